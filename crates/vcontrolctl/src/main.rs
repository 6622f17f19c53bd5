use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vcontrolctl::cmd_allow;
use vcontrolctl::cmd_check;
use vcontrolctl::cmd_show;
use vcontrolctl::cmd_tree;
use vcontrolctl::cmd_watch;

#[derive(Parser, Debug)]
#[command(name = "vcontrolctl", version, about = "V-Control catalog CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long)]
    json: bool,
    /// V-Control document
    #[arg(short, long, default_value = "/etc/vcontrold/vcontrold.xml")]
    file: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile the document and print a summary
    Check,
    /// Dump the expanded, comment-free tree
    Tree,
    /// Print one catalog entry
    Show {
        #[command(subcommand)]
        what: Show,
    },
    /// Test a client address against the allow list
    Allow { ip: IpAddr },
    /// Keep the catalog loaded, reloading on SIGHUP
    Watch,
}

#[derive(Subcommand, Debug)]
enum Show {
    /// Device with its merged command table
    Device { id: String },
    /// Command as seen by one device
    Command { id: String, name: String },
    /// Unit by name or abbreviation
    Unit { name: String },
    /// Protocol with macros and initial commands
    Protocol { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        file,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .init();

    match cmd {
        Cmd::Check => cmd_check::run(&file, json)?,
        Cmd::Tree => cmd_tree::run(&file, json)?,
        Cmd::Show { what } => match what {
            Show::Device { id } => cmd_show::device(&file, &id, json)?,
            Show::Command { id, name } => cmd_show::command(&file, &id, &name, json)?,
            Show::Unit { name } => cmd_show::unit(&file, &name, json)?,
            Show::Protocol { name } => cmd_show::protocol(&file, &name, json)?,
        },
        Cmd::Allow { ip } => cmd_allow::run(&file, ip, json)?,
        Cmd::Watch => cmd_watch::run(&file).await?,
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check_defaults() {
        let cli = Cli::parse_from(["vcontrolctl", "check"]);
        assert_eq!(cli.file, PathBuf::from("/etc/vcontrold/vcontrold.xml"));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.json);
        assert!(matches!(cli.cmd, Cmd::Check));
    }

    #[test]
    fn parse_show_command() {
        let cli = Cli::parse_from([
            "vcontrolctl",
            "-vv",
            "--file",
            "vcontrold.xml",
            "show",
            "command",
            "2098",
            "getTempA",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, PathBuf::from("vcontrold.xml"));
        match cli.cmd {
            Cmd::Show {
                what: Show::Command { id, name },
            } => {
                assert_eq!(id, "2098");
                assert_eq!(name, "getTempA");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_allow_address() {
        let cli = Cli::parse_from(["vcontrolctl", "--json", "allow", "10.0.0.7"]);
        assert!(cli.json);
        match cli.cmd {
            Cmd::Allow { ip } => assert_eq!(ip, "10.0.0.7".parse::<IpAddr>().unwrap()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(Cli::try_parse_from(["vcontrolctl", "allow", "10.0.0"]).is_err());
    }
}
