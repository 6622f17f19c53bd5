use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use vcontrol_core::Catalog;

use crate::common;

#[derive(Serialize)]
struct Summary {
    source: String,
    protocols: usize,
    units: usize,
    devices: usize,
    default_commands: usize,
    device_commands: usize,
    default_device: String,
    tty: Option<String>,
    port: u16,
    allow: Vec<String>,
}

fn summarize(catalog: &Catalog, path: &Path) -> Summary {
    Summary {
        source: path.display().to_string(),
        protocols: catalog.protocols().len(),
        units: catalog.units().len(),
        devices: catalog.devices().len(),
        default_commands: catalog.default_commands().len(),
        device_commands: catalog.devices().iter().map(|d| d.commands().len()).sum(),
        default_device: catalog.default_device().id.clone(),
        tty: catalog.config().tty.clone(),
        port: catalog.config().port,
        allow: catalog
            .config()
            .allow
            .entries()
            .iter()
            .map(|e| e.text().to_string())
            .collect(),
    }
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let summary = summarize(&catalog, path);
    info!(source = %summary.source, "catalog is valid");

    if json {
        return common::print_json(&summary);
    }

    println!("{}: OK", summary.source);
    println!("  protocols        {}", summary.protocols);
    println!("  units            {}", summary.units);
    println!("  devices          {}", summary.devices);
    println!("  default commands {}", summary.default_commands);
    println!("  device commands  {}", summary.device_commands);
    println!("  default device   {}", summary.default_device);
    println!("  tty              {}", summary.tty.as_deref().unwrap_or("-"));
    println!("  port             {}", summary.port);
    println!("  allow            {}", summary.allow.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_document;

    #[test]
    fn summary_counts_everything() {
        let (_dir, path) = write_document();
        let catalog = common::load_catalog(&path).expect("load");
        let summary = summarize(&catalog, &path);
        assert_eq!(summary.protocols, 1);
        assert_eq!(summary.devices, 2);
        assert_eq!(summary.default_commands, 1);
        assert_eq!(summary.device_commands, 2);
        assert_eq!(summary.default_device, "2098");
        assert_eq!(summary.port, 3002);
        assert_eq!(summary.allow, vec!["192.168.0.0/16".to_string()]);
    }

    #[test]
    fn broken_document_reports_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.xml");
        let err = run(&path, false).unwrap_err();
        assert!(format!("{err:#}").contains("load catalog from"));
    }
}
