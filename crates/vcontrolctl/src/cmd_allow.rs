use std::net::IpAddr;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;
use vcontrol_core::Catalog;

use crate::common;

#[derive(Serialize, Debug, PartialEq)]
struct Verdict {
    address: String,
    allowed: bool,
    entry: Option<String>,
}

fn check(catalog: &Catalog, addr: IpAddr) -> Verdict {
    let entry = catalog.allow_entry(addr);
    debug!(%addr, entry = ?entry.map(|e| e.text()), "allow-list lookup");
    Verdict {
        address: addr.to_string(),
        allowed: entry.is_some(),
        entry: entry.map(|e| e.text().to_string()),
    }
}

pub fn run(path: &Path, addr: IpAddr, json: bool) -> Result<()> {
    let catalog = common::load_catalog(path)?;
    let verdict = check(&catalog, addr);
    if json {
        return common::print_json(&verdict);
    }
    match &verdict.entry {
        Some(entry) => println!("{} allowed by {entry}", verdict.address),
        None => println!("{} denied", verdict.address),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_document;

    #[test]
    fn verdicts_name_the_matching_entry() {
        let (_dir, path) = write_document();
        let catalog = common::load_catalog(&path).expect("load");

        let inside = check(&catalog, "192.168.4.2".parse().expect("ip"));
        assert!(inside.allowed);
        assert_eq!(inside.entry.as_deref(), Some("192.168.0.0/16"));

        let mapped = check(&catalog, "::ffff:192.168.4.2".parse().expect("ip"));
        assert!(mapped.allowed);

        let outside = check(&catalog, "10.0.0.1".parse().expect("ip"));
        assert_eq!(
            outside,
            Verdict {
                address: "10.0.0.1".into(),
                allowed: false,
                entry: None,
            }
        );
    }
}
