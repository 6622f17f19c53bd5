use std::env;
use std::error::Error;
use std::net::IpAddr;

use vcontrol_core::{AllowEntry, AllowList};

fn main() -> Result<(), Box<dyn Error>> {
    let mut list = AllowList::new();
    for rule in ["127.0.0.1", "192.168.178.0/24", "10.0.0.0/8"] {
        let entry: AllowEntry = rule.parse()?;
        println!("{:<18} mask {:#010x}", entry.text(), entry.mask());
        list.push(entry);
    }

    let probes: Vec<String> = env::args().skip(1).collect();
    let probes = if probes.is_empty() {
        vec!["192.168.178.20".to_string(), "192.168.1.20".to_string()]
    } else {
        probes
    };
    for probe in probes {
        let addr: IpAddr = probe.parse()?;
        match list.find(addr) {
            Some(entry) => println!("{addr}: allowed by {entry}"),
            None => println!("{addr}: denied"),
        }
    }
    Ok(())
}
