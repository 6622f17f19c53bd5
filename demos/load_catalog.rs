use std::env;
use std::error::Error;
use std::path::PathBuf;

use vcontrol_core::Catalog;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let path = env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/vcontrold.xml"))
    });

    let catalog = Catalog::load(&path)?;
    println!(
        "{}: default device {} on port {}",
        path.display(),
        catalog.default_device().id,
        catalog.config().port
    );
    for device in catalog.devices() {
        println!("{} {} ({})", device.id, device.name, device.protocol.name);
        for cmd in device.commands() {
            let unit = cmd
                .unit
                .as_deref()
                .and_then(|u| catalog.unit_by_abbrev(u).or_else(|| catalog.unit(u)))
                .map(|u| u.name.as_str())
                .unwrap_or("-");
            println!(
                "    {:<20} {:<10} addr={:<6} len={} unit={}",
                cmd.name,
                cmd.origin,
                cmd.address.as_deref().unwrap_or("-"),
                cmd.length,
                unit
            );
        }
    }
    Ok(())
}
