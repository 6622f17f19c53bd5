use std::error::Error;
use std::fs;
use std::path::Path;

use vcontrol_core::CatalogStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let dir = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demos"));
    let good = fs::read_to_string(dir.join("vcontrold.xml"))?;

    let store = CatalogStore::new();
    let generation = store.load_str(&good, dir)?;
    println!("published generation {generation}");

    // A reader keeps its snapshot while the store moves on.
    let reader = store.get()?;
    let task = tokio::spawn(async move { reader.devices().len() });

    let broken = good.replace(r#"<device ID="2098"/>"#, r#"<device ID="FFFF"/>"#);
    if let Err(err) = store.load_str(&broken, dir) {
        println!("reload rejected: {err}");
    }
    println!("active generation {}", store.get()?.generation());
    println!("reader saw {} devices", task.await?);
    Ok(())
}
