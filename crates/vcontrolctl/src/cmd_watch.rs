use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use vcontrol_core::CatalogStore;

/// Reload the catalog into `store`, keeping the current one on failure.
///
/// Returns whether the new catalog was published.
pub fn reload(store: &CatalogStore, path: &Path) -> bool {
    match store.load(path) {
        Ok(generation) => {
            info!(generation, path = %path.display(), "catalog reloaded");
            true
        }
        Err(err) => {
            let active = store.get().map(|c| c.generation()).ok();
            warn!(error = %err, active = ?active, "reload failed, keeping active catalog");
            false
        }
    }
}

/// Load the catalog, then reload it on SIGHUP until Ctrl-C.
pub async fn run(path: &Path) -> Result<()> {
    let store = CatalogStore::new();
    let generation = store
        .load(path)
        .with_context(|| format!("initial load of {}", path.display()))?;
    info!(generation, path = %path.display(), "watching catalog (SIGHUP reloads, Ctrl-C exits)");

    wait_for_signals(&store, path).await?;

    let catalog = store.get().context("catalog disappeared")?;
    info!(generation = catalog.generation(), "stopped watching");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signals(store: &CatalogStore, path: &Path) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("install SIGHUP handler")?;
    loop {
        tokio::select! {
            _ = hangup.recv() => {
                info!("SIGHUP received");
                reload(store, path);
            }
            res = tokio::signal::ctrl_c() => {
                res.context("wait for Ctrl-C")?;
                return Ok(());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_store: &CatalogStore, _path: &Path) -> Result<()> {
    tokio::signal::ctrl_c().await.context("wait for Ctrl-C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_document, DOCUMENT};
    use std::fs;

    #[test]
    fn failed_reload_keeps_the_active_catalog() {
        let (_dir, path) = write_document();
        let store = CatalogStore::new();
        assert!(reload(&store, &path));
        assert_eq!(store.get().expect("loaded").generation(), 1);

        let broken = DOCUMENT.replace(r#"protocol="KW2"/>"#, r#"protocol="P300"/>"#);
        fs::write(&path, broken).expect("rewrite");
        assert!(!reload(&store, &path));
        assert_eq!(store.get().expect("loaded").generation(), 1);

        fs::write(&path, DOCUMENT).expect("restore");
        assert!(reload(&store, &path));
        assert_eq!(store.get().expect("loaded").generation(), 2);
    }
}
