//! Process-wide home of the active catalog.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::CatalogError;

/// Holds the current catalog snapshot and swaps it atomically on reload.
///
/// Readers get an `Arc` and keep a superseded catalog alive until they drop
/// it. A failed load never touches the current snapshot.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Option<Arc<Catalog>>>,
    generation: AtomicU64,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Result<Arc<Catalog>, CatalogError> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone().ok_or(CatalogError::NotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Make `catalog` the current snapshot. Returns its generation.
    pub fn publish(&self, mut catalog: Catalog) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        catalog.generation = generation;
        let previous = guard.replace(Arc::new(catalog));
        drop(guard);
        if let Some(previous) = previous {
            info!(
                generation,
                previous = previous.generation(),
                "catalog replaced"
            );
        } else {
            info!(generation, "catalog published");
        }
        generation
    }

    /// Compile the document at `path` and publish it on success.
    pub fn load(&self, path: &Path) -> Result<u64, CatalogError> {
        let catalog = Catalog::load(path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "catalog load failed, keeping current");
            err
        })?;
        Ok(self.publish(catalog))
    }

    /// Compile an in-memory document and publish it on success.
    pub fn load_str(&self, xml: &str, base_dir: &Path) -> Result<u64, CatalogError> {
        let catalog = Catalog::load_str(xml, base_dir).map_err(|err| {
            warn!(error = %err, "catalog load failed, keeping current");
            err
        })?;
        Ok(self.publish(catalog))
    }
}
