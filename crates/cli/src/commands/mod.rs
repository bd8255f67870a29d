//! Subcommand implementations.

pub mod assemble;
pub mod diagrams;
pub mod fragment;
pub mod import;
pub mod init;
pub mod status;

use std::sync::Arc;

use arbor_config::AppConfig;
use arbor_core::store::{DiagramStore, FragmentStore};
use arbor_store::InMemoryStore;

/// Both store handles, opened from the configured backend.
pub struct Stores {
    pub backend: &'static str,
    pub fragments: Arc<dyn FragmentStore>,
    pub diagrams: Arc<dyn DiagramStore>,
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

pub async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match config.store.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.store.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store = Arc::new(arbor_store::SqliteStore::new(&path.to_string_lossy()).await?);
            Ok(Stores {
                backend: "sqlite",
                fragments: store.clone(),
                diagrams: store,
            })
        }
        "memory" => {
            tracing::warn!("Using the in-memory store; nothing will be persisted");
            let store = Arc::new(InMemoryStore::new());
            Ok(Stores {
                backend: "memory",
                fragments: store.clone(),
                diagrams: store,
            })
        }
        other => Err(format!("Store backend '{other}' is not available in this build").into()),
    }
}
