//! Shared command setup: config, catalog and stores.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use examforge_core::engine::{SessionEngine, SessionEngineConfig};
use examforge_core::parser::{self, Catalog};
use examforge_store::config::load_config_from;
use examforge_store::{ExamforgeConfig, FileResultStore, MemoryCatalog};

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn load_config(&self) -> Result<ExamforgeConfig> {
        let mut config = load_config_from(self.config.as_deref())?;
        if let Some(catalog) = &self.catalog {
            config.catalog = catalog.clone();
        }
        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        Ok(config)
    }
}

pub fn load_catalog(config: &ExamforgeConfig) -> Result<Catalog> {
    parser::load_catalog(&config.catalog)
        .with_context(|| format!("failed to load catalog from {}", config.catalog.display()))
}

/// Everything a session or report command needs.
pub struct AppContext {
    pub config: ExamforgeConfig,
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<FileResultStore>,
}

impl AppContext {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config = overrides.load_config()?;
        let catalog = Arc::new(MemoryCatalog::new(load_catalog(&config)?));
        let store = Arc::new(FileResultStore::new(&config.results_dir));
        tracing::debug!(
            catalog = %config.catalog.display(),
            results_dir = %config.results_dir.display(),
            questions = catalog.question_count(),
            "context loaded"
        );
        Ok(Self {
            config,
            catalog,
            store,
        })
    }

    pub fn engine(&self) -> SessionEngine {
        SessionEngine::new(
            self.catalog.clone(),
            self.catalog.clone(),
            self.store.clone(),
            SessionEngineConfig {
                tick_interval: self.config.tick_interval(),
            },
        )
    }
}
