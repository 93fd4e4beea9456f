//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tattoo_core::{ImageModel, OutputStore};

use crate::config::Config;
use crate::templates::Templates;

/// State shared across all HTTP handlers, built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Generative image model; Gemini in production.
    pub model: Arc<dyn ImageModel>,
    /// Output directory for generated images.
    pub store: Arc<OutputStore>,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("model", &self.model.model_id())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
