pub mod audio;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod local_server;
pub mod state;
pub mod websocket;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub use audio::{AudioHandle, AudioStore};
pub use backend::{GenerationBackend, HttpBackend, PresetCatalog, PromptBody};
pub use config::Config;
pub use controller::GenerationController;
pub use error::{CatalogLoadError, GenerateError};
pub use state::{Draft, GenerationRequest, UiSnapshot, UiState};

/// Starts the studio against the configured backend and serves it until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    info!(backend = %config.backend_url, "using generation backend");
    let backend = HttpBackend::new(config.backend_url.clone());
    let controller = Arc::new(GenerationController::new(backend));

    // Presets are optional; the page works without them.
    tokio::spawn({
        let controller = controller.clone();
        async move { controller.load_presets().await }
    });

    local_server::start_server(controller.clone(), config.listen_addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await?;

    controller.teardown();
    Ok(())
}
