use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::error::CatalogLoadError;

pub const PRESETS_PATH: &str = "api/presets";
pub const GENERATE_MUSIC_PATH: &str = "api/generate-music";
pub const GENERATE_FROM_PRESET_PATH: &str = "api/generate-from-preset";

/// Preset key -> human readable description.
pub type PresetCatalog = BTreeMap<String, String>;

/// JSON body of `POST /api/generate-music`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBody {
    pub prompt: String,
    pub duration_seconds: f64,
    pub force_instrumental: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PresetListing {
    #[serde(default)]
    presets: PresetCatalog,
}

/// Raw outcome of a generation request that reached the backend.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl BackendReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The remote service that lists presets and renders audio.
///
/// `Err(String)` from the generation calls is a transport failure; any HTTP
/// status, including errors, comes back as a [`BackendReply`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn list_presets(&self) -> Result<PresetCatalog, CatalogLoadError>;

    async fn generate_music(&self, body: &PromptBody) -> Result<BackendReply, String>;

    async fn generate_from_preset(
        &self,
        preset: &str,
        duration_seconds: f64,
    ) -> Result<BackendReply, String>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base_url
            .join(path)
            .map_err(|e| format!("Invalid backend URL: {}", e))
    }

    /// `/api/generate-from-preset?preset=<key>&duration_seconds=<n>`
    pub fn preset_url(&self, preset: &str, duration_seconds: f64) -> Result<Url, String> {
        let mut url = self.endpoint(GENERATE_FROM_PRESET_PATH)?;
        url.query_pairs_mut()
            .append_pair("preset", preset)
            .append_pair("duration_seconds", &duration_seconds.to_string());
        Ok(url)
    }

    async fn into_reply(response: reqwest::Response) -> Result<BackendReply, String> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| e.to_string())?;

        debug!(status, bytes = body.len(), "backend replied");
        Ok(BackendReply {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn list_presets(&self) -> Result<PresetCatalog, CatalogLoadError> {
        let url = self
            .endpoint(PRESETS_PATH)
            .map_err(CatalogLoadError::Transport)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogLoadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogLoadError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogLoadError::Transport(e.to_string()))?;
        let listing: PresetListing =
            serde_json::from_slice(&body).map_err(|e| CatalogLoadError::Decode(e.to_string()))?;

        Ok(listing.presets)
    }

    async fn generate_music(&self, body: &PromptBody) -> Result<BackendReply, String> {
        let url = self.endpoint(GENERATE_MUSIC_PATH)?;
        debug!(%url, "requesting generation from prompt");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Self::into_reply(response).await
    }

    async fn generate_from_preset(
        &self,
        preset: &str,
        duration_seconds: f64,
    ) -> Result<BackendReply, String> {
        let url = self.preset_url(preset, duration_seconds)?;
        debug!(%url, "requesting generation from preset");

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Self::into_reply(response).await
    }
}
