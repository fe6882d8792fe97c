use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioHandle, AudioStore};
use crate::backend::{GenerationBackend, PresetCatalog, PromptBody};
use crate::error::GenerateError;
use crate::state::{Draft, GenerationRequest, UiSnapshot, UiState};

const EVENT_CAPACITY: usize = 64;

/// Owns the form state and talks to the backend, one request at a time.
///
/// Every method takes `&self`; the state lock is only held between awaits,
/// so the `loading` flag is what keeps a second `generate()` out while one
/// is in flight.
pub struct GenerationController<B> {
    backend: B,
    audio: AudioStore,
    state: Mutex<UiState>,
    presets: RwLock<PresetCatalog>,
    events: broadcast::Sender<String>,
}

impl<B: GenerationBackend> GenerationController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_store(backend, AudioStore::new())
    }

    pub fn with_store(backend: B, audio: AudioStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            audio,
            state: Mutex::new(UiState::new()),
            presets: RwLock::new(PresetCatalog::new()),
            events,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    /// JSON snapshots, one per state transition.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> UiSnapshot {
        self.state.lock().snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn presets(&self) -> PresetCatalog {
        self.presets.read().clone()
    }

    /// Typing a prompt drops any preset choice.
    pub fn set_prompt_text(&self, text: impl Into<String>) {
        {
            let mut state = self.state.lock();
            state.draft.prompt = text.into();
            state.draft.preset.clear();
        }
        self.publish();
    }

    /// Picking a preset (empty key = none) drops the typed prompt. The key is
    /// not checked against the catalog; the backend rejects unknown keys.
    pub fn select_preset(&self, key: impl Into<String>) {
        {
            let mut state = self.state.lock();
            state.draft.preset = key.into();
            state.draft.prompt.clear();
        }
        self.publish();
    }

    pub fn set_duration(&self, seconds: f64) {
        self.state.lock().draft.duration_seconds = seconds;
        self.publish();
    }

    pub fn set_force_instrumental(&self, enabled: bool) {
        self.state.lock().draft.force_instrumental = enabled;
        self.publish();
    }

    /// Replaces the whole draft at once. A non-empty preset wins and clears
    /// the prompt, same as `select_preset`.
    pub fn set_draft(&self, mut draft: Draft) {
        if !draft.preset.is_empty() {
            draft.prompt.clear();
        }
        self.state.lock().draft = draft;
        self.publish();
    }

    /// Fetches the preset catalog. Failures are logged and leave the catalog
    /// empty; they never reach the user-visible error.
    pub async fn load_presets(&self) {
        match self.backend.list_presets().await {
            Ok(catalog) => {
                info!(count = catalog.len(), "presets loaded");
                *self.presets.write() = catalog;
                // Lets an already open page refresh its preset list.
                self.publish();
            }
            Err(e) => {
                warn!("Failed to load presets: {}", e);
                self.presets.write().clear();
            }
        }
    }

    /// Submits the current draft.
    ///
    /// A call made while another is in flight returns `Ok(())` without
    /// touching the backend. Errors are returned and also stored as the
    /// user-visible error message. Dropping the future mid-request clears
    /// `loading` again.
    pub async fn generate(&self) -> Result<(), GenerateError> {
        let request = {
            let mut state = self.state.lock();
            if state.loading {
                debug!("generation already in flight, ignoring");
                return Ok(());
            }

            let parsed = state.draft.to_request();
            match parsed {
                Ok(request) => {
                    state.loading = true;
                    state.error = None;
                    state.result = None;
                    request
                }
                Err(e) => {
                    state.error = Some(e.to_string());
                    drop(state);
                    self.publish();
                    return Err(e);
                }
            }
        };
        let mut in_flight = InFlight {
            controller: self,
            armed: true,
        };
        self.publish();

        let outcome = self.dispatch(&request).await;

        let result = {
            let mut state = self.state.lock();
            state.loading = false;
            in_flight.armed = false;
            match outcome {
                Ok(handle) => {
                    info!(url = %handle.url(), bytes = handle.size_bytes(), "audio ready");
                    // Release whatever is still held before installing the new clip.
                    state.result.take();
                    state.result = Some(handle);
                    Ok(())
                }
                Err(e) => {
                    error!("Error generating music: {}", e);
                    state.error = Some(e.to_string());
                    Err(e)
                }
            }
        };
        self.publish();
        result
    }

    /// Releases the held audio, if any.
    pub fn teardown(&self) {
        let released = self.state.lock().result.take();
        if let Some(handle) = released {
            debug!(id = handle.id(), "releasing audio on teardown");
        }
        self.publish();
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<AudioHandle, GenerateError> {
        let reply = match request {
            GenerationRequest::FromPreset {
                preset_key,
                duration_seconds,
            } => {
                info!(preset = %preset_key, duration_seconds, "generating from preset");
                self.backend
                    .generate_from_preset(preset_key, *duration_seconds)
                    .await
            }
            GenerationRequest::FromPrompt {
                prompt,
                duration_seconds,
                force_instrumental,
            } => {
                info!(duration_seconds, force_instrumental, "generating from prompt");
                let body = PromptBody {
                    prompt: prompt.clone(),
                    duration_seconds: *duration_seconds,
                    force_instrumental: *force_instrumental,
                };
                self.backend.generate_music(&body).await
            }
        }
        .map_err(GenerateError::Transport)?;

        if !reply.is_success() {
            return Err(GenerateError::from_response(reply.status, &reply.body));
        }

        Ok(self.audio.create(reply.body, reply.content_type))
    }

    fn publish(&self) {
        match serde_json::to_string(&self.snapshot()) {
            Ok(json) => {
                // No subscribers is fine.
                let _ = self.events.send(json);
            }
            Err(e) => error!("Snapshot encode error: {}", e),
        }
    }
}

/// Resets `loading` if a `generate()` future is dropped before it completes.
struct InFlight<'a, B: GenerationBackend> {
    controller: &'a GenerationController<B>,
    armed: bool,
}

impl<B: GenerationBackend> Drop for InFlight<'_, B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("generation dropped before the backend answered");
        self.controller.state.lock().loading = false;
        self.controller.publish();
    }
}
