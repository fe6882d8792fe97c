use serde::{Deserialize, Serialize};

use crate::audio::AudioHandle;
use crate::error::GenerateError;

pub const DEFAULT_DURATION_SECONDS: f64 = 30.0;

/// What the user has typed or picked so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Draft {
    pub prompt: String,
    /// Empty means "no preset".
    pub preset: String,
    pub duration_seconds: f64,
    pub force_instrumental: bool,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            preset: String::new(),
            duration_seconds: DEFAULT_DURATION_SECONDS,
            force_instrumental: true,
        }
    }
}

impl Draft {
    /// Resolves the draft into the request to dispatch. A selected preset
    /// takes precedence over the prompt.
    pub fn to_request(&self) -> Result<GenerationRequest, GenerateError> {
        if !self.preset.is_empty() {
            return Ok(GenerationRequest::FromPreset {
                preset_key: self.preset.clone(),
                duration_seconds: self.duration_seconds,
            });
        }

        if self.prompt.trim().is_empty() {
            return Err(GenerateError::Validation);
        }

        Ok(GenerationRequest::FromPrompt {
            prompt: self.prompt.clone(),
            duration_seconds: self.duration_seconds,
            force_instrumental: self.force_instrumental,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    FromPrompt {
        prompt: String,
        duration_seconds: f64,
        force_instrumental: bool,
    },
    FromPreset {
        preset_key: String,
        duration_seconds: f64,
    },
}

#[derive(Debug, Default)]
pub struct UiState {
    pub draft: Draft,
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<AudioHandle>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UiSnapshot {
        UiSnapshot {
            prompt: self.draft.prompt.clone(),
            preset: self.draft.preset.clone(),
            duration_seconds: self.draft.duration_seconds,
            force_instrumental: self.draft.force_instrumental,
            loading: self.loading,
            error: self.error.clone(),
            audio_url: self.result.as_ref().map(AudioHandle::url),
        }
    }
}

/// Serializable view of [`UiState`] pushed to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSnapshot {
    pub prompt: String,
    pub preset: String,
    pub duration_seconds: f64,
    pub force_instrumental: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub audio_url: Option<String>,
}
