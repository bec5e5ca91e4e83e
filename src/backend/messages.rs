use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};
use crate::ui::AudioRef;

/// Request body for `POST /generate_audio`
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: String,
}

/// Every field any backend operation may answer with
///
/// Decoded once at the boundary and immediately classified into a `BackendReply`.
#[derive(Debug, Default, Deserialize)]
pub struct RawReply {
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub voice_used: Option<String>,
    #[serde(default)]
    pub voices: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub degraded: Option<bool>,
}

/// Outcome of a backend operation that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply<T> {
    Success(T),
    /// The server could not do the work but may offer its own fallback audio
    Degraded {
        audio_url: Option<AudioRef>,
        message: String,
    },
    Failure {
        error: String,
        message: Option<String>,
        suggestions: Vec<String>,
    },
}

impl<T> BackendReply<T> {
    /// Collapse non-success outcomes into the error taxonomy
    pub fn into_result(self) -> AgentResult<T> {
        match self {
            BackendReply::Success(value) => Ok(value),
            BackendReply::Degraded { audio_url, message } => Err(AgentError::BackendDegraded {
                message,
                audio_url: audio_url.map(|a| a.to_string()),
            }),
            BackendReply::Failure {
                error,
                message,
                suggestions,
            } => Err(AgentError::BackendRejected {
                message: message.unwrap_or(error),
                suggestions,
            }),
        }
    }
}

/// Spoken answer from the echo or agent chat operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenReply {
    pub audio: AudioRef,
    pub transcription: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSpeech {
    pub audio: AudioRef,
    pub voice_used: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RawReply {
    /// Classify a reply given the HTTP success flag
    ///
    /// `extract` pulls the success payload out; `None` turns an otherwise
    /// successful reply into a failure carrying `missing`.
    fn classify<T>(
        mut self,
        ok: bool,
        missing: &str,
        extract: impl FnOnce(&mut RawReply) -> Option<T>,
    ) -> BackendReply<T> {
        let failed = !ok || self.error.is_some();

        if self.degraded == Some(true) || (failed && non_empty(self.audio_url.clone()).is_some()) {
            let message = non_empty(self.message)
                .or(self.error)
                .unwrap_or_else(|| "Service degraded".to_string());
            return BackendReply::Degraded {
                audio_url: non_empty(self.audio_url).map(AudioRef::new),
                message,
            };
        }

        if !failed {
            if let Some(value) = extract(&mut self) {
                return BackendReply::Success(value);
            }
        }

        BackendReply::Failure {
            error: self.error.unwrap_or_else(|| missing.to_string()),
            message: non_empty(self.message),
            suggestions: self.suggestions.unwrap_or_default(),
        }
    }

    pub fn into_spoken(self, ok: bool) -> BackendReply<SpokenReply> {
        self.classify(ok, "No audio URL received", |raw| {
            let audio = non_empty(raw.audio_url.take())?;
            Some(SpokenReply {
                audio: AudioRef::new(audio),
                transcription: non_empty(raw.transcription.take()),
            })
        })
    }

    pub fn into_synthesized(self, ok: bool, requested_voice: &str) -> BackendReply<SynthesizedSpeech> {
        self.classify(ok, "No audio URL received", |raw| {
            let audio = non_empty(raw.audio_url.take())?;
            Some(SynthesizedSpeech {
                audio: AudioRef::new(audio),
                voice_used: non_empty(raw.voice_used.take())
                    .unwrap_or_else(|| requested_voice.to_string()),
            })
        })
    }

    /// An empty transcription is still a success
    pub fn into_transcription(self, ok: bool) -> BackendReply<String> {
        self.classify(ok, "No transcription received", |raw| {
            raw.transcription.take().map(|t| t.trim().to_string())
        })
    }
}
