//! UI surface seams
//!
//! The core never talks to a concrete display. It writes through these sinks,
//! each of which is optional: a missing sink degrades to a debug log line and
//! never fails a turn.

mod command;
mod snapshot;

pub use command::{CommandPlayer, CommandSpeech};
pub use snapshot::{StatusLine, StatusMessage, SurfaceSnapshot, SurfaceView, TranscriptBox, VoiceList};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::AgentResult;

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Opaque reference to playable audio (a URL in practice)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AudioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait StatusSink: Send + Sync {
    fn show(&self, message: &str, level: StatusLevel);
    fn clear(&self);
}

pub trait TranscriptSink: Send + Sync {
    fn set_text(&self, text: &str);
    fn clear(&self);
}

pub trait VoiceListSink: Send + Sync {
    fn populate(&self, voices: &[String]);
}

/// Plays an audio reference
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Resolves once playback has ended
    async fn play(&self, audio: &AudioRef) -> AgentResult<()>;
}

/// On-device speech synthesis used as the first fallback
#[async_trait::async_trait]
pub trait LocalSpeech: Send + Sync {
    async fn speak(&self, text: &str) -> AgentResult<()>;
}

/// The set of sinks the core writes to
#[derive(Clone, Default)]
pub struct UiSurface {
    pub status: Option<Arc<dyn StatusSink>>,
    pub recording_status: Option<Arc<dyn StatusSink>>,
    pub transcript: Option<Arc<dyn TranscriptSink>>,
    pub voices: Option<Arc<dyn VoiceListSink>>,
    pub player: Option<Arc<dyn AudioPlayer>>,
    pub speech: Option<Arc<dyn LocalSpeech>>,
}

impl UiSurface {
    pub fn show_status(&self, message: &str, level: StatusLevel) {
        match &self.status {
            Some(sink) => sink.show(message, level),
            None => debug!("status ({:?}): {}", level, message),
        }
    }

    pub fn clear_status(&self) {
        if let Some(sink) = &self.status {
            sink.clear();
        }
    }

    pub fn show_recording_status(&self, message: &str, level: StatusLevel) {
        match &self.recording_status {
            Some(sink) => sink.show(message, level),
            None => debug!("recording status ({:?}): {}", level, message),
        }
    }

    pub fn set_transcript(&self, text: &str) {
        match &self.transcript {
            Some(sink) => sink.set_text(text),
            None => debug!("transcript: {}", text),
        }
    }

    pub fn clear_transcript(&self) {
        if let Some(sink) = &self.transcript {
            sink.clear();
        }
    }

    pub fn populate_voices(&self, voices: &[String]) {
        match &self.voices {
            Some(sink) => sink.populate(voices),
            None => debug!("voices: {}", voices.join(", ")),
        }
    }
}
