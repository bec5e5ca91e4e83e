use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use super::{StatusLevel, StatusSink, TranscriptSink, UiSurface, VoiceListSink};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub shown_at: DateTime<Utc>,
}

/// Single status line that keeps the latest message
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Mutex<Option<StatusMessage>>,
}

impl StatusLine {
    pub fn current(&self) -> Option<StatusMessage> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn text(&self) -> Option<String> {
        self.current().map(|m| m.text)
    }
}

impl StatusSink for StatusLine {
    fn show(&self, message: &str, level: StatusLevel) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(StatusMessage {
            text: message.to_string(),
            level,
            shown_at: Utc::now(),
        });
    }

    fn clear(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[derive(Debug, Default)]
pub struct TranscriptBox {
    text: Mutex<String>,
}

impl TranscriptBox {
    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TranscriptSink for TranscriptBox {
    fn set_text(&self, text: &str) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
    }

    fn clear(&self) {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Debug, Default)]
pub struct VoiceList {
    voices: Mutex<Vec<String>>,
}

impl VoiceList {
    pub fn voices(&self) -> Vec<String> {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl VoiceListSink for VoiceList {
    fn populate(&self, voices: &[String]) {
        *self.voices.lock().unwrap_or_else(PoisonError::into_inner) = voices.to_vec();
    }
}

/// Serializable view of everything the surface currently shows
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceView {
    pub status: Option<StatusMessage>,
    pub recording_status: Option<StatusMessage>,
    pub transcript: String,
    pub voices: Vec<String>,
}

/// In-memory UI surface, read back by the control API
#[derive(Debug, Default, Clone)]
pub struct SurfaceSnapshot {
    pub status: Arc<StatusLine>,
    pub recording_status: Arc<StatusLine>,
    pub transcript: Arc<TranscriptBox>,
    pub voices: Arc<VoiceList>,
}

impl SurfaceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display sinks backed by this snapshot (no player or local speech)
    pub fn surface(&self) -> UiSurface {
        UiSurface {
            status: Some(self.status.clone()),
            recording_status: Some(self.recording_status.clone()),
            transcript: Some(self.transcript.clone()),
            voices: Some(self.voices.clone()),
            player: None,
            speech: None,
        }
    }

    pub fn view(&self) -> SurfaceView {
        SurfaceView {
            status: self.status.current(),
            recording_status: self.recording_status.current(),
            transcript: self.transcript.text(),
            voices: self.voices.voices(),
        }
    }
}
