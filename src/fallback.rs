//! Last line of defense against dead air

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::ui::{AudioPlayer, AudioRef, LocalSpeech, StatusLevel, StatusSink, UiSurface};

/// Which channel ended up carrying an announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Spoken,
    Displayed,
    CachedAudio,
    Silent,
}

/// Tells the user something went wrong, through the first channel that works:
/// local speech, then the recording status line, then the last fallback audio
/// the server handed us.
pub struct FallbackAnnouncer {
    speech: Option<Arc<dyn LocalSpeech>>,
    status: Option<Arc<dyn StatusSink>>,
    player: Option<Arc<dyn AudioPlayer>>,
    cached_audio: Mutex<Option<AudioRef>>,
}

impl FallbackAnnouncer {
    pub fn new(ui: &UiSurface) -> Self {
        Self {
            speech: ui.speech.clone(),
            status: ui.recording_status.clone().or_else(|| ui.status.clone()),
            player: ui.player.clone(),
            cached_audio: Mutex::new(None),
        }
    }

    /// Keep a server-provided fallback clip for later announcements
    pub fn remember_fallback(&self, audio: AudioRef) {
        info!("Caching fallback audio {}", audio);
        *self
            .cached_audio
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(audio);
    }

    pub fn cached_fallback(&self) -> Option<AudioRef> {
        self.cached_audio
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Never fails; reports which channel was used
    pub async fn announce(&self, message: &str) -> Announcement {
        warn!("Fallback announcement: {}", message);

        if let Some(speech) = &self.speech {
            match speech.speak(message).await {
                Ok(()) => return Announcement::Spoken,
                Err(e) => warn!("Local speech failed: {}", e),
            }
        }

        if let Some(status) = &self.status {
            status.show(message, StatusLevel::Error);
            return Announcement::Displayed;
        }

        if let (Some(player), Some(audio)) = (&self.player, self.cached_fallback()) {
            match player.play(&audio).await {
                Ok(()) => return Announcement::CachedAudio,
                Err(e) => warn!("Fallback audio failed: {}", e),
            }
        }

        Announcement::Silent
    }
}
