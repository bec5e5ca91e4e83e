use crate::conversation::ConversationLoop;
use crate::session::SessionId;
use crate::turn::TextToSpeech;
use crate::ui::SurfaceSnapshot;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The conversation driven by start/stop/cancel requests
    pub conversation: Arc<ConversationLoop>,

    /// Manual text-to-speech path
    pub speech: Arc<TextToSpeech>,

    /// What the surface currently shows
    pub surface: SurfaceSnapshot,

    pub session_id: SessionId,

    /// Page address carrying the session, for resuming after a reload
    pub address: String,
}
