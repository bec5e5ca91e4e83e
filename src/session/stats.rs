use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::SessionId;
use crate::conversation::LoopState;
use crate::turn::ConversationMode;

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStats {
    /// Session the turns are bound to
    pub session_id: SessionId,

    /// Echo or conversation mode
    pub mode: ConversationMode,

    /// Current loop state
    pub state: LoopState,

    /// When the loop was created
    pub started_at: DateTime<Utc>,

    /// Turns whose backend calls have settled
    pub turns_completed: usize,

    /// Settled turns that came back degraded
    pub degraded_turns: usize,

    /// Transcription of the most recent turn, if any
    pub last_transcription: Option<String>,
}
