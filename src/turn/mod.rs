//! Turn dispatch
//!
//! `TurnPipeline` sends one captured unit to the backend (echo + transcribe, or
//! agent chat) and merges the answers; `TextToSpeech` is the manual text path.

mod pipeline;
mod speech;

pub use pipeline::{
    ConversationMode, PendingTurnFlag, PendingTurnGuard, TurnPipeline, TurnResult,
    NO_PROPER_RESPONSE, TROUBLE_RESPONDING,
};
pub use speech::{SpeechRequest, TextToSpeech, DEFAULT_VOICES};
