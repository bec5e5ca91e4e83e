//! Hands-free conversation loop
//!
//! `ConversationLoop` sequences capture, turn dispatch and playback, restarting
//! capture after each reply until the user stops the conversation.

mod controller;

pub use controller::{ConversationLoop, LoopState, TurnOutcome, TROUBLE_PLAYING};
