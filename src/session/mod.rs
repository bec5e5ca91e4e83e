//! Session continuity
//!
//! This module provides:
//! - `SessionIdentity`, which recovers or creates the session id and keeps it in the page address
//! - `ConversationStats`, a snapshot of the turns taken in a session

mod identity;
mod stats;

pub use identity::{PageAddress, SessionId, SessionIdentity, UrlAddress, SESSION_PARAM};
pub use stats::ConversationStats;
