//! Speech backend client
//!
//! Operations consumed from the backend service:
//! - GET /get_voices - Available synthesis voices
//! - POST /generate_audio - Text to speech
//! - POST /tts/echo - Speak the captured audio back
//! - POST /transcribe/file - Transcription only
//! - POST /agent/chat/:session_id - Conversational reply scoped to a session

mod client;
mod messages;

pub use client::{Backend, HttpBackend, CORRELATION_HEADER};
pub use messages::{BackendReply, RawReply, SpokenReply, SynthesizeRequest, SynthesizedSpeech};
