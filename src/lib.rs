pub mod audio;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fallback;
pub mod http;
pub mod session;
pub mod turn;
pub mod ui;

pub use audio::{
    AudioFile, AudioFrame, AudioUnit, CaptureConfig, CaptureController, CaptureDevice,
    RecordingState, WavFileDevice,
};
pub use backend::{Backend, BackendReply, HttpBackend, SpokenReply, SynthesizedSpeech};
pub use config::Config;
pub use conversation::{ConversationLoop, LoopState, TurnOutcome};
pub use error::{AgentError, AgentResult};
pub use fallback::{Announcement, FallbackAnnouncer};
pub use http::{create_router, AppState};
pub use session::{ConversationStats, PageAddress, SessionId, SessionIdentity, UrlAddress};
pub use turn::{ConversationMode, SpeechRequest, TextToSpeech, TurnPipeline, TurnResult};
pub use ui::{AudioPlayer, AudioRef, LocalSpeech, StatusLevel, SurfaceSnapshot, UiSurface};
