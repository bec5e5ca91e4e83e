use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audio::AudioUnit;
use crate::backend::{Backend, BackendReply, SpokenReply};
use crate::error::{AgentError, AgentResult};
use crate::fallback::FallbackAnnouncer;
use crate::session::SessionId;
use crate::ui::{AudioRef, StatusLevel, UiSurface};

pub const TROUBLE_RESPONDING: &str = "I'm having trouble responding right now.";
pub const NO_PROPER_RESPONSE: &str = "I didn't get a proper response.";
const TRANSCRIPTION_FAILED: &str = "Transcription failed";

/// Which backend operations a turn is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Echo plus a parallel transcription
    Echo,
    /// One agent chat call scoped to the session
    #[default]
    Conversation,
}

impl ConversationMode {
    fn label(self) -> &'static str {
        match self {
            ConversationMode::Echo => "Echo Bot",
            ConversationMode::Conversation => "Agent",
        }
    }

    fn working_message(self) -> &'static str {
        match self {
            ConversationMode::Echo => "Processing with Echo Bot...",
            ConversationMode::Conversation => "Thinking...",
        }
    }

    fn done_message(self) -> &'static str {
        match self {
            ConversationMode::Echo => "Echo Bot complete!",
            ConversationMode::Conversation => "Response ready",
        }
    }
}

/// Merged outcome of every backend call made for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResult {
    pub unit_id: Uuid,
    pub transcription_text: Option<String>,
    pub playable_audio_ref: Option<AudioRef>,
    pub degraded: bool,
    pub message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Latch allowing at most one turn in flight per session
#[derive(Debug, Clone, Default)]
pub struct PendingTurnFlag(Arc<AtomicBool>);

impl PendingTurnFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag, or `None` if it is already set
    pub fn try_acquire(&self) -> Option<PendingTurnGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| PendingTurnGuard(Arc::clone(&self.0)))
    }
}

/// Releases the pending flag on every exit path, including cancellation
#[derive(Debug)]
pub struct PendingTurnGuard(Arc<AtomicBool>);

impl Drop for PendingTurnGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Nothing,
    Placeholder,
    Secondary,
    Primary,
}

/// Transcript display rules for one echo turn: the echo result always wins,
/// the transcription call only fills an empty box.
struct TranscriptDisplay<'a> {
    ui: &'a UiSurface,
    shown: Mutex<Shown>,
}

impl<'a> TranscriptDisplay<'a> {
    fn new(ui: &'a UiSurface) -> Self {
        Self {
            ui,
            shown: Mutex::new(Shown::Nothing),
        }
    }

    fn primary(&self, text: &str) {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner) = Shown::Primary;
        self.ui.set_transcript(text);
    }

    fn secondary(&self, text: &str) {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*shown, Shown::Nothing | Shown::Placeholder) {
            *shown = Shown::Secondary;
            self.ui.set_transcript(text);
        }
    }

    fn secondary_failed(&self) {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        if *shown == Shown::Nothing {
            *shown = Shown::Placeholder;
            self.ui.set_transcript(TRANSCRIPTION_FAILED);
        }
    }
}

struct Dispatched {
    reply: AgentResult<BackendReply<SpokenReply>>,
    secondary_transcription: Option<String>,
}

/// Drives one captured unit through the backend and merges the results
pub struct TurnPipeline {
    backend: Arc<dyn Backend>,
    mode: ConversationMode,
    session: SessionId,
    ui: UiSurface,
    announcer: Arc<FallbackAnnouncer>,
    pending: PendingTurnFlag,
}

impl TurnPipeline {
    pub fn new(
        backend: Arc<dyn Backend>,
        mode: ConversationMode,
        session: SessionId,
        ui: UiSurface,
        announcer: Arc<FallbackAnnouncer>,
    ) -> Self {
        Self {
            backend,
            mode,
            session,
            ui,
            announcer,
            pending: PendingTurnFlag::default(),
        }
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_set()
    }

    /// Run one turn
    ///
    /// The only error is `TurnInProgress`; backend trouble is reported as a
    /// degraded `TurnResult` after the fallback announcer has run.
    pub async fn run_turn(&self, unit: AudioUnit) -> AgentResult<TurnResult> {
        let _pending = self.pending.try_acquire().ok_or_else(|| {
            warn!("Turn for unit {} rejected: another turn is in flight", unit.id());
            AgentError::TurnInProgress
        })?;

        info!(
            "Running {:?} turn for session {} (unit {})",
            self.mode,
            self.session,
            unit.id()
        );
        self.ui
            .show_recording_status(self.mode.working_message(), StatusLevel::Info);

        let dispatched = match self.mode {
            ConversationMode::Echo => self.dispatch_echo(&unit).await,
            ConversationMode::Conversation => self.dispatch_chat(&unit).await,
        };

        Ok(self.settle(&unit, dispatched).await)
    }

    async fn dispatch_echo(&self, unit: &AudioUnit) -> Dispatched {
        self.ui.clear_transcript();
        let display = TranscriptDisplay::new(&self.ui);

        let echo = async {
            let reply = self.backend.echo(unit).await;
            if let Ok(BackendReply::Success(SpokenReply {
                transcription: Some(text),
                ..
            })) = &reply
            {
                display.primary(text);
            }
            reply
        };

        // Optional leg: failures only cost the transcription
        let transcribe = async {
            match self.backend.transcribe(unit).await {
                Ok(BackendReply::Success(text)) if !text.is_empty() => {
                    display.secondary(&text);
                    Some(text)
                }
                Ok(BackendReply::Success(_)) => None,
                Ok(other) => {
                    warn!("Transcription failed for unit {}: {:?}", unit.id(), other);
                    display.secondary_failed();
                    None
                }
                Err(e) => {
                    warn!("Transcription error for unit {}: {}", unit.id(), e);
                    display.secondary_failed();
                    None
                }
            }
        };

        let (reply, secondary_transcription) = futures::future::join(echo, transcribe).await;

        Dispatched {
            reply,
            secondary_transcription,
        }
    }

    async fn dispatch_chat(&self, unit: &AudioUnit) -> Dispatched {
        let reply = self.backend.agent_chat(&self.session, unit).await;

        if let Ok(BackendReply::Success(spoken)) = &reply {
            self.ui
                .set_transcript(spoken.transcription.as_deref().unwrap_or("No transcription"));
        }

        Dispatched {
            reply,
            secondary_transcription: None,
        }
    }

    async fn settle(&self, unit: &AudioUnit, dispatched: Dispatched) -> TurnResult {
        let label = self.mode.label();
        let secondary = dispatched.secondary_transcription;

        let (transcription, audio, degraded, message) = match dispatched.reply {
            Ok(BackendReply::Success(spoken)) => {
                self.ui
                    .show_recording_status(self.mode.done_message(), StatusLevel::Success);
                (spoken.transcription.or(secondary), Some(spoken.audio), false, None)
            }
            Ok(BackendReply::Degraded {
                audio_url: Some(audio),
                message,
            }) => {
                // Server-supplied fallback audio takes priority over our own announcement
                self.ui.show_recording_status(
                    &format!("Service degraded: {}", message),
                    StatusLevel::Warning,
                );
                self.announcer.remember_fallback(audio.clone());
                (secondary, Some(audio), true, Some(message))
            }
            Ok(BackendReply::Degraded {
                audio_url: None,
                message,
            }) => {
                self.ui.show_recording_status(
                    &format!("Service degraded: {}", message),
                    StatusLevel::Warning,
                );
                self.announcer.announce(TROUBLE_RESPONDING).await;
                (secondary, None, true, Some(message))
            }
            Ok(BackendReply::Failure { error, message, .. }) => {
                let detail = message.unwrap_or(error);
                error!("{} failed for unit {}: {}", label, unit.id(), detail);
                self.ui.show_recording_status(
                    &format!("{} error: {}", label, detail),
                    StatusLevel::Error,
                );
                let notice = match self.mode {
                    ConversationMode::Echo => TROUBLE_RESPONDING,
                    ConversationMode::Conversation => NO_PROPER_RESPONSE,
                };
                self.announcer.announce(notice).await;
                (secondary, None, true, Some(detail))
            }
            Err(e) => {
                error!("{} call failed for unit {}: {}", label, unit.id(), e);
                self.ui
                    .show_recording_status(&format!("{} error: {}", label, e), StatusLevel::Error);
                self.announcer.announce(TROUBLE_RESPONDING).await;
                (secondary, None, true, Some(e.to_string()))
            }
        };

        TurnResult {
            unit_id: unit.id(),
            transcription_text: transcription,
            playable_audio_ref: audio,
            degraded,
            message,
            completed_at: Utc::now(),
        }
    }
}
