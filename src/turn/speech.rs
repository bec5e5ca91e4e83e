use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::{Backend, SynthesizedSpeech};
use crate::error::{AgentError, AgentResult};
use crate::ui::{AudioRef, StatusLevel, UiSurface};

/// Built-in voices used when the backend cannot list its own
pub const DEFAULT_VOICES: [&str; 4] = ["en-US-Natalie", "en-US-Mike", "en-GB-Lucy", "hi-IN-Priya"];

/// Validated text-to-speech request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    text: String,
    voice: String,
}

impl SpeechRequest {
    /// Blank text is rejected here, before anything is dispatched
    pub fn new(text: &str, voice: &str) -> AgentResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyInput);
        }

        Ok(Self {
            text: text.to_string(),
            voice: voice.trim().to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

/// Manual text-to-speech path and voice listing
pub struct TextToSpeech {
    backend: Arc<dyn Backend>,
    ui: UiSurface,
    default_voice: String,
}

impl TextToSpeech {
    pub fn new(backend: Arc<dyn Backend>, ui: UiSurface, default_voice: impl Into<String>) -> Self {
        Self {
            backend,
            ui,
            default_voice: default_voice.into(),
        }
    }

    /// Fetch voices from the backend, falling back to the built-in list
    pub async fn load_voices(&self) -> Vec<String> {
        self.ui
            .show_status("Loading available voices...", StatusLevel::Info);

        let voices = match self.backend.list_voices().await {
            Ok(voices) => {
                self.ui.clear_status();
                voices
            }
            Err(e) => {
                error!("Error fetching voices: {}", e);
                self.ui.show_status(
                    "Error loading voices. Using default options.",
                    StatusLevel::Error,
                );
                DEFAULT_VOICES.iter().map(|v| v.to_string()).collect()
            }
        };

        self.ui.populate_voices(&voices);
        voices
    }

    /// Synthesize the request and start playing it
    ///
    /// Playback runs in the background; failing to play is not an error.
    pub async fn speak(&self, request: SpeechRequest) -> AgentResult<SynthesizedSpeech> {
        let speech = self.synthesize(request).await?;

        let ui = self.ui.clone();
        let audio = speech.audio.clone();
        tokio::spawn(async move { play_or_hint(&ui, &audio).await });

        Ok(speech)
    }

    /// Synthesize the request and return once playback has finished
    ///
    /// For callers that exit right after speaking, where a background
    /// playback would be cut short.
    pub async fn speak_and_wait(&self, request: SpeechRequest) -> AgentResult<SynthesizedSpeech> {
        let speech = self.synthesize(request).await?;
        play_or_hint(&self.ui, &speech.audio).await;
        Ok(speech)
    }

    async fn synthesize(&self, request: SpeechRequest) -> AgentResult<SynthesizedSpeech> {
        let voice = if request.voice().is_empty() {
            self.default_voice.as_str()
        } else {
            request.voice()
        };

        self.ui.show_status("Generating audio...", StatusLevel::Info);

        let reply = self.backend.synthesize(request.text(), voice).await;
        let speech = match reply.and_then(|r| r.into_result()) {
            Ok(speech) => speech,
            Err(e) => {
                error!("Generation error: {}", e);
                self.ui.show_status(&e.user_message(), StatusLevel::Error);
                return Err(e);
            }
        };

        self.ui.show_status(
            &format!("Audio generated with voice: {}", speech.voice_used),
            StatusLevel::Success,
        );
        info!("Synthesized {} with {}", speech.audio, speech.voice_used);

        Ok(speech)
    }
}

async fn play_or_hint(ui: &UiSurface, audio: &AudioRef) {
    let Some(player) = &ui.player else {
        return;
    };

    if let Err(e) = player.play(audio).await {
        warn!("Auto-play prevented: {}", e);
        ui.show_status("Click the play button to listen", StatusLevel::Info);
    }
}
