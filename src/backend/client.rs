use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::messages::{BackendReply, RawReply, SpokenReply, SynthesizeRequest, SynthesizedSpeech};
use crate::audio::AudioUnit;
use crate::error::{AgentError, AgentResult};
use crate::session::SessionId;

/// Header carrying the per-call correlation token
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Speech backend operations
///
/// `Err` means the server could not be reached or answered with something
/// undecodable. Anything the server did say is a `BackendReply`.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn list_voices(&self) -> AgentResult<Vec<String>>;

    async fn synthesize(&self, text: &str, voice: &str) -> AgentResult<BackendReply<SynthesizedSpeech>>;

    async fn echo(&self, audio: &AudioUnit) -> AgentResult<BackendReply<SpokenReply>>;

    async fn transcribe(&self, audio: &AudioUnit) -> AgentResult<BackendReply<String>>;

    async fn agent_chat(
        &self,
        session: &SessionId,
        audio: &AudioUnit,
    ) -> AgentResult<BackendReply<SpokenReply>>;
}

/// HTTP client for the speech backend
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> AgentResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AgentError::Unknown(format!("Invalid backend URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AgentError::Unknown(format!("Invalid backend URL {}", base_url)));
        }

        let client = Client::builder().timeout(timeout).build()?;

        info!("Speech backend at {}", base_url);

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn audio_form(field: &'static str, audio: &AudioUnit, correlation: &str) -> AgentResult<Form> {
        let part = Part::bytes(audio.data().to_vec())
            .file_name(audio.file_name())
            .mime_str(audio.content_type())?;

        Ok(Form::new()
            .part(field, part)
            .text("correlation_id", correlation.to_string()))
    }

    /// Send a request and decode whatever JSON comes back
    async fn send(&self, request: RequestBuilder, correlation: &str) -> AgentResult<(bool, RawReply)> {
        let response = request.header(CORRELATION_HEADER, correlation).send().await?;

        let status = response.status();
        let body = response.bytes().await?;

        let raw = serde_json::from_slice::<RawReply>(&body).map_err(|e| {
            AgentError::BackendUnavailable(format!("Invalid response ({}): {}", status, e))
        })?;

        if !status.is_success() {
            warn!(
                "Backend answered {} for {} (error={:?})",
                status, correlation, raw.error
            );
        }

        Ok((status.is_success(), raw))
    }

    async fn send_audio(
        &self,
        url: Url,
        field: &'static str,
        audio: &AudioUnit,
        operation: &str,
    ) -> AgentResult<(bool, RawReply)> {
        let correlation = audio.correlation_token(operation);
        let form = Self::audio_form(field, audio, &correlation)?;

        info!(
            "Dispatching {} ({} bytes) as {}",
            operation,
            audio.data().len(),
            correlation
        );

        self.send(self.client.post(url).multipart(form), &correlation)
            .await
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn list_voices(&self) -> AgentResult<Vec<String>> {
        let correlation = format!("text-{}", uuid::Uuid::new_v4().simple());
        let (ok, raw) = self
            .send(self.client.get(self.endpoint(&["get_voices"])), &correlation)
            .await?;

        match raw.voices {
            Some(voices) if ok && !voices.is_empty() => Ok(voices),
            _ => Err(AgentError::BackendUnavailable(
                raw.error.unwrap_or_else(|| "No voices returned".to_string()),
            )),
        }
    }

    async fn synthesize(&self, text: &str, voice: &str) -> AgentResult<BackendReply<SynthesizedSpeech>> {
        let correlation = format!("text-{}", uuid::Uuid::new_v4().simple());
        let body = SynthesizeRequest {
            text: text.to_string(),
            voice: voice.to_string(),
        };

        let (ok, raw) = self
            .send(
                self.client.post(self.endpoint(&["generate_audio"])).json(&body),
                &correlation,
            )
            .await?;

        Ok(raw.into_synthesized(ok, voice))
    }

    async fn echo(&self, audio: &AudioUnit) -> AgentResult<BackendReply<SpokenReply>> {
        let (ok, raw) = self
            .send_audio(self.endpoint(&["tts", "echo"]), "audio", audio, "echo")
            .await?;
        Ok(raw.into_spoken(ok))
    }

    async fn transcribe(&self, audio: &AudioUnit) -> AgentResult<BackendReply<String>> {
        let (ok, raw) = self
            .send_audio(self.endpoint(&["transcribe", "file"]), "file", audio, "transcribe")
            .await?;
        Ok(raw.into_transcription(ok))
    }

    async fn agent_chat(
        &self,
        session: &SessionId,
        audio: &AudioUnit,
    ) -> AgentResult<BackendReply<SpokenReply>> {
        let url = self.endpoint(&["agent", "chat", session.as_str()]);
        let (ok, raw) = self.send_audio(url, "audio", audio, "chat").await?;
        Ok(raw.into_spoken(ok))
    }
}
