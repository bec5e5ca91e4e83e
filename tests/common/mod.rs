// Scripted doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use voice_agent::{
    AgentError, AgentResult, AudioFrame, AudioPlayer, AudioRef, AudioUnit, Backend, BackendReply,
    CaptureConfig, CaptureController, CaptureDevice, ConversationLoop, ConversationMode,
    FallbackAnnouncer, LocalSpeech, SessionId, SpokenReply, SurfaceSnapshot, SynthesizedSpeech,
    TurnPipeline, UiSurface,
};

pub fn unscripted<T>() -> AgentResult<T> {
    Err(AgentError::BackendUnavailable("unscripted".to_string()))
}

pub fn spoken(audio: &str, transcription: Option<&str>) -> AgentResult<BackendReply<SpokenReply>> {
    Ok(BackendReply::Success(SpokenReply {
        audio: AudioRef::new(audio),
        transcription: transcription.map(str::to_string),
    }))
}

pub fn failure<T>(error: &str) -> AgentResult<BackendReply<T>> {
    Ok(BackendReply::Failure {
        error: error.to_string(),
        message: None,
        suggestions: Vec::new(),
    })
}

/// Backend answering every call with a canned reply
pub struct ScriptedBackend {
    pub voices: AgentResult<Vec<String>>,
    pub synth: AgentResult<BackendReply<SynthesizedSpeech>>,
    pub echo: AgentResult<BackendReply<SpokenReply>>,
    pub transcribe: AgentResult<BackendReply<String>>,
    pub chat: AgentResult<BackendReply<SpokenReply>>,
    pub echo_delay: Duration,
    pub transcribe_delay: Duration,
    /// When set, every audio call waits for a permit
    pub gate: Option<Arc<Semaphore>>,
    pub calls: Mutex<Vec<String>>,
    pub tokens: Mutex<Vec<String>>,
    pub sessions: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            voices: unscripted(),
            synth: unscripted(),
            echo: unscripted(),
            transcribe: unscripted(),
            chat: unscripted(),
            echo_delay: Duration::ZERO,
            transcribe_delay: Duration::ZERO,
            gate: None,
            calls: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }

    async fn audio_call(&self, op: &str, audio: &AudioUnit, delay: Duration) {
        self.record(op);
        self.tokens.lock().unwrap().push(audio.correlation_token(op));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn list_voices(&self) -> AgentResult<Vec<String>> {
        self.record("voices");
        self.voices.clone()
    }

    async fn synthesize(&self, _text: &str, _voice: &str) -> AgentResult<BackendReply<SynthesizedSpeech>> {
        self.record("synthesize");
        self.synth.clone()
    }

    async fn echo(&self, audio: &AudioUnit) -> AgentResult<BackendReply<SpokenReply>> {
        self.audio_call("echo", audio, self.echo_delay).await;
        self.echo.clone()
    }

    async fn transcribe(&self, audio: &AudioUnit) -> AgentResult<BackendReply<String>> {
        self.audio_call("transcribe", audio, self.transcribe_delay).await;
        self.transcribe.clone()
    }

    async fn agent_chat(
        &self,
        session: &SessionId,
        audio: &AudioUnit,
    ) -> AgentResult<BackendReply<SpokenReply>> {
        self.sessions.lock().unwrap().push(session.to_string());
        self.audio_call("chat", audio, Duration::ZERO).await;
        self.chat.clone()
    }
}

/// Observes a `ScriptedDevice` after it has been boxed into a controller
#[derive(Clone, Default)]
pub struct DeviceTracker {
    pub open: Arc<AtomicBool>,
    pub opens: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl DeviceTracker {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Microphone that yields a fixed set of frames and then stays live until released
pub struct ScriptedDevice {
    frames: Vec<AudioFrame>,
    fail_with: Option<AgentError>,
    tracker: DeviceTracker,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

impl ScriptedDevice {
    pub fn new(frames: Vec<AudioFrame>) -> (Self, DeviceTracker) {
        let tracker = DeviceTracker::default();
        let device = Self {
            frames,
            fail_with: None,
            tracker: tracker.clone(),
            tx: None,
        };
        (device, tracker)
    }

    pub fn failing(error: AgentError) -> (Self, DeviceTracker) {
        let (mut device, tracker) = Self::new(Vec::new());
        device.fail_with = Some(error);
        (device, tracker)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn open(&mut self, _config: &CaptureConfig) -> AgentResult<mpsc::Receiver<AudioFrame>> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        if self.is_open() {
            return Err(AgentError::AlreadyRecording);
        }

        let (tx, rx) = mpsc::channel(self.frames.len() + 1);
        for frame in &self.frames {
            tx.try_send(frame.clone()).unwrap();
        }
        self.tx = Some(tx);
        self.tracker.open.store(true, Ordering::SeqCst);
        self.tracker.opens.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn release(&mut self) -> AgentResult<()> {
        self.tx = None;
        self.tracker.open.store(false, Ordering::SeqCst);
        self.tracker.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.tracker.is_open()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 100ms of 16kHz mono audio
pub fn speech_frames(count: usize) -> Vec<AudioFrame> {
    (0..count)
        .map(|i| AudioFrame {
            samples: vec![(i as i16) * 100; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: i as u64 * 100,
        })
        .collect()
}

pub fn sample_unit() -> AudioUnit {
    AudioUnit::from_frames(&speech_frames(2), 16000, 1).unwrap()
}

#[derive(Default)]
pub struct RecordingPlayer {
    pub played: Mutex<Vec<String>>,
    pub fail: bool,
    pub gate: Option<Arc<Semaphore>>,
}

impl RecordingPlayer {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, audio: &AudioRef) -> AgentResult<()> {
        self.played.lock().unwrap().push(audio.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail {
            return Err(AgentError::Playback("autoplay blocked".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LocalSpeech for RecordingSpeech {
    async fn speak(&self, text: &str) -> AgentResult<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AgentError::Playback("no voices installed".to_string()));
        }
        Ok(())
    }
}

/// A fully wired conversation over scripted parts
pub struct Harness {
    pub conversation: Arc<ConversationLoop>,
    pub surface: SurfaceSnapshot,
    pub backend: Arc<ScriptedBackend>,
    pub device: DeviceTracker,
    pub player: Arc<RecordingPlayer>,
    pub speech: Arc<RecordingSpeech>,
    pub announcer: Arc<FallbackAnnouncer>,
    pub session: SessionId,
}

pub struct HarnessBuilder {
    pub backend: ScriptedBackend,
    pub mode: ConversationMode,
    pub hands_free: bool,
    pub player: RecordingPlayer,
    pub speech: RecordingSpeech,
    pub device_error: Option<AgentError>,
    pub with_player: bool,
}

impl HarnessBuilder {
    pub fn new(backend: ScriptedBackend) -> Self {
        Self {
            backend,
            mode: ConversationMode::Conversation,
            hands_free: true,
            player: RecordingPlayer::default(),
            speech: RecordingSpeech::default(),
            device_error: None,
            with_player: true,
        }
    }

    pub fn mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn hands_free(mut self, hands_free: bool) -> Self {
        self.hands_free = hands_free;
        self
    }

    pub fn player(mut self, player: RecordingPlayer) -> Self {
        self.player = player;
        self
    }

    pub fn speech(mut self, speech: RecordingSpeech) -> Self {
        self.speech = speech;
        self
    }

    pub fn without_player(mut self) -> Self {
        self.with_player = false;
        self
    }

    pub fn device_error(mut self, error: AgentError) -> Self {
        self.device_error = Some(error);
        self
    }

    pub fn build(self) -> Harness {
        let surface = SurfaceSnapshot::new();
        let player = Arc::new(self.player);
        let speech = Arc::new(self.speech);

        let mut ui: UiSurface = surface.surface();
        if self.with_player {
            ui.player = Some(player.clone() as Arc<dyn AudioPlayer>);
        }
        ui.speech = Some(speech.clone() as Arc<dyn LocalSpeech>);

        let (device, tracker) = match self.device_error {
            Some(err) => ScriptedDevice::failing(err),
            None => ScriptedDevice::new(speech_frames(3)),
        };

        let backend = Arc::new(self.backend);
        let session = SessionId::generate();
        let announcer = Arc::new(FallbackAnnouncer::new(&ui));
        let capture = CaptureController::new(Box::new(device), CaptureConfig::default(), ui.clone());
        let pipeline = TurnPipeline::new(
            backend.clone() as Arc<dyn Backend>,
            self.mode,
            session.clone(),
            ui.clone(),
            Arc::clone(&announcer),
        );
        let conversation = Arc::new(ConversationLoop::new(
            capture,
            pipeline,
            Arc::clone(&announcer),
            ui,
            self.hands_free,
        ));

        Harness {
            conversation,
            surface,
            backend,
            device: tracker,
            player,
            speech,
            announcer,
            session,
        }
    }
}
