use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use voice_agent::ui::{CommandPlayer, CommandSpeech};
use voice_agent::{
    create_router, AppState, AudioPlayer, Backend, CaptureController, Config, ConversationLoop,
    FallbackAnnouncer, HttpBackend, LocalSpeech, PageAddress, SessionIdentity, SpeechRequest,
    SurfaceSnapshot, TextToSpeech, TurnOutcome, TurnPipeline, UrlAddress, WavFileDevice,
};

#[derive(Parser)]
#[command(name = "voice-agent", version, about = "Hands-free client for a voice conversation backend")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/voice-agent")]
    config: String,

    /// Page address; its `session` parameter resumes an earlier conversation
    #[arg(long, default_value = "http://localhost:8090/")]
    page_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the control API
    Serve,
    /// List available voices
    Voices,
    /// Synthesize text
    Speak {
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        voice: String,
    },
    /// Record for a few seconds and run a single turn
    Turn {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

fn assemble(cfg: &Config, page_url: &str) -> Result<AppState> {
    let address = UrlAddress::parse(page_url)
        .with_context(|| format!("Invalid page address {}", page_url))?;
    let mut identity = SessionIdentity::new(address);
    let session_id = identity.ensure_session();
    let address = identity.address().href();

    let surface = SurfaceSnapshot::new();
    let mut ui = surface.surface();
    ui.player = CommandPlayer::from_command_line(&cfg.playback.player_command)
        .map(|p| Arc::new(p) as Arc<dyn AudioPlayer>);
    ui.speech = CommandSpeech::from_command_line(&cfg.playback.speech_command)
        .map(|s| Arc::new(s) as Arc<dyn LocalSpeech>);

    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(&cfg.backend.base_url, cfg.backend.timeout())
            .context("Failed to create backend client")?,
    );

    let announcer = Arc::new(FallbackAnnouncer::new(&ui));
    let device = WavFileDevice::new(&cfg.capture.input_path, cfg.capture.realtime);
    let capture = CaptureController::new(
        Box::new(device),
        cfg.capture.capture_config(),
        ui.clone(),
    );
    let pipeline = TurnPipeline::new(
        Arc::clone(&backend),
        cfg.conversation.mode,
        session_id.clone(),
        ui.clone(),
        Arc::clone(&announcer),
    );
    let conversation = Arc::new(ConversationLoop::new(
        capture,
        pipeline,
        announcer,
        ui.clone(),
        cfg.conversation.hands_free,
    ));
    let speech = Arc::new(TextToSpeech::new(
        backend,
        ui,
        cfg.conversation.default_voice.clone(),
    ));

    Ok(AppState {
        conversation,
        speech,
        surface,
        session_id,
        address,
    })
}

async fn serve(cfg: &Config, state: AppState) -> Result<()> {
    let bind = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("Control API listening on http://{}", bind);
    info!("Resume this conversation at {}", state.address);

    let conversation = Arc::clone(&state.conversation);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Control API failed")?;

    // Never leave the device held on the way out
    conversation.cancel().await;
    Ok(())
}

async fn single_turn(state: AppState, seconds: u64) -> Result<()> {
    let conversation = state.conversation;

    conversation.start().await.context("Failed to start capture")?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    match conversation.finish_turn().await? {
        TurnOutcome::Completed { result, .. } | TurnOutcome::Interrupted { result } => {
            info!(
                "Transcription: {}",
                result.transcription_text.as_deref().unwrap_or("(none)")
            );
            match &result.playable_audio_ref {
                Some(audio) => info!("Reply audio: {}", audio),
                None => warn!("No reply audio (degraded={})", result.degraded),
            }
        }
        TurnOutcome::NothingCaptured => warn!("Nothing was captured"),
    }

    conversation.cancel().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Backend: {} ({:?} mode)", cfg.backend.base_url, cfg.conversation.mode);

    let state = assemble(&cfg, &cli.page_url)?;
    info!("Session: {}", state.session_id);

    match cli.command {
        Command::Serve => serve(&cfg, state).await,
        Command::Voices => {
            for voice in state.speech.load_voices().await {
                println!("{}", voice);
            }
            Ok(())
        }
        Command::Speak { text, voice } => {
            let request = SpeechRequest::new(&text, &voice)?;
            let speech = state.speech.speak_and_wait(request).await?;
            println!("{} ({})", speech.audio, speech.voice_used);
            Ok(())
        }
        Command::Turn { seconds } => single_turn(state, seconds).await,
    }
}
