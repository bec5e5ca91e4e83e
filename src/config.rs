use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::CaptureConfig;
use crate::turn::ConversationMode;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub conversation: ConversationConfig,
    pub capture: CaptureSettings,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-agent".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub mode: ConversationMode,
    /// Restart capture automatically when a reply finishes playing
    pub hands_free: bool,
    pub default_voice: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            mode: ConversationMode::Conversation,
            hands_free: true,
            default_voice: "en-US-Natalie".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// WAV file replayed as microphone input
    pub input_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// Pace frames at real time instead of as fast as possible
    pub realtime: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            input_path: "recordings/input.wav".to_string(),
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            realtime: true,
        }
    }
}

impl CaptureSettings {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            target_sample_rate: self.sample_rate,
            target_channels: self.channels,
            buffer_duration_ms: self.buffer_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// e.g. ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]
    pub player_command: Vec<String>,
    /// e.g. ["espeak"]
    pub speech_command: Vec<String>,
}

impl Config {
    /// Load `<path>.toml` (optional) layered with `VOICE_AGENT__*` environment variables
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &str, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

/// Environment overrides; command lines are space separated,
/// e.g. `VOICE_AGENT__PLAYBACK__PLAYER_COMMAND="ffplay -nodisp -autoexit"`
fn environment() -> config::Environment {
    config::Environment::with_prefix("VOICE_AGENT")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("playback.player_command")
        .with_list_parse_key("playback.speech_command")
}
