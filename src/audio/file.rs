use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureConfig, CaptureDevice};
use crate::error::{AgentError, AgentResult};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels.max(1) as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into frames of `frame_ms` milliseconds each
    pub fn frames(&self, frame_ms: u64) -> Vec<AudioFrame> {
        let per_frame = (self.sample_rate as u64 * frame_ms / 1000).max(1) as usize
            * self.channels.max(1) as usize;

        self.samples
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * frame_ms,
            })
            .collect()
    }
}

/// Capture device that replays a WAV file as if it were a microphone
///
/// Useful on hosts without a capture backend and for scripted runs. The file is
/// re-read on every `open`, so each turn hears the current file contents.
pub struct WavFileDevice {
    path: PathBuf,
    realtime: bool,
    running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl WavFileDevice {
    pub fn new(path: impl Into<PathBuf>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            realtime,
            running: Arc::new(AtomicBool::new(false)),
            feeder: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavFileDevice {
    async fn open(&mut self, config: &CaptureConfig) -> AgentResult<mpsc::Receiver<AudioFrame>> {
        if self.is_open() {
            return Err(AgentError::AlreadyRecording);
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| AgentError::Unknown(format!("File reader panicked: {}", e)))??;

        let frame_ms = config.buffer_duration_ms.max(1);
        let frames = audio.frames(frame_ms);
        let (tx, rx) = mpsc::channel(64);

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let realtime = self.realtime;

        let feeder = tokio::spawn(async move {
            for frame in frames {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
                if realtime {
                    tokio::time::sleep(Duration::from_millis(frame_ms)).await;
                }
            }
            // Dropping tx ends the stream
        });

        self.feeder = Some(feeder);
        info!("File capture started from {}", self.path.display());

        Ok(rx)
    }

    async fn release(&mut self) -> AgentResult<()> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
            if let Err(e) = feeder.await {
                if !e.is_cancelled() {
                    warn!("File feeder task failed: {}", e);
                }
            }
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.feeder.is_some()
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
