use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureConfig, CaptureDevice};
use super::unit::{normalize_frame, AudioUnit};
use crate::error::{AgentError, AgentResult};
use crate::ui::{StatusLevel, UiSurface};

/// Lifecycle of the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Idle,
    Requesting,
    Recording,
    Stopping,
    AwaitingResult,
}

/// Owns the capture device and turns a recording into one `AudioUnit`
pub struct CaptureController {
    device: Box<dyn CaptureDevice>,
    config: CaptureConfig,
    ui: UiSurface,
    state: Arc<watch::Sender<RecordingState>>,
    /// Task draining device frames into the turn buffer, with its stop signal
    collector: Option<(oneshot::Sender<()>, JoinHandle<AgentResult<Vec<AudioFrame>>>)>,
}

impl CaptureController {
    pub fn new(device: Box<dyn CaptureDevice>, config: CaptureConfig, ui: UiSurface) -> Self {
        let (state, _) = watch::channel(RecordingState::Idle);
        Self {
            device,
            config,
            ui,
            state: Arc::new(state),
            collector: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.state.subscribe()
    }

    /// Whether the underlying device is currently held
    pub fn device_open(&self) -> bool {
        self.device.is_open()
    }

    /// Request device access and begin buffering frames
    pub async fn start(&mut self) -> AgentResult<()> {
        if self.state() != RecordingState::Idle {
            warn!("Capture start rejected in state {:?}", self.state());
            return Err(AgentError::AlreadyRecording);
        }

        self.set_state(RecordingState::Requesting);
        self.ui
            .show_recording_status("Requesting microphone access...", StatusLevel::Info);

        let mut rx = match self.device.open(&self.config).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Error accessing {}: {}", self.device.name(), e);
                self.set_state(RecordingState::Idle);
                self.ui
                    .show_recording_status(&e.user_message(), StatusLevel::Error);
                return Err(e);
            }
        };

        let target_rate = self.config.target_sample_rate;
        let target_channels = self.config.target_channels;

        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut frames = Vec::new();
            loop {
                tokio::select! {
                    frame = rx.recv() => match frame {
                        Some(frame) => frames.push(normalize_frame(frame, target_rate, target_channels)?),
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        // Keep whatever the device flushed before release
                        while let Ok(frame) = rx.try_recv() {
                            frames.push(normalize_frame(frame, target_rate, target_channels)?);
                        }
                        break;
                    }
                }
            }
            Ok::<_, AgentError>(frames)
        });
        self.collector = Some((stop_tx, task));

        self.set_state(RecordingState::Recording);
        self.ui
            .show_recording_status("Recording... Speak now!", StatusLevel::Info);
        info!("Capture started on {}", self.device.name());

        Ok(())
    }

    /// Release the device and assemble the buffered frames
    ///
    /// Returns `Ok(None)` when no recording is active.
    pub async fn stop(&mut self) -> AgentResult<Option<AudioUnit>> {
        if self.state() != RecordingState::Recording {
            return Ok(None);
        }

        self.set_state(RecordingState::Stopping);
        self.ui
            .show_recording_status("Processing...", StatusLevel::Info);

        // Release first so the device is never left held, even if assembly fails
        if let Err(e) = self.device.release().await {
            error!("Failed to release {}: {}", self.device.name(), e);
        }

        let frames = match self.collector.take() {
            Some((stop_tx, task)) => {
                let _ = stop_tx.send(());
                match task.await {
                    Ok(Ok(frames)) => frames,
                    Ok(Err(e)) => {
                        error!("Captured audio could not be normalized: {}", e);
                        self.set_state(RecordingState::Idle);
                        self.ui
                            .show_recording_status(&e.user_message(), StatusLevel::Error);
                        return Err(e);
                    }
                    Err(e) => {
                        error!("Capture collector panicked: {}", e);
                        self.set_state(RecordingState::Idle);
                        return Err(AgentError::Unknown(format!(
                            "Capture collector failed: {}",
                            e
                        )));
                    }
                }
            }
            None => Vec::new(),
        };

        let unit = AudioUnit::from_frames(
            &frames,
            self.config.target_sample_rate,
            self.config.target_channels,
        );
        self.set_state(RecordingState::Idle);

        let unit = unit?;
        info!(
            "Capture stopped: {} frames, {}ms, unit {}",
            frames.len(),
            unit.duration_ms(),
            unit.id()
        );

        Ok(Some(unit))
    }

    /// Mark the captured unit as handed to the pipeline
    ///
    /// The controller stays in `AwaitingResult` until the returned latch is
    /// dropped. `None` unless the controller is idle.
    pub fn await_result(&self) -> Option<ResultLatch> {
        let mut latched = false;
        self.state.send_if_modified(|state| {
            if *state == RecordingState::Idle {
                *state = RecordingState::AwaitingResult;
                latched = true;
            }
            latched
        });

        latched.then(|| ResultLatch {
            state: Arc::clone(&self.state),
        })
    }

    fn set_state(&self, next: RecordingState) {
        self.state.send_replace(next);
    }
}

/// Holds the controller in `AwaitingResult`; dropping it returns to `Idle`
#[derive(Debug)]
pub struct ResultLatch {
    state: Arc<watch::Sender<RecordingState>>,
}

impl Drop for ResultLatch {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state == RecordingState::AwaitingResult {
                *state = RecordingState::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some((_, task)) = self.collector.take() {
            warn!("Capture controller dropped while recording");
            task.abort();
        }
    }
}
