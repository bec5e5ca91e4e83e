use chrono::{DateTime, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

use super::backend::AudioFrame;
use crate::error::{AgentError, AgentResult};

pub const WAV_CONTENT_TYPE: &str = "audio/wav";
pub const WAV_FILE_NAME: &str = "recording.wav";

/// One captured utterance, ready to be dispatched to the backend
///
/// Immutable once built; clones share the same payload.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    id: Uuid,
    data: Arc<[u8]>,
    content_type: &'static str,
    created_at: DateTime<Utc>,
    duration_ms: u64,
}

impl AudioUnit {
    /// Encode captured frames into a single in-memory WAV payload
    ///
    /// Every frame must already be in the declared format; the header is
    /// never allowed to disagree with the samples.
    pub fn from_frames(frames: &[AudioFrame], sample_rate: u32, channels: u16) -> AgentResult<Self> {
        if let Some(frame) = frames
            .iter()
            .find(|f| f.sample_rate != sample_rate || f.channels != channels)
        {
            return Err(AgentError::Unknown(format!(
                "Frame at {}ms is {}Hz/{}ch, expected {}Hz/{}ch",
                frame.timestamp_ms, frame.sample_rate, frame.channels, sample_rate, channels
            )));
        }

        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut sample_count: u64 = 0;
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for frame in frames {
                for &sample in &frame.samples {
                    writer.write_sample(sample)?;
                }
                sample_count += frame.samples.len() as u64;
            }
            writer.finalize()?;
        }

        let per_second = sample_rate as u64 * channels.max(1) as u64;
        let duration_ms = if per_second == 0 {
            0
        } else {
            sample_count * 1000 / per_second
        };

        Ok(Self::from_bytes(cursor.into_inner(), duration_ms))
    }

    /// Wrap an already-encoded WAV payload
    pub fn from_bytes(data: Vec<u8>, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: data.into(),
            content_type: WAV_CONTENT_TYPE,
            created_at: Utc::now(),
            duration_ms,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn file_name(&self) -> &'static str {
        WAV_FILE_NAME
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Token sent with every backend call made for this unit
    pub fn correlation_token(&self, operation: &str) -> String {
        format!("turn-{}-{}", self.id.simple(), operation)
    }
}

/// Normalize a frame to the target format before buffering
///
/// Channels are mixed first, then the rate is converted: decimation when the
/// source rate is an integer multiple of the target, linear interpolation
/// otherwise. Channel layouts that cannot be mapped are rejected.
pub fn normalize_frame(
    frame: AudioFrame,
    target_sample_rate: u32,
    target_channels: u16,
) -> AgentResult<AudioFrame> {
    if frame.sample_rate == 0 || frame.channels == 0 || target_sample_rate == 0 || target_channels == 0 {
        return Err(AgentError::Unknown(format!(
            "Invalid audio format {}Hz/{}ch -> {}Hz/{}ch",
            frame.sample_rate, frame.channels, target_sample_rate, target_channels
        )));
    }

    let mixed = convert_channels(frame, target_channels)?;

    Ok(if mixed.sample_rate == target_sample_rate {
        mixed
    } else if mixed.sample_rate % target_sample_rate == 0 {
        decimate(mixed, target_sample_rate)
    } else {
        resample_linear(mixed, target_sample_rate)
    })
}

fn convert_channels(frame: AudioFrame, target: u16) -> AgentResult<AudioFrame> {
    if frame.channels == target {
        return Ok(frame);
    }

    let source = frame.channels as usize;
    let samples: Vec<i16> = if target == 1 {
        // Saturating sum of every channel
        frame
            .samples
            .chunks_exact(source)
            .map(|group| {
                let sum: i32 = group.iter().map(|&s| s as i32).sum();
                sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
            })
            .collect()
    } else if source == 1 {
        frame
            .samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(target as usize))
            .collect()
    } else {
        return Err(AgentError::Unknown(format!(
            "Cannot map {}-channel audio to {} channels",
            frame.channels, target
        )));
    };

    Ok(AudioFrame {
        samples,
        sample_rate: frame.sample_rate,
        channels: target,
        timestamp_ms: frame.timestamp_ms,
    })
}

/// Keep every n-th whole frame; `target_rate` must divide the source rate
fn decimate(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    let ratio = (frame.sample_rate / target_rate) as usize;
    let channels = frame.channels as usize;

    let samples = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Linear interpolation between neighbouring frames, per channel
fn resample_linear(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    let channels = frame.channels as usize;
    let source_frames = frame.samples.len() / channels;
    let out_frames =
        (source_frames as u64 * target_rate as u64 / frame.sample_rate as u64) as usize;
    let step = frame.sample_rate as f64 / target_rate as f64;

    let mut samples = Vec::with_capacity(out_frames * channels);
    if source_frames > 0 {
        for i in 0..out_frames {
            let position = i as f64 * step;
            let index = (position as usize).min(source_frames - 1);
            let next = (index + 1).min(source_frames - 1);
            let fraction = position - index as f64;

            for c in 0..channels {
                let a = frame.samples[index * channels + c] as f64;
                let b = frame.samples[next * channels + c] as f64;
                samples.push((a + (b - a) * fraction).round() as i16);
            }
        }
    }

    AudioFrame {
        samples,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn decimates_48k_to_16k() {
        let out = normalize_frame(frame((0..12).collect(), 48000, 1), 16000, 1).unwrap();
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples, vec![0, 3, 6, 9]);
    }

    #[test]
    fn stereo_sum_saturates() {
        let out = normalize_frame(frame(vec![30000, 30000, -5, 5], 16000, 2), 16000, 1).unwrap();
        assert_eq!(out.channels, 1);
        assert_eq!(out.samples, vec![i16::MAX, 0]);
    }

    #[test]
    fn non_integer_ratio_is_resampled_not_relabelled() {
        // One second at 44.1kHz
        let out = normalize_frame(frame(vec![100; 44100], 44100, 1), 16000, 1).unwrap();
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 16000);
        assert!(out.samples.iter().all(|&s| s == 100));

        let unit = AudioUnit::from_frames(&[out], 16000, 1).unwrap();
        assert_eq!(unit.duration_ms(), 1000);
    }

    #[test]
    fn lower_rate_is_upsampled() {
        let out = normalize_frame(frame((0..8000).map(|i| (i % 100) as i16).collect(), 8000, 1), 16000, 1)
            .unwrap();
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 16000);
        // Midpoints are interpolated
        assert_eq!(&out.samples[0..4], &[0, 1, 1, 2]);

        let unit = AudioUnit::from_frames(&[out], 16000, 1).unwrap();
        assert_eq!(unit.duration_ms(), 1000);
    }

    #[test]
    fn multichannel_is_mixed_down() {
        let out = normalize_frame(frame(vec![1, 2, 3, 10, 20, 30], 16000, 3), 16000, 1).unwrap();
        assert_eq!(out.channels, 1);
        assert_eq!(out.samples, vec![6, 60]);
    }

    #[test]
    fn mono_is_duplicated_for_stereo_target() {
        let out = normalize_frame(frame(vec![7, -7], 16000, 1), 16000, 2).unwrap();
        assert_eq!(out.channels, 2);
        assert_eq!(out.samples, vec![7, 7, -7, -7]);
    }

    #[test]
    fn unmappable_layout_is_rejected() {
        let result = normalize_frame(frame(vec![0; 6], 16000, 3), 16000, 2);
        assert!(matches!(result, Err(AgentError::Unknown(_))));
    }

    #[test]
    fn mislabelled_frames_are_not_encoded() {
        let frames = vec![frame(vec![0; 1600], 16000, 1), frame(vec![0; 800], 8000, 1)];
        let result = AudioUnit::from_frames(&frames, 16000, 1);
        assert!(matches!(result, Err(AgentError::Unknown(_))));
    }

    #[test]
    fn unit_reports_duration_and_wav_header() {
        let frames = vec![frame(vec![0; 1600], 16000, 1), frame(vec![0; 1600], 16000, 1)];
        let unit = AudioUnit::from_frames(&frames, 16000, 1).unwrap();

        assert_eq!(unit.duration_ms(), 200);
        assert_eq!(&unit.data()[0..4], b"RIFF");
        assert_eq!(unit.content_type(), "audio/wav");
        // 44 byte header + 3200 samples * 2 bytes
        assert_eq!(unit.data().len(), 44 + 3200 * 2);
    }

    #[test]
    fn correlation_token_is_derived_from_unit_id() {
        let unit = AudioUnit::from_bytes(vec![1, 2, 3], 0);
        let echo = unit.correlation_token("echo");
        let transcribe = unit.correlation_token("transcribe");

        assert!(echo.starts_with(&format!("turn-{}", unit.id().simple())));
        assert!(echo.ends_with("-echo"));
        assert_ne!(echo, transcribe);
    }
}
