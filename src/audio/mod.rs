pub mod backend;
pub mod capture;
pub mod file;
pub mod unit;

pub use backend::{AudioFrame, CaptureConfig, CaptureDevice};
pub use capture::{CaptureController, RecordingState, ResultLatch};
pub use file::{AudioFile, WavFileDevice};
pub use unit::AudioUnit;
