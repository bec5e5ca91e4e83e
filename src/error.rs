//! Error types for the voice agent core

use thiserror::Error;

/// Result type alias for voice agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while capturing, dispatching or playing a turn
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Capture already running")]
    AlreadyRecording,

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend degraded: {message}")]
    BackendDegraded {
        message: String,
        audio_url: Option<String>,
    },

    #[error("Backend rejected request: {message}")]
    BackendRejected {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("A turn is already in progress")]
    TurnInProgress,

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AgentError {
    /// Text suitable for a status line shown to the user
    pub fn user_message(&self) -> String {
        match self {
            AgentError::PermissionDenied => {
                "Please allow microphone access in your settings".to_string()
            }
            AgentError::DeviceUnavailable(_) => "No microphone device found".to_string(),
            AgentError::AlreadyRecording => "Already recording".to_string(),
            AgentError::EmptyInput => "Please enter some text".to_string(),
            AgentError::BackendRejected { suggestions, .. } if !suggestions.is_empty() => {
                format!("Try one of these voices: {}", suggestions.join(", "))
            }
            AgentError::TurnInProgress => "Still working on the previous reply".to_string(),
            AgentError::Unknown(detail) => format!("Recording error: {}", detail),
            other => format!("Error: {}", other),
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AgentError::PermissionDenied,
            std::io::ErrorKind::NotFound => AgentError::DeviceUnavailable(err.to_string()),
            _ => AgentError::Unknown(err.to_string()),
        }
    }
}

impl From<hound::Error> for AgentError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => io.into(),
            other => AgentError::Unknown(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::BackendUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_capture_taxonomy() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(AgentError::from(denied), AgentError::PermissionDenied);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            AgentError::from(missing),
            AgentError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn rejected_with_suggestions_lists_voices() {
        let err = AgentError::BackendRejected {
            message: "Invalid voice".to_string(),
            suggestions: vec!["en-US-Mike".to_string(), "en-GB-Lucy".to_string()],
        };
        assert_eq!(
            err.user_message(),
            "Try one of these voices: en-US-Mike, en-GB-Lucy"
        );
    }
}
