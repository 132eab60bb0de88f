/// Audio device and decode errors
use thiserror::Error;

use audioq_playback::PlaybackError;

/// Result type for desktop audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Desktop audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device available
    #[error("audio device not found")]
    DeviceNotFound,

    /// Failed to build the output stream
    #[error("failed to build output stream: {0}")]
    StreamBuild(String),

    /// Failed to start the output stream
    #[error("failed to start stream: {0}")]
    Play(String),

    /// Device rejected or cannot report a stream configuration
    #[error("unsupported stream configuration: {0}")]
    UnsupportedConfig(String),

    /// Audio thread failed during stream setup
    #[error("audio thread error: {0}")]
    AudioThread(String),
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioError::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioError::Play(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        AudioError::UnsupportedConfig(err.to_string())
    }
}

impl From<AudioError> for PlaybackError {
    fn from(err: AudioError) -> Self {
        PlaybackError::Io(err.to_string())
    }
}
