//! Project settings
//!
//! Settings are a single value replaced as a whole on every accepted
//! update; an update that fails validation leaves the prior value in place.

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Default frames per write to the output sink.
pub const DEFAULT_BUFFER_FRAMES: u32 = 1024;

/// Project-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Operator-facing project name
    pub project_name: String,

    /// Frames per write to the output sink; a latency/stability tradeoff.
    /// Takes effect for streams started after the change, never for the
    /// stream already in flight.
    pub buffer_size_frames: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            buffer_size_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

impl Settings {
    /// Reject unusable values before they replace the current settings.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size_frames == 0 {
            return Err(PlaybackError::InvalidBufferSize(self.buffer_size_frames));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.buffer_size_frames, DEFAULT_BUFFER_FRAMES);
        assert!(settings.project_name.is_empty());
    }

    #[test]
    fn zero_buffer_size_is_rejected() {
        let settings = Settings {
            project_name: "Show".to_string(),
            buffer_size_frames: 0,
        };
        assert!(matches!(
            settings.validate(),
            Err(PlaybackError::InvalidBufferSize(0))
        ));
    }

    #[test]
    fn one_frame_buffer_is_allowed() {
        let settings = Settings {
            project_name: String::new(),
            buffer_size_frames: 1,
        };
        assert!(settings.validate().is_ok());
    }
}
