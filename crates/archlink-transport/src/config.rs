//! Transport tuning knobs.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::TransportError;

/// Configuration shared by every transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum bytes per outgoing physical frame. Larger messages are sent
    /// as a sequence of continuation frames.
    pub chunk_size: usize,

    /// Largest incoming message the receive loop will reassemble.
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

impl TransportConfig {
    /// Checks the settings and returns the chunk size as a non-zero value.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidConfig`] if either limit is zero.
    pub fn validate(&self) -> Result<NonZeroUsize, TransportError> {
        if self.max_message_size == 0 {
            return Err(TransportError::InvalidConfig(
                "max_message_size must be greater than zero".into(),
            ));
        }
        NonZeroUsize::new(self.chunk_size).ok_or_else(|| {
            TransportError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let chunk = TransportConfig::default().validate().unwrap();
        assert_eq!(chunk.get(), 1024);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let config = TransportConfig {
            chunk_size: 0,
            ..TransportConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TransportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"chunk_size": 64}"#).unwrap();
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.max_message_size, 16 * 1024 * 1024);
    }
}
