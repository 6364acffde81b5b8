//! Codec configuration.

use crate::error::CodecError;
use irongate_core::DEFAULT_START_OF_MESSAGE;
use std::str::FromStr;

/// What the transport does with the byte stream after a protocol error.
///
/// Field-level errors inside a well-delimited frame always drop just that
/// frame; the policy only governs a bad StartOfMessage or type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncPolicy {
    /// Treat the error as fatal for the connection.
    #[default]
    Disconnect,
    /// Discard one byte and try again.
    SkipByte,
    /// Discard the frame announced by the header.
    SkipFrame,
}

impl ResyncPolicy {
    /// Returns the settings name of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::SkipByte => "skip_byte",
            Self::SkipFrame => "skip_frame",
        }
    }
}

impl FromStr for ResyncPolicy {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "disconnect" => Ok(Self::Disconnect),
            "skip_byte" => Ok(Self::SkipByte),
            "skip_frame" => Ok(Self::SkipFrame),
            _ => Err(CodecError::UnknownResyncPolicy {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ResyncPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`Codec`](crate::Codec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// StartOfMessage marker written to and expected from every frame.
    pub start_of_message: u8,
    /// Recovery behaviour after a protocol error.
    pub resync_policy: ResyncPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            start_of_message: DEFAULT_START_OF_MESSAGE,
            resync_policy: ResyncPolicy::default(),
        }
    }
}

impl CodecConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the StartOfMessage marker.
    #[must_use]
    pub fn start_of_message(mut self, marker: u8) -> Self {
        self.start_of_message = marker;
        self
    }

    /// Sets the resync policy.
    #[must_use]
    pub fn resync_policy(mut self, policy: ResyncPolicy) -> Self {
        self.resync_policy = policy;
        self
    }
}
