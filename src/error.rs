//! Error types for Lead Intake.

use std::time::Duration;

/// Top-level error type for the service binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Abuse gate errors.
///
/// A declined token is not an error: it comes back as a rejected
/// [`GateVerdict`](crate::gate::GateVerdict). This type covers the case
/// where no trust decision could be made at all.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Verification service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Verification timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Invalid response from verification service: {reason}")]
    InvalidResponse { reason: String },
}

/// Channel delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel {name} rejected the request with status {status}: {body}")]
    Rejected {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Channel {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("Channel {name} task aborted: {reason}")]
    Aborted { name: String, reason: String },
}

/// Terminal failures of a lead submission.
///
/// Probe requests and channel failures are not represented here: the first
/// is a successful outcome, the second is reported per channel.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("Verification rejected: {0}")]
    VerificationRejected(crate::gate::Rejection),

    #[error("Verification unavailable: {0}")]
    VerificationUnavailable(#[from] GateError),

    #[error("Classification fault: {0}")]
    ClassificationFault(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
