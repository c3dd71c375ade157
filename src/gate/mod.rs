//! Abuse gate: bot verification in front of the lead pipeline.
//!
//! Fails closed: an empty token is rejected without contacting the
//! verifier, and a verifier that cannot answer is an error, never an
//! implicit accept or reject.

pub mod recaptcha;

pub use recaptcha::{RecaptchaConfig, RecaptchaVerifier};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Lookup, non_empty, parse_bool, parse_timeout_secs};
use crate::error::{ConfigError, GateError};

/// Default minimum score for an accepted token.
pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Score reported by the development bypass.
pub const BYPASS_SCORE: f64 = 1.0;

/// Action tag reported by the development bypass.
pub const BYPASS_ACTION: &str = "bypass";

/// Raw answer of an external verifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifierResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// External bot-verification capability.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verifier name for logs.
    fn name(&self) -> &str;

    /// Check a client token.
    async fn verify(&self, token: &str) -> Result<VerifierResponse, GateError>;
}

/// Why a token was declined.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    MissingToken,
    Declined { error_codes: Vec<String> },
    LowScore { score: Option<f64>, threshold: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => f.write_str("verification token is missing"),
            Self::Declined { error_codes } if error_codes.is_empty() => {
                f.write_str("token declined by verifier")
            }
            Self::Declined { error_codes } => {
                write!(f, "token declined by verifier ({})", error_codes.join(", "))
            }
            Self::LowScore {
                score: Some(score),
                threshold,
            } => write!(f, "score {score} does not exceed threshold {threshold}"),
            Self::LowScore {
                score: None,
                threshold,
            } => write!(f, "no score reported, threshold {threshold} required"),
        }
    }
}

/// Gate decision for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    pub accepted: bool,
    pub score: f64,
    pub action: String,
    pub rejection: Option<Rejection>,
}

impl GateVerdict {
    fn accepted(score: f64, action: impl Into<String>) -> Self {
        Self {
            accepted: true,
            score,
            action: action.into(),
            rejection: None,
        }
    }

    fn rejected(rejection: Rejection, score: f64, action: impl Into<String>) -> Self {
        Self {
            accepted: false,
            score,
            action: action.into(),
            rejection: Some(rejection),
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Gate configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Skip the verifier entirely. Development only.
    pub bypass: bool,
    /// Verifier settings; required unless `bypass` is set.
    pub recaptcha: Option<RecaptchaConfig>,
    /// Scores must be strictly greater than this. `None` disables the check.
    pub min_score: Option<f64>,
    /// Upper bound on one verifier call.
    pub timeout: Duration,
}

impl GateConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let bypass = match non_empty(lookup, "CAPTCHA_BYPASS") {
            Some(raw) => parse_bool("CAPTCHA_BYPASS", &raw)?,
            None => false,
        };

        let min_score = match non_empty(lookup, "RECAPTCHA_MIN_SCORE") {
            None => Some(DEFAULT_MIN_SCORE),
            Some(raw) if matches!(raw.to_lowercase().as_str(), "off" | "none") => None,
            Some(raw) => {
                let score: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "RECAPTCHA_MIN_SCORE".into(),
                    message: format!("expected a number between 0 and 1, got {raw:?}"),
                })?;
                if !(0.0..=1.0).contains(&score) {
                    return Err(ConfigError::InvalidValue {
                        key: "RECAPTCHA_MIN_SCORE".into(),
                        message: format!("{score} is outside 0..=1"),
                    });
                }
                Some(score)
            }
        };

        let timeout = parse_timeout_secs(lookup, "RECAPTCHA_TIMEOUT_SECS", 5)?;

        let recaptcha = RecaptchaConfig::from_lookup(lookup);
        if !bypass && recaptcha.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "RECAPTCHA_SECRET".into(),
                hint: "Set it, or set CAPTCHA_BYPASS=true for local development.".into(),
            });
        }

        Ok(Self {
            bypass,
            recaptcha,
            min_score,
            timeout,
        })
    }
}

// ── Gate ────────────────────────────────────────────────────────────

enum GateMode {
    Verify(Arc<dyn Verifier>),
    Bypass,
}

/// Abuse gate: turns a verifier answer into an accept/reject verdict.
pub struct AbuseGate {
    mode: GateMode,
    min_score: Option<f64>,
    timeout: Duration,
}

impl AbuseGate {
    /// Gate backed by an external verifier.
    pub fn new(verifier: Arc<dyn Verifier>, min_score: Option<f64>, timeout: Duration) -> Self {
        Self {
            mode: GateMode::Verify(verifier),
            min_score,
            timeout,
        }
    }

    /// Gate that accepts every non-empty token without verification.
    pub fn bypass() -> Self {
        Self {
            mode: GateMode::Bypass,
            min_score: None,
            timeout: Duration::ZERO,
        }
    }

    /// Build the gate described by `config`.
    pub fn from_config(config: &GateConfig) -> Result<Self, ConfigError> {
        if config.bypass {
            return Ok(Self::bypass());
        }
        let recaptcha = config
            .recaptcha
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "RECAPTCHA_SECRET".into(),
                hint: "Required when CAPTCHA_BYPASS is not set.".into(),
            })?;
        Ok(Self::new(
            Arc::new(RecaptchaVerifier::new(recaptcha)),
            config.min_score,
            config.timeout,
        ))
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self.mode, GateMode::Bypass)
    }

    /// Verify a client token.
    pub async fn verify(&self, token: &str) -> Result<GateVerdict, GateError> {
        if token.trim().is_empty() {
            debug!("Empty verification token, rejecting without verifier call");
            return Ok(GateVerdict::rejected(Rejection::MissingToken, 0.0, ""));
        }

        let verifier = match &self.mode {
            GateMode::Bypass => {
                warn!("Captcha bypass active — token accepted without verification");
                return Ok(GateVerdict::accepted(BYPASS_SCORE, BYPASS_ACTION));
            }
            GateMode::Verify(verifier) => verifier,
        };

        let response = tokio::time::timeout(self.timeout, verifier.verify(token))
            .await
            .map_err(|_| GateError::Timeout {
                timeout: self.timeout,
            })??;

        debug!(
            verifier = verifier.name(),
            success = response.success,
            score = ?response.score,
            "Verifier answered"
        );
        Ok(self.evaluate(response))
    }

    fn evaluate(&self, response: VerifierResponse) -> GateVerdict {
        let score = response.score.unwrap_or(0.0);
        let action = response.action.unwrap_or_default();

        if !response.success {
            return GateVerdict::rejected(
                Rejection::Declined {
                    error_codes: response.error_codes,
                },
                score,
                action,
            );
        }

        if let Some(threshold) = self.min_score {
            let passes = response.score.is_some_and(|s| s > threshold);
            if !passes {
                return GateVerdict::rejected(
                    Rejection::LowScore {
                        score: response.score,
                        threshold,
                    },
                    score,
                    action,
                );
            }
        }

        GateVerdict::accepted(score, action)
    }
}
