//! Google reCAPTCHA `siteverify` client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{Lookup, non_empty};
use crate::error::GateError;
use crate::gate::{Verifier, VerifierResponse};

/// Default verification endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// reCAPTCHA configuration.
#[derive(Debug, Clone)]
pub struct RecaptchaConfig {
    pub secret: SecretString,
    pub verify_url: String,
}

impl RecaptchaConfig {
    /// Returns `None` if `RECAPTCHA_SECRET` is not set.
    pub fn from_lookup(lookup: Lookup<'_>) -> Option<Self> {
        let secret = non_empty(lookup, "RECAPTCHA_SECRET")?;
        let verify_url =
            non_empty(lookup, "RECAPTCHA_VERIFY_URL").unwrap_or_else(|| DEFAULT_VERIFY_URL.into());
        Some(Self {
            secret: SecretString::from(secret),
            verify_url,
        })
    }
}

/// Verifier posting `secret` + `response` to the siteverify endpoint.
pub struct RecaptchaVerifier {
    config: RecaptchaConfig,
    client: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(config: RecaptchaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Verifier for RecaptchaVerifier {
    fn name(&self) -> &str {
        "recaptcha"
    }

    async fn verify(&self, token: &str) -> Result<VerifierResponse, GateError> {
        let resp = self
            .client
            .post(&self.config.verify_url)
            .form(&[
                ("secret", self.config.secret.expose_secret()),
                ("response", token),
            ])
            .send()
            .await
            .map_err(|e| GateError::Unavailable {
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GateError::Unavailable {
                reason: format!("siteverify returned {status}: {body}"),
            });
        }

        resp.json::<VerifierResponse>()
            .await
            .map_err(|e| GateError::InvalidResponse {
                reason: e.without_url().to_string(),
            })
    }
}
