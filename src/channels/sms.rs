//! SMS gateway: sends the client acknowledgement to the lead's phone.
//!
//! Speaks the Twilio Messages API (form POST with basic auth), which most
//! SMS gateways accept.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::LeadChannel;
use crate::config::{ChannelSetting, Lookup, non_empty, required_all};
use crate::error::ChannelError;
use crate::pipeline::types::ClassifiedLead;

/// Default gateway base URL.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// SMS gateway configuration.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    pub api_base: String,
}

impl SmsConfig {
    /// Enabled when account SID, auth token and sender number are all set.
    pub fn from_lookup(lookup: Lookup<'_>) -> ChannelSetting<Self> {
        match required_all(
            lookup,
            ["SMS_ACCOUNT_SID", "SMS_AUTH_TOKEN", "SMS_FROM_NUMBER"],
        ) {
            Ok([account_sid, auth_token, from_number]) => ChannelSetting::Enabled(Self {
                account_sid,
                auth_token: SecretString::from(auth_token),
                from_number,
                api_base: non_empty(lookup, "SMS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            }),
            Err(missing) => ChannelSetting::Disabled { missing },
        }
    }
}

/// SMS channel.
pub struct SmsChannel {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// Send a text message.
    pub async fn send(&self, to_number: &str, text: &str) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("To", to_number),
                ("From", self.config.from_number.as_str()),
                ("Body", text),
            ])
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "sms".into(),
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                name: "sms".into(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LeadChannel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    async fn deliver(&self, lead: &ClassifiedLead) -> Result<(), ChannelError> {
        self.send(&lead.phone, &lead.client_message).await?;
        tracing::info!(lead_id = %lead.id, "Client acknowledgement sent by SMS");
        Ok(())
    }
}
