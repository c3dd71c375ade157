//! Google Sheets ledger: appends one row per lead.
//!
//! Uses the Sheets v4 `values:append` endpoint with a bearer token. Rows are
//! only ever appended: timestamp, phone, then answers 1..6.
//!
//! `SHEETS_ACCESS_TOKEN` is used as given and never refreshed. Google OAuth
//! access tokens expire after about an hour, so the token must be rotated
//! outside the service (sidecar, secret manager) or every append fails with
//! 401 and is reported as a failed `sheets` delivery.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::LeadChannel;
use crate::config::{ChannelSetting, Lookup, non_empty, required_all};
use crate::error::ChannelError;
use crate::pipeline::types::ClassifiedLead;

/// Default Sheets API base URL.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Default A1 range rows are appended to.
pub const DEFAULT_RANGE: &str = "Leads!A:H";

/// Sheets ledger configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub access_token: SecretString,
    pub range: String,
    pub api_base: String,
}

impl SheetsConfig {
    /// Enabled when `SHEETS_SPREADSHEET_ID` and `SHEETS_ACCESS_TOKEN` are set.
    pub fn from_lookup(lookup: Lookup<'_>) -> ChannelSetting<Self> {
        match required_all(lookup, ["SHEETS_SPREADSHEET_ID", "SHEETS_ACCESS_TOKEN"]) {
            Ok([spreadsheet_id, access_token]) => ChannelSetting::Enabled(Self {
                spreadsheet_id,
                access_token: SecretString::from(access_token),
                range: non_empty(lookup, "SHEETS_RANGE").unwrap_or_else(|| DEFAULT_RANGE.into()),
                api_base: non_empty(lookup, "SHEETS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            }),
            Err(missing) => ChannelSetting::Disabled { missing },
        }
    }
}

/// Spreadsheet ledger channel.
pub struct SheetsChannel {
    config: SheetsConfig,
    client: reqwest::Client,
}

impl SheetsChannel {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn append_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.config.api_base.trim_end_matches('/'),
            self.config.spreadsheet_id,
            self.config.range
        )
    }

    /// Append one row to the ledger.
    pub async fn append(&self, row: &[String]) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "majorDimension": "ROWS",
            "values": [row],
        });

        let resp = self
            .client
            .post(self.append_url())
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "sheets".into(),
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                name: "sheets".into(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LeadChannel for SheetsChannel {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn deliver(&self, lead: &ClassifiedLead) -> Result<(), ChannelError> {
        self.append(&lead.ledger_row()).await?;
        tracing::info!(lead_id = %lead.id, "Lead appended to spreadsheet");
        Ok(())
    }
}
