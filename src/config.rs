//! Configuration types.
//!
//! Everything is read from environment variables. Parsing goes through a
//! lookup function so tests can supply their own environment.

use std::time::Duration;

use crate::channels::sheets::SheetsConfig;
use crate::channels::sms::SmsConfig;
use crate::channels::telegram::TelegramConfig;
use crate::error::ConfigError;
use crate::gate::GateConfig;

/// Environment lookup: variable name to value.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Optional channel settings: either complete, or disabled with the
/// variables that were missing.
#[derive(Debug, Clone)]
pub enum ChannelSetting<T> {
    Enabled(T),
    Disabled { missing: Vec<&'static str> },
}

impl<T> ChannelSetting<T> {
    /// Human-readable reason for a disabled channel.
    pub fn disabled_reason(&self) -> Option<String> {
        match self {
            Self::Enabled(_) => None,
            Self::Disabled { missing } => Some(format!("missing {}", missing.join(", "))),
        }
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on one channel delivery.
    pub channel_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(10),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    pub gate: GateConfig,
    pub dispatch: DispatchConfig,
    pub telegram: ChannelSetting<TelegramConfig>,
    pub sheets: ChannelSetting<SheetsConfig>,
    pub sms: ChannelSetting<SmsConfig>,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary lookup.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let port = parse_or(lookup, "PORT", 3000u16)?;
        let channel_timeout = parse_timeout_secs(lookup, "CHANNEL_TIMEOUT_SECS", 10)?;

        Ok(Self {
            port,
            gate: GateConfig::from_lookup(lookup)?,
            dispatch: DispatchConfig { channel_timeout },
            telegram: TelegramConfig::from_lookup(lookup),
            sheets: SheetsConfig::from_lookup(lookup),
            sms: SmsConfig::from_lookup(lookup),
        })
    }
}

/// Trimmed, non-empty value of a variable.
pub fn non_empty(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collect required variables; disabled when any is missing.
pub(crate) fn required_all<const N: usize>(
    lookup: Lookup<'_>,
    keys: [&'static str; N],
) -> Result<[String; N], Vec<&'static str>> {
    let values = keys.map(|key| non_empty(lookup, key));
    let missing: Vec<&'static str> = keys
        .iter()
        .zip(values.iter())
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }
    Ok(values.map(Option::unwrap_or_default))
}

pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true/false, got {raw:?}"),
        }),
    }
}

/// Timeout in whole seconds, at least 1.
pub(crate) fn parse_timeout_secs(
    lookup: Lookup<'_>,
    key: &str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match parse_or(lookup, key, default_secs)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least 1 second".into(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: Lookup<'_>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
        None => Ok(default),
    }
}
