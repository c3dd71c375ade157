//! Channel manager: the set of channels a lead fans out to.

use std::sync::Arc;

use crate::channels::{LeadChannel, SheetsChannel, SmsChannel, TelegramChannel};
use crate::config::{AppConfig, ChannelSetting};

/// A registered channel: live, or disabled by configuration.
#[derive(Clone)]
pub enum ChannelSlot {
    Active(Arc<dyn LeadChannel>),
    Disabled { name: String, reason: String },
}

impl ChannelSlot {
    pub fn name(&self) -> &str {
        match self {
            Self::Active(channel) => channel.name(),
            Self::Disabled { name, .. } => name,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Ordered channel registry. Dispatch results follow registration order.
#[derive(Clone, Default)]
pub struct ChannelManager {
    slots: Vec<ChannelSlot>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the telegram, sheets and sms channels from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut channels = Self::new();
        channels.add_setting("telegram", &config.telegram, |c| -> Arc<dyn LeadChannel> {
            Arc::new(TelegramChannel::new(c.clone()))
        });
        channels.add_setting("sheets", &config.sheets, |c| -> Arc<dyn LeadChannel> {
            Arc::new(SheetsChannel::new(c.clone()))
        });
        channels.add_setting("sms", &config.sms, |c| -> Arc<dyn LeadChannel> {
            Arc::new(SmsChannel::new(c.clone()))
        });
        channels
    }

    /// Register a live channel.
    pub fn add(&mut self, channel: Arc<dyn LeadChannel>) {
        self.slots.push(ChannelSlot::Active(channel));
    }

    /// Register a channel that is known but not configured.
    pub fn add_disabled(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.slots.push(ChannelSlot::Disabled {
            name: name.into(),
            reason: reason.into(),
        });
    }

    fn add_setting<T>(
        &mut self,
        name: &str,
        setting: &ChannelSetting<T>,
        build: impl FnOnce(&T) -> Arc<dyn LeadChannel>,
    ) {
        match setting {
            ChannelSetting::Enabled(config) => self.add(build(config)),
            ChannelSetting::Disabled { .. } => self.add_disabled(
                name,
                setting.disabled_reason().unwrap_or_default(),
            ),
        }
    }

    pub fn slots(&self) -> &[ChannelSlot] {
        &self.slots
    }

    /// Names of live channels.
    pub fn active_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.name().to_string())
            .collect()
    }
}
