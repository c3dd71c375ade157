//! Channel adapters for lead fan-out.

pub mod channel;
pub mod manager;
pub mod sheets;
pub mod sms;
pub mod telegram;

pub use channel::*;
pub use manager::{ChannelManager, ChannelSlot};
pub use sheets::SheetsChannel;
pub use sms::SmsChannel;
pub use telegram::TelegramChannel;
