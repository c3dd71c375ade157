//! Lead channel trait.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::pipeline::types::ClassifiedLead;

/// A notification or storage destination for classified leads.
///
/// Implementations do one delivery attempt per call and report the outcome;
/// retries and timeouts belong to the dispatcher.
#[async_trait]
pub trait LeadChannel: Send + Sync {
    /// Channel name (e.g. "telegram", "sheets").
    fn name(&self) -> &str;

    /// Deliver one lead.
    async fn deliver(&self, lead: &ClassifiedLead) -> Result<(), ChannelError>;
}
