//! Lead dispatcher: gates, classifies and fans leads out to channels.
//!
//! Flow:
//! 1. Probe check (no external calls) → may short-circuit
//! 2. Abuse gate → reject or fail before anything is classified
//! 3. Classification + rendering
//! 4. Concurrent delivery to every registered channel
//!
//! Channel failures never fail the lead. Each channel runs in its own task
//! under its own timeout and reports a [`DispatchResult`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::channels::{ChannelManager, ChannelSlot, LeadChannel};
use crate::config::DispatchConfig;
use crate::error::{ChannelError, LeadError};
use crate::gate::AbuseGate;
use crate::pipeline::classifier::classify;
use crate::pipeline::render::render;
use crate::pipeline::types::{
    ClassifiedLead, DispatchResult, LeadOutcome, LeadPayload, LeadReport, LeadSubmission,
};

/// Lead dispatcher: the request-level state machine.
pub struct LeadDispatcher {
    gate: AbuseGate,
    channels: ChannelManager,
    config: DispatchConfig,
}

impl LeadDispatcher {
    /// Create a new lead dispatcher.
    pub fn new(gate: AbuseGate, channels: ChannelManager, config: DispatchConfig) -> Self {
        Self {
            gate,
            channels,
            config,
        }
    }

    pub fn gate(&self) -> &AbuseGate {
        &self.gate
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    /// Process one submitted form.
    pub async fn handle(&self, payload: LeadPayload) -> Result<LeadOutcome, LeadError> {
        if payload.is_probe() {
            info!("Service request without lead data, skipping");
            return Ok(LeadOutcome::Probe);
        }

        let verdict = self.gate.verify(payload.token()).await.map_err(|e| {
            error!(error = %e, "Captcha verification unavailable");
            LeadError::VerificationUnavailable(e)
        })?;
        if let Some(rejection) = verdict.rejection {
            warn!(reason = %rejection, score = verdict.score, "Captcha rejected lead");
            return Err(LeadError::VerificationRejected(rejection));
        }

        let submission = LeadSubmission::from_payload(payload).map_err(|e| {
            error!(error = %e, "Lead could not be classified");
            e
        })?;
        let lead = Arc::new(classify_submission(submission));

        info!(
            lead_id = %lead.id,
            phone = %lead.phone,
            status = lead.tier.label(),
            answers = ?lead.answers,
            "New lead"
        );

        let channel_results = self.fan_out(Arc::clone(&lead)).await;
        let delivered = channel_results.iter().filter(|r| r.succeeded).count();
        info!(
            lead_id = %lead.id,
            delivered,
            total = channel_results.len(),
            "Lead dispatch complete"
        );

        Ok(LeadOutcome::Completed(LeadReport {
            lead_id: lead.id,
            tier: lead.tier,
            client_message: lead.client_message.clone(),
            channel_results,
        }))
    }

    /// Deliver to every registered channel concurrently.
    ///
    /// Results come back in registration order.
    async fn fan_out(&self, lead: Arc<ClassifiedLead>) -> Vec<DispatchResult> {
        let timeout = self.config.channel_timeout;

        let deliveries = self.channels.slots().iter().map(|slot| {
            let lead = Arc::clone(&lead);
            async move {
                match slot {
                    ChannelSlot::Disabled { name, reason } => {
                        warn!(
                            lead_id = %lead.id,
                            channel = %name,
                            reason = %reason,
                            "Channel not configured, skipping"
                        );
                        DispatchResult::skipped(name.as_str())
                    }
                    ChannelSlot::Active(channel) => {
                        deliver_one(Arc::clone(channel), lead, timeout).await
                    }
                }
            }
        });

        join_all(deliveries).await
    }
}

/// Classify and render a gated submission.
fn classify_submission(submission: LeadSubmission) -> ClassifiedLead {
    let tier = classify(&submission.answers);
    let messages = render(tier, &submission.phone, &submission.answers);
    ClassifiedLead {
        id: Uuid::new_v4(),
        received_at: Utc::now(),
        phone: submission.phone,
        answers: submission.answers,
        tier,
        operator_message: messages.operator_message,
        client_message: messages.client_message,
    }
}

/// One delivery in its own task, so a panic or hang stays contained.
async fn deliver_one(
    channel: Arc<dyn LeadChannel>,
    lead: Arc<ClassifiedLead>,
    timeout: Duration,
) -> DispatchResult {
    let name = channel.name().to_string();
    let lead_id = lead.id;

    let task = tokio::spawn(async move {
        tokio::time::timeout(timeout, channel.deliver(&lead)).await
    });

    let outcome = match task.await {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => Err(ChannelError::Timeout {
            name: name.clone(),
            timeout,
        }),
        Err(join_err) => Err(ChannelError::Aborted {
            name: name.clone(),
            reason: join_err.to_string(),
        }),
    };

    match outcome {
        Ok(()) => DispatchResult::delivered(name),
        Err(e) => {
            error!(lead_id = %lead_id, channel = %name, error = %e, "Channel delivery failed");
            DispatchResult::failed(name, e.to_string())
        }
    }
}
