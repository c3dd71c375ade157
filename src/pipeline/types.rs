//! Shared types for the lead pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LeadError;

/// Question index of the budget answer.
pub const BUDGET_QUESTION: u8 = 5;
/// Question index of the timeline answer.
pub const TIMELINE_QUESTION: u8 = 6;
/// Number of questions on the lead form.
pub const QUESTION_COUNT: u8 = 6;

// ── Inbound payload ─────────────────────────────────────────────────

/// Raw lead form payload as posted by the browser.
///
/// Every field is optional on the wire; the dispatcher decides whether the
/// payload is a lead or a probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPayload {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub answers: Option<serde_json::Value>,
    #[serde(default)]
    pub token: Option<String>,
}

impl LeadPayload {
    /// A probe carries no classifiable lead: blank phone, no answers, or
    /// answers without a budget or timeline.
    ///
    /// Non-object answers are not a probe; they fail later as a
    /// classification fault.
    pub fn is_probe(&self) -> bool {
        let phone_blank = self
            .phone
            .as_deref()
            .map(|p| p.trim().is_empty())
            .unwrap_or(true);
        if phone_blank {
            return true;
        }

        match &self.answers {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Object(map)) => {
                !map.contains_key(&BUDGET_QUESTION.to_string())
                    || !map.contains_key(&TIMELINE_QUESTION.to_string())
            }
            Some(_) => false,
        }
    }

    /// The verification token, empty when absent.
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }
}

// ── Answers ─────────────────────────────────────────────────────────

/// Form answers keyed by question index ("1".."6").
///
/// Lookups of missing questions yield the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet(BTreeMap<String, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an answer set from the JSON `answers` object.
    ///
    /// Strings are kept as-is, numbers and booleans use their JSON text and
    /// `null` becomes empty. Nested arrays or objects are rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, LeadError> {
        let map = value.as_object().ok_or_else(|| {
            LeadError::ClassificationFault(format!(
                "answers must be an object, got {}",
                json_kind(value)
            ))
        })?;

        let mut answers = BTreeMap::new();
        for (key, raw) in map {
            let text = match raw {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(LeadError::ClassificationFault(format!(
                        "answer {key} must be a scalar, got {}",
                        json_kind(other)
                    )));
                }
            };
            answers.insert(key.clone(), text);
        }
        Ok(Self(answers))
    }

    /// Set the answer for a question.
    pub fn insert(&mut self, question: u8, answer: impl Into<String>) {
        self.0.insert(question.to_string(), answer.into());
    }

    /// Answer text for a question, or `""` when unanswered.
    pub fn get(&self, question: u8) -> &str {
        self.0
            .get(&question.to_string())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn budget(&self) -> &str {
        self.get(BUDGET_QUESTION)
    }

    pub fn timeline(&self) -> &str {
        self.get(TIMELINE_QUESTION)
    }

    /// Answers 1..=6 in question order, missing ones as `""`.
    pub fn in_order(&self) -> Vec<&str> {
        (1..=QUESTION_COUNT).map(|q| self.get(q)).collect()
    }
}

impl<S: Into<String>> FromIterator<(u8, S)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (u8, S)>>(iter: I) -> Self {
        let mut answers = Self::new();
        for (question, answer) in iter {
            answers.insert(question, answer);
        }
        answers
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ── Submission ──────────────────────────────────────────────────────

/// A lead that passed the probe check and the abuse gate.
#[derive(Debug, Clone)]
pub struct LeadSubmission {
    pub phone: String,
    pub answers: AnswerSet,
    pub token: String,
}

impl LeadSubmission {
    /// Promote a non-probe payload into a submission.
    pub fn from_payload(payload: LeadPayload) -> Result<Self, LeadError> {
        let answers = match &payload.answers {
            Some(value) => AnswerSet::from_json(value)?,
            None => {
                return Err(LeadError::ClassificationFault(
                    "answers missing after probe check".into(),
                ));
            }
        };
        Ok(Self {
            phone: payload.phone.unwrap_or_default().trim().to_string(),
            answers,
            token: payload.token.unwrap_or_default(),
        })
    }
}

// ── Urgency tier ────────────────────────────────────────────────────

/// Urgency bucket of a lead. Ordered `Hot > Warm > Cold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrgencyTier {
    Cold,
    Warm,
    Hot,
}

impl UrgencyTier {
    /// Short label for logging and the API.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hot => "HOT",
            Self::Warm => "WARM",
            Self::Cold => "COLD",
        }
    }

    /// Decorated label shown to operators.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Hot => "🔥 ГОРЯЧИЙ",
            Self::Warm => "👍 ТЕПЛЫЙ",
            Self::Cold => "❄️ ХОЛОДНЫЙ",
        }
    }

    /// Operator guidance for this tier.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Hot => {
                "Немедленно позвонить! Клиент готов к покупке в ближайшее время с высоким бюджетом."
            }
            Self::Warm => {
                "Позвонить в течение 2 часов. Клиент в среднесрочной перспективе с хорошим бюджетом."
            }
            Self::Cold => {
                "Отправить письмо с каталогом и позвонить на следующий день. Клиент на ранней стадии рассмотрения."
            }
        }
    }
}

impl std::fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Classified lead ─────────────────────────────────────────────────

/// A classified, rendered lead ready for the channels.
///
/// Shared read-only between the concurrent channel deliveries.
#[derive(Debug, Clone)]
pub struct ClassifiedLead {
    /// Correlation ID for logs.
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub phone: String,
    pub answers: AnswerSet,
    pub tier: UrgencyTier,
    pub operator_message: String,
    pub client_message: String,
}

impl ClassifiedLead {
    /// Ledger row: timestamp, phone, then answers 1..6.
    pub fn ledger_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(2 + QUESTION_COUNT as usize);
        row.push(self.received_at.format("%Y-%m-%d %H:%M:%S").to_string());
        row.push(self.phone.clone());
        row.extend(self.answers.in_order().into_iter().map(String::from));
        row
    }
}

// ── Dispatch results ────────────────────────────────────────────────

/// Outcome of one channel for one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub channel_name: String,
    pub attempted: bool,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn delivered(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            attempted: true,
            succeeded: true,
            error: None,
        }
    }

    pub fn failed(channel_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            attempted: true,
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// Channel is not configured. Not an error.
    pub fn skipped(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            attempted: false,
            succeeded: false,
            error: None,
        }
    }
}

/// Successful end states of a submission.
#[derive(Debug, Clone)]
pub enum LeadOutcome {
    /// Not a lead; acknowledged without gate, classification or dispatch.
    Probe,
    /// Classified and dispatched.
    Completed(LeadReport),
}

/// Summary of a completed lead.
#[derive(Debug, Clone)]
pub struct LeadReport {
    pub lead_id: Uuid,
    pub tier: UrgencyTier,
    pub client_message: String,
    pub channel_results: Vec<DispatchResult>,
}

// ── Response ────────────────────────────────────────────────────────

/// Caller-facing response body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_status: Option<UrgencyTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_results: Option<Vec<DispatchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LeadResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<LeadOutcome> for LeadResponse {
    fn from(outcome: LeadOutcome) -> Self {
        match outcome {
            LeadOutcome::Probe => Self {
                success: true,
                message: Some("Служебный запрос обработан".into()),
                ..Self::default()
            },
            LeadOutcome::Completed(report) => Self {
                success: true,
                message: Some("Лид сохранён".into()),
                lead_status: Some(report.tier),
                client_message: Some(report.client_message),
                channel_results: Some(report.channel_results),
                error: None,
            },
        }
    }
}
