//! Typed status conditions attached to resource objects.
//!
//! A condition records one observed fact about an object: a type
//! discriminator, a tri-state status, a short machine-readable reason, and a
//! human-readable message. At most one condition of a given type may be
//! present on an object; [`set`] enforces this.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The tri-state value of a [`Condition`].
///
/// `Unknown` means the controller could not determine the answer, which is
/// distinct from the condition being absent (never evaluated, or healthy for
/// condition types that are only materialized on failure).
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// A typed, timestamped status annotation on a resource object.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Discriminates conditions on the same object.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub status: ConditionStatus,
    /// Machine-readable token for the last transition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Human-readable elaboration of `reason`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// When status, reason or message last changed. Not updated on writes
    /// that leave all three unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(type_: &str, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.into();
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True when status, reason and message all match `other`.
    ///
    /// Transition timestamps are deliberately excluded: two conditions that
    /// agree on these three fields describe the same state, and writing one
    /// over the other would only churn the timestamp.
    pub fn same_as(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Find the condition of the given type.
pub fn find<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Upsert `cond`, replacing any existing condition of the same type.
pub fn set(conditions: &mut Vec<Condition>, cond: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == cond.type_) {
        Some(existing) => *existing = cond,
        None => conditions.push(cond),
    }
}

/// Drop the condition of the given type, if present.
pub fn remove(conditions: &mut Vec<Condition>, type_: &str) {
    conditions.retain(|c| c.type_ != type_);
}
