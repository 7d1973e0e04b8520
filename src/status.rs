use std::collections::BTreeSet;

use itertools::Itertools;

use crate::error::{AppError, AppResult};
use crate::transport::Normalized;

/// Anything the poller can observe: an identifier and a raw, server-controlled
/// status string.
pub trait RemoteObject {
    fn id(&self) -> &str;
    fn raw_status(&self) -> &str;
}

/// The classification of one observation of a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Mutation still in flight. An empty raw status means "initializing".
    Pending(String),
    Success(String),
    Failure { raw: String, reason: String },
    Denied { raw: String, reason: String },
    /// The transport reported the object as not found.
    Deleted,
    /// A status no policy covers.
    Unknown(String),
}

/// The status vocabulary of one kind of remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Used in messages, e.g. "cluster".
    pub kind: String,
    pub pending: BTreeSet<String>,
    pub success: BTreeSet<String>,
    pub failure: BTreeSet<String>,
    pub denied: Option<String>,
}

fn status_set(statuses: &[&str]) -> BTreeSet<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

impl StatusPolicy {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            pending: BTreeSet::new(),
            success: BTreeSet::new(),
            failure: BTreeSet::new(),
            denied: None,
        }
    }

    pub fn with_pending(mut self, statuses: &[&str]) -> Self {
        self.pending = status_set(statuses);
        self
    }

    pub fn with_success(mut self, statuses: &[&str]) -> Self {
        self.success = status_set(statuses);
        self
    }

    pub fn with_failure(mut self, statuses: &[&str]) -> Self {
        self.failure = status_set(statuses);
        self
    }

    pub fn with_denied(mut self, sentinel: &str) -> Self {
        self.denied = Some(sentinel.to_string());
        self
    }

    /// The status sets must not overlap, and the denied sentinel must not
    /// appear in any of them.
    pub fn validate(&self) -> AppResult<()> {
        let sets = [
            ("pending", &self.pending),
            ("success", &self.success),
            ("failure", &self.failure),
        ];

        for (i, (name_a, a)) in sets.iter().enumerate() {
            for (name_b, b) in sets.iter().skip(i + 1) {
                let shared = a.intersection(b).join(", ");
                if !shared.is_empty() {
                    return Err(AppError::InvalidInput(format!(
                        "{} status policy: {} and {} sets share {}",
                        self.kind, name_a, name_b, shared
                    )));
                }
            }
        }

        if let Some(denied) = &self.denied {
            if let Some((name, _)) = sets.iter().find(|(_, set)| set.contains(denied)) {
                return Err(AppError::InvalidInput(format!(
                    "{} status policy: denied sentinel {} is also in the {} set",
                    self.kind, denied, name
                )));
            }
        }

        if self.success.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "{} status policy has no success status",
                self.kind
            )));
        }

        Ok(())
    }

    /// Classify the raw status of an object that exists.
    pub fn classify_status(&self, id: &str, raw: &str) -> StatusOutcome {
        if self.success.contains(raw) {
            return StatusOutcome::Success(raw.to_string());
        }

        if self.failure.contains(raw) {
            // Create and update failures are reported the same way.
            return StatusOutcome::Failure {
                raw: raw.to_string(),
                reason: format!(
                    "{} {} mutation failed with status {}",
                    self.kind, id, raw
                ),
            };
        }

        if self.denied.as_deref() == Some(raw) {
            return StatusOutcome::Denied {
                raw: raw.to_string(),
                reason: format!("{} {}: access denied ({})", self.kind, id, raw),
            };
        }

        if raw.trim().is_empty() {
            return StatusOutcome::Pending(String::new());
        }

        if self.pending.contains(raw) {
            return StatusOutcome::Pending(raw.to_string());
        }

        StatusOutcome::Unknown(raw.to_string())
    }
}

/// Classify one probe result.
///
/// Not-found wins over everything else; a structured API error aborts the
/// caller instead of becoming a status.
pub fn classify<T: RemoteObject>(
    normalized: &Normalized,
    object: Option<&T>,
    policy: &StatusPolicy,
) -> AppResult<StatusOutcome> {
    if normalized.is_not_found() {
        return Ok(StatusOutcome::Deleted);
    }

    if let Some(detail) = &normalized.detail {
        return Err(AppError::Api {
            code: normalized.code,
            detail: detail.clone(),
        });
    }

    match object {
        Some(object) => Ok(policy.classify_status(object.id(), object.raw_status())),
        None => Err(AppError::MalformedResponse {
            code: normalized.code,
            reason: format!("{} response carried no object", policy.kind),
        }),
    }
}
