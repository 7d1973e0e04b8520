use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::status::{classify, RemoteObject, StatusOutcome, StatusPolicy};
use crate::transport::TransportResponse;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Reported as the last status when an object timed out with an empty status.
const INITIALIZING: &str = "INITIALIZING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub policy: StatusPolicy,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl PollConfig {
    pub fn new(policy: StatusPolicy) -> Self {
        Self {
            policy,
            timeout: DEFAULT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.min_interval.is_zero() {
            return Err(AppError::InvalidInput(format!(
                "{} poll interval must be positive",
                self.policy.kind
            )));
        }
        self.policy.validate()
    }
}

/// How a poll ended, when it ended in a state the caller should record.
#[derive(Debug)]
pub enum PollResult<T> {
    /// The object reached one of the success statuses.
    Reached(T),
    /// The object disappeared. Not an error: someone else may have deleted it.
    Deleted,
    /// Failure, access denied, or timeout. `last` is the last fetched object,
    /// kept so the caller can persist what the remote side looks like.
    Failed { last: Option<T>, error: AppError },
}

/// Drives repeated observation of one remote object until it settles.
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `id` with `probe` until it reaches a terminal state.
    ///
    /// The first probe happens immediately; after that probes are spaced
    /// `min_interval` apart and never overlap. Transport errors, API errors,
    /// malformed responses and unknown statuses abort the poll with `Err`.
    /// Cancellation interrupts both the wait between probes and a probe in
    /// flight.
    pub async fn poll<T, F, Fut>(&self, id: &str, mut probe: F) -> AppResult<PollResult<T>>
    where
        T: RemoteObject + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<TransportResponse>>,
    {
        self.config.validate()?;

        let kind = self.config.policy.kind.as_str();
        let start = Instant::now();
        let mut tick: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled(format!("polling {} {}", kind, id)));
            }

            tick += 1;
            let response = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(AppError::Cancelled(format!("polling {} {}", kind, id)));
                }
                response = probe() => response?,
            };
            let normalized = response.normalize();
            let object: Option<T> = if normalized.is_success() && normalized.detail.is_none() {
                Some(response.decode()?)
            } else {
                None
            };

            let outcome = classify(&normalized, object.as_ref(), &self.config.policy)?;
            log::debug!("{} {} tick {}: {:?}", kind, id, tick, outcome);

            match outcome {
                StatusOutcome::Deleted => {
                    log::info!("{} {} no longer exists", kind, id);
                    return Ok(PollResult::Deleted);
                }
                StatusOutcome::Unknown(status) => {
                    return Err(AppError::UnknownStatus {
                        kind: kind.to_string(),
                        id: id.to_string(),
                        status,
                    });
                }
                StatusOutcome::Success(status) => {
                    let object = object.ok_or_else(|| missing_object(kind, id))?;
                    log::info!(
                        "{} {} reached {} after {}s",
                        kind,
                        id,
                        status,
                        start.elapsed().as_secs()
                    );
                    return Ok(PollResult::Reached(object));
                }
                StatusOutcome::Failure { raw, reason } => {
                    log::warn!("{}", reason);
                    return Ok(PollResult::Failed {
                        last: object,
                        error: AppError::MutationFailed {
                            id: id.to_string(),
                            status: raw,
                            reason,
                        },
                    });
                }
                StatusOutcome::Denied { raw, reason } => {
                    log::warn!("{}", reason);
                    return Ok(PollResult::Failed {
                        last: object,
                        error: AppError::AccessDenied {
                            id: id.to_string(),
                            status: raw,
                            reason,
                        },
                    });
                }
                StatusOutcome::Pending(status) => {
                    let elapsed = start.elapsed();
                    if elapsed >= self.config.timeout {
                        let last_status = if status.is_empty() {
                            INITIALIZING.to_string()
                        } else {
                            status
                        };
                        log::warn!(
                            "{} {} still {} after {}s, giving up",
                            kind,
                            id,
                            last_status,
                            elapsed.as_secs()
                        );
                        return Ok(PollResult::Failed {
                            last: object,
                            error: AppError::Timeout {
                                kind: kind.to_string(),
                                id: id.to_string(),
                                elapsed,
                                last_status,
                            },
                        });
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(AppError::Cancelled(format!("polling {} {}", kind, id)));
                }
                _ = tokio::time::sleep(self.config.min_interval) => {}
            }
        }
    }
}

fn missing_object(kind: &str, id: &str) -> AppError {
    AppError::MalformedResponse {
        code: 200,
        reason: format!("{} {} classified without an object", kind, id),
    }
}
