use std::future::Future;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::poller::{PollConfig, PollResult, Poller};
use crate::status::{classify, RemoteObject, StatusOutcome, StatusPolicy};
use crate::transport::TransportResponse;

/// What a caller gets to see of a remote object: the object itself, or the
/// sentinel saying it no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    Present(T),
    Deleted,
}

impl<T> Observed<T> {
    pub fn as_ref(&self) -> Observed<&T> {
        match self {
            Observed::Present(object) => Observed::Present(object),
            Observed::Deleted => Observed::Deleted,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Observed::Deleted)
    }
}

/// Mutate, then wait for the remote object to settle, then hand the settled
/// object to the caller.
#[derive(Debug, Clone)]
pub struct Reconciler {
    poller: Poller,
}

impl Reconciler {
    pub fn new(config: PollConfig) -> Self {
        Self {
            poller: Poller::new(config),
        }
    }

    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self {
            poller: self.poller.with_cancellation(cancel),
        }
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.poller.config().policy
    }

    /// Run `mutate`, then poll the object it returned via `probe_for(id)`.
    ///
    /// `map` receives the terminal observation, including failed and timed-out
    /// ones, before any error is returned. It must be idempotent.
    pub async fn reconcile<T, M, MFut, P, PFut, F>(
        &self,
        mutate: M,
        probe_for: P,
        map: F,
    ) -> AppResult<()>
    where
        T: RemoteObject + DeserializeOwned,
        M: FnOnce() -> MFut,
        MFut: Future<Output = AppResult<T>>,
        P: FnMut(&str) -> PFut,
        PFut: Future<Output = AppResult<TransportResponse>>,
        F: FnOnce(Observed<T>),
    {
        let kind = self.policy().kind.clone();
        let initial = mutate().await?;
        let id = initial.id().to_string();
        log::info!(
            "{} {} mutation accepted with status {:?}, waiting for it to settle",
            kind,
            id,
            initial.raw_status()
        );

        self.settle(&id, probe_for, map).await
    }

    /// Wait on an object without mutating it first, e.g. after a DELETE.
    ///
    /// `map` is called exactly as in [`Reconciler::reconcile`].
    pub async fn settle<T, P, PFut, F>(&self, id: &str, mut probe_for: P, map: F) -> AppResult<()>
    where
        T: RemoteObject + DeserializeOwned,
        P: FnMut(&str) -> PFut,
        PFut: Future<Output = AppResult<TransportResponse>>,
        F: FnOnce(Observed<T>),
    {
        match self.poller.poll::<T, _, _>(id, || probe_for(id)).await? {
            PollResult::Reached(object) => {
                map(Observed::Present(object));
                Ok(())
            }
            PollResult::Deleted => {
                map(Observed::Deleted);
                Ok(())
            }
            PollResult::Failed { last, error } => {
                if let Some(object) = last {
                    map(Observed::Present(object));
                }
                Err(error)
            }
        }
    }
}

/// A one-shot read. Not-found means "drop local state", not an error; the
/// status is classified but not acted on, so an object mid-mutation still
/// reads back fine.
pub async fn read<T, P, PFut>(probe: P, policy: &StatusPolicy) -> AppResult<Observed<T>>
where
    T: RemoteObject + DeserializeOwned,
    P: FnOnce() -> PFut,
    PFut: Future<Output = AppResult<TransportResponse>>,
{
    let response = probe().await?;
    let normalized = response.normalize();
    let object: Option<T> = if normalized.is_success() && normalized.detail.is_none() {
        Some(response.decode()?)
    } else {
        None
    };

    match classify(&normalized, object.as_ref(), policy)? {
        StatusOutcome::Deleted => {
            log::info!("{} no longer exists, dropping local state", policy.kind);
            Ok(Observed::Deleted)
        }
        outcome => {
            let object = object.ok_or_else(|| AppError::MalformedResponse {
                code: normalized.code,
                reason: format!("{} read carried no object", policy.kind),
            })?;
            if let StatusOutcome::Unknown(status) = &outcome {
                log::warn!(
                    "{} {} reports unrecognized status {:?}",
                    policy.kind,
                    object.id(),
                    status
                );
            }
            Ok(Observed::Present(object))
        }
    }
}
