use async_trait::async_trait;
use itertools::Itertools;

use crate::error::AppResult;

pub mod authorization;
pub mod cluster;
pub mod deployment;

pub use authorization::{ClusterAuthorization, ClusterAuthorizationSpec, ClusterAuthorizationState};
pub use cluster::{ClusterResource, ClusterSpec, ClusterState};
pub use deployment::{DeploymentResource, DeploymentSpec, DeploymentState};

/// What a read found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The object exists; local state was refreshed from it.
    Exists,
    /// The object is gone; local state was cleared and should be dropped.
    Gone,
}

/// Lifecycle of one kind of remote object, as seen by whoever keeps its local
/// state.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    type Spec: Send + Sync;
    type State: Send;

    async fn create(&self, spec: &Self::Spec, state: &mut Self::State) -> AppResult<()>;
    async fn read(&self, state: &mut Self::State) -> AppResult<ReadOutcome>;
    async fn update(&self, spec: &Self::Spec, state: &mut Self::State) -> AppResult<()>;
    async fn delete(&self, state: &mut Self::State) -> AppResult<()>;
}

/// Sorted and de-duplicated, so that ordering differences never show up as
/// drift.
pub(crate) fn sorted_ids(ids: &[String]) -> Vec<String> {
    ids.iter().cloned().sorted().dedup().collect()
}
