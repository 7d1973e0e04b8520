use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{sorted_ids, ManagedResource, ReadOutcome};
use crate::api::{ApiClient, Cluster, CreateClusterInput, UpdateClusterInput};
use crate::config::PollTiming;
use crate::error::{AppError, AppResult};
use crate::reconciler::{self, Observed, Reconciler};
use crate::status::StatusPolicy;
use crate::transport::TransportResponse;

pub const CREATING: &str = "CREATING";
pub const CREATED: &str = "CREATED";
pub const CREATE_FAILED: &str = "CREATE_FAILED";
pub const UPDATING: &str = "UPDATING";
pub const UPDATE_FAILED: &str = "UPDATE_FAILED";
pub const UPGRADE_PENDING: &str = "UPGRADE_PENDING";
pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
pub const DELETING: &str = "DELETING";
pub const DELETED: &str = "DELETED";
pub const DELETE_FAILED: &str = "DELETE_FAILED";

/// Statuses a cluster moves through after a create or update.
pub fn cluster_status_policy() -> StatusPolicy {
    StatusPolicy::new("cluster")
        .with_pending(&[CREATING, UPDATING, UPGRADE_PENDING])
        .with_success(&[CREATED])
        .with_failure(&[CREATE_FAILED, UPDATE_FAILED])
        .with_denied(ACCESS_DENIED)
}

/// Statuses a cluster moves through after a delete, until it 404s.
///
/// A read right after an accepted DELETE may still report `CREATED`.
pub fn cluster_deletion_policy() -> StatusPolicy {
    StatusPolicy::new("cluster")
        .with_pending(&[CREATED, DELETING])
        .with_success(&[DELETED])
        .with_failure(&[DELETE_FAILED])
        .with_denied(ACCESS_DENIED)
}

pub(crate) type ProbeFuture = Pin<Box<dyn Future<Output = AppResult<TransportResponse>> + Send>>;

/// A probe that fetches a cluster by id on every call.
pub(crate) fn cluster_probe(client: &Arc<ApiClient>) -> impl FnMut(&str) -> ProbeFuture + Send {
    let client = Arc::clone(client);
    move |id: &str| -> ProbeFuture {
        let client = Arc::clone(&client);
        let id = id.to_string();
        Box::pin(async move { client.fetch_cluster(&id).await })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub cloud_provider: String,
    pub region: String,
    #[serde(default)]
    pub workspace_ids: Vec<String>,
}

/// The locally persisted view of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    pub id: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub cloud_provider: Option<String>,
    pub region: Option<String>,
    pub workspace_ids: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClusterState {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn apply_observed(&mut self, observed: Observed<&Cluster>) {
        match observed {
            Observed::Present(cluster) => {
                self.id = Some(cluster.id.clone());
                self.name = cluster.name.clone();
                self.status = Some(cluster.status.clone());
                self.cloud_provider = cluster.cloud_provider.clone();
                self.region = cluster.region.clone();
                self.workspace_ids = sorted_ids(&cluster.workspace_ids);
                self.updated_at = cluster.updated_at;
            }
            Observed::Deleted => *self = Self::default(),
        }
    }

    fn require_id(&self) -> AppResult<String> {
        self.id
            .clone()
            .ok_or_else(|| AppError::InvalidInput("cluster has no id in local state".to_string()))
    }
}

pub struct ClusterResource {
    client: Arc<ApiClient>,
    reconciler: Reconciler,
    deletion: Reconciler,
}

impl ClusterResource {
    pub fn new(client: Arc<ApiClient>, timing: PollTiming) -> Self {
        Self {
            client,
            reconciler: Reconciler::new(timing.poll_config(cluster_status_policy())),
            deletion: Reconciler::new(timing.poll_config(cluster_deletion_policy())),
        }
    }

    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self {
            client: self.client,
            reconciler: self.reconciler.with_cancellation(cancel.clone()),
            deletion: self.deletion.with_cancellation(cancel),
        }
    }

    /// Wait for a cluster to settle without mutating it. The last observed
    /// cluster is recorded in `state` even when waiting fails.
    pub async fn wait(&self, state: &mut ClusterState) -> AppResult<()> {
        let id = state.require_id()?;
        self.reconciler
            .settle(&id, cluster_probe(&self.client), |observed: Observed<Cluster>| {
                state.apply_observed(observed.as_ref())
            })
            .await
    }
}

#[async_trait]
impl ManagedResource for ClusterResource {
    type Spec = ClusterSpec;
    type State = ClusterState;

    async fn create(&self, spec: &ClusterSpec, state: &mut ClusterState) -> AppResult<()> {
        let input = CreateClusterInput {
            name: spec.name.clone(),
            cloud_provider: spec.cloud_provider.clone(),
            region: spec.region.clone(),
            workspace_ids: sorted_ids(&spec.workspace_ids),
        };

        self.reconciler
            .reconcile(
                || self.client.create_cluster(&input),
                cluster_probe(&self.client),
                |observed: Observed<Cluster>| state.apply_observed(observed.as_ref()),
            )
            .await
    }

    async fn read(&self, state: &mut ClusterState) -> AppResult<ReadOutcome> {
        let Some(id) = state.id.clone() else {
            return Ok(ReadOutcome::Gone);
        };

        let observed = reconciler::read::<Cluster, _, _>(
            || self.client.fetch_cluster(&id),
            self.reconciler.policy(),
        )
        .await?;

        state.apply_observed(observed.as_ref());
        if observed.is_deleted() {
            log::warn!("Cluster {} was deleted outside of this tool", id);
            return Ok(ReadOutcome::Gone);
        }
        Ok(ReadOutcome::Exists)
    }

    async fn update(&self, spec: &ClusterSpec, state: &mut ClusterState) -> AppResult<()> {
        let id = state.require_id()?;

        if let Some(current) = state.cloud_provider.as_deref() {
            if current != spec.cloud_provider {
                return Err(AppError::InvalidInput(format!(
                    "cluster {} cannot move from {} to {}; replace it instead",
                    id, current, spec.cloud_provider
                )));
            }
        }
        if let Some(current) = state.region.as_deref() {
            if current != spec.region {
                return Err(AppError::InvalidInput(format!(
                    "cluster {} cannot move from region {} to {}; replace it instead",
                    id, current, spec.region
                )));
            }
        }

        let input = UpdateClusterInput {
            name: Some(spec.name.clone()),
            workspace_ids: Some(sorted_ids(&spec.workspace_ids)),
        };

        self.reconciler
            .reconcile(
                || self.client.update_cluster(&id, &input),
                cluster_probe(&self.client),
                |observed: Observed<Cluster>| state.apply_observed(observed.as_ref()),
            )
            .await
    }

    async fn delete(&self, state: &mut ClusterState) -> AppResult<()> {
        let Some(id) = state.id.clone() else {
            return Ok(());
        };

        if !self.client.delete_cluster(&id).await? {
            log::info!("Cluster {} was already gone", id);
            state.apply_observed(Observed::Deleted);
            return Ok(());
        }

        self.deletion
            .settle(&id, cluster_probe(&self.client), |observed: Observed<Cluster>| {
                state.apply_observed(observed.as_ref())
            })
            .await?;
        state.apply_observed(Observed::Deleted);
        Ok(())
    }
}
