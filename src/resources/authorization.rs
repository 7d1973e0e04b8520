use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::cluster::{cluster_probe, cluster_status_policy};
use super::{sorted_ids, ManagedResource, ReadOutcome};
use crate::api::{ApiClient, Cluster, UpdateClusterInput};
use crate::config::PollTiming;
use crate::error::{AppError, AppResult};
use crate::reconciler::{self, Observed, Reconciler};

/// Which workspaces may use a cluster.
///
/// This has no remote status of its own: it is a field of the cluster, so
/// every change is an update of the cluster and waits for the cluster to
/// settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAuthorizationSpec {
    pub cluster_id: String,
    pub workspace_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAuthorizationState {
    pub cluster_id: Option<String>,
    pub workspace_ids: Vec<String>,
    pub cluster_status: Option<String>,
}

impl ClusterAuthorizationState {
    pub fn apply_observed(&mut self, observed: Observed<&Cluster>) {
        match observed {
            Observed::Present(cluster) => {
                self.cluster_id = Some(cluster.id.clone());
                self.workspace_ids = sorted_ids(&cluster.workspace_ids);
                self.cluster_status = Some(cluster.status.clone());
            }
            Observed::Deleted => *self = Self::default(),
        }
    }
}

pub struct ClusterAuthorization {
    client: Arc<ApiClient>,
    reconciler: Reconciler,
}

impl ClusterAuthorization {
    pub fn new(client: Arc<ApiClient>, timing: PollTiming) -> Self {
        Self {
            client,
            reconciler: Reconciler::new(timing.poll_config(cluster_status_policy())),
        }
    }

    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self {
            client: self.client,
            reconciler: self.reconciler.with_cancellation(cancel),
        }
    }

    async fn authorize(
        &self,
        cluster_id: &str,
        workspace_ids: Vec<String>,
        state: &mut ClusterAuthorizationState,
    ) -> AppResult<()> {
        log::info!(
            "Setting workspaces allowed on cluster {} to [{}]",
            cluster_id,
            workspace_ids.join(", ")
        );
        let input = UpdateClusterInput {
            workspace_ids: Some(workspace_ids),
            ..Default::default()
        };

        self.reconciler
            .reconcile(
                || self.client.update_cluster(cluster_id, &input),
                cluster_probe(&self.client),
                |observed: Observed<Cluster>| state.apply_observed(observed.as_ref()),
            )
            .await
    }
}

#[async_trait]
impl ManagedResource for ClusterAuthorization {
    type Spec = ClusterAuthorizationSpec;
    type State = ClusterAuthorizationState;

    async fn create(
        &self,
        spec: &ClusterAuthorizationSpec,
        state: &mut ClusterAuthorizationState,
    ) -> AppResult<()> {
        self.authorize(&spec.cluster_id, sorted_ids(&spec.workspace_ids), state)
            .await
    }

    async fn read(&self, state: &mut ClusterAuthorizationState) -> AppResult<ReadOutcome> {
        let Some(cluster_id) = state.cluster_id.clone() else {
            return Ok(ReadOutcome::Gone);
        };

        let observed = reconciler::read::<Cluster, _, _>(
            || self.client.fetch_cluster(&cluster_id),
            self.reconciler.policy(),
        )
        .await?;

        state.apply_observed(observed.as_ref());
        if observed.is_deleted() {
            return Ok(ReadOutcome::Gone);
        }
        Ok(ReadOutcome::Exists)
    }

    async fn update(
        &self,
        spec: &ClusterAuthorizationSpec,
        state: &mut ClusterAuthorizationState,
    ) -> AppResult<()> {
        if let Some(current) = state.cluster_id.as_deref() {
            if current != spec.cluster_id {
                return Err(AppError::InvalidInput(format!(
                    "authorization is bound to cluster {}, not {}",
                    current, spec.cluster_id
                )));
            }
        }
        self.authorize(&spec.cluster_id, sorted_ids(&spec.workspace_ids), state)
            .await
    }

    async fn delete(&self, state: &mut ClusterAuthorizationState) -> AppResult<()> {
        let Some(cluster_id) = state.cluster_id.clone() else {
            return Ok(());
        };

        match self.authorize(&cluster_id, Vec::new(), state).await {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => {
                log::info!("Cluster {} is gone, nothing to revoke", cluster_id);
            }
            Err(e) => return Err(e),
        }

        *state = ClusterAuthorizationState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_server::MockApi;
    use crate::resources::cluster::{CREATED, UPDATE_FAILED, UPDATING};
    use serde_json::json;
    use std::time::Duration;

    fn resource(api: &MockApi) -> ClusterAuthorization {
        let client = Arc::new(ApiClient::new(api.config()).expect("client"));
        ClusterAuthorization::new(
            client,
            PollTiming {
                timeout: Duration::from_secs(5),
                min_interval: Duration::from_millis(10),
            },
        )
    }

    fn cluster_json(status: &str, workspaces: &[&str]) -> serde_json::Value {
        json!({
            "id": "cl-1",
            "name": "primary",
            "status": status,
            "workspaceIds": workspaces
        })
    }

    fn spec(workspaces: &[&str]) -> ClusterAuthorizationSpec {
        ClusterAuthorizationSpec {
            cluster_id: "cl-1".to_string(),
            workspace_ids: workspaces.iter().map(|w| w.to_string()).collect(),
        }
    }

    #[actix_web::test]
    async fn create_updates_and_waits_on_the_cluster() {
        let api = MockApi::start().await;
        api.respond("POST", "clusters/cl-1", 200, cluster_json(UPDATING, &[]));
        api.respond("GET", "clusters/cl-1", 200, cluster_json(UPDATING, &["ws-1"]));
        api.respond("GET", "clusters/cl-1", 200, cluster_json(CREATED, &["ws-1", "ws-2"]));
        let mut state = ClusterAuthorizationState::default();

        resource(&api)
            .create(&spec(&["ws-2", "ws-1"]), &mut state)
            .await
            .expect("create");

        assert_eq!(state.cluster_id.as_deref(), Some("cl-1"));
        assert_eq!(state.workspace_ids, vec!["ws-1", "ws-2"]);
        assert_eq!(state.cluster_status.as_deref(), Some(CREATED));
        let posted = api.requests_to("POST", "clusters/cl-1");
        assert_eq!(posted[0].body, Some(json!({ "workspaceIds": ["ws-1", "ws-2"] })));
        assert_eq!(api.requests_to("GET", "clusters/cl-1").len(), 2);
        api.stop().await;
    }

    #[actix_web::test]
    async fn failed_cluster_update_is_an_error_with_state_kept() {
        let api = MockApi::start().await;
        api.respond("POST", "clusters/cl-1", 200, cluster_json(UPDATING, &[]));
        api.respond("GET", "clusters/cl-1", 200, cluster_json(UPDATE_FAILED, &[]));
        let mut state = ClusterAuthorizationState::default();

        let err = resource(&api)
            .create(&spec(&["ws-1"]), &mut state)
            .await
            .expect_err("update failed");

        assert!(matches!(err, AppError::MutationFailed { .. }));
        assert_eq!(state.cluster_status.as_deref(), Some(UPDATE_FAILED));
        api.stop().await;
    }

    #[actix_web::test]
    async fn update_cannot_switch_clusters() {
        let api = MockApi::start().await;
        let mut state = ClusterAuthorizationState {
            cluster_id: Some("cl-other".to_string()),
            ..Default::default()
        };

        let err = resource(&api)
            .update(&spec(&["ws-1"]), &mut state)
            .await
            .expect_err("different cluster");

        assert!(matches!(err, AppError::InvalidInput(_)));
        api.stop().await;
    }

    #[actix_web::test]
    async fn delete_clears_workspaces_and_state() {
        let api = MockApi::start().await;
        api.respond("POST", "clusters/cl-1", 200, cluster_json(UPDATING, &["ws-1"]));
        api.respond("GET", "clusters/cl-1", 200, cluster_json(CREATED, &[]));
        let mut state = ClusterAuthorizationState {
            cluster_id: Some("cl-1".to_string()),
            workspace_ids: vec!["ws-1".to_string()],
            cluster_status: Some(CREATED.to_string()),
        };

        resource(&api).delete(&mut state).await.expect("delete");

        assert_eq!(state, ClusterAuthorizationState::default());
        let posted = api.requests_to("POST", "clusters/cl-1");
        assert_eq!(posted[0].body, Some(json!({ "workspaceIds": [] })));
        api.stop().await;
    }

    #[actix_web::test]
    async fn delete_tolerates_missing_cluster() {
        let api = MockApi::start().await;
        let mut state = ClusterAuthorizationState {
            cluster_id: Some("cl-1".to_string()),
            ..Default::default()
        };

        resource(&api).delete(&mut state).await.expect("delete");

        assert_eq!(state, ClusterAuthorizationState::default());
        api.stop().await;
    }

    #[actix_web::test]
    async fn read_reports_current_workspaces() {
        let api = MockApi::start().await;
        api.respond("GET", "clusters/cl-1", 200, cluster_json(CREATED, &["ws-3"]));
        let mut state = ClusterAuthorizationState {
            cluster_id: Some("cl-1".to_string()),
            workspace_ids: vec!["ws-1".to_string()],
            ..Default::default()
        };

        let outcome = resource(&api).read(&mut state).await.expect("read");

        assert_eq!(outcome, ReadOutcome::Exists);
        assert_eq!(state.workspace_ids, vec!["ws-3"]);
        api.stop().await;
    }
}
