use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ManagedResource, ReadOutcome};
use crate::api::{ApiClient, Deployment, DeploymentInput};
use crate::error::{AppError, AppResult};
use crate::reconciler::{self, Observed};
use crate::status::StatusPolicy;

/// Deployment mutations take effect synchronously; the statuses only matter
/// when reading one back.
pub fn deployment_status_policy() -> StatusPolicy {
    StatusPolicy::new("deployment")
        .with_pending(&["CREATING", "DEPLOYING", "UPDATING"])
        .with_success(&["HEALTHY", "HIBERNATING"])
        .with_failure(&["UNHEALTHY"])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cluster_id: String,
    pub workspace_id: String,
}

impl DeploymentSpec {
    fn input(&self) -> DeploymentInput {
        DeploymentInput {
            name: self.name.clone(),
            description: self.description.clone(),
            cluster_id: self.cluster_id.clone(),
            workspace_id: self.workspace_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub cluster_id: Option<String>,
    pub workspace_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeploymentState {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn apply_observed(&mut self, observed: Observed<&Deployment>) {
        match observed {
            Observed::Present(deployment) => {
                self.id = Some(deployment.id.clone());
                self.name = deployment.name.clone();
                self.description = deployment.description.clone();
                self.status = Some(deployment.status.clone());
                self.cluster_id = Some(deployment.cluster_id.clone());
                self.workspace_id = Some(deployment.workspace_id.clone());
                self.updated_at = deployment.updated_at;
            }
            Observed::Deleted => *self = Self::default(),
        }
    }
}

pub struct DeploymentResource {
    client: Arc<ApiClient>,
    policy: StatusPolicy,
}

impl DeploymentResource {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            policy: deployment_status_policy(),
        }
    }
}

#[async_trait]
impl ManagedResource for DeploymentResource {
    type Spec = DeploymentSpec;
    type State = DeploymentState;

    async fn create(&self, spec: &DeploymentSpec, state: &mut DeploymentState) -> AppResult<()> {
        let deployment = self.client.create_deployment(&spec.input()).await?;
        state.apply_observed(Observed::Present(&deployment));
        Ok(())
    }

    async fn read(&self, state: &mut DeploymentState) -> AppResult<ReadOutcome> {
        let Some(id) = state.id.clone() else {
            return Ok(ReadOutcome::Gone);
        };

        let observed = reconciler::read::<Deployment, _, _>(
            || self.client.fetch_deployment(&id),
            &self.policy,
        )
        .await?;

        state.apply_observed(observed.as_ref());
        if observed.is_deleted() {
            return Ok(ReadOutcome::Gone);
        }
        Ok(ReadOutcome::Exists)
    }

    async fn update(&self, spec: &DeploymentSpec, state: &mut DeploymentState) -> AppResult<()> {
        let id = state.id.clone().ok_or_else(|| {
            AppError::InvalidInput("deployment has no id in local state".to_string())
        })?;

        let deployment = self.client.update_deployment(&id, &spec.input()).await?;
        state.apply_observed(Observed::Present(&deployment));
        Ok(())
    }

    async fn delete(&self, state: &mut DeploymentState) -> AppResult<()> {
        let Some(id) = state.id.clone() else {
            return Ok(());
        };

        if !self.client.delete_deployment(&id).await? {
            log::info!("Deployment {} was already gone", id);
        }
        state.apply_observed(Observed::Deleted);
        Ok(())
    }
}
