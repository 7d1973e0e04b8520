use super::models::{Deployment, DeploymentInput};
use super::ApiClient;
use crate::error::AppResult;
use crate::transport::{expect_done, expect_ok, TransportResponse};

impl ApiClient {
    pub fn deployment_path(&self, id: &str) -> String {
        self.organization_path(&format!("deployments/{}", id))
    }

    pub async fn fetch_deployment(&self, id: &str) -> AppResult<TransportResponse> {
        self.get(&self.deployment_path(id)).await
    }

    pub async fn create_deployment(&self, input: &DeploymentInput) -> AppResult<Deployment> {
        log::info!(
            "Creating deployment {} on cluster {}",
            input.name,
            input.cluster_id
        );
        let response = self
            .post_json(&self.organization_path("deployments"), input)
            .await?;
        expect_ok(&response, "deployments")
    }

    pub async fn update_deployment(
        &self,
        id: &str,
        input: &DeploymentInput,
    ) -> AppResult<Deployment> {
        log::info!("Updating deployment {}", id);
        let response = self.post_json(&self.deployment_path(id), input).await?;
        expect_ok(&response, &format!("deployment {}", id))
    }

    pub async fn delete_deployment(&self, id: &str) -> AppResult<bool> {
        log::info!("Deleting deployment {}", id);
        let response = self.delete(&self.deployment_path(id)).await?;
        expect_done(&response)
    }
}
