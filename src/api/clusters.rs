use super::models::{Cluster, CreateClusterInput, UpdateClusterInput};
use super::ApiClient;
use crate::error::AppResult;
use crate::transport::{expect_done, expect_ok, TransportResponse};

impl ApiClient {
    pub fn cluster_path(&self, id: &str) -> String {
        self.organization_path(&format!("clusters/{}", id))
    }

    /// Raw fetch, for callers that classify the response themselves.
    pub async fn fetch_cluster(&self, id: &str) -> AppResult<TransportResponse> {
        self.get(&self.cluster_path(id)).await
    }

    pub async fn create_cluster(&self, input: &CreateClusterInput) -> AppResult<Cluster> {
        log::info!("Creating cluster {}", input.name);
        let response = self
            .post_json(&self.organization_path("clusters"), input)
            .await?;
        expect_ok(&response, "clusters")
    }

    pub async fn update_cluster(&self, id: &str, input: &UpdateClusterInput) -> AppResult<Cluster> {
        log::info!("Updating cluster {}", id);
        let response = self.post_json(&self.cluster_path(id), input).await?;
        expect_ok(&response, &format!("cluster {}", id))
    }

    /// Returns `false` when the cluster was already gone.
    pub async fn delete_cluster(&self, id: &str) -> AppResult<bool> {
        log::info!("Deleting cluster {}", id);
        let response = self.delete(&self.cluster_path(id)).await?;
        expect_done(&response)
    }
}
