pub mod client;
pub mod clusters;
pub mod deployments;
pub mod models;

#[cfg(test)]
pub(crate) mod mock_server;

pub use client::ApiClient;
pub use models::{
    Cluster, CreateClusterInput, Deployment, DeploymentInput, UpdateClusterInput,
};

#[cfg(test)]
mod tests {
    use super::mock_server::{MockApi, TOKEN};
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    #[actix_web::test]
    async fn fetch_sends_token_and_decodes() {
        let api = MockApi::start().await;
        api.respond(
            "GET",
            "clusters/cl-1",
            200,
            json!({ "id": "cl-1", "name": "primary", "status": "CREATED", "workspaceIds": ["ws-1"] }),
        );
        let client = ApiClient::new(api.config()).expect("client");

        let response = client.fetch_cluster("cl-1").await.expect("fetch");
        let cluster: Cluster = response.decode().expect("decodes");

        assert_eq!(cluster.status, "CREATED");
        assert_eq!(cluster.workspace_ids, vec!["ws-1"]);
        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].authorization.as_deref(),
            Some(format!("Bearer {}", TOKEN).as_str())
        );
        api.stop().await;
    }

    #[actix_web::test]
    async fn fetch_returns_raw_not_found() {
        let api = MockApi::start().await;
        let client = ApiClient::new(api.config()).expect("client");

        let response = client.fetch_cluster("missing").await.expect("fetch");
        assert_eq!(response.code, 404);

        let err = client
            .update_cluster("missing", &UpdateClusterInput::default())
            .await
            .expect_err("not found");
        assert!(matches!(err, AppError::NotFound(_)));
        api.stop().await;
    }

    #[actix_web::test]
    async fn create_posts_camel_case_body() {
        let api = MockApi::start().await;
        api.respond(
            "POST",
            "clusters",
            200,
            json!({ "id": "cl-2", "name": "edge", "status": "CREATING" }),
        );
        let client = ApiClient::new(api.config()).expect("client");

        let cluster = client
            .create_cluster(&CreateClusterInput {
                name: "edge".to_string(),
                cloud_provider: "AWS".to_string(),
                region: "us-east-1".to_string(),
                workspace_ids: vec![],
            })
            .await
            .expect("create");

        assert_eq!(cluster.id, "cl-2");
        let posted = api.requests_to("POST", "clusters");
        assert_eq!(
            posted[0].body,
            Some(json!({ "name": "edge", "cloudProvider": "AWS", "region": "us-east-1" }))
        );
        api.stop().await;
    }

    #[actix_web::test]
    async fn api_error_detail_surfaces() {
        let api = MockApi::start().await;
        api.respond(
            "POST",
            "deployments/dep-1",
            422,
            json!({ "detail": "workspace ws-9 cannot use cluster cl-1", "statusCode": 422 }),
        );
        let client = ApiClient::new(api.config()).expect("client");

        let err = client
            .update_deployment(
                "dep-1",
                &DeploymentInput {
                    name: "etl".to_string(),
                    description: None,
                    cluster_id: "cl-1".to_string(),
                    workspace_id: "ws-9".to_string(),
                },
            )
            .await
            .expect_err("rejected");

        assert!(matches!(
            err,
            AppError::Api { code: 422, detail } if detail.contains("ws-9")
        ));
        api.stop().await;
    }

    #[actix_web::test]
    async fn delete_reports_already_gone() {
        let api = MockApi::start().await;
        api.respond("DELETE", "deployments/dep-1", 204, serde_json::Value::Null);
        let client = ApiClient::new(api.config()).expect("client");

        assert!(client.delete_deployment("dep-1").await.expect("delete"));
        assert!(!client.delete_deployment("dep-2").await.expect("delete"));
        api.stop().await;
    }
}
