use reqwest::RequestBuilder;
use serde::Serialize;
use url::Url;

use crate::config::ApiConfig;
use crate::error::AppResult;
use crate::transport::TransportResponse;

const USER_AGENT: &str = concat!("cloud-reconciler/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over `reqwest` that hands back raw responses, so that what a
/// status code means is decided by the caller, not here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, config })
    }

    /// `organizations/{org}/{suffix}`, relative to the configured base.
    pub fn organization_path(&self, suffix: &str) -> String {
        format!("organizations/{}/{}", self.config.organization_id, suffix)
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    pub async fn get(&self, path: &str) -> AppResult<TransportResponse> {
        let url = self.url(path)?;
        log::debug!("GET {}", url);
        self.send(self.http.get(url)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<TransportResponse> {
        let url = self.url(path)?;
        log::debug!("POST {}", url);
        self.send(self.http.post(url).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<TransportResponse> {
        let url = self.url(path)?;
        log::debug!("DELETE {}", url);
        self.send(self.http.delete(url)).await
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<TransportResponse> {
        let response = request.bearer_auth(&self.config.api_token).send().await?;
        let code = response.status().as_u16();
        let body = response.bytes().await?;
        log::debug!("-> HTTP {} ({} bytes)", code, body.len());
        Ok(TransportResponse::new(code, body.to_vec()))
    }
}
