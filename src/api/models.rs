use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::RemoteObject;

/// A compute cluster as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,

    /// Server-controlled; empty while the cluster is initializing.
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub cloud_provider: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Workspaces allowed to run deployments on this cluster.
    #[serde(default)]
    pub workspace_ids: Vec<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteObject for Cluster {
    fn id(&self) -> &str {
        &self.id
    }

    fn raw_status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterInput {
    pub name: String,
    pub cloud_provider: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workspace_ids: Vec<String>,
}

/// Partial update; omitted fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_ids: Option<Vec<String>>,
}

/// A deployment running on a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub description: Option<String>,

    pub cluster_id: String,
    pub workspace_id: String,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteObject for Deployment {
    fn id(&self) -> &str {
        &self.id
    }

    fn raw_status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cluster_id: String,
    pub workspace_id: String,
}
