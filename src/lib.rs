pub mod prelude {
    pub use crate::api::{ApiClient, Cluster, Deployment};
    pub use crate::config::{ApiConfig, PollTiming};
    pub use crate::error::{format_anyhow_chain, format_error_chain, AppError, AppResult};
    pub use crate::poller::{PollConfig, PollResult, Poller};
    pub use crate::reconciler::{Observed, Reconciler};
    pub use crate::resources::*;
    pub use crate::status::{RemoteObject, StatusOutcome, StatusPolicy};
    pub use crate::transport::{Normalized, TransportResponse};

    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod reconciler;
pub mod resources;
pub mod status;
pub mod transport;
