//! Chat webhook delivery.
//!
//! Delivery is best effort. Callers get a `Result` so they can log the
//! outcome, but nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Webhook responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Something that can carry a rendered digest to its destination.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, digest: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(rename = "Msg")]
    msg: &'a str,
}

pub struct Webhook {
    endpoint: String,
    client: reqwest::Client,
}

impl Webhook {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl Deliver for Webhook {
    async fn deliver(&self, digest: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&Payload { msg: digest })
            .send()
            .await?;

        let status = response.status();
        // The body carries nothing we use. Read it so the connection can be reused.
        let _ = response.bytes().await;

        if !status.is_success() {
            return Err(DeliveryError::Status(status));
        }
        debug!("Delivered {} bytes to webhook ({})", digest.len(), status);
        Ok(())
    }
}
