use crate::client::{RequestOptions, TrackingClient};
use crate::error::Result;
use crate::models::{AsyncRegistration, TrackingResult};

/// The asynchronous half of the tracking API, as used by batch processing.
#[async_trait::async_trait]
pub trait Tracker: Send + Sync {
    async fn register(&self, codes: &[String]) -> Result<AsyncRegistration>;

    async fn fetch_receipt(&self, receipt: &str) -> Result<TrackingResult>;
}

/// Uses the client's default token for every call.
#[async_trait::async_trait]
impl Tracker for TrackingClient {
    async fn register(&self, codes: &[String]) -> Result<AsyncRegistration> {
        TrackingClient::register(self, codes, &RequestOptions::default()).await
    }

    async fn fetch_receipt(&self, receipt: &str) -> Result<TrackingResult> {
        TrackingClient::fetch_receipt(self, receipt, &RequestOptions::default()).await
    }
}
