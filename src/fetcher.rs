use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::batch::read_batches;
use crate::error::RastroError;
use crate::models::{AsyncRegistration, TrackingResult};
use crate::tracker::Tracker;

/// Outcome of registering a batch file. Chunks are numbered from 1 in file order.
///
/// Accepted chunks are reported even when others fail, so their receipts are
/// not lost and a retry can skip them.
#[derive(Debug, Default)]
pub struct BatchRegistration {
    pub accepted: Vec<(usize, AsyncRegistration)>,
    pub failed: Vec<(usize, RastroError)>,
}

impl BatchRegistration {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn registrations(&self) -> Vec<AsyncRegistration> {
        self.accepted.iter().map(|(_, registration)| registration.clone()).collect()
    }
}

pub struct BatchFetcher {
    tracker: Arc<dyn Tracker>,
}

impl BatchFetcher {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }

    /// Registers every chunk of a batch file concurrently.
    ///
    /// Only an unreadable or invalid file is an error; nothing is registered
    /// then. Per-chunk failures land in [`BatchRegistration::failed`].
    pub async fn register_file(&self, path: impl AsRef<Path>) -> Result<BatchRegistration> {
        let path = path.as_ref();
        let batches = read_batches(path)
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;

        info!(chunks = batches.len(), file = %path.display(), "registering batch file");

        let registrations = futures::future::join_all(
            batches.iter().map(|codes| self.tracker.register(codes)),
        )
        .await;

        let mut outcome = BatchRegistration::default();
        for (index, registration) in registrations.into_iter().enumerate() {
            let chunk = index + 1;
            match registration {
                Ok(registration) => {
                    info!(
                        receipt = %registration.receipt,
                        objects = registration.object_count,
                        "chunk {} registered",
                        chunk
                    );
                    outcome.accepted.push((chunk, registration));
                }
                Err(e) => outcome.failed.push((chunk, e)),
            }
        }

        Ok(outcome)
    }

    /// Fetches the tracking result behind each receipt, in order.
    pub async fn collect(&self, registrations: &[AsyncRegistration]) -> Result<Vec<TrackingResult>> {
        let mut results = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let result = self
                .tracker
                .fetch_receipt(&registration.receipt)
                .await
                .with_context(|| format!("Failed to fetch receipt {}", registration.receipt))?;
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackedObject;
    use reqwest::StatusCode;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTracker {
        registered: Mutex<Vec<Vec<String>>>,
        fail_chunk_len: Option<usize>,
        fail_receipt: Option<String>,
    }

    #[async_trait::async_trait]
    impl Tracker for MockTracker {
        async fn register(&self, codes: &[String]) -> crate::error::Result<AsyncRegistration> {
            let mut registered = self.registered.lock().unwrap();
            registered.push(codes.to_vec());
            if self.fail_chunk_len == Some(codes.len()) {
                return Err(RastroError::remote("async registration", StatusCode::SERVICE_UNAVAILABLE, ""));
            }
            Ok(AsyncRegistration {
                receipt: format!("R{}", codes.len()),
                object_count: codes.len() as u32,
                ..Default::default()
            })
        }

        async fn fetch_receipt(&self, receipt: &str) -> crate::error::Result<TrackingResult> {
            if self.fail_receipt.as_deref() == Some(receipt) {
                return Err(RastroError::remote("receipt lookup", StatusCode::NOT_FOUND, ""));
            }
            Ok(TrackingResult {
                objects: vec![TrackedObject {
                    code: receipt.to_string(),
                    events: Vec::new(),
                }],
            })
        }
    }

    fn batch_file(lines: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for n in 0..lines {
            writeln!(file, "AB{n:09}BR").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn registers_each_chunk_in_order() {
        let tracker = Arc::new(MockTracker::default());
        let fetcher = BatchFetcher::new(tracker.clone());

        let file = batch_file(1200);
        let outcome = fetcher.register_file(file.path()).await.unwrap();
        assert!(outcome.is_complete());

        let receipts: Vec<String> = outcome.registrations().into_iter().map(|r| r.receipt).collect();
        assert_eq!(receipts, vec!["R1000", "R200"]);
        assert_eq!(tracker.registered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_chunk_keeps_accepted_receipts() {
        let tracker = Arc::new(MockTracker {
            fail_chunk_len: Some(1000),
            ..Default::default()
        });
        let fetcher = BatchFetcher::new(tracker.clone());

        let file = batch_file(2200);
        let outcome = fetcher.register_file(file.path()).await.unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].0, 3);
        assert_eq!(outcome.accepted[0].1.receipt, "R200");

        let failed: Vec<usize> = outcome.failed.iter().map(|(chunk, _)| *chunk).collect();
        assert_eq!(failed, vec![1, 2]);
        assert_eq!(outcome.failed[0].1.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(tracker.registered.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invalid_file_registers_nothing() {
        let tracker = Arc::new(MockTracker::default());
        let fetcher = BatchFetcher::new(tracker.clone());

        let mut file = batch_file(3);
        writeln!(file, "invalid").unwrap();

        let err = fetcher.register_file(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid"));
        assert!(tracker.registered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_stops_at_first_failed_receipt() {
        let tracker = Arc::new(MockTracker {
            fail_receipt: Some("R2".to_string()),
            ..Default::default()
        });
        let fetcher = BatchFetcher::new(tracker);

        let registrations: Vec<AsyncRegistration> = ["R1", "R2", "R3"]
            .iter()
            .map(|receipt| AsyncRegistration {
                receipt: receipt.to_string(),
                ..Default::default()
            })
            .collect();

        let err = fetcher.collect(&registrations).await.unwrap_err();
        assert!(err.to_string().contains("R2"));

        let results = fetcher.collect(&registrations[..1]).await.unwrap();
        assert_eq!(results[0].objects[0].code, "R1");
    }
}
