//! Remote snapshot service client.
//!
//! Fetches a full supply-chain snapshot as one JSON document from
//! `GET {base}/snapshot`. The document has the same shape as
//! [`RawDataset`]: one array of records per kind plus an optional
//! `recentScans` counter. Records are returned untyped and validated by
//! ingestion.

use crate::dataset::RawDataset;

/// Client for a remote snapshot service.
#[derive(Clone)]
pub struct SnapshotClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl SnapshotClient {
    /// Create a client for the given base URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, with or without a trailing slash
    /// * `api_token` - Optional bearer token
    pub fn new(base_url: &str, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Create an unauthenticated client (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(base_url, None)
    }

    pub fn snapshot_url(&self) -> String {
        format!("{}/snapshot", self.base_url)
    }

    /// Build a request with optional authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        if let Some(token) = &self.api_token {
            req.header("Authorization", format!("Bearer {}", token))
        } else {
            req
        }
    }

    /// Fetch the current snapshot.
    ///
    /// Fails on transport errors, non-success statuses and documents that
    /// are not a snapshot object.
    pub async fn fetch_snapshot(&self) -> anyhow::Result<RawDataset> {
        let response = self
            .build_request(&self.snapshot_url())
            .send()
            .await?
            .error_for_status()?;

        let data = response.json::<RawDataset>().await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_url_trims_trailing_slash() {
        let client = SnapshotClient::with_base_url("https://trace.example.org/api/");
        assert_eq!(client.snapshot_url(), "https://trace.example.org/api/snapshot");
    }

    #[test]
    fn test_snapshot_document_shape() {
        let raw: RawDataset = serde_json::from_str(
            r#"{ "collectionEvents": [{ "id": "ce-1" }], "recentScans": 42 }"#,
        )
        .unwrap();

        assert_eq!(raw.collection_events.len(), 1);
        assert!(raw.batches.is_empty());
        assert_eq!(raw.recent_scans, Some(42));
    }
}
