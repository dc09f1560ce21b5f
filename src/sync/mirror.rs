//! Remote mirror backends.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::sync::record::SyncRecord;

/// Errors raised while pushing a record.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote store answered with a non-success status.
    #[error("remote store returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for mirrored records.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Push one record.
    ///
    /// # Errors
    /// Returns an error if the remote write fails.
    async fn push(&self, record: &SyncRecord) -> Result<(), SyncError>;
}

/// `PostgREST` (Supabase) mirror.
pub struct SupabaseMirror {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseMirror {
    /// Create a mirror for the given project URL and anon key.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, SyncError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }
}

#[async_trait]
impl RemoteMirror for SupabaseMirror {
    async fn push(&self, record: &SyncRecord) -> Result<(), SyncError> {
        let body = record.body()?;
        let request = match record {
            SyncRecord::ConversationTitle { id, .. } => {
                let id = id.to_string();
                let url = format!(
                    "{}?id=eq.{}",
                    self.table_url(record.table()),
                    urlencoding::encode(&id)
                );
                self.client.patch(url).json(&body)
            }
            _ => {
                let mut url = self.table_url(record.table());
                if let Some(columns) = record.conflict_target() {
                    url.push_str("?on_conflict=");
                    url.push_str(&urlencoding::encode(columns));
                }
                self.client
                    .post(url)
                    .header("Prefer", "resolution=merge-duplicates")
                    .json(&body)
            }
        };

        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
