//! Remote schema and generator access.
//!
//! Two services are involved:
//!
//! - the content type listing, queried twice (newest by `createdAt` and
//!   newest by `updatedAt`) to build a [`Fingerprint`]
//! - the SDK generator, which answers with the zip archive of the generated
//!   client, or with a JSON error payload
//!
//! ## Examples
//!
//! ```rust,no_run
//! use codegen_lib::{RemoteClient, SchemaSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RemoteClient::new("my-api-key");
//! let fingerprint = client.fetch_fingerprint().await?;
//! println!("schema last updated at {}", fingerprint.updated_at);
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::config::{CodegenConfig, DEFAULT_GENERATOR_URL, DEFAULT_SCHEMA_URL};
use crate::error::RemoteError;
use crate::fingerprint::Fingerprint;

/// Header carrying the API key on schema lookups.
const AUTH_HEADER: &str = "X-AUTH-TOKEN";

/// Message used when the service fails without explaining why.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Source of schema fingerprints and generated SDK archives.
///
/// Implementations do not retry; retry policy belongs to the caller.
pub trait SchemaSource {
    /// Fetches the current schema fingerprint.
    ///
    /// ## Errors
    ///
    /// Returns [`RemoteError`] if either lookup fails or returns no rows.
    fn fetch_fingerprint(&self) -> impl Future<Output = Result<Fingerprint, RemoteError>> + Send;

    /// Fetches the generated SDK as zip archive bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`RemoteError`] if the request fails or the service answers
    /// with an error payload.
    fn fetch_bundle(&self) -> impl Future<Output = Result<Vec<u8>, RemoteError>> + Send;
}

/// HTTP implementation of [`SchemaSource`].
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: HttpClient,
    schema_url: String,
    generator_url: String,
    credential: String,
}

/// One row of the content type listing. Only the timestamps matter here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeRow {
    created_at: Option<String>,
    updated_at: Option<String>,
}

/// The listing is normally wrapped in `{"data": [...]}`, but a bare array
/// is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Wrapped { data: Vec<ContentTypeRow> },
    Bare(Vec<ContentTypeRow>),
}

impl ListResponse {
    fn into_first(self) -> Option<ContentTypeRow> {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data.into_iter().next(),
        }
    }
}

#[derive(Clone, Copy)]
enum OrderBy {
    CreatedAt,
    UpdatedAt,
}

impl OrderBy {
    fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

impl RemoteClient {
    /// Creates a client for the default service endpoints.
    ///
    /// `credential` must be a non-empty API key.
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            generator_url: DEFAULT_GENERATOR_URL.to_string(),
            credential: credential.into(),
        }
    }

    /// Creates a client using the endpoints from `config`.
    pub fn from_config(config: &CodegenConfig, credential: impl Into<String>) -> Self {
        Self::new(credential)
            .with_schema_url(config.schema_url.clone())
            .with_generator_url(config.generator_url.clone())
    }

    pub fn with_schema_url(mut self, url: impl Into<String>) -> Self {
        self.schema_url = url.into();
        self
    }

    pub fn with_generator_url(mut self, url: impl Into<String>) -> Self {
        self.generator_url = url.into();
        self
    }

    /// Fetches the newest content type ordered by `order_by`.
    async fn latest_content_type(&self, order_by: OrderBy) -> Result<ContentTypeRow, RemoteError> {
        tracing::debug!(order_by = order_by.as_str(), "Querying content types");

        let response = self
            .http
            .get(&self.schema_url)
            .query(&[
                ("order_by", order_by.as_str()),
                ("limit", "1"),
                ("order_direction", "desc"),
            ])
            .header(AUTH_HEADER, &self.credential)
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                url: self.schema_url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteError::Request {
                url: self.schema_url.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = server_message(&body).unwrap_or_else(|| {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                if text.is_empty() {
                    status.canonical_reason().unwrap_or(UNKNOWN_ERROR).to_string()
                } else {
                    text
                }
            });
            return Err(RemoteError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let list: ListResponse = serde_json::from_slice(&body).map_err(|e| {
            match server_message(&body) {
                Some(message) => RemoteError::Service {
                    status: status.as_u16(),
                    message,
                },
                None => RemoteError::UnexpectedBody {
                    url: self.schema_url.clone(),
                    reason: e.to_string(),
                },
            }
        })?;

        list.into_first().ok_or(RemoteError::EmptyResult {
            order_by: order_by.as_str(),
        })
    }
}

impl SchemaSource for RemoteClient {
    async fn fetch_fingerprint(&self) -> Result<Fingerprint, RemoteError> {
        let by_updated = self.latest_content_type(OrderBy::UpdatedAt).await?;
        let by_created = self.latest_content_type(OrderBy::CreatedAt).await?;

        let missing = |field: &str| RemoteError::UnexpectedBody {
            url: self.schema_url.clone(),
            reason: format!("content type has no `{field}` field"),
        };

        Ok(Fingerprint {
            created_at: by_created.created_at.ok_or_else(|| missing("createdAt"))?,
            updated_at: by_updated.updated_at.ok_or_else(|| missing("updatedAt"))?,
        })
    }

    async fn fetch_bundle(&self) -> Result<Vec<u8>, RemoteError> {
        tracing::debug!(url = %self.generator_url, "Requesting generated SDK");

        let response = self
            .http
            .get(&self.generator_url)
            .query(&[("token", &self.credential)])
            .send()
            .await
            .map_err(|source| RemoteError::Request {
                url: self.generator_url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteError::Request {
                url: self.generator_url.clone(),
                source,
            })?;

        // A JSON object is an error payload no matter what the status says;
        // an archive never parses as one.
        if let Some(payload) = error_payload(&body) {
            let message = payload
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(UNKNOWN_ERROR)
                .to_string();
            return Err(RemoteError::Service {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            return Err(RemoteError::Service {
                status: status.as_u16(),
                message: UNKNOWN_ERROR.to_string(),
            });
        }

        if body.is_empty() {
            return Err(RemoteError::UnexpectedBody {
                url: self.generator_url.clone(),
                reason: "empty archive".to_string(),
            });
        }

        tracing::debug!(bytes = body.len(), "Received SDK archive");
        Ok(body.to_vec())
    }
}

fn error_payload(body: &[u8]) -> Option<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_slice(body).ok()
}

fn server_message(body: &[u8]) -> Option<String> {
    error_payload(body)?
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
