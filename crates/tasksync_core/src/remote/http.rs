//! HTTP document service backend.
//!
//! # Responsibility
//! - Read connection credentials from a JSON file named by the locator.
//! - Map document operations onto a REST layout:
//!   `{endpoint}/users/{owner}/tasks/{id}`.
//!
//! # Invariants
//! - `PUT` replaces a document, `PATCH` merges into it. A merge that
//!   finds no document falls back to `PUT`.
//! - Deleting or listing something the service does not know (404) succeeds.
//! - The API token is never written to logs or `Debug` output.

use super::{Document, DocumentBackend, RemoteConnector, RemoteError, RemoteResult, WriteMode};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Contents of a credentials file.
#[derive(Clone, Deserialize)]
pub struct RemoteCredentials {
    /// Base URL, e.g. `https://tasks.example.com/v1`.
    pub endpoint: String,
    pub api_token: String,
    /// Per-request timeout. Absent means no client-side timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Debug for RemoteCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RemoteCredentials {
    /// Reads and validates a credentials file.
    pub fn from_file(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            RemoteError::Credentials(format!("cannot read `{}`: {err}", path.display()))
        })?;
        let credentials: Self = serde_json::from_str(&raw).map_err(|err| {
            RemoteError::Credentials(format!("cannot parse `{}`: {err}", path.display()))
        })?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> RemoteResult<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RemoteError::Credentials(format!(
                "endpoint must be an http(s) URL, got `{endpoint}`"
            )));
        }
        if self.api_token.trim().is_empty() {
            return Err(RemoteError::Credentials("api_token is empty".to_string()));
        }
        Ok(())
    }
}

/// Backend talking to the HTTP document service.
pub struct HttpBackend {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl Debug for HttpBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpBackend {
    pub fn new(credentials: RemoteCredentials) -> RemoteResult<Self> {
        credentials.validate()?;

        let mut builder = Client::builder();
        if let Some(secs) = credentials.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| RemoteError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: credentials.endpoint.trim().trim_end_matches('/').to_string(),
            api_token: credentials.api_token,
        })
    }

    fn collection_url(&self, owner_id: &str) -> String {
        format!(
            "{}/users/{}/tasks",
            self.endpoint,
            urlencoding::encode(owner_id)
        )
    }

    fn document_url(&self, owner_id: &str, doc_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(owner_id),
            urlencoding::encode(doc_id)
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_token)
    }
}

async fn send(request: RequestBuilder) -> RemoteResult<Response> {
    request
        .send()
        .await
        .map_err(|err| RemoteError::Transport(err.to_string()))
}

async fn status_error(response: Response) -> RemoteError {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RemoteError::Status {
        code,
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    fn backend_id(&self) -> &str {
        "http"
    }

    async fn put_document(
        &self,
        owner_id: &str,
        doc_id: &str,
        document: Document,
        mode: WriteMode,
    ) -> RemoteResult<()> {
        let url = self.document_url(owner_id, doc_id);
        let method = match mode {
            WriteMode::Replace => Method::PUT,
            WriteMode::Merge => Method::PATCH,
        };
        let response = send(self.request(method, url.clone()).json(&document)).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if mode == WriteMode::Merge && status == StatusCode::NOT_FOUND {
            // Merging into a missing document creates it.
            let retry = send(self.request(Method::PUT, url).json(&document)).await?;
            if retry.status().is_success() {
                return Ok(());
            }
            return Err(status_error(retry).await);
        }
        Err(status_error(response).await)
    }

    async fn delete_document(&self, owner_id: &str, doc_id: &str) -> RemoteResult<()> {
        let response = send(self.request(Method::DELETE, self.document_url(owner_id, doc_id))).await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn list_documents(&self, owner_id: &str) -> RemoteResult<Vec<Document>> {
        let response = send(self.request(Method::GET, self.collection_url(owner_id))).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        response
            .json::<Vec<Document>>()
            .await
            .map_err(|err| RemoteError::Codec(err.to_string()))
    }
}

/// Connector treating the credentials locator as a credentials file path.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl RemoteConnector for HttpConnector {
    fn connect(&self, credentials: &str) -> RemoteResult<Arc<dyn DocumentBackend>> {
        let credentials = RemoteCredentials::from_file(credentials.trim())?;
        Ok(Arc::new(HttpBackend::new(credentials)?))
    }
}
