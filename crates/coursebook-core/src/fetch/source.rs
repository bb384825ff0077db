//! Snapshot sources: where the read-only JSON documents come from.
//!
//! Every source classifies its own failures into `TransportError` kinds,
//! so nothing above this layer needs to know whether the bytes came from
//! disk, HTTP, or memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::TransportError;

/// HTTP request timeout used when none is configured.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// A read-only provider of JSON documents keyed by resource name
/// (`users`, `courses`, `enrollments`, `testimonials`, ...).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load(&self, resource: &str) -> Result<Value, TransportError>;
}

/// Resource names become file names and URL path segments.
fn check_resource_name(resource: &str) -> Result<(), TransportError> {
    let valid = !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TransportError::ClientError {
            status: 400,
            body: format!("invalid resource name '{}'", resource),
        })
    }
}

/// Pull the record list out of a snapshot document.
///
/// Documents are either a bare array or an object holding the array under
/// the resource name, e.g. `{"courses": [...]}`.
pub fn extract_collection(resource: &str, document: Value) -> Result<Vec<Value>, TransportError> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(resource) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(TransportError::Malformed(format!(
                "'{}' field is not an array",
                resource
            ))),
            None => Err(TransportError::Malformed(format!(
                "document has no '{}' array",
                resource
            ))),
        },
        _ => Err(TransportError::Malformed(format!(
            "'{}' document is neither an array nor an object",
            resource
        ))),
    }
}

/// Reads `<dir>/<resource>.json`.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, resource: &str) -> PathBuf {
        self.dir.join(format!("{}.json", resource))
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn load(&self, resource: &str) -> Result<Value, TransportError> {
        check_resource_name(resource)?;
        let path = self.path_for(resource);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransportError::NotFound(resource.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(resource, path = %path.display(), bytes = contents.len(), "Snapshot file read");
        serde_json::from_str(&contents)
            .map_err(|e| TransportError::Malformed(format!("{}: {}", path.display(), e)))
    }
}

/// Fetches `<base_url>/<resource>.json` over HTTP.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, resource: &str) -> String {
        format!("{}/{}.json", self.base_url, resource)
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn load(&self, resource: &str) -> Result<Value, TransportError> {
        check_resource_name(resource)?;
        let url = self.url_for(resource);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status.as_u16(), resource, &body));
        }

        let text = response.text().await?;
        debug!(resource, url = %url, bytes = text.len(), "Snapshot document received");
        serde_json::from_str(&text)
            .map_err(|e| TransportError::Malformed(format!("{}: {}", url, e)))
    }
}

/// Documents held in memory, for embedded fixtures and tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, resource: &str, document: Value) -> Self {
        self.insert(resource, document);
        self
    }

    pub fn insert(&self, resource: &str, document: Value) {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(resource.to_string(), document);
    }
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn load(&self, resource: &str) -> Result<Value, TransportError> {
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(resource)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(resource.to_string()))
    }
}
