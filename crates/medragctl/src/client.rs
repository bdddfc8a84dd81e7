//! HTTP client for the MedRAG service.

use crate::errors::ClientError;
use medrag_shared::{ErrorBody, HealthResponse, QueryRequest, QueryResponse};
use serde::de::DeserializeOwned;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";

/// Client for communicating with medragd
pub struct MedragClient {
    client: reqwest::Client,
    base_url: String,
}

impl MedragClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        decode(resp).await
    }

    /// POST /query
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        self.post("query", request).await
    }

    /// POST /ablate
    pub async fn ablate(&self, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        self.post("ablate", request).await
    }

    async fn post(&self, path: &str, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        decode(resp).await
    }

    fn unreachable(&self, err: reqwest::Error) -> ClientError {
        ClientError::Unreachable {
            url: self.base_url.clone(),
            reason: err.to_string(),
        }
    }
}

/// Parse a success body as `T`, or an error body into `ClientError::Service`
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

    if !status.is_success() {
        let body: ErrorBody = serde_json::from_str(&text)
            .unwrap_or_else(|_| ErrorBody::new(text.trim(), "unknown"));
        return Err(ClientError::Service {
            status: status.as_u16(),
            kind: body.kind,
            detail: body.detail,
        });
    }

    serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
