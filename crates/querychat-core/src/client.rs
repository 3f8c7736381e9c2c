use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::QueryError;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5001/query";

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// The one outbound call a turn makes. The body comes back undecoded by
/// shape; validation happens in [`crate::response`].
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, text: &str) -> Result<Value, QueryError>;
}

#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl QueryClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

#[async_trait]
impl QueryBackend for QueryClient {
    async fn query(&self, text: &str) -> Result<Value, QueryError> {
        debug!(endpoint = %self.endpoint, "sending query");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&QueryRequest { query: text });

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| QueryError::Decode(e.to_string()))
    }
}
