//! Thin JSON client for the node's HTTP API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7070";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    code: String,
}

pub struct NodeClient {
    endpoint: String,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self.http.get(self.url(path)).send().await.map_err(|e| {
            anyhow::anyhow!("could not reach node at {}: {}", self.endpoint, e)
        })?;
        Self::decode(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("could not reach node at {}: {}", self.endpoint, e))?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        match resp.json::<ErrorResponse>().await {
            Ok(err) if !err.code.is_empty() => {
                anyhow::bail!("request failed (HTTP {}, {}): {}", status, err.code, err.error)
            }
            Ok(err) => anyhow::bail!("request failed (HTTP {}): {}", status, err.error),
            Err(_) => anyhow::bail!("request failed (HTTP {})", status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = NodeClient::new("http://localhost:7070/");
        assert_eq!(client.url("/api/v1/status"), "http://localhost:7070/api/v1/status");
    }
}
