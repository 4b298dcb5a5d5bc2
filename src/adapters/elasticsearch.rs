use crate::config::settings::SearchSettings;
use crate::domain::model::ServiceRecord;
use crate::domain::ports::{ClusterInfo, FlushResponse, IndexResponse, SearchIndex};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CreateIndexResponse {
    #[serde(default)]
    acknowledged: bool,
}

/// Minimal Elasticsearch REST client covering the calls the pipeline makes.
pub struct ElasticsearchClient {
    base_url: String,
    client: Client,
}

impl ElasticsearchClient {
    /// Builds the client and pings the root endpoint. Failing to reach the
    /// service here is fatal for the run.
    pub async fn connect(hostname: &str, port: &str, settings: &SearchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        let search = Self {
            base_url: base_url(hostname, port, &settings.scheme),
            client,
        };

        let info = search.ping().await?;
        tracing::info!(
            "Connected to search cluster '{}' at {} (version {})",
            info.cluster_name,
            search.base_url,
            info.version.number
        );

        Ok(search)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ping(&self) -> Result<ClusterInfo> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        parse_json(response, "ping").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// `localhost` + `9200` -> `http://localhost:9200`; a hostname that already
/// carries a scheme is kept as given.
pub fn base_url(hostname: &str, port: &str, scheme: &str) -> String {
    let hostname = hostname.trim().trim_end_matches('/');
    if hostname.contains("://") {
        format!("{}:{}", hostname, port.trim())
    } else {
        format!("{}://{}:{}", scheme, hostname, port.trim())
    }
}

async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(EtlError::SearchError {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let response = check_status(response, operation).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.client.head(self.url(index)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check_status(response, "index exists check").await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str) -> Result<bool> {
        let response = self.client.put(self.url(index)).send().await?;
        let created: CreateIndexResponse = parse_json(response, "create index").await?;
        Ok(created.acknowledged)
    }

    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        record: &ServiceRecord,
    ) -> Result<IndexResponse> {
        let response = self
            .client
            .put(self.url(&format!("{}/{}/{}", index, doc_type, id)))
            .json(record)
            .send()
            .await?;
        parse_json(response, "index document").await
    }

    async fn flush(&self, index: &str) -> Result<FlushResponse> {
        let response = self
            .client
            .post(self.url(&format!("{}/_flush", index)))
            .send()
            .await?;
        parse_json(response, "flush").await
    }
}
