use crate::domain::model::{Coordinates, ServiceRecord};
use crate::utils::error::{GeocodeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolves a free-form postal address to a coordinate pair.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> std::result::Result<Coordinates, GeocodeError>;
}

/// Index management and document writes against the search service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Returns whether the service acknowledged the new index.
    async fn create_index(&self, index: &str) -> Result<bool>;

    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        record: &ServiceRecord,
    ) -> Result<IndexResponse>;

    async fn flush(&self, index: &str) -> Result<FlushResponse>;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &Path;
    fn records(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: Option<u64>,
    /// `created` / `updated` on newer clusters; absent on very old ones.
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlushResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub number: String,
}

/// Body of the search service's root endpoint, used as a connectivity check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: ClusterVersion,
}
