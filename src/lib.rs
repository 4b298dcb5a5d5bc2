pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{ElasticsearchClient, GoogleGeocoder};
pub use config::Settings;
pub use crate::core::{
    etl::EtlEngine,
    pipeline::{EnrichmentPipeline, IndexTarget, RunSummary},
};
pub use utils::error::{EtlError, Result};
