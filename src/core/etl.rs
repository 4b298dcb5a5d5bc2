use crate::core::pipeline::{EnrichmentPipeline, RunSummary};
use crate::domain::ports::{ConfigProvider, Geocoder, SearchIndex};
use crate::utils::error::{EtlError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Opens the CSV input. The header row is consumed later, never parsed as data.
pub fn open_input(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(io) => EtlError::IoError(io),
            other => EtlError::ConfigError {
                message: format!("Cannot open '{}': {:?}", path.display(), other),
            },
        })
}

pub struct EtlEngine<G: Geocoder, S: SearchIndex> {
    pipeline: EnrichmentPipeline<G, S>,
}

impl<G: Geocoder, S: SearchIndex> EtlEngine<G, S> {
    pub fn new(pipeline: EnrichmentPipeline<G, S>) -> Self {
        Self { pipeline }
    }

    pub async fn run<C: ConfigProvider>(&self, config: &C) -> Result<RunSummary> {
        tracing::info!(
            "Reading outpatient services from {}",
            config.input_path().display()
        );
        let reader = open_input(config.input_path()).map_err(|e| {
            tracing::error!(
                "Error trying to read file '{}'",
                config.input_path().display()
            );
            e
        })?;
        self.process(reader, config.records()).await
    }

    /// 略過標題列、確認索引存在，再跑完整個 pipeline
    async fn process<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
        records: usize,
    ) -> Result<RunSummary> {
        match reader.headers() {
            Ok(header) => tracing::debug!("Discarded header row with {} columns", header.len()),
            Err(e) => tracing::warn!("Could not read the header row: {}", e),
        }

        self.pipeline.prepare_index().await?;

        let target = self.pipeline.target();
        tracing::info!(
            "Processing up to {} records into index '{}' (type '{}')",
            records,
            target.index_name,
            target.document_type
        );

        self.pipeline.run(&mut reader, records).await
    }
}
