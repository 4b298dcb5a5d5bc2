use crate::domain::model::parse_service_record;
use crate::domain::ports::{FlushResponse, Geocoder, IndexResponse, SearchIndex};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::io::Read;

/// Where enriched records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    pub index_name: String,
    pub document_type: String,
}

/// The per-record step at which an iteration was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Read,
    Parse,
    Geocode,
    Index,
}

/// 執行結果統計，只用於日誌與測試，不影響流程
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub attempted: usize,
    pub indexed: usize,
    pub read_failures: usize,
    pub parse_failures: usize,
    pub geocode_failures: usize,
    pub index_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            attempted: 0,
            indexed: 0,
            read_failures: 0,
            parse_failures: 0,
            geocode_failures: 0,
            index_failures: 0,
            started_at: now,
            finished_at: now,
        }
    }

    fn record_failure(&mut self, step: Step) {
        match step {
            Step::Read => self.read_failures += 1,
            Step::Parse => self.parse_failures += 1,
            Step::Geocode => self.geocode_failures += 1,
            Step::Index => self.index_failures += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.read_failures + self.parse_failures + self.geocode_failures + self.index_failures
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Reads, parses, geocodes and indexes rows one at a time.
///
/// Per-record failures are logged and skipped. Only problems with the search
/// service itself (existence check, index creation, the trailing flush) are
/// returned as errors.
pub struct EnrichmentPipeline<G: Geocoder, S: SearchIndex> {
    geocoder: G,
    search: S,
    target: IndexTarget,
}

impl<G: Geocoder, S: SearchIndex> EnrichmentPipeline<G, S> {
    pub fn new(geocoder: G, search: S, target: IndexTarget) -> Self {
        Self {
            geocoder,
            search,
            target,
        }
    }

    pub fn target(&self) -> &IndexTarget {
        &self.target
    }

    /// Creates the target index when it does not exist yet.
    ///
    /// An unacknowledged create is only logged; the run carries on.
    pub async fn prepare_index(&self) -> Result<()> {
        let index = &self.target.index_name;
        if self.search.index_exists(index).await? {
            tracing::debug!("Index '{}' already exists", index);
            return Ok(());
        }

        tracing::info!("Will create index '{}'", index);
        if !self.search.create_index(index).await? {
            tracing::warn!("The index '{}' has not been acknowledged", index);
        }
        Ok(())
    }

    /// Runs exactly `records` iterations against `reader`, then flushes the index.
    ///
    /// `records` is a budget: iterations past the end of the input fail at the
    /// read step and still count.
    pub async fn run<R: Read>(
        &self,
        reader: &mut csv::Reader<R>,
        records: usize,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::start();

        for i in 0..records {
            summary.attempted += 1;
            match self.process_row(reader, i).await {
                Ok(_) => summary.indexed += 1,
                Err(step) => summary.record_failure(step),
            }
        }

        let flushed = self.flush().await?;
        summary.finished_at = Utc::now();

        tracing::info!(
            "Processed {} rows: {} indexed, {} skipped (read {}, parse {}, geocode {}, index {}) in {}ms",
            summary.attempted,
            summary.indexed,
            summary.failures(),
            summary.read_failures,
            summary.parse_failures,
            summary.geocode_failures,
            summary.index_failures,
            summary.elapsed().num_milliseconds()
        );
        tracing::debug!(
            "Flush shards: total {}, successful {}, failed {}",
            flushed.shards.total,
            flushed.shards.successful,
            flushed.shards.failed
        );

        Ok(summary)
    }

    async fn process_row<R: Read>(
        &self,
        reader: &mut csv::Reader<R>,
        iteration: usize,
    ) -> std::result::Result<IndexResponse, Step> {
        let mut row = StringRecord::new();
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Row {}: end of input reached, nothing to read", iteration);
                return Err(Step::Read);
            }
            Err(e) => {
                tracing::warn!("Row {}: error reading record from the data set: {}", iteration, e);
                return Err(Step::Read);
            }
        }

        let fields: Vec<&str> = row.iter().collect();
        let record = parse_service_record(&fields).map_err(|e| {
            tracing::warn!("Row {}: could not parse record: {}", iteration, e);
            Step::Parse
        })?;

        let address = record.address();
        let location = self.geocoder.geocode(&address).await.map_err(|e| {
            tracing::warn!(
                "Row {}: error retrieving GPS information for '{}': {}",
                iteration,
                address,
                e
            );
            Step::Geocode
        })?;
        let record = record.with_location(location);

        // 文件 id 直接使用迴圈索引
        let id = iteration.to_string();
        let response = self
            .search
            .index_document(&self.target.index_name, &self.target.document_type, &id, &record)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Row {}: could not index provider {} / APC {}: {}",
                    iteration,
                    record.provider_id,
                    record.apc_code,
                    e
                );
                Step::Index
            })?;

        tracing::info!(
            "Indexed document {} into '{}' (version {}, result {})",
            response.id,
            response.index,
            response
                .version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            response.result.as_deref().unwrap_or("-")
        );
        Ok(response)
    }

    async fn flush(&self) -> Result<FlushResponse> {
        self.search
            .flush(&self.target.index_name)
            .await
            .map_err(|e| {
                tracing::error!("Flushing index '{}' failed: {}", self.target.index_name, e);
                e
            })
    }
}

impl<G: Geocoder, S: SearchIndex> std::fmt::Debug for EnrichmentPipeline<G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentPipeline")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Coordinates, ServiceRecord};
    use crate::utils::error::EtlError;
    use crate::utils::error::{ErrorSeverity, GeocodeError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const HEADER: &str = "APC,Provider Id,Provider Name,Provider Street Address,Provider City,Provider State,Provider Zip Code,Provider HRR,Outpatient Services,Average Estimated Submitted Charges,Average Total Payments\n";

    #[derive(Clone, Default)]
    struct MockGeocoder {
        calls: Arc<Mutex<Vec<String>>>,
        failing: Vec<String>,
    }

    impl MockGeocoder {
        fn failing_on(address: &str) -> Self {
            Self {
                failing: vec![address.to_string()],
                ..Self::default()
            }
        }

        async fn calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn geocode(&self, address: &str) -> std::result::Result<Coordinates, GeocodeError> {
            self.calls.lock().await.push(address.to_string());
            if self.failing.iter().any(|a| a == address) {
                return Err(GeocodeError::NoResults);
            }
            Ok(Coordinates {
                latitude: 39.8,
                longitude: -89.6,
            })
        }
    }

    #[derive(Clone, Default)]
    struct MockSearch {
        exists: bool,
        acknowledge: bool,
        fail_flush: bool,
        fail_ids: Vec<String>,
        created: Arc<Mutex<Vec<String>>>,
        documents: Arc<Mutex<HashMap<String, ServiceRecord>>>,
        flushed: Arc<Mutex<usize>>,
    }

    impl MockSearch {
        fn new() -> Self {
            Self {
                exists: true,
                acknowledge: true,
                ..Self::default()
            }
        }

        async fn document(&self, id: &str) -> Option<ServiceRecord> {
            self.documents.lock().await.get(id).cloned()
        }
    }

    #[async_trait]
    impl SearchIndex for MockSearch {
        async fn index_exists(&self, _index: &str) -> Result<bool> {
            Ok(self.exists)
        }

        async fn create_index(&self, index: &str) -> Result<bool> {
            self.created.lock().await.push(index.to_string());
            Ok(self.acknowledge)
        }

        async fn index_document(
            &self,
            index: &str,
            doc_type: &str,
            id: &str,
            record: &ServiceRecord,
        ) -> Result<IndexResponse> {
            if self.fail_ids.iter().any(|f| f == id) {
                return Err(EtlError::SearchError {
                    operation: "index document".to_string(),
                    status: 400,
                    body: "mapper_parsing_exception".to_string(),
                });
            }
            self.documents
                .lock()
                .await
                .insert(id.to_string(), record.clone());
            Ok(IndexResponse {
                index: index.to_string(),
                doc_type: Some(doc_type.to_string()),
                id: id.to_string(),
                version: Some(1),
                result: Some("created".to_string()),
            })
        }

        async fn flush(&self, _index: &str) -> Result<FlushResponse> {
            *self.flushed.lock().await += 1;
            if self.fail_flush {
                return Err(EtlError::SearchError {
                    operation: "flush".to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(FlushResponse::default())
        }
    }

    fn target() -> IndexTarget {
        IndexTarget {
            index_name: "healthadvisor".to_string(),
            document_type: "service".to_string(),
        }
    }

    fn reader(rows: &str) -> csv::Reader<std::io::Cursor<Vec<u8>>> {
        let data = format!("{}{}", HEADER, rows);
        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(std::io::Cursor::new(data.into_bytes()))
    }

    #[tokio::test]
    async fn test_run_indexes_every_row() {
        let geocoder = MockGeocoder::default();
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "APC1,P1,Gen Hosp,1 Main St,Springfield,IL,62701,HRR1,100,250.50,180.25\n\
             APC2,P2,City Hosp,2 Oak Ave,Peoria,IL,61602,HRR2,12,99.0,45.5\n",
        );
        let summary = pipeline.run(&mut rows, 2).await.unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.failures(), 0);
        assert_eq!(
            geocoder.calls().await,
            vec![
                "1 Main St, Springfield, IL, 62701".to_string(),
                "2 Oak Ave, Peoria, IL, 61602".to_string()
            ]
        );

        let first = search.document("0").await.unwrap();
        assert_eq!(first.provider_id, "P1");
        assert_eq!(first.service_count, 100);
        assert_eq!(
            first.location(),
            Some(Coordinates {
                latitude: 39.8,
                longitude: -89.6
            })
        );
        assert_eq!(search.document("1").await.unwrap().provider_id, "P2");
        assert_eq!(*search.flushed.lock().await, 1);
    }

    #[tokio::test]
    async fn test_parse_failure_skips_geocode_and_index() {
        let geocoder = MockGeocoder::default();
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "APC1,P1,Gen Hosp,1 Main St,Springfield,IL,62701,HRR1,abc,250.50,180.25\n\
             APC2,P2,City Hosp,2 Oak Ave,Peoria,IL,61602,HRR2,12,99.0,45.5\n",
        );
        let summary = pipeline.run(&mut rows, 2).await.unwrap();

        assert_eq!(summary.parse_failures, 1);
        assert_eq!(summary.indexed, 1);
        assert_eq!(geocoder.calls().await, vec!["2 Oak Ave, Peoria, IL, 61602".to_string()]);
        assert!(search.document("0").await.is_none());
        // 第二列仍使用自己的迴圈索引作為 id
        assert!(search.document("1").await.is_some());
    }

    #[tokio::test]
    async fn test_records_beyond_input_fail_at_read() {
        let geocoder = MockGeocoder::default();
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "A,P1,H,1 A St,X,IL,1,R,1,1.0,1.0\n\
             A,P2,H,2 A St,X,IL,2,R,2,2.0,2.0\n\
             A,P3,H,3 A St,X,IL,3,R,3,3.0,3.0\n",
        );
        let summary = pipeline.run(&mut rows, 5).await.unwrap();

        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.indexed, 3);
        assert_eq!(summary.read_failures, 2);
        assert_eq!(geocoder.calls().await.len(), 3);
        assert_eq!(search.documents.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_geocode_failure_drops_record() {
        let geocoder = MockGeocoder::failing_on("1 Main St, Springfield, IL, 62701");
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "APC1,P1,Gen Hosp,1 Main St,Springfield,IL,62701,HRR1,100,250.50,180.25\n\
             APC2,P2,City Hosp,2 Oak Ave,Peoria,IL,61602,HRR2,12,99.0,45.5\n",
        );
        let summary = pipeline.run(&mut rows, 2).await.unwrap();

        assert_eq!(summary.geocode_failures, 1);
        assert_eq!(summary.indexed, 1);
        assert!(search.document("0").await.is_none());
    }

    #[tokio::test]
    async fn test_index_failure_does_not_stop_run() {
        let geocoder = MockGeocoder::default();
        let search = MockSearch {
            fail_ids: vec!["0".to_string()],
            ..MockSearch::new()
        };
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "APC1,P1,Gen Hosp,1 Main St,Springfield,IL,62701,HRR1,100,250.50,180.25\n\
             APC2,P2,City Hosp,2 Oak Ave,Peoria,IL,61602,HRR2,12,99.0,45.5\n",
        );
        let summary = pipeline.run(&mut rows, 2).await.unwrap();

        assert_eq!(summary.index_failures, 1);
        assert_eq!(summary.indexed, 1);
        assert_eq!(geocoder.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_ragged_row_fails_at_read() {
        let geocoder = MockGeocoder::default();
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(geocoder.clone(), search.clone(), target());

        let mut rows = reader(
            "APC1,P1,Gen Hosp\n\
             APC2,P2,City Hosp,2 Oak Ave,Peoria,IL,61602,HRR2,12,99.0,45.5\n",
        );
        let summary = pipeline.run(&mut rows, 2).await.unwrap();

        assert_eq!(summary.read_failures, 1);
        assert_eq!(summary.indexed, 1);
        assert!(search.document("1").await.is_some());
    }

    #[tokio::test]
    async fn test_flush_failure_is_fatal() {
        let search = MockSearch {
            fail_flush: true,
            ..MockSearch::new()
        };
        let pipeline = EnrichmentPipeline::new(MockGeocoder::default(), search.clone(), target());

        let mut rows = reader("APC1,P1,Gen Hosp,1 Main St,Springfield,IL,62701,HRR1,100,250.50,180.25\n");
        let result = pipeline.run(&mut rows, 1).await;

        assert!(matches!(result, Err(EtlError::SearchError { ref operation, .. }) if operation == "flush"));
        assert_eq!(result.unwrap_err().severity(), ErrorSeverity::Critical);
        // 文件仍在 flush 之前寫入
        assert!(search.document("0").await.is_some());
    }

    #[tokio::test]
    async fn test_prepare_index_creates_missing_index() {
        let search = MockSearch {
            exists: false,
            ..MockSearch::new()
        };
        let pipeline = EnrichmentPipeline::new(MockGeocoder::default(), search.clone(), target());

        pipeline.prepare_index().await.unwrap();
        assert_eq!(*search.created.lock().await, vec!["healthadvisor".to_string()]);
    }

    #[tokio::test]
    async fn test_unacknowledged_create_is_not_fatal() {
        let search = MockSearch {
            exists: false,
            acknowledge: false,
            ..MockSearch::new()
        };
        let pipeline = EnrichmentPipeline::new(MockGeocoder::default(), search.clone(), target());

        assert!(pipeline.prepare_index().await.is_ok());
        assert_eq!(search.created.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_index_is_left_alone() {
        let search = MockSearch::new();
        let pipeline = EnrichmentPipeline::new(MockGeocoder::default(), search.clone(), target());

        pipeline.prepare_index().await.unwrap();
        assert!(search.created.lock().await.is_empty());
    }
}
