//! The ingestion pipeline.
//!
//! STAGE ORDER (fixed):
//!   1. Delimiter & header detection   (fails fast on file-level errors)
//!   2. Chunked parsing + normalization (progress after every batch)
//!   3. AM/PM repair                    (once per record)
//!   4. Fraud / integrity screening     (wallet map, then per-record flags)
//!
//! File-level failures abort the whole ingestion. Row and record issues
//! only ever become counters or flags.

use crate::{
    clock::IngestClock,
    config::IngestConfig,
    dataset::DatasetVersion,
    error::IngestResult,
    event::IngestEvent,
    fraud::screen_dataset,
    header::detect,
    normalize::{repair_am_pm, NormalizeContext},
    parser::RecordParser,
};

pub struct Ingestor {
    pub config: IngestConfig,
    pub clock: IngestClock,
}

impl Ingestor {
    pub fn new(config: IngestConfig, clock: IngestClock) -> Self {
        Self { config, clock }
    }

    pub fn ingest(&self, file_name: &str, text: &str) -> IngestResult<DatasetVersion> {
        self.ingest_with(file_name, text, |_| {})
    }

    /// Run the full pipeline, reporting each event to `sink` as it happens.
    pub fn ingest_with(
        &self,
        file_name: &str,
        text: &str,
        mut sink: impl FnMut(&IngestEvent),
    ) -> IngestResult<DatasetVersion> {
        let layout = detect(text)?;
        let now = self.clock.now();
        let version_id = uuid::Uuid::new_v4().to_string();

        sink(&IngestEvent::IngestionStarted {
            file_name: file_name.to_string(),
            delimiter: layout.delimiter,
            headers: layout.headers.clone(),
            data_rows: layout.data_row_count(),
        });

        let ctx = NormalizeContext { now, stamp: now.timestamp_millis() };
        let parser = RecordParser::new(layout, ctx, self.config.parser.batch_size);
        let outcome = parser.run(|progress| {
            sink(&IngestEvent::BatchProcessed { progress: *progress });
        });

        let repaired = outcome.records.into_iter().map(repair_am_pm).collect();
        let (records, screening) = screen_dataset(repaired, &self.config.fraud);

        sink(&IngestEvent::RecordsScreened {
            records: records.len(),
            suspicious: screening.suspicious,
            data_errors: screening.data_errors,
            shared_wallets: screening.shared_wallets,
        });

        let version = DatasetVersion {
            id: version_id,
            file_name: file_name.to_string(),
            upload_date: now,
            record_count: records.len(),
            data: records,
        };

        log::info!(
            "Ingested '{file_name}' as version {}: {} record(s), {} row(s) skipped in {} batch(es)",
            version.id,
            version.record_count,
            outcome.rows_skipped,
            outcome.batches
        );
        sink(&IngestEvent::IngestionCompleted {
            version_id: version.id.clone(),
            record_count: version.record_count,
            rows_skipped: outcome.rows_skipped,
        });

        Ok(version)
    }
}
