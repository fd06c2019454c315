//! Chunked record parser.
//!
//! Data lines are processed in fixed-size batches. The parser is an
//! iterator: each `next()` handles exactly one batch and returns, so the
//! caller regains control between batches and can report progress,
//! render, or stop early by dropping the parser. No state survives
//! across files.

use crate::{
    header::CsvLayout,
    normalize::{normalize_row, NormalizeContext},
    record::{DeveloperRecord, RawRow},
    splitter::split_line,
};
use serde::{Deserialize, Serialize};

/// Rows with fewer split fields than this are treated as corrupt.
const MIN_FIELDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub batch_index: usize,
    /// Data rows consumed so far, skipped rows included.
    pub rows_processed: usize,
    pub total_rows: usize,
    pub rows_skipped: usize,
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub records: Vec<DeveloperRecord>,
    pub progress: BatchProgress,
}

/// Everything a full parse produced, in input order.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub records: Vec<DeveloperRecord>,
    pub rows_skipped: usize,
    pub batches: usize,
}

pub struct RecordParser<'a> {
    layout: CsvLayout<'a>,
    ctx: NormalizeContext,
    batch_size: usize,
    next_line: usize,
    batch_index: usize,
    skipped: usize,
}

impl<'a> RecordParser<'a> {
    pub fn new(layout: CsvLayout<'a>, ctx: NormalizeContext, batch_size: usize) -> Self {
        Self {
            layout,
            ctx,
            batch_size: batch_size.max(1),
            next_line: 1,
            batch_index: 0,
            skipped: 0,
        }
    }

    /// Drive the parser to completion, calling `on_progress` after every
    /// batch.
    pub fn run(mut self, mut on_progress: impl FnMut(&BatchProgress)) -> ParseOutcome {
        let mut records = Vec::with_capacity(self.layout.data_row_count());
        let mut batches = 0;
        for batch in self.by_ref() {
            on_progress(&batch.progress);
            records.extend(batch.records);
            batches += 1;
        }
        ParseOutcome { records, rows_skipped: self.skipped, batches }
    }

    fn split(&self, line_index: usize) -> Option<RawRow> {
        let cells = split_line(self.layout.lines[line_index], self.layout.delimiter);
        if cells.len() < MIN_FIELDS {
            return None;
        }
        Some(RawRow { line_index, cells })
    }
}

impl Iterator for RecordParser<'_> {
    type Item = RecordBatch;

    fn next(&mut self) -> Option<RecordBatch> {
        let line_count = self.layout.lines.len();
        if self.next_line >= line_count {
            return None;
        }
        let end = (self.next_line + self.batch_size).min(line_count);

        let mut records = Vec::with_capacity(end - self.next_line);
        for i in self.next_line..end {
            match self.split(i) {
                Some(row) => records.push(normalize_row(&row, &self.layout.columns, &self.ctx)),
                None => self.skipped += 1,
            }
        }

        let total_rows = self.layout.data_row_count();
        let rows_processed = end - 1;
        let percent = ((rows_processed as f64 / total_rows as f64) * 100.0).round() as u8;
        let progress = BatchProgress {
            batch_index: self.batch_index,
            rows_processed,
            total_rows,
            rows_skipped: self.skipped,
            percent,
        };
        log::debug!(
            "Batch {} parsed: {rows_processed}/{total_rows} rows ({percent}%)",
            self.batch_index
        );

        self.next_line = end;
        self.batch_index += 1;
        Some(RecordBatch { records, progress })
    }
}
