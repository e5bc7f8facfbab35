//! Asynchronous record parser with cooperative batching
//!
//! Produces the same [`ParseOutcome`] as the synchronous
//! [`RecordParser`](crate::io::RecordParser) for the same input, but reads
//! rows in fixed-size batches, reports progress after each batch and yields
//! back to the tokio scheduler between batches so a long parse never starves
//! other tasks.
//!
//! # Architecture
//!
//! ```text
//! SourceFile → precheck → csv-async reader → batches of rows
//!                                  ↓
//!                       csv_format module (RowCollector)
//! ```

use crate::config::ReconcilerConfig;
use crate::io::csv_format::{check_headers, CsvRecord, ParseOutcome, RowCollector};
use crate::io::record_parser::precheck;
use crate::io::source::SourceFile;
use crate::types::{ReconError, Source};
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::io::Cursor;

/// Batched, yielding CSV record parser
#[derive(Debug, Clone)]
pub struct AsyncRecordParser {
    max_file_size: u64,
    batch_size: usize,
    reject_duplicates: bool,
}

impl AsyncRecordParser {
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            batch_size: config.parse_batch_size.max(1),
            reject_duplicates: config.reject_duplicate_references,
        }
    }

    /// Parse one source, reporting progress as bytes consumed
    ///
    /// # Arguments
    ///
    /// * `source` - The raw source to parse
    /// * `side` - Label attached to every error produced
    /// * `on_progress` - Called with 0..=100 after every batch and once with
    ///   100 when parsing ends; values never decrease
    ///
    /// # Returns
    ///
    /// The same `ParseOutcome` the synchronous parser returns for `source`.
    pub async fn parse<F>(&self, source: &SourceFile, side: Source, mut on_progress: F) -> ParseOutcome
    where
        F: FnMut(f64),
    {
        let text = match precheck(source, self.max_file_size) {
            Ok(text) => text,
            Err(e) => return ParseOutcome::rejected(side, &e),
        };
        let total_bytes = text.len().max(1) as f64;

        let mut reader = AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .flexible(true)
            .create_reader(Cursor::new(text.as_bytes()));

        let headers = match reader.headers().await {
            Ok(headers) => headers.clone(),
            Err(e) => return ParseOutcome::rejected(side, &ReconError::from(e)),
        };
        if let Err(e) = check_headers(headers.iter()) {
            return ParseOutcome::rejected(side, &e);
        }

        let mut rows = RowCollector::new(side, self.reject_duplicates);
        let mut record = StringRecord::new();
        let mut in_batch = 0usize;
        loop {
            match reader.read_record(&mut record).await {
                Ok(true) => {
                    rows.accept(
                        record
                            .deserialize::<CsvRecord>(Some(&headers))
                            .map_err(|e| format!("CSV parse error: {}", e)),
                    );
                    in_batch += 1;
                    if in_batch == self.batch_size {
                        in_batch = 0;
                        let consumed = reader.position().byte() as f64;
                        on_progress((consumed / total_bytes * 100.0).min(100.0));
                        tokio::task::yield_now().await;
                    }
                }
                Ok(false) => break,
                Err(e) => return ParseOutcome::rejected(side, &ReconError::from(e)),
            }
        }

        on_progress(100.0);
        rows.finish()
    }
}
