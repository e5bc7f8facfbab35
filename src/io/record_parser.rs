//! Synchronous record parser
//!
//! Turns one raw delimited-text source into validated transactions plus
//! row-level validation errors. Parsing is a pure function of the input
//! bytes and never fails as a whole: every failure is reported as a
//! [`ValidationError`](crate::types::ValidationError) in the outcome.
//!
//! # Pipeline
//!
//! ```text
//! SourceFile → precheck (size, format, UTF-8, quoting)
//!            → header check (reference, amount, status)
//!            → per-row validation (RowCollector)
//!            → ParseOutcome { records, errors }
//! ```
//!
//! A structural failure stops parsing and yields exactly one error and no
//! records. Row failures are collected and parsing continues.

use crate::config::ReconcilerConfig;
use crate::io::csv_format::{check_headers, check_quoting, CsvRecord, ParseOutcome, RowCollector};
use crate::io::source::SourceFile;
use crate::types::{ReconError, Source};
use csv::{ReaderBuilder, StringRecord, Trim};

/// Run the file-level checks that precede any parsing
///
/// Checks, in order: byte size against `max_file_size`, the declared
/// format, UTF-8 decoding and quote balance. A leading byte order mark is
/// stripped from the returned text.
pub fn precheck(source: &SourceFile, max_file_size: u64) -> Result<&str, ReconError> {
    if source.len() > max_file_size {
        return Err(ReconError::FileTooLarge {
            size: source.len(),
            limit: max_file_size,
        });
    }

    if !source.declares_csv() {
        return Err(ReconError::UnsupportedFormat {
            name: source.name.clone(),
        });
    }

    let text = std::str::from_utf8(&source.bytes).map_err(|e| {
        let valid = &source.bytes[..e.valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() as u64 + 1;
        ReconError::Unreadable {
            line: Some(line),
            message: "file is not valid UTF-8 text".to_string(),
        }
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    check_quoting(text)?;

    Ok(text)
}

/// Synchronous CSV record parser
///
/// # Examples
///
/// ```
/// use rust_payments_reconciler::config::ReconcilerConfig;
/// use rust_payments_reconciler::io::{RecordParser, SourceFile};
/// use rust_payments_reconciler::types::Source;
///
/// let parser = RecordParser::new(&ReconcilerConfig::default());
/// let source = SourceFile::new("internal.csv", "reference,amount,status\nT1,10.00,completed\n");
/// let outcome = parser.parse(&source, Source::Internal);
/// assert_eq!(outcome.records.len(), 1);
/// assert!(outcome.errors.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RecordParser {
    max_file_size: u64,
    reject_duplicates: bool,
}

impl RecordParser {
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            reject_duplicates: config.reject_duplicate_references,
        }
    }

    /// Parse one source into records and validation errors
    ///
    /// # Arguments
    ///
    /// * `source` - The raw source to parse
    /// * `side` - Label attached to every error produced
    ///
    /// # Returns
    ///
    /// A `ParseOutcome`. Structural failures produce a single error and no
    /// records; row failures drop the row and add one error each.
    pub fn parse(&self, source: &SourceFile, side: Source) -> ParseOutcome {
        let text = match precheck(source, self.max_file_size) {
            Ok(text) => text,
            Err(e) => return ParseOutcome::rejected(side, &e),
        };

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => return ParseOutcome::rejected(side, &ReconError::from(e)),
        };
        if let Err(e) = check_headers(headers.iter()) {
            return ParseOutcome::rejected(side, &e);
        }

        let mut rows = RowCollector::new(side, self.reject_duplicates);
        let mut record = StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => rows.accept(
                    record
                        .deserialize::<CsvRecord>(Some(&headers))
                        .map_err(|e| format!("CSV parse error: {}", e)),
                ),
                Ok(false) => break,
                Err(e) => return ParseOutcome::rejected(side, &ReconError::from(e)),
            }
        }

        rows.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionStatus;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn parse(content: &str) -> ParseOutcome {
        let parser = RecordParser::new(&ReconcilerConfig::default());
        parser.parse(&SourceFile::new("internal.csv", content), Source::Internal)
    }

    #[test]
    fn test_parses_valid_rows() {
        let outcome = parse(
            "reference,amount,status\n\
             T1,100.00,completed\n\
             T2,50.5,pending\n\
             T3,-3,failed\n",
        );

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[0].reference, "T1");
        assert_eq!(outcome.records[0].amount, Decimal::new(10000, 2));
        assert_eq!(outcome.records[1].status, TransactionStatus::Pending);
        assert_eq!(outcome.records[2].amount, Decimal::new(-3, 0));
    }

    #[test]
    fn test_trims_fields_and_headers() {
        let outcome = parse(" reference , amount ,status\n  T1 ,  10.00 , completed \n");

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records[0].reference, "T1");
        assert_eq!(outcome.records[0].status, TransactionStatus::Completed);
    }

    #[test]
    fn test_optional_columns_are_carried_through() {
        let outcome = parse(
            "transaction_reference,amount,status,timestamp,customer_id,fee_amount\n\
             T1,10,completed,2024-03-01T09:00:00Z,CUST-1,0.25\n\
             T2,20,completed,,,\n\
             T3,30,completed,,,free\n",
        );

        assert!(outcome.errors.is_empty());
        let records = &outcome.records;
        assert_eq!(records[0].timestamp.as_deref(), Some("2024-03-01T09:00:00Z"));
        assert_eq!(records[0].customer_id.as_deref(), Some("CUST-1"));
        assert_eq!(records[0].fee_amount, Some(Decimal::new(25, 2)));
        assert_eq!(records[1].timestamp, None);
        assert_eq!(records[1].fee_amount, None);
        assert_eq!(records[2].fee_amount, None);
    }

    #[test]
    fn test_row_errors_do_not_abort_the_batch() {
        let outcome = parse(
            "reference,amount,status\n\
             T1,100.00,completed\n\
             ,5,completed\n\
             T3,abc,completed\n\
             T4,5,Completed\n\
             T5,5,failed\n",
        );

        let refs: Vec<_> = outcome.records.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, vec!["T1", "T5"]);

        let rows: Vec<_> = outcome.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![Some(3), Some(4), Some(5)]);
        assert_eq!(outcome.errors[0].message, "reference is required");
        assert_eq!(outcome.errors[1].message, "amount must be a valid number");
        assert_eq!(
            outcome.errors[2].message,
            "status must be one of: completed, pending, failed"
        );
        assert!(outcome.errors.iter().all(|e| e.source == Source::Internal));
    }

    #[test]
    fn test_short_rows_are_row_errors() {
        let outcome = parse("reference,amount,status\nT1,10\nT2,20,pending\n");

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, Some(2));
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let outcome = parse("reference,amount,status\n\nT1,10,completed\n\nT2,x,completed\n");

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors[0].row, Some(3));
    }

    #[test]
    fn test_quoted_fields() {
        let outcome = parse("reference,amount,status\n\"T,1\",\"1,5\",completed\n\"T2\",\"7\",pending\n");

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].reference, "T2");
        assert_eq!(outcome.errors[0].row, Some(2));
    }

    #[test]
    fn test_duplicate_references_are_flagged() {
        let outcome = parse("reference,amount,status\nT1,1,completed\nT2,1,completed\nT1,2,completed\n");

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, Some(4));
        assert_eq!(
            outcome.errors[0].message,
            "duplicate reference 'T1' (first seen at row 2)"
        );
    }

    #[test]
    fn test_duplicate_references_allowed_when_configured() {
        let config = ReconcilerConfig::default().with_reject_duplicate_references(false);
        let parser = RecordParser::new(&config);
        let outcome = parser.parse(
            &SourceFile::new("p.csv", "reference,amount,status\nT1,1,completed\nT1,2,completed\n"),
            Source::Provider,
        );

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_internal_duplicates_rejected_even_when_allowed() {
        let config = ReconcilerConfig::default().with_reject_duplicate_references(false);
        let parser = RecordParser::new(&config);
        let outcome = parser.parse(
            &SourceFile::new("i.csv", "reference,amount,status\nT1,1,completed\nT1,1,completed\n"),
            Source::Internal,
        );

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, Some(3));
        assert_eq!(
            outcome.errors[0].message,
            "duplicate reference 'T1' (first seen at row 2)"
        );
    }

    #[rstest]
    #[case::missing_status("reference,amount\nT1,1\n", "Missing required columns: status")]
    #[case::missing_all("id,value\n1,2\n", "Missing required columns: reference, amount, status")]
    #[case::empty_file("", "Missing required columns: reference, amount, status")]
    #[case::unterminated_quote(
        "reference,amount,status\nT1,1,completed\n\"T2,2,completed\n",
        "CSV parsing error: unterminated quoted field starting at line 3"
    )]
    fn test_structural_errors(#[case] content: &str, #[case] message: &str) {
        let outcome = parse(content);

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].message, message);
        assert!(outcome.errors[0].is_structural());
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let parser = RecordParser::new(&ReconcilerConfig::default());
        let mut bytes = b"reference,amount,status\nT1,1,completed\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b',', b'1', b'\n']);

        let outcome = parser.parse(&SourceFile::new("internal.csv", bytes), Source::Internal);

        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.errors[0].message,
            "CSV parsing error at line 3: file is not valid UTF-8 text"
        );
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let outcome = parse("\u{feff}reference,amount,status\nT1,1,completed\n");

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_rejects_oversized_source_before_parsing() {
        let config = ReconcilerConfig::default().with_max_file_size(16);
        let parser = RecordParser::new(&config);
        let source = SourceFile::new("internal.csv", "reference,amount,status\nT1,1,completed\n");

        let outcome = parser.parse(&source, Source::Internal);

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0].message,
            "File size of 39 bytes exceeds the 16 byte limit"
        );
    }

    #[test]
    fn test_rejects_non_csv_source() {
        let parser = RecordParser::new(&ReconcilerConfig::default());
        let source = SourceFile::new("internal.json", "reference,amount,status\n");

        let outcome = parser.parse(&source, Source::Provider);

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source, Source::Provider);
        assert_eq!(outcome.errors[0].message, "File 'internal.json' must be a CSV file");
    }
}
