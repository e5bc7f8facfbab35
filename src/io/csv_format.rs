//! CSV format handling for transaction sources and reconciliation output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Header and quoting checks
//! - Conversion from CSV records to validated transactions
//! - Row bookkeeping shared by the sync and async parsers
//! - Flat CSV export of summaries and categories
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{
    Category, MismatchedPair, ReconError, ReconciliationResult, Source, Transaction,
    TransactionStatus, ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::str::FromStr;

/// Columns every source must declare, in schema order
pub const REQUIRED_COLUMNS: [&str; 3] = ["reference", "amount", "status"];

/// Legacy header accepted in place of `reference`
pub const REFERENCE_ALIAS: &str = "transaction_reference";

/// CSV record structure for deserialization
///
/// Every field is optional so that a row with missing or empty values still
/// deserializes and can be reported with all of its problems at once.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CsvRecord {
    #[serde(alias = "transaction_reference")]
    pub reference: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<String>,
    pub customer_id: Option<String>,
    pub fee_amount: Option<String>,
}

/// Check the header row for the mandatory columns
///
/// # Returns
///
/// * `Ok(())` if `reference` (or its alias), `amount` and `status` are present
/// * `Err(ReconError::MissingColumns)` naming every missing column
pub fn check_headers<'a, I>(headers: I) -> Result<(), ReconError>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = headers.into_iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| {
            !(present.contains(column) || (*column == "reference" && present.contains(&REFERENCE_ALIAS)))
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::missing_columns(&missing))
    }
}

/// Detect a quoted field that is never closed
///
/// A quote only opens a field when it is the first byte of that field; a
/// doubled quote inside a quoted field is an escaped quote.
pub fn check_quoting(text: &str) -> Result<(), ReconError> {
    let mut bytes = text.bytes().peekable();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut line = 1u64;
    let mut opened_at = 1u64;

    while let Some(byte) = bytes.next() {
        if in_quotes {
            match byte {
                b'"' if bytes.peek() == Some(&b'"') => {
                    bytes.next();
                }
                b'"' => in_quotes = false,
                b'\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' if at_field_start => {
                in_quotes = true;
                opened_at = line;
                at_field_start = false;
            }
            b',' | b'\r' => at_field_start = true,
            b'\n' => {
                line += 1;
                at_field_start = true;
            }
            _ => at_field_start = false,
        }
    }

    if in_quotes {
        Err(ReconError::UnterminatedQuote { line: opened_at })
    } else {
        Ok(())
    }
}

/// Parse locale-independent decimal text
///
/// Accepts plain (`-12.50`) and scientific (`1.25e2`) notation. Anything else,
/// including `NaN` and infinities, is rejected.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    // from_str skips digit separators
    if text.contains('_') {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Convert a CsvRecord to a Transaction
///
/// This function:
/// - Requires a non-blank reference
/// - Parses the amount as a finite decimal
/// - Parses the status with an exact, case-sensitive match
/// - Carries optional fields through; an unparsable fee is dropped silently
///
/// # Returns
///
/// Result containing either:
/// - Ok(Transaction) - Successfully converted record
/// - Err(String) - Every failed check, joined with ", "
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Transaction, String> {
    let mut problems = Vec::new();

    let reference = non_empty(csv_record.reference);
    if reference.is_none() {
        problems.push("reference is required".to_string());
    }

    let amount = csv_record.amount.as_deref().and_then(parse_amount);
    if amount.is_none() {
        problems.push("amount must be a valid number".to_string());
    }

    let status = csv_record
        .status
        .as_deref()
        .and_then(|s| TransactionStatus::from_str(s).ok());
    if status.is_none() {
        let allowed: Vec<&str> = TransactionStatus::ALL.iter().map(|s| s.as_str()).collect();
        problems.push(format!("status must be one of: {}", allowed.join(", ")));
    }

    match (reference, amount, status) {
        (Some(reference), Some(amount), Some(status)) => Ok(Transaction {
            reference,
            amount,
            status,
            timestamp: non_empty(csv_record.timestamp),
            customer_id: non_empty(csv_record.customer_id),
            fee_amount: csv_record.fee_amount.as_deref().and_then(parse_amount),
        }),
        _ => Err(problems.join(", ")),
    }
}

/// Output of parsing one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<Transaction>,
    pub errors: Vec<ValidationError>,
}

impl ParseOutcome {
    /// Outcome for a source rejected before row parsing
    pub fn rejected(source: Source, error: &ReconError) -> Self {
        ParseOutcome {
            records: Vec::new(),
            errors: vec![error.for_source(source)],
        }
    }
}

/// Per-row bookkeeping shared by the parsers
///
/// Rows are numbered from 2 (the header is row 1). A failing row contributes
/// one ValidationError and is left out of the record list.
#[derive(Debug)]
pub struct RowCollector {
    source: Source,
    reject_duplicates: bool,
    next_row: u64,
    seen: HashMap<String, u64>,
    outcome: ParseOutcome,
}

impl RowCollector {
    /// Internal references are always checked for repeats; `reject_duplicates`
    /// only relaxes the provider side.
    pub fn new(source: Source, reject_duplicates: bool) -> Self {
        Self {
            source,
            reject_duplicates: reject_duplicates || source == Source::Internal,
            next_row: 2,
            seen: HashMap::new(),
            outcome: ParseOutcome::default(),
        }
    }

    /// Number of data rows seen so far
    pub fn rows_seen(&self) -> u64 {
        self.next_row - 2
    }

    /// Validate one deserialized row, or record why it could not be read
    pub fn accept(&mut self, row: Result<CsvRecord, String>) {
        let row_number = self.next_row;
        self.next_row += 1;

        let transaction = row.and_then(convert_csv_record);
        match transaction {
            Ok(tx) => {
                if self.reject_duplicates {
                    if let Some(first) = self.seen.get(&tx.reference) {
                        let message =
                            format!("duplicate reference '{}' (first seen at row {})", tx.reference, first);
                        self.outcome
                            .errors
                            .push(ValidationError::row(self.source, row_number, message));
                        return;
                    }
                    self.seen.insert(tx.reference.clone(), row_number);
                }
                self.outcome.records.push(tx);
            }
            Err(message) => self
                .outcome
                .errors
                .push(ValidationError::row(self.source, row_number, message)),
        }
    }

    pub fn finish(self) -> ParseOutcome {
        self.outcome
    }
}

fn csv_writer(output: &mut dyn Write) -> csv::Writer<&mut dyn Write> {
    csv::Writer::from_writer(output)
}

fn write_failed(error: csv::Error) -> ReconError {
    ReconError::Io {
        message: format!("Failed to write CSV output: {}", error),
    }
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_decimal(value: &Option<Decimal>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn transaction_row(tx: &Transaction) -> [String; 6] {
    [
        tx.reference.clone(),
        tx.amount.to_string(),
        tx.status.to_string(),
        opt_text(&tx.timestamp),
        opt_text(&tx.customer_id),
        opt_decimal(&tx.fee_amount),
    ]
}

fn mismatched_row(pair: &MismatchedPair) -> [String; 9] {
    [
        pair.internal.reference.clone(),
        pair.internal.amount.to_string(),
        pair.provider.amount.to_string(),
        pair.internal.status.to_string(),
        pair.provider.status.to_string(),
        pair.differences.amount.to_string(),
        pair.differences.status.to_string(),
        opt_text(&pair.internal.timestamp),
        opt_text(&pair.provider.timestamp),
    ]
}

/// Write the summary counts as a one-row CSV
pub fn write_summary_csv(
    result: &ReconciliationResult,
    output: &mut dyn Write,
) -> Result<(), ReconError> {
    let mut writer = csv_writer(output);
    let summary = &result.summary;

    writer.write_record([
        "total_internal",
        "total_provider",
        "matched",
        "internal_only",
        "provider_only",
        "mismatched",
        "shadowed_provider",
    ]).map_err(write_failed)?;
    writer.write_record(&[
        summary.total_internal.to_string(),
        summary.total_provider.to_string(),
        summary.matched.to_string(),
        summary.internal_only.to_string(),
        summary.provider_only.to_string(),
        summary.mismatched.to_string(),
        summary.shadowed_provider.to_string(),
    ]).map_err(write_failed)?;
    writer.flush()?;

    Ok(())
}

/// Write one category as a flat record-per-row CSV
///
/// Transaction categories use `reference, amount, status, timestamp,
/// customer_id, fee_amount`; the mismatched category puts both sides of each
/// pair on one row.
pub fn write_category_csv(
    result: &ReconciliationResult,
    category: Category,
    output: &mut dyn Write,
) -> Result<(), ReconError> {
    let mut writer = csv_writer(output);
    let categories = &result.categories;

    let transactions = match category {
        Category::Matched => &categories.matched,
        Category::InternalOnly => &categories.internal_only,
        Category::ProviderOnly => &categories.provider_only,
        Category::Mismatched => {
            writer.write_record([
                "reference",
                "internal_amount",
                "provider_amount",
                "internal_status",
                "provider_status",
                "amount_mismatch",
                "status_mismatch",
                "internal_timestamp",
                "provider_timestamp",
            ]).map_err(write_failed)?;
            for pair in &categories.mismatched {
                writer.write_record(&mismatched_row(pair)).map_err(write_failed)?;
            }
            writer.flush()?;
            return Ok(());
        }
    };

    writer.write_record([
        "reference",
        "amount",
        "status",
        "timestamp",
        "customer_id",
        "fee_amount",
    ]).map_err(write_failed)?;
    for tx in transactions {
        writer.write_record(&transaction_row(tx)).map_err(write_failed)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write every category into one CSV, one row per classified record
///
/// Columns: `category, reference, internal_amount, provider_amount,
/// internal_status, provider_status, amount_mismatch, status_mismatch`.
/// Matched rows carry the internal representative only; the mismatch flags
/// are only filled for mismatched rows.
pub fn write_report_csv(
    result: &ReconciliationResult,
    output: &mut dyn Write,
) -> Result<(), ReconError> {
    let mut writer = csv_writer(output);
    let categories = &result.categories;

    writer.write_record([
        "category",
        "reference",
        "internal_amount",
        "provider_amount",
        "internal_status",
        "provider_status",
        "amount_mismatch",
        "status_mismatch",
    ]).map_err(write_failed)?;

    let one_sided = |category: Category, tx: &Transaction, internal: bool| {
        let (amount, status) = (tx.amount.to_string(), tx.status.to_string());
        let (ia, pa, is, ps) = if internal {
            (amount, String::new(), status, String::new())
        } else {
            (String::new(), amount, String::new(), status)
        };
        [
            category.to_string(),
            tx.reference.clone(),
            ia,
            pa,
            is,
            ps,
            String::new(),
            String::new(),
        ]
    };

    for tx in &categories.matched {
        writer.write_record(&one_sided(Category::Matched, tx, true)).map_err(write_failed)?;
    }
    for pair in &categories.mismatched {
        writer.write_record(&[
            Category::Mismatched.to_string(),
            pair.internal.reference.clone(),
            pair.internal.amount.to_string(),
            pair.provider.amount.to_string(),
            pair.internal.status.to_string(),
            pair.provider.status.to_string(),
            pair.differences.amount.to_string(),
            pair.differences.status.to_string(),
        ]).map_err(write_failed)?;
    }
    for tx in &categories.internal_only {
        writer.write_record(&one_sided(Category::InternalOnly, tx, true)).map_err(write_failed)?;
    }
    for tx in &categories.provider_only {
        writer.write_record(&one_sided(Category::ProviderOnly, tx, false)).map_err(write_failed)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Differences, ReconciliationSummary};
    use rstest::rstest;

    fn record(reference: &str, amount: &str, status: &str) -> CsvRecord {
        CsvRecord {
            reference: Some(reference.to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
            ..CsvRecord::default()
        }
    }

    #[rstest]
    #[case::canonical(&["reference", "amount", "status"], None)]
    #[case::alias(&["transaction_reference", "amount", "status", "timestamp"], None)]
    #[case::extra_columns(&["customer_id", "status", "amount", "reference", "notes"], None)]
    #[case::missing_one(&["reference", "amount"], Some(vec!["status"]))]
    #[case::missing_two(&["reference"], Some(vec!["amount", "status"]))]
    #[case::empty(&[], Some(vec!["reference", "amount", "status"]))]
    #[case::case_sensitive(&["Reference", "amount", "status"], Some(vec!["reference"]))]
    fn test_check_headers(#[case] headers: &[&str], #[case] missing: Option<Vec<&str>>) {
        let result = check_headers(headers.iter().copied());
        match missing {
            None => assert_eq!(result, Ok(())),
            Some(columns) => assert_eq!(result, Err(ReconError::missing_columns(&columns))),
        }
    }

    #[rstest]
    #[case::plain("reference,amount\nT1,10\n", None)]
    #[case::quoted("reference,amount\n\"T,1\",10\n", None)]
    #[case::escaped_quote("reference,amount\n\"T\"\"1\",10\n", None)]
    #[case::multiline_quoted("a,b\n\"x\ny\",1\n", None)]
    #[case::literal_quote_mid_field("a,b\n5\"3,1\n", None)]
    #[case::unterminated("a,b\nT1,10\n\"T2,20\nT3,30\n", Some(3))]
    #[case::unterminated_in_header("\"a,b\n", Some(1))]
    fn test_check_quoting(#[case] text: &str, #[case] unterminated_at: Option<u64>) {
        let result = check_quoting(text);
        match unterminated_at {
            None => assert!(result.is_ok()),
            Some(line) => assert_eq!(result, Err(ReconError::UnterminatedQuote { line })),
        }
    }

    #[rstest]
    #[case::integer("100", Some(Decimal::new(100, 0)))]
    #[case::two_places("50.02", Some(Decimal::new(5002, 2)))]
    #[case::negative("-12.5", Some(Decimal::new(-125, 1)))]
    #[case::scientific("1.25e2", Some(Decimal::new(125, 0)))]
    #[case::nan("NaN", None)]
    #[case::infinity("inf", None)]
    #[case::trailing_garbage("100abc", None)]
    #[case::empty("", None)]
    #[case::underscore("1_000", None)]
    #[case::underscore_scientific("1_0e2", None)]
    fn test_parse_amount(#[case] text: &str, #[case] expected: Option<Decimal>) {
        assert_eq!(parse_amount(text), expected);
    }

    #[test]
    fn test_convert_valid_record_with_optional_fields() {
        let csv_record = CsvRecord {
            timestamp: Some("2024-01-15T10:30:00Z".to_string()),
            customer_id: Some("C-9".to_string()),
            fee_amount: Some("1.50".to_string()),
            ..record("T1", "100.00", "completed")
        };

        let tx = convert_csv_record(csv_record).unwrap();
        assert_eq!(tx.reference, "T1");
        assert_eq!(tx.amount, Decimal::new(10000, 2));
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.timestamp.as_deref(), Some("2024-01-15T10:30:00Z"));
        assert_eq!(tx.customer_id.as_deref(), Some("C-9"));
        assert_eq!(tx.fee_amount, Some(Decimal::new(150, 2)));
    }

    #[test]
    fn test_convert_drops_unparsable_fee() {
        let csv_record = CsvRecord {
            fee_amount: Some("n/a".to_string()),
            ..record("T1", "1", "pending")
        };

        let tx = convert_csv_record(csv_record).unwrap();
        assert_eq!(tx.fee_amount, None);
    }

    #[rstest]
    #[case::blank_reference(record("  ", "1", "completed"), "reference is required")]
    #[case::bad_amount(record("T1", "ten", "completed"), "amount must be a valid number")]
    #[case::bad_status(
        record("T1", "1", "Completed"),
        "status must be one of: completed, pending, failed"
    )]
    #[case::everything_wrong(
        CsvRecord::default(),
        "reference is required, amount must be a valid number, status must be one of: completed, pending, failed"
    )]
    fn test_convert_invalid_record(#[case] csv_record: CsvRecord, #[case] expected: &str) {
        assert_eq!(convert_csv_record(csv_record), Err(expected.to_string()));
    }

    #[test]
    fn test_row_collector_numbers_rows_from_two() {
        let mut collector = RowCollector::new(Source::Provider, true);
        collector.accept(Ok(record("T1", "1", "completed")));
        collector.accept(Ok(record("T2", "x", "completed")));
        collector.accept(Err("CSV parse error: bad row".to_string()));

        assert_eq!(collector.rows_seen(), 3);
        let outcome = collector.finish();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].row, Some(3));
        assert_eq!(outcome.errors[0].source, Source::Provider);
        assert_eq!(outcome.errors[1].row, Some(4));
    }

    #[rstest]
    #[case::internal_rejected(Source::Internal, true, 1, 1)]
    #[case::internal_always_rejected(Source::Internal, false, 1, 1)]
    #[case::provider_rejected(Source::Provider, true, 1, 1)]
    #[case::provider_allowed(Source::Provider, false, 2, 0)]
    fn test_row_collector_duplicate_policy(
        #[case] source: Source,
        #[case] reject: bool,
        #[case] records: usize,
        #[case] errors: usize,
    ) {
        let mut collector = RowCollector::new(source, reject);
        collector.accept(Ok(record("T1", "1", "completed")));
        collector.accept(Ok(record("T1", "2", "completed")));

        let outcome = collector.finish();
        assert_eq!(outcome.records.len(), records);
        assert_eq!(outcome.errors.len(), errors);
        if errors > 0 {
            assert_eq!(
                outcome.errors[0].message,
                "duplicate reference 'T1' (first seen at row 2)"
            );
            assert_eq!(outcome.errors[0].row, Some(3));
        }
    }

    fn sample_result() -> ReconciliationResult {
        let tx = |r: &str, a: i64, s| Transaction::new(r, Decimal::new(a, 2), s);
        let mut result = ReconciliationResult::default();
        result.categories.matched = vec![tx("T1", 10000, TransactionStatus::Completed)];
        result.categories.mismatched = vec![MismatchedPair {
            internal: tx("T2", 5000, TransactionStatus::Completed),
            provider: tx("T2", 5002, TransactionStatus::Completed),
            differences: Differences {
                amount: true,
                status: false,
            },
        }];
        result.categories.internal_only = vec![tx("T3", 100, TransactionStatus::Pending)];
        result.categories.provider_only = vec![tx("T4", 200, TransactionStatus::Failed)];
        result.summary = ReconciliationSummary {
            total_internal: 3,
            total_provider: 3,
            matched: 1,
            internal_only: 1,
            provider_only: 1,
            mismatched: 1,
            shadowed_provider: 0,
        };
        result
    }

    #[test]
    fn test_write_summary_csv() {
        let mut output = Vec::new();
        write_summary_csv(&sample_result(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "total_internal,total_provider,matched,internal_only,provider_only,mismatched,shadowed_provider\n3,3,1,1,1,1,0\n"
        );
    }

    #[test]
    fn test_write_report_csv() {
        let mut output = Vec::new();
        write_report_csv(&sample_result(), &mut output).unwrap();

        let expected = "category,reference,internal_amount,provider_amount,internal_status,provider_status,amount_mismatch,status_mismatch\n\
                        matched,T1,100.00,,completed,,,\n\
                        mismatched,T2,50.00,50.02,completed,completed,true,false\n\
                        internal_only,T3,1.00,,pending,,,\n\
                        provider_only,T4,,2.00,,failed,,\n";
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[rstest]
    #[case::matched(Category::Matched, "reference,amount,status,timestamp,customer_id,fee_amount\nT1,100.00,completed,,,\n")]
    #[case::provider_only(Category::ProviderOnly, "reference,amount,status,timestamp,customer_id,fee_amount\nT4,2.00,failed,,,\n")]
    #[case::mismatched(
        Category::Mismatched,
        "reference,internal_amount,provider_amount,internal_status,provider_status,amount_mismatch,status_mismatch,internal_timestamp,provider_timestamp\n\
         T2,50.00,50.02,completed,completed,true,false,,\n"
    )]
    fn test_write_category_csv(#[case] category: Category, #[case] expected: &str) {
        let mut output = Vec::new();
        write_category_csv(&sample_result(), category, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }
}
