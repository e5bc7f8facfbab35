//! I/O module
//!
//! Handles CSV ingestion and output.
//!
//! # Components
//!
//! - `source` - Named raw byte sources
//! - `csv_format` - CSV format handling (row conversion, checks, output serialization)
//! - `record_parser` - Synchronous parser, a pure function of the input bytes
//! - `async_parser` - Batched parser that yields and reports progress

pub mod async_parser;
pub mod csv_format;
pub mod record_parser;
pub mod source;

pub use async_parser::AsyncRecordParser;
pub use csv_format::{
    convert_csv_record, write_category_csv, write_report_csv, write_summary_csv, CsvRecord,
    ParseOutcome,
};
pub use record_parser::RecordParser;
pub use source::SourceFile;
