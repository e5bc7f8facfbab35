//! Raw byte sources handed to the parsers

use crate::types::ReconError;
use std::path::Path;

/// A named, fully-buffered source file
///
/// The name is what the source declares itself as; only names ending in
/// `.csv` (any case) are accepted by the parsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a source from disk
    ///
    /// # Errors
    ///
    /// * `ReconError::FileNotFound` if nothing exists at `path`
    /// * `ReconError::Io` for any other read failure
    pub fn from_path(path: &Path) -> Result<Self, ReconError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReconError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ReconError::from(e),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { name, bytes })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the source declares itself as CSV
    pub fn declares_csv(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::Builder;

    #[rstest]
    #[case::lowercase("internal.csv", true)]
    #[case::uppercase("PROVIDER.CSV", true)]
    #[case::spreadsheet("internal.xlsx", false)]
    #[case::no_extension("internal", false)]
    #[case::csv_in_middle("internal.csv.bak", false)]
    fn test_declares_csv(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(SourceFile::new(name, Vec::new()).declares_csv(), expected);
    }

    #[test]
    fn test_from_path_reads_name_and_bytes() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"reference,amount,status\n").unwrap();
        file.flush().unwrap();

        let source = SourceFile::from_path(file.path()).unwrap();
        assert!(source.declares_csv());
        assert_eq!(source.len(), 24);
        assert_eq!(source.bytes, b"reference,amount,status\n");
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = SourceFile::from_path(Path::new("does/not/exist.csv"));
        assert_eq!(
            result,
            Err(ReconError::FileNotFound {
                path: "does/not/exist.csv".to_string()
            })
        );
    }
}
