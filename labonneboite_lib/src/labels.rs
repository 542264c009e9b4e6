//! ROME and NAF code/label catalogs.
//!
//! Both catalogs are headerless delimited files with the code in the first
//! column and its label in the second. The NAF catalog uses `|` because some
//! labels contain `;`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::normalize_code;

pub const ROME_LABELS_DELIMITER: u8 = b';';
pub const NAF_LABELS_DELIMITER: u8 = b'|';

/// Error types for label catalog loading.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("failed to read label file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed label data: {0}")]
    Csv(#[from] csv::Error),
    #[error("label row {line} has {found} column(s), expected at least 2")]
    MissingColumns { line: u64, found: usize },
    #[error("duplicate code in label file: {0}")]
    DuplicateCode(String),
}

/// Code to label lookup table.
#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    labels: HashMap<String, String>,
}

impl LabelCatalog {
    /// Parses catalog content. Rows must all have the same number of columns.
    pub fn parse(content: &str, delimiter: u8) -> Result<Self, LabelError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut labels = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let (Some(code), Some(label)) = (record.get(0), record.get(1)) else {
                return Err(LabelError::MissingColumns {
                    line,
                    found: record.len(),
                });
            };

            let code = normalize_code(code);
            if labels.contains_key(&code) {
                return Err(LabelError::DuplicateCode(code));
            }
            labels.insert(code, label.to_string());
        }

        Ok(Self { labels })
    }

    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self, LabelError> {
        let content = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, delimiter)
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.labels.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The two catalogs every mapping row is validated against.
#[derive(Debug, Clone, Default)]
pub struct CodeCatalogs {
    pub rome: LabelCatalog,
    pub naf: LabelCatalog,
}

impl CodeCatalogs {
    /// Catalogs shipped in `seed_data/`, embedded at compile time.
    pub fn embedded() -> Result<Self, LabelError> {
        let rome = include_str!("../../seed_data/rome_labels.csv");
        let naf = include_str!("../../seed_data/naf_labels.csv");
        Ok(Self {
            rome: LabelCatalog::parse(rome, ROME_LABELS_DELIMITER)?,
            naf: LabelCatalog::parse(naf, NAF_LABELS_DELIMITER)?,
        })
    }

    /// True if the ROME code has a label.
    pub fn rome_is_valid(&self, rome: &str) -> bool {
        self.rome.contains(rome)
    }

    /// True if the NAF code has a label.
    pub fn naf_is_valid(&self, naf: &str) -> bool {
        self.naf.contains(naf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rome_labels() {
        let content = "D1505;Personnel de caisse\nd1507 ; Mise en rayon libre-service\n";
        let catalog = LabelCatalog::parse(content, ROME_LABELS_DELIMITER).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label("D1505"), Some("Personnel de caisse"));
        assert_eq!(catalog.label("D1507"), Some("Mise en rayon libre-service"));
        assert!(catalog.label("d1507").is_none());
    }

    #[test]
    fn test_parse_naf_labels_with_semicolon() {
        let content = "4711D|Supermarchés; hypermarchés exclus\n";
        let catalog = LabelCatalog::parse(content, NAF_LABELS_DELIMITER).unwrap();
        assert_eq!(
            catalog.label("4711D"),
            Some("Supermarchés; hypermarchés exclus")
        );
    }

    #[test]
    fn test_parse_rejects_uneven_rows() {
        let content = "D1505;Personnel de caisse\nD1507;Mise en rayon;extra\n";
        let result = LabelCatalog::parse(content, ROME_LABELS_DELIMITER);
        assert!(matches!(result.unwrap_err(), LabelError::Csv(_)));
    }

    #[test]
    fn test_parse_rejects_single_column() {
        let content = "D1505\n";
        let result = LabelCatalog::parse(content, ROME_LABELS_DELIMITER);
        assert!(matches!(
            result.unwrap_err(),
            LabelError::MissingColumns { found: 1, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_code() {
        let content = "D1505;Personnel de caisse\nD1505;Caisse\n";
        let result = LabelCatalog::parse(content, ROME_LABELS_DELIMITER);
        assert!(matches!(result.unwrap_err(), LabelError::DuplicateCode(code) if code == "D1505"));
    }

    #[test]
    fn test_embedded_catalogs_load() {
        let catalogs = CodeCatalogs::embedded().unwrap();
        assert!(catalogs.rome_is_valid("D1505"));
        assert!(catalogs.naf_is_valid("4711D"));
        assert!(!catalogs.rome_is_valid("Z9999"));
        assert!(!catalogs.naf_is_valid("0000A"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = LabelCatalog::from_path(Path::new("/nonexistent/rome.csv"), b';');
        assert!(matches!(result.unwrap_err(), LabelError::Io { .. }));
    }
}
