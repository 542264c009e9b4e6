//! Normalization and format checks for ROME, NAF and SIRET codes.
//!
//! The data loaders store codes trimmed and upper-cased; callers receiving
//! codes from the outside (CLI arguments, office files) go through these
//! helpers before querying the mapping.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid ROME code: {0:?} (expected one letter followed by 4 digits)")]
    InvalidRomeCode(String),
    #[error("invalid NAF code: {0:?} (expected 4 digits followed by one letter)")]
    InvalidNafCode(String),
    #[error("invalid SIRET: {0:?} (expected 14 digits)")]
    InvalidSiret(String),
}

fn rome_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]\d{4}$").expect("static ROME pattern"))
}

fn naf_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}[A-Z]$").expect("static NAF pattern"))
}

fn siret_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{14}$").expect("static SIRET pattern"))
}

/// Trims surrounding whitespace and upper-cases a code.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Normalizes and validates a ROME code such as `D1505`.
pub fn validate_rome_code(raw: &str) -> Result<String, ValidationError> {
    let code = normalize_code(raw);
    if rome_re().is_match(&code) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidRomeCode(raw.to_string()))
    }
}

/// Normalizes and validates a NAF code such as `4711D`.
pub fn validate_naf_code(raw: &str) -> Result<String, ValidationError> {
    let code = normalize_code(raw);
    if naf_re().is_match(&code) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidNafCode(raw.to_string()))
    }
}

/// Validates a SIRET. Inner spaces are tolerated (`785 480 351 01646`).
pub fn validate_siret(raw: &str) -> Result<String, ValidationError> {
    let siret: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if siret_re().is_match(&siret) {
        Ok(siret)
    } else {
        Err(ValidationError::InvalidSiret(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  d1505 "), "D1505");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn test_validate_rome_code() {
        assert_eq!(validate_rome_code("d1505").unwrap(), "D1505");
        assert_eq!(validate_rome_code(" N4101 ").unwrap(), "N4101");
        assert!(matches!(
            validate_rome_code("D150"),
            Err(ValidationError::InvalidRomeCode(_))
        ));
        assert!(validate_rome_code("4711D").is_err());
    }

    #[test]
    fn test_validate_naf_code() {
        assert_eq!(validate_naf_code("4711d").unwrap(), "4711D");
        assert!(matches!(
            validate_naf_code("D1505"),
            Err(ValidationError::InvalidNafCode(_))
        ));
        assert!(validate_naf_code("47111").is_err());
    }

    #[test]
    fn test_validate_siret() {
        assert_eq!(validate_siret("78548035101646").unwrap(), "78548035101646");
        assert_eq!(validate_siret("785 480 351 01646").unwrap(), "78548035101646");
        assert!(validate_siret("7854803510164").is_err());
        assert!(validate_siret("7854803510164A").is_err());
    }
}
