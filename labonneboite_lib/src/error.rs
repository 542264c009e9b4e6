//! Error types for the scoring engine.

use std::fmt;

use crate::config::ConfigError;
use crate::labels::LabelError;
use crate::rome_naf_mapping::MappingError;
use crate::scoring::ScoringError;
use crate::validation::ValidationError;

/// Errors produced by the engine, wrapping the error of each component.
#[derive(Debug)]
pub enum LaBonneBoiteError {
    /// Settings could not be loaded or are inconsistent.
    Config(ConfigError),
    /// A label catalog could not be loaded.
    Label(LabelError),
    /// The rome/naf mapping could not be loaded or holds corrupted data.
    Mapping(MappingError),
    /// A score or a number of hirings outside of its domain.
    Scoring(ScoringError),
    /// A malformed ROME, NAF or SIRET code.
    Validation(ValidationError),
}

impl fmt::Display for LaBonneBoiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Label(e) => write!(f, "Label error: {}", e),
            Self::Mapping(e) => write!(f, "Mapping error: {}", e),
            Self::Scoring(e) => write!(f, "Scoring error: {}", e),
            Self::Validation(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl std::error::Error for LaBonneBoiteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Label(e) => Some(e),
            Self::Mapping(e) => Some(e),
            Self::Scoring(e) => Some(e),
            Self::Validation(e) => Some(e),
        }
    }
}

impl From<ConfigError> for LaBonneBoiteError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<LabelError> for LaBonneBoiteError {
    fn from(e: LabelError) -> Self {
        Self::Label(e)
    }
}

impl From<MappingError> for LaBonneBoiteError {
    fn from(e: MappingError) -> Self {
        Self::Mapping(e)
    }
}

impl From<ScoringError> for LaBonneBoiteError {
    fn from(e: ScoringError) -> Self {
        Self::Scoring(e)
    }
}

impl From<ValidationError> for LaBonneBoiteError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}
