//! Scoring engine for La Bonne Boite: turns predicted hirings into 0–100
//! scores, adjusts them to an occupation (ROME) through the historical
//! hirings of the office's industry (NAF), and maps them to star ratings.
//!
//! Breakpoints come from configuration; the values compiled in are fake
//! development values.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod labels;
pub mod rome_naf_mapping;
pub mod rome_scoring;
pub mod scoring;
pub mod stars;
pub mod validation;

pub use cache::CacheStats;
pub use config::{Breakpoints, CacheSettings, ConfigError, DataSettings, ScoringSettings};
pub use engine::{ScoreKind, ScoringEngine};
pub use error::LaBonneBoiteError;
pub use index::{
    rank_for_rome, IndexBuilder, IndexStatsSnapshot, OfficeDocument, OfficeRecord, OfficeUpdate,
    RankedOffice, ScoresByRome,
};
pub use labels::{CodeCatalogs, LabelCatalog, LabelError};
pub use rome_naf_mapping::{
    CoverageReport, MappingError, NafForRome, RomeForNaf, RomeNafMapping, SharedRomeNafMapping,
};
pub use rome_scoring::{fallback_reason, FallbackReason, RomeScorer};
pub use scoring::{round_half_up, Bucketing, Score, ScoreConverter, ScoringError};
pub use stars::StarsMapper;
pub use validation::ValidationError;
