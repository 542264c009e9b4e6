//! Conversion between predicted hirings and scores.
//!
//! WARNING about matching scores and hirings: both directions rely on the
//! `SCORE_*_HIRINGS` breakpoints. The values in this repository are fake and
//! only used for development and tests. The real values are confidential and
//! supplied by configuration in staging and production, so that hirings
//! cannot be guessed from a score seen in production.
//!
//! ```text
//!   0 stars-score   ~ 0 hirings
//!  50 (2.5 stars)   ~ SCORE_50_HIRINGS
//!  60 (3.0 stars)   ~ SCORE_60_HIRINGS
//!  80 (4.0 stars)   ~ SCORE_80_HIRINGS
//! 100 (5.0 stars)   ~ SCORE_100_HIRINGS and above
//! ```

use thiserror::Error;

use crate::cache::{BoundedCache, CacheStats};
use crate::config::{Breakpoints, CacheSettings};

/// An integer score between 0 and 100.
pub type Score = u8;

pub const MAX_SCORE: Score = 100;

/// Error types for conversions fed with values outside their domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("unexpected value of hirings: {0}")]
    InvalidHirings(f64),
    #[error("unexpected value of score: {0}")]
    InvalidScore(f64),
}

/// Whether raw hirings are bucketed before the memoized conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bucketing {
    #[default]
    Apply,
    Skip,
}

/// Rounds to the nearest integer; exact halves go up for positive values and
/// down for the others.
///
/// This is not "round half to even" and it is relied upon by stored scores.
pub fn round_half_up(x: f64) -> i64 {
    let floor = x.floor();
    let diff = x - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 || x > 0.0 {
        x.ceil()
    } else {
        floor
    };
    rounded as i64
}

/// Buckets raw hirings to improve the hit ratio of the conversion cache:
/// one decimal up to 3 hirings, integers above.
pub fn bucket_hirings(hirings: f64) -> f64 {
    if hirings <= 3.0 {
        (hirings * 10.0).round() / 10.0
    } else {
        round_half_up(hirings) as f64
    }
}

/// Unrounded score of `hirings` (finite, non-negative), in `[0.0, 100.0]`.
///
/// With `SCORE_80_HIRINGS` below 1 the logarithmic segment overshoots 100
/// just below `SCORE_100_HIRINGS`, hence the upper clamp.
pub(crate) fn score_from_hirings(breakpoints: &Breakpoints, hirings: f64) -> f64 {
    let Breakpoints {
        score_50_hirings: h50,
        score_60_hirings: h60,
        score_80_hirings: h80,
        score_100_hirings: h100,
    } = *breakpoints;

    let score = if hirings <= h50 {
        // offices below 50 are filtered out of the production index
        50.0 * hirings / h50
    } else if hirings >= h100 {
        100.0
    } else if hirings <= h60 {
        50.0 + 10.0 * (hirings - h50) / (h60 - h50)
    } else if hirings <= h80 {
        60.0 + 20.0 * (hirings - h60) / (h80 - h60)
    } else {
        80.0 + 20.0 / h100.log10() * (1.0 + hirings - h80).log10()
    };
    score.clamp(0.0, 100.0)
}

/// Predicted hirings of `score` (in `[0.0, 100.0]`), reversing
/// [`score_from_hirings`] segment by segment.
pub(crate) fn hirings_from_score(breakpoints: &Breakpoints, score: f64) -> f64 {
    let Breakpoints {
        score_50_hirings: h50,
        score_60_hirings: h60,
        score_80_hirings: h80,
        score_100_hirings: h100,
    } = *breakpoints;

    if score <= 50.0 {
        h50 * score / 50.0
    } else if score <= 60.0 {
        h50 + (score - 50.0) / 10.0 * (h60 - h50)
    } else if score <= 80.0 {
        h60 + (score - 60.0) / 20.0 * (h80 - h60)
    } else {
        -1.0 + h80 + 10f64.powf((score - 80.0) / 20.0 * h100.log10())
    }
}

/// Converts predicted hirings to scores and back, memoizing both directions.
pub struct ScoreConverter {
    breakpoints: Breakpoints,
    scores: BoundedCache<u64, f64>,
    hirings: BoundedCache<u64, f64>,
}

impl ScoreConverter {
    /// `breakpoints` are expected to be validated already
    /// (see [`Breakpoints::validate`]).
    pub fn new(breakpoints: Breakpoints, cache: &CacheSettings) -> Self {
        Self {
            breakpoints,
            scores: BoundedCache::new(cache.converter_capacity),
            hirings: BoundedCache::new(cache.score_to_hirings_capacity),
        }
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Bucketed, rounded score for a number of predicted hirings.
    pub fn hirings_to_score(&self, hirings: f64) -> Result<Score, ScoringError> {
        self.hirings_to_score_with(hirings, Bucketing::Apply)
    }

    pub fn hirings_to_score_with(
        &self,
        hirings: f64,
        bucketing: Bucketing,
    ) -> Result<Score, ScoringError> {
        let score = self.hirings_to_score_float(hirings, bucketing)?;
        Ok(round_half_up(score).clamp(0, i64::from(MAX_SCORE)) as Score)
    }

    /// Unrounded score, in `[0.0, 100.0]`.
    pub fn hirings_to_score_float(
        &self,
        hirings: f64,
        bucketing: Bucketing,
    ) -> Result<f64, ScoringError> {
        if !hirings.is_finite() || hirings < 0.0 {
            return Err(ScoringError::InvalidHirings(hirings));
        }
        let hirings = match bucketing {
            Bucketing::Apply => bucket_hirings(hirings),
            Bucketing::Skip => hirings,
        };
        // -0.0 and 0.0 share a cache slot
        let hirings = hirings + 0.0;
        self.scores
            .get_or_try_insert_with(hirings.to_bits(), || {
                Ok(score_from_hirings(&self.breakpoints, hirings))
            })
    }

    /// Exact reverse of [`Self::hirings_to_score_float`] on each segment.
    pub fn score_to_hirings(&self, score: f64) -> Result<f64, ScoringError> {
        if !(0.0..=100.0).contains(&score) {
            return Err(ScoringError::InvalidScore(score));
        }
        let score = score + 0.0;
        self.hirings
            .get_or_try_insert_with(score.to_bits(), || {
                Ok(hirings_from_score(&self.breakpoints, score))
            })
    }

    /// Statistics of the hirings→score and score→hirings caches.
    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.scores.stats(), self.hirings.stats())
    }

    pub fn clear_caches(&self) {
        self.scores.clear();
        self.hirings.clear();
    }
}
