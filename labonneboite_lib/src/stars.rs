//! Star ratings shown to job seekers.
//!
//! Only offices scoring at least the rome minimum are indexed for a ROME, so
//! the star scale starts there: the minimum score is 2.5 stars and 100 is
//! 5 stars.

use crate::scoring::{Score, MAX_SCORE};

pub const STARS_MINIMUM: f64 = 2.5;
pub const STARS_MAXIMUM: f64 = 5.0;

/// Maps scores in `[score_minimum, 100]` to stars in `[2.5, 5.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarsMapper {
    score_minimum: f64,
}

impl Default for StarsMapper {
    fn default() -> Self {
        Self::new(20)
    }
}

impl StarsMapper {
    pub fn new(score_minimum: Score) -> Self {
        Self {
            score_minimum: f64::from(score_minimum.min(MAX_SCORE)),
        }
    }

    pub fn score_minimum(&self) -> f64 {
        self.score_minimum
    }

    fn score_span(&self) -> f64 {
        f64::from(MAX_SCORE) - self.score_minimum
    }

    /// Stars rounded to one decimal. Scores below the minimum get 2.5 stars.
    pub fn score_to_stars(&self, score: f64) -> f64 {
        let span = self.score_span();
        if span <= 0.0 {
            return STARS_MAXIMUM;
        }
        let score = score.max(self.score_minimum);
        let normalized = (score - self.score_minimum) / span;
        let stars = STARS_MINIMUM + normalized * (STARS_MAXIMUM - STARS_MINIMUM);
        (stars * 10.0).round() / 10.0
    }

    /// Exact inverse of the unrounded mapping; neither clamped nor rounded.
    pub fn stars_to_score(&self, stars: f64) -> f64 {
        let normalized = (stars - STARS_MINIMUM) / (STARS_MAXIMUM - STARS_MINIMUM);
        self.score_minimum + normalized * self.score_span()
    }
}
