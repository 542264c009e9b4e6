//! Adjusts an office's general score to one ROME code.
//!
//! The general score predicts hirings over every occupation. The score for a
//! given ROME keeps only the share of those hirings that the office's NAF
//! makes for this ROME, according to the manual rome/naf mapping.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{BoundedCache, CacheStats};
use crate::error::LaBonneBoiteError;
use crate::rome_naf_mapping::{RomeNafMapping, SharedRomeNafMapping};
use crate::scoring::{Score, ScoreConverter, ScoringError, MAX_SCORE};

/// Why a score is returned unadjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No ROME code was given.
    NoRomeContext,
    /// The NAF code has no ROME at all in the mapping.
    OrphanNaf,
    /// The ROME code is not among the ROMEs of the NAF.
    RomeNotMappedToNaf,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoRomeContext => "no rome context",
            Self::OrphanNaf => "orphan naf",
            Self::RomeNotMappedToNaf => "rome not mapped to naf",
        };
        f.write_str(reason)
    }
}

/// Runs the fallback checks in order and returns the first that applies.
pub fn fallback_reason(
    mapping: &RomeNafMapping,
    rome: Option<&str>,
    naf: &str,
) -> Option<FallbackReason> {
    let rome = match rome {
        Some(rome) if !rome.is_empty() => rome,
        _ => return Some(FallbackReason::NoRomeContext),
    };
    if !mapping.has_naf(naf) {
        return Some(FallbackReason::OrphanNaf);
    }
    if !mapping.is_mapped(rome, naf) {
        return Some(FallbackReason::RomeNotMappedToNaf);
    }
    None
}

type AdjustedKey = (u64, Score, String, String);

/// Memoized rome-adjusted scoring for one score kind.
pub struct RomeScorer {
    converter: Arc<ScoreConverter>,
    mapping: SharedRomeNafMapping,
    cache: BoundedCache<AdjustedKey, Score>,
}

impl RomeScorer {
    pub fn new(
        converter: Arc<ScoreConverter>,
        mapping: SharedRomeNafMapping,
        capacity: usize,
    ) -> Self {
        Self {
            converter,
            mapping,
            cache: BoundedCache::new(capacity),
        }
    }

    pub fn converter(&self) -> &ScoreConverter {
        &self.converter
    }

    /// Score of an office for `rome`, given its general `score` and `naf`.
    ///
    /// Falls back to `score` unchanged when there is no ROME, when the NAF is
    /// an orphan or when the ROME is not mapped to the NAF.
    pub fn adjust_score(
        &self,
        score: Score,
        rome: Option<&str>,
        naf: &str,
    ) -> Result<Score, LaBonneBoiteError> {
        if score > MAX_SCORE {
            return Err(ScoringError::InvalidScore(f64::from(score)).into());
        }

        let mapping = self.mapping.current();
        if let Some(reason) = fallback_reason(&mapping, rome, naf) {
            match reason {
                FallbackReason::OrphanNaf => {
                    warn!(naf, "soft fail: naf has no rome, score left unadjusted")
                }
                _ => debug!(?rome, naf, %reason, "score left unadjusted"),
            }
            return Ok(score);
        }
        // fallback_reason rules out a missing rome
        let rome = rome.unwrap_or_default();

        let key = (mapping.generation(), score, rome.to_string(), naf.to_string());
        self.cache
            .get_or_try_insert_with(key, || self.compute(&mapping, score, rome, naf))
    }

    fn compute(
        &self,
        mapping: &RomeNafMapping,
        score: Score,
        rome: &str,
        naf: &str,
    ) -> Result<Score, LaBonneBoiteError> {
        let total_hirings = self.converter.score_to_hirings(f64::from(score))?;
        let affinity = mapping.affinity(rome, naf)?;
        Ok(self.converter.hirings_to_score(total_hirings * affinity)?)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Breakpoints, CacheSettings};
    use crate::labels::CodeCatalogs;

    fn shared_mapping() -> SharedRomeNafMapping {
        let catalogs = Arc::new(CodeCatalogs::embedded().unwrap());
        SharedRomeNafMapping::new(RomeNafMapping::embedded(catalogs, false).unwrap())
    }

    fn scorer() -> RomeScorer {
        let converter = Arc::new(ScoreConverter::new(
            Breakpoints::DEV_DPAE,
            &CacheSettings::default(),
        ));
        RomeScorer::new(converter, shared_mapping(), 1024)
    }

    #[test]
    fn test_fallback_reasons_in_order() {
        let mapping = shared_mapping().current();
        assert_eq!(
            fallback_reason(&mapping, None, "6201Z"),
            Some(FallbackReason::NoRomeContext)
        );
        assert_eq!(
            fallback_reason(&mapping, Some(""), "4711D"),
            Some(FallbackReason::NoRomeContext)
        );
        assert_eq!(
            fallback_reason(&mapping, Some("M1805"), "6201Z"),
            Some(FallbackReason::OrphanNaf)
        );
        assert_eq!(
            fallback_reason(&mapping, Some("G1602"), "4711D"),
            Some(FallbackReason::RomeNotMappedToNaf)
        );
        assert_eq!(fallback_reason(&mapping, Some("D1505"), "4711D"), None);
    }

    #[test]
    fn test_missing_rome_keeps_score() {
        let s = scorer();
        assert_eq!(s.adjust_score(90, None, "4711D").unwrap(), 90);
        assert_eq!(s.adjust_score(90, Some(""), "4711D").unwrap(), 90);
    }

    #[test]
    fn test_orphan_naf_keeps_score() {
        let s = scorer();
        assert_eq!(s.adjust_score(73, Some("M1805"), "6201Z").unwrap(), 73);
    }

    #[test]
    fn test_unmapped_rome_keeps_score() {
        let s = scorer();
        assert_eq!(s.adjust_score(73, Some("G1602"), "4711D").unwrap(), 73);
        assert_eq!(s.cache_stats().len, 0);
    }

    #[test]
    fn test_small_share_of_hirings() {
        let s = scorer();
        // 52 of the 7844 hirings of 4711D: 121.36 * 52 / 7844 ~ 0.8 hirings
        assert_eq!(s.adjust_score(90, Some("N1103"), "4711D").unwrap(), 4);
        // 2410 of 7844: ~37 hirings
        assert_eq!(s.adjust_score(90, Some("D1507"), "4711D").unwrap(), 57);
    }

    #[test]
    fn test_single_rome_naf_keeps_most_of_score() {
        let s = scorer();
        let adjusted = s.adjust_score(80, Some("I1604"), "4520A").unwrap();
        assert!(adjusted < 80);
        assert!(adjusted >= 78);
    }

    #[test]
    fn test_adjusted_scores_never_exceed_general_score() {
        let s = scorer();
        let mapping = shared_mapping().current();
        for naf in ["4711D", "5610A", "4941A", "8810A", "6831Z", "4520A"] {
            for rome in mapping.rome_codes_for_naf(naf).unwrap() {
                for score in [0u8, 20, 50, 65, 90, 100] {
                    let adjusted = s.adjust_score(score, Some(rome), naf).unwrap();
                    assert!(adjusted <= score, "{rome}/{naf} raised {score} to {adjusted}");
                }
            }
        }
    }

    #[test]
    fn test_affinities_sum_to_total_hirings() {
        let s = scorer();
        let mapping = shared_mapping().current();
        let total = s.converter().score_to_hirings(90.0).unwrap();
        let sum: f64 = mapping
            .rome_codes_for_naf("4711D")
            .unwrap()
            .into_iter()
            .map(|rome| total * mapping.affinity(rome, "4711D").unwrap())
            .sum();
        assert!((sum - total).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_score_rejected() {
        let s = scorer();
        let err = s.adjust_score(101, Some("D1505"), "4711D").unwrap_err();
        assert!(matches!(
            err,
            LaBonneBoiteError::Scoring(ScoringError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_adjusted_scores_are_memoized() {
        let s = scorer();
        for _ in 0..5 {
            s.adjust_score(90, Some("D1505"), "4711D").unwrap();
        }
        let stats = s.cache_stats();
        assert_eq!(stats.len, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 4);

        s.clear_cache();
        assert_eq!(s.cache_stats().len, 0);
    }
}
