//! Wires settings, label catalogs, the rome/naf mapping, converters and rome
//! scorers together.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheStats;
use crate::config::{DataSettings, ScoringSettings};
use crate::error::LaBonneBoiteError;
use crate::labels::{CodeCatalogs, LabelCatalog, NAF_LABELS_DELIMITER, ROME_LABELS_DELIMITER};
use crate::rome_naf_mapping::{RomeNafMapping, SharedRomeNafMapping};
use crate::rome_scoring::RomeScorer;
use crate::scoring::{Score, ScoreConverter};
use crate::stars::StarsMapper;

/// The two hiring predictions of an office, each with its own breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Regular hirings (DPAE declarations).
    Dpae,
    /// Apprenticeship and professionalization contracts.
    Alternance,
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dpae => write!(f, "dpae"),
            Self::Alternance => write!(f, "alternance"),
        }
    }
}

impl FromStr for ScoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dpae" => Ok(Self::Dpae),
            "alternance" => Ok(Self::Alternance),
            other => Err(format!("unknown score kind: {other} (expected dpae or alternance)")),
        }
    }
}

/// Loads the label catalogs named in `data`, falling back to the embedded
/// dataset for each one that is not set.
pub fn load_catalogs(data: &DataSettings) -> Result<CodeCatalogs, LaBonneBoiteError> {
    let embedded = CodeCatalogs::embedded()?;
    let rome = match &data.rome_labels {
        Some(path) => LabelCatalog::from_path(path, ROME_LABELS_DELIMITER)?,
        None => embedded.rome,
    };
    let naf = match &data.naf_labels {
        Some(path) => LabelCatalog::from_path(path, NAF_LABELS_DELIMITER)?,
        None => embedded.naf,
    };
    Ok(CodeCatalogs { rome, naf })
}

/// Loads the catalogs and the rome/naf mapping described by `settings`.
pub fn load_mapping(settings: &ScoringSettings) -> Result<RomeNafMapping, LaBonneBoiteError> {
    let catalogs = Arc::new(load_catalogs(&settings.data)?);
    let ensure = settings.ensure_labels_in_mapping_match;
    let mapping = match &settings.data.rome_naf_mapping {
        Some(path) => RomeNafMapping::from_path(path, catalogs, ensure)?,
        None => RomeNafMapping::embedded(catalogs, ensure)?,
    };
    Ok(mapping)
}

/// Scoring entry point shared by every worker of a process.
pub struct ScoringEngine {
    settings: ScoringSettings,
    mapping: SharedRomeNafMapping,
    dpae: RomeScorer,
    alternance: RomeScorer,
    dpae_stars: StarsMapper,
    alternance_stars: StarsMapper,
}

impl ScoringEngine {
    /// Builds an engine around an already loaded mapping.
    pub fn new(
        settings: ScoringSettings,
        mapping: RomeNafMapping,
    ) -> Result<Self, LaBonneBoiteError> {
        settings.validate()?;
        let mapping = SharedRomeNafMapping::new(mapping);
        let cache = settings.cache;

        let dpae_converter = Arc::new(ScoreConverter::new(settings.dpae, &cache));
        let alternance_converter = Arc::new(ScoreConverter::new(settings.alternance, &cache));

        Ok(Self {
            dpae: RomeScorer::new(dpae_converter, mapping.clone(), cache.rome_scorer_capacity),
            alternance: RomeScorer::new(
                alternance_converter,
                mapping.clone(),
                cache.rome_scorer_capacity,
            ),
            dpae_stars: StarsMapper::new(settings.score_for_rome_minimum),
            alternance_stars: StarsMapper::new(settings.score_alternance_for_rome_minimum),
            mapping,
            settings,
        })
    }

    /// Loads the data files named in `settings` (or the embedded dataset) and
    /// builds the engine.
    pub fn load(settings: ScoringSettings) -> Result<Self, LaBonneBoiteError> {
        settings.validate()?;
        let mapping = load_mapping(&settings)?;
        info!(
            mapping_entries = mapping.len(),
            ensure_labels = settings.ensure_labels_in_mapping_match,
            "scoring engine ready"
        );
        Self::new(settings, mapping)
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Snapshot of the current mapping.
    pub fn mapping(&self) -> Arc<RomeNafMapping> {
        self.mapping.current()
    }

    pub fn converter(&self, kind: ScoreKind) -> &ScoreConverter {
        self.rome_scorer(kind).converter()
    }

    pub fn rome_scorer(&self, kind: ScoreKind) -> &RomeScorer {
        match kind {
            ScoreKind::Dpae => &self.dpae,
            ScoreKind::Alternance => &self.alternance,
        }
    }

    pub fn stars_mapper(&self, kind: ScoreKind) -> &StarsMapper {
        match kind {
            ScoreKind::Dpae => &self.dpae_stars,
            ScoreKind::Alternance => &self.alternance_stars,
        }
    }

    /// Minimum rome-adjusted score for an office to be indexed for a ROME.
    pub fn score_minimum(&self, kind: ScoreKind) -> Score {
        match kind {
            ScoreKind::Dpae => self.settings.score_for_rome_minimum,
            ScoreKind::Alternance => self.settings.score_alternance_for_rome_minimum,
        }
    }

    /// General score of an office from its predicted hirings.
    pub fn general_score(&self, kind: ScoreKind, hirings: f64) -> Result<Score, LaBonneBoiteError> {
        Ok(self.converter(kind).hirings_to_score(hirings)?)
    }

    pub fn adjust_score(
        &self,
        kind: ScoreKind,
        score: Score,
        rome: Option<&str>,
        naf: &str,
    ) -> Result<Score, LaBonneBoiteError> {
        self.rome_scorer(kind).adjust_score(score, rome, naf)
    }

    pub fn stars(&self, kind: ScoreKind, score: Score) -> f64 {
        self.stars_mapper(kind).score_to_stars(f64::from(score))
    }

    /// Adjusted-score cache counters of both score kinds, added up.
    pub fn rome_cache_stats(&self) -> CacheStats {
        let dpae = self.dpae.cache_stats();
        let alternance = self.alternance.cache_stats();
        CacheStats {
            hits: dpae.hits + alternance.hits,
            misses: dpae.misses + alternance.misses,
            len: dpae.len + alternance.len,
            capacity: dpae.capacity + alternance.capacity,
        }
    }

    /// Swaps in a new mapping and drops every adjusted score computed from the
    /// previous one. Returns the new mapping generation.
    pub fn reload_mapping(&self, mapping: RomeNafMapping) -> u64 {
        let generation = self.mapping.reload(mapping);
        self.dpae.clear_cache();
        self.alternance.clear_cache();
        generation
    }

    /// Reads the data files again and swaps in the resulting mapping.
    pub fn reload_mapping_from_settings(&self) -> Result<u64, LaBonneBoiteError> {
        let mapping = load_mapping(&self.settings)?;
        Ok(self.reload_mapping(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScoringEngine {
        ScoringEngine::load(ScoringSettings::default()).unwrap()
    }

    #[test]
    fn test_score_kind_parse() {
        assert_eq!("dpae".parse::<ScoreKind>().unwrap(), ScoreKind::Dpae);
        assert_eq!("Alternance".parse::<ScoreKind>().unwrap(), ScoreKind::Alternance);
        assert!("lba".parse::<ScoreKind>().is_err());
        assert_eq!(ScoreKind::Alternance.to_string(), "alternance");
    }

    #[test]
    fn test_kinds_use_their_own_breakpoints() {
        let e = engine();
        assert_eq!(e.general_score(ScoreKind::Dpae, 10.0).unwrap(), 50);
        assert_eq!(e.general_score(ScoreKind::Alternance, 10.0).unwrap(), 80);
        assert_eq!(e.general_score(ScoreKind::Alternance, 1.0).unwrap(), 50);
    }

    #[test]
    fn test_adjust_and_stars() {
        let e = engine();
        let general = e.general_score(ScoreKind::Dpae, 120.0).unwrap();
        assert_eq!(general, 90);
        let adjusted = e
            .adjust_score(ScoreKind::Dpae, general, Some("N1103"), "4711D")
            .unwrap();
        assert_eq!(adjusted, 4);
        assert_eq!(e.stars(ScoreKind::Dpae, adjusted), 2.5);
        assert_eq!(e.stars(ScoreKind::Dpae, general), 4.7);
    }

    #[test]
    fn test_score_minimums() {
        let mut settings = ScoringSettings::default();
        settings.score_alternance_for_rome_minimum = 30;
        let e = ScoringEngine::load(settings).unwrap();
        assert_eq!(e.score_minimum(ScoreKind::Dpae), 20);
        assert_eq!(e.score_minimum(ScoreKind::Alternance), 30);
        assert_eq!(e.stars(ScoreKind::Alternance, 30), 2.5);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = ScoringSettings::default();
        settings.dpae.score_80_hirings = 1000.0;
        assert!(matches!(
            ScoringEngine::load(settings),
            Err(LaBonneBoiteError::Config(_))
        ));
    }

    #[test]
    fn test_rome_cache_stats_cover_both_kinds() {
        let e = engine();
        for _ in 0..3 {
            e.adjust_score(ScoreKind::Dpae, 90, Some("D1505"), "4711D").unwrap();
        }
        e.adjust_score(ScoreKind::Alternance, 58, Some("D1505"), "4711D").unwrap();

        let stats = e.rome_cache_stats();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_reload_clears_adjusted_scores() {
        let e = engine();
        e.adjust_score(ScoreKind::Dpae, 90, Some("D1505"), "4711D").unwrap();
        assert_eq!(e.rome_scorer(ScoreKind::Dpae).cache_stats().len, 1);

        let generation = e.reload_mapping_from_settings().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(e.mapping().generation(), 1);
        assert_eq!(e.rome_scorer(ScoreKind::Dpae).cache_stats().len, 0);
    }
}
