//! Builds the per-office search documents: general scores, rome-adjusted
//! scores, star ratings and manual boosts.
//!
//! An office is indexed for a ROME when its adjusted score reaches the rome
//! minimum, or when an admin update boosts it for that ROME. Offices are
//! processed in parallel, one department per task, sharing the engine and its
//! caches.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::engine::{ScoreKind, ScoringEngine};
use crate::error::LaBonneBoiteError;
use crate::scoring::Score;
use crate::validation::{normalize_code, validate_naf_code, validate_siret};

/// An office as exported by the hiring prediction job.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OfficeRecord {
    pub siret: String,
    pub naf: String,
    pub name: String,
    pub department: String,
    /// Predicted regular hirings.
    pub hiring: f64,
    /// Predicted alternance hirings.
    #[serde(default)]
    pub hiring_alternance: f64,
}

/// Manual changes an admin applied to one office.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OfficeUpdate {
    pub siret: String,
    /// Extra NAF codes whose ROMEs the office hires for too.
    pub nafs_to_add: Vec<String>,
    pub boost: bool,
    /// ROMEs to boost (all ROMEs when empty); added even if unrelated to the NAF.
    pub romes_to_boost: Vec<String>,
    pub romes_to_remove: Vec<String>,
    pub boost_alternance: bool,
    pub romes_alternance_to_boost: Vec<String>,
    pub romes_alternance_to_remove: Vec<String>,
}

/// Adjusted scores kept for one score kind, and the ROMEs that were boosted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RomeScores {
    pub scores: BTreeMap<String, Score>,
    pub boosted: BTreeSet<String>,
}

impl RomeScores {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoresByRome {
    pub dpae: RomeScores,
    pub alternance: RomeScores,
}

/// Search document of one office.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeDocument {
    pub siret: String,
    pub name: String,
    pub naf: String,
    pub department: String,
    pub score: Score,
    pub stars: f64,
    pub score_alternance: Score,
    pub stars_alternance: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scores_by_rome: BTreeMap<String, Score>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub boosted_romes: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scores_alternance_by_rome: BTreeMap<String, Score>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub boosted_alternance_romes: BTreeSet<String>,
}

impl OfficeDocument {
    /// False when no search can return this office.
    pub fn is_reachable(&self) -> bool {
        !self.scores_by_rome.is_empty() || !self.scores_alternance_by_rome.is_empty()
    }

    fn rome_scores(&self, kind: ScoreKind) -> (&BTreeMap<String, Score>, &BTreeSet<String>) {
        match kind {
            ScoreKind::Dpae => (&self.scores_by_rome, &self.boosted_romes),
            ScoreKind::Alternance => (
                &self.scores_alternance_by_rome,
                &self.boosted_alternance_romes,
            ),
        }
    }
}

/// Counters of an index build.
#[derive(Debug, Default)]
pub struct IndexStats {
    offices: AtomicU64,
    rome_scores: AtomicU64,
    alternance_rome_scores: AtomicU64,
    unreachable_offices: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStatsSnapshot {
    pub offices: u64,
    pub rome_scores: u64,
    pub alternance_rome_scores: u64,
    pub unreachable_offices: u64,
}

impl IndexStats {
    pub fn snapshot(&self) -> IndexStatsSnapshot {
        IndexStatsSnapshot {
            offices: self.offices.load(Ordering::Relaxed),
            rome_scores: self.rome_scores.load(Ordering::Relaxed),
            alternance_rome_scores: self.alternance_rome_scores.load(Ordering::Relaxed),
            unreachable_offices: self.unreachable_offices.load(Ordering::Relaxed),
        }
    }

    fn record(&self, document: &OfficeDocument) {
        self.offices.fetch_add(1, Ordering::Relaxed);
        self.rome_scores
            .fetch_add(document.scores_by_rome.len() as u64, Ordering::Relaxed);
        self.alternance_rome_scores
            .fetch_add(document.scores_alternance_by_rome.len() as u64, Ordering::Relaxed);
        if !document.is_reachable() {
            self.unreachable_offices.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Boost and removal rules of one score kind, taken from an [`OfficeUpdate`].
#[derive(Debug, Default)]
struct RomeRules {
    boost: bool,
    to_boost: Vec<String>,
    to_remove: BTreeSet<String>,
}

impl RomeRules {
    fn for_kind(update: Option<&OfficeUpdate>, kind: ScoreKind) -> Self {
        let Some(u) = update else {
            return Self::default();
        };
        let (boost, to_boost, to_remove) = match kind {
            ScoreKind::Dpae => (u.boost, &u.romes_to_boost, &u.romes_to_remove),
            ScoreKind::Alternance => (
                u.boost_alternance,
                &u.romes_alternance_to_boost,
                &u.romes_alternance_to_remove,
            ),
        };
        Self {
            boost,
            to_boost: to_boost.iter().map(|r| normalize_code(r)).collect(),
            to_remove: to_remove.iter().map(|r| normalize_code(r)).collect(),
        }
    }

    fn is_boosted(&self, rome: &str) -> bool {
        self.boost && (self.to_boost.is_empty() || self.to_boost.iter().any(|r| r == rome))
    }
}

/// Computes office documents with a shared [`ScoringEngine`].
pub struct IndexBuilder<'a> {
    engine: &'a ScoringEngine,
    stats: IndexStats,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(engine: &'a ScoringEngine) -> Self {
        Self {
            engine,
            stats: IndexStats::default(),
        }
    }

    pub fn stats(&self) -> IndexStatsSnapshot {
        self.stats.snapshot()
    }

    /// Rome-adjusted scores of an office, for both score kinds.
    ///
    /// `scores` are the general DPAE and alternance scores of the office.
    pub fn scores_by_rome(
        &self,
        naf: &str,
        scores: (Score, Score),
        update: Option<&OfficeUpdate>,
    ) -> Result<ScoresByRome, LaBonneBoiteError> {
        let mut nafs = vec![naf.to_string()];
        if let Some(update) = update {
            nafs.extend(update.nafs_to_add.iter().map(|n| normalize_code(n)));
        }

        Ok(ScoresByRome {
            dpae: self.rome_scores(ScoreKind::Dpae, scores.0, &nafs, update)?,
            alternance: self.rome_scores(ScoreKind::Alternance, scores.1, &nafs, update)?,
        })
    }

    fn rome_scores(
        &self,
        kind: ScoreKind,
        general: Score,
        nafs: &[String],
        update: Option<&OfficeUpdate>,
    ) -> Result<RomeScores, LaBonneBoiteError> {
        let rules = RomeRules::for_kind(update, kind);

        let minimum = self.engine.score_minimum(kind);
        let mapping = self.engine.mapping();
        let mut result = RomeScores::default();

        for naf in nafs {
            let Some(naf_romes) = mapping.rome_codes_for_naf(naf) else {
                debug!(naf = %naf, %kind, "naf has no rome, skipped");
                continue;
            };

            let mut candidates: BTreeSet<String> =
                naf_romes.into_iter().map(str::to_string).collect();
            candidates.extend(rules.to_boost.iter().cloned());
            candidates.retain(|rome| !rules.to_remove.contains(rome));

            for rome in candidates {
                let boosted = rules.is_boosted(&rome);
                if boosted {
                    result.boosted.insert(rome.clone());
                }

                let score = self.engine.adjust_score(kind, general, Some(rome.as_str()), naf)?;
                if score < minimum && !boosted {
                    continue;
                }
                result
                    .scores
                    .entry(rome)
                    .and_modify(|best| *best = (*best).max(score))
                    .or_insert(score);
            }
        }
        Ok(result)
    }

    /// Validates an office and computes its document.
    pub fn build_document(
        &self,
        office: &OfficeRecord,
        update: Option<&OfficeUpdate>,
    ) -> Result<OfficeDocument, LaBonneBoiteError> {
        let siret = validate_siret(&office.siret)?;
        let naf = validate_naf_code(&office.naf)?;

        let score = self.engine.general_score(ScoreKind::Dpae, office.hiring)?;
        let score_alternance = self
            .engine
            .general_score(ScoreKind::Alternance, office.hiring_alternance)?;
        let by_rome = self.scores_by_rome(&naf, (score, score_alternance), update)?;

        let document = OfficeDocument {
            siret,
            name: office.name.trim().to_string(),
            naf,
            department: office.department.trim().to_string(),
            score,
            stars: self.engine.stars(ScoreKind::Dpae, score),
            score_alternance,
            stars_alternance: self.engine.stars(ScoreKind::Alternance, score_alternance),
            scores_by_rome: by_rome.dpae.scores,
            boosted_romes: by_rome.dpae.boosted,
            scores_alternance_by_rome: by_rome.alternance.scores,
            boosted_alternance_romes: by_rome.alternance.boosted,
        };
        self.stats.record(&document);
        Ok(document)
    }

    /// Builds the documents of many offices, one department per parallel task.
    ///
    /// `updates` are keyed by SIRET. Documents come out grouped by department
    /// (in department order), in input order within a department.
    pub fn build_documents(
        &self,
        offices: &[OfficeRecord],
        updates: &HashMap<String, OfficeUpdate>,
    ) -> Result<Vec<OfficeDocument>, LaBonneBoiteError> {
        self.build_documents_with_progress(offices, updates, || {})
    }

    /// Same as [`Self::build_documents`], calling `progress` after each office.
    pub fn build_documents_with_progress<F>(
        &self,
        offices: &[OfficeRecord],
        updates: &HashMap<String, OfficeUpdate>,
        progress: F,
    ) -> Result<Vec<OfficeDocument>, LaBonneBoiteError>
    where
        F: Fn() + Sync,
    {
        let mut partitions: BTreeMap<&str, Vec<&OfficeRecord>> = BTreeMap::new();
        for office in offices {
            partitions
                .entry(office.department.trim())
                .or_default()
                .push(office);
        }
        info!(
            offices = offices.len(),
            departments = partitions.len(),
            updates = updates.len(),
            "building office documents"
        );

        let partitions: Vec<Vec<OfficeDocument>> = partitions
            .into_par_iter()
            .map(|(department, offices)| -> Result<Vec<OfficeDocument>, LaBonneBoiteError> {
                let documents = offices
                    .into_iter()
                    .map(|office| {
                        let update = validate_siret(&office.siret)
                            .ok()
                            .and_then(|siret| updates.get(&siret));
                        let document = self.build_document(office, update);
                        progress();
                        document
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                debug!(department, documents = documents.len(), "department done");
                Ok(documents)
            })
            .collect::<Result<Vec<_>, LaBonneBoiteError>>()?;

        let stats = self.stats();
        info!(
            offices = stats.offices,
            rome_scores = stats.rome_scores,
            alternance_rome_scores = stats.alternance_rome_scores,
            unreachable_offices = stats.unreachable_offices,
            "office documents built"
        );
        Ok(partitions.into_iter().flatten().collect())
    }
}

/// One office in a search result for a ROME.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOffice {
    pub siret: String,
    pub name: String,
    pub score: Score,
    pub stars: f64,
    pub boosted: bool,
}

/// Offices indexed for `rome`: boosted offices first, then by adjusted score
/// descending. Ties keep SIRET order.
pub fn rank_for_rome(
    engine: &ScoringEngine,
    documents: &[OfficeDocument],
    rome: &str,
    kind: ScoreKind,
) -> Vec<RankedOffice> {
    let rome = normalize_code(rome);
    let mut ranked: Vec<RankedOffice> = documents
        .iter()
        .filter_map(|document| {
            let (scores, boosted) = document.rome_scores(kind);
            let score = *scores.get(&rome)?;
            Some(RankedOffice {
                siret: document.siret.clone(),
                name: document.name.clone(),
                score,
                stars: engine.stars(kind, score),
                boosted: boosted.contains(&rome),
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.boosted
            .cmp(&a.boosted)
            .then(b.score.cmp(&a.score))
            .then_with(|| a.siret.cmp(&b.siret))
    });
    ranked
}
