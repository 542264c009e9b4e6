//! Manual ROME/NAF mapping: historical hirings per (occupation, industry) pair.
//!
//! The mapping is loaded once, validated against the label catalogs and kept
//! immutable. It is indexed both ways (ROME → NAFs and NAF → ROMEs); every
//! entry appears in both indexes. Within an index, codes keep the order in
//! which they appear in the mapping file, which is the tie-break order of the
//! hirings-sorted listings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::labels::CodeCatalogs;
use crate::validation::normalize_code;

/// Error types for mapping loading and affinity queries.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed mapping data: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate mapping for ROME {rome} and NAF {naf}")]
    DuplicateMapping { rome: String, naf: String },
    #[error("missing label for ROME {0}")]
    MissingRomeLabel(String),
    #[error("missing label for NAF {0}")]
    MissingNafLabel(String),
    #[error(
        "label mismatch for {code}: mapping says {mapping_label:?}, catalog says {catalog_label:?}"
    )]
    LabelMismatch {
        code: String,
        mapping_label: String,
        catalog_label: String,
    },
    #[error("bad ROME code {0}")]
    UnknownRome(String),
    #[error("ROME {rome} is not mapped to NAF {naf}")]
    RomeNotMappedToNaf { rome: String, naf: String },
    #[error("affinity between ROME {rome} and NAF {naf} is {affinity}, expected a value in (0, 1]")]
    AffinityOutOfRange {
        rome: String,
        naf: String,
        affinity: f64,
    },
}

/// One row of the mapping file.
#[derive(Debug, Clone, Deserialize)]
struct MappingRow {
    rome_code: String,
    rome_label: String,
    naf_code: String,
    naf_label: String,
    hirings: u32,
}

/// Hirings per code, in insertion order, with their total.
#[derive(Debug, Clone, Default)]
struct HiringsIndex {
    entries: Vec<(String, u32)>,
    positions: HashMap<String, usize>,
    total: u64,
}

impl HiringsIndex {
    /// Returns false if `code` is already present.
    fn insert(&mut self, code: String, hirings: u32) -> bool {
        if self.positions.contains_key(&code) {
            return false;
        }
        self.positions.insert(code.clone(), self.entries.len());
        self.entries.push((code, hirings));
        self.total += u64::from(hirings);
        true
    }

    fn hirings(&self, code: &str) -> Option<u32> {
        self.positions.get(code).map(|&i| self.entries[i].1)
    }

    fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    /// Entries by hirings descending; equal hirings keep insertion order.
    fn by_hirings_desc(&self) -> Vec<(&str, u32)> {
        let mut sorted: Vec<(&str, u32)> = self
            .entries
            .iter()
            .map(|(code, hirings)| (code.as_str(), *hirings))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

/// A ROME code mapped to a NAF code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RomeForNaf {
    pub code: String,
    pub label: String,
    pub hirings: u32,
}

/// A NAF code mapped to a ROME code, with the ROME's share of its hirings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NafForRome {
    pub code: String,
    pub label: String,
    pub hirings: u32,
    pub affinity: f64,
}

/// Codes present on one side only, as reported by [`RomeNafMapping::coverage_report`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub rome_codes_in_catalog: usize,
    pub rome_codes_in_mapping: usize,
    pub naf_codes_in_catalog: usize,
    pub naf_codes_in_mapping: usize,
    /// Labelled ROME codes that no NAF maps to.
    pub romes_without_mapping: Vec<String>,
    /// Labelled NAF codes without any ROME (orphan NAFs).
    pub nafs_without_mapping: Vec<String>,
}

/// Immutable ROME/NAF affinity table.
#[derive(Debug, Clone)]
pub struct RomeNafMapping {
    nafs_by_rome: HashMap<String, HiringsIndex>,
    romes_by_naf: HashMap<String, HiringsIndex>,
    catalogs: Arc<CodeCatalogs>,
    entries: usize,
    generation: u64,
}

impl RomeNafMapping {
    /// Parses mapping content (CSV with a
    /// `rome_code,rome_label,naf_code,naf_label,hirings` header).
    ///
    /// Fails on duplicate pairs and on codes missing from the catalogs. When
    /// `ensure_labels_match` is set, the labels of each row must also equal the
    /// catalog labels.
    pub fn parse(
        content: &str,
        catalogs: Arc<CodeCatalogs>,
        ensure_labels_match: bool,
    ) -> Result<Self, MappingError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut nafs_by_rome: HashMap<String, HiringsIndex> = HashMap::new();
        let mut romes_by_naf: HashMap<String, HiringsIndex> = HashMap::new();
        let mut entries = 0;

        for row in reader.deserialize::<MappingRow>() {
            let row = row?;
            let rome = normalize_code(&row.rome_code);
            let naf = normalize_code(&row.naf_code);

            let Some(rome_label) = catalogs.rome.label(&rome) else {
                return Err(MappingError::MissingRomeLabel(rome));
            };
            let Some(naf_label) = catalogs.naf.label(&naf) else {
                return Err(MappingError::MissingNafLabel(naf));
            };
            if ensure_labels_match {
                ensure_label_matches(&rome, &row.rome_label, rome_label)?;
                ensure_label_matches(&naf, &row.naf_label, naf_label)?;
            }

            let duplicate = || MappingError::DuplicateMapping {
                rome: rome.clone(),
                naf: naf.clone(),
            };
            if !nafs_by_rome
                .entry(rome.clone())
                .or_default()
                .insert(naf.clone(), row.hirings)
            {
                return Err(duplicate());
            }
            if !romes_by_naf
                .entry(naf.clone())
                .or_default()
                .insert(rome.clone(), row.hirings)
            {
                return Err(duplicate());
            }
            entries += 1;
        }

        info!(
            entries,
            romes = nafs_by_rome.len(),
            nafs = romes_by_naf.len(),
            "loaded rome/naf mapping"
        );

        Ok(Self {
            nafs_by_rome,
            romes_by_naf,
            catalogs,
            entries,
            generation: 0,
        })
    }

    pub fn from_path(
        path: &Path,
        catalogs: Arc<CodeCatalogs>,
        ensure_labels_match: bool,
    ) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, catalogs, ensure_labels_match)
    }

    /// Mapping shipped in `seed_data/`, embedded at compile time.
    pub fn embedded(
        catalogs: Arc<CodeCatalogs>,
        ensure_labels_match: bool,
    ) -> Result<Self, MappingError> {
        let content = include_str!("../../seed_data/rome_naf_mapping.csv");
        Self::parse(content, catalogs, ensure_labels_match)
    }

    pub fn catalogs(&self) -> &CodeCatalogs {
        &self.catalogs
    }

    /// Number of (ROME, NAF) pairs.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Incremented by [`SharedRomeNafMapping::reload`]; part of the cache keys
    /// of values derived from this mapping.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// ROME codes present in the mapping.
    pub fn rome_codes(&self) -> impl Iterator<Item = &str> {
        self.nafs_by_rome.keys().map(String::as_str)
    }

    /// NAF codes present in the mapping.
    pub fn naf_codes(&self) -> impl Iterator<Item = &str> {
        self.romes_by_naf.keys().map(String::as_str)
    }

    /// True if at least one ROME is mapped to `naf`.
    pub fn has_naf(&self, naf: &str) -> bool {
        self.romes_by_naf.contains_key(naf)
    }

    pub fn is_mapped(&self, rome: &str, naf: &str) -> bool {
        self.rome_hirings_for_naf(rome, naf).is_some()
    }

    /// ROME codes mapped to `naf` in file order, or `None` for an orphan NAF.
    pub fn rome_codes_for_naf(&self, naf: &str) -> Option<Vec<&str>> {
        self.romes_by_naf.get(naf).map(|index| index.codes().collect())
    }

    pub fn rome_hirings_for_naf(&self, rome: &str, naf: &str) -> Option<u32> {
        self.romes_by_naf.get(naf)?.hirings(rome)
    }

    /// Hirings of `naf` summed over all of its ROME codes.
    pub fn naf_total_hirings(&self, naf: &str) -> Option<u64> {
        self.romes_by_naf.get(naf).map(|index| index.total)
    }

    /// Share of the hirings of `naf` made for `rome`, in `(0, 1]`.
    ///
    /// A value outside that range means the loaded data is corrupted.
    pub fn affinity(&self, rome: &str, naf: &str) -> Result<f64, MappingError> {
        let index = self
            .romes_by_naf
            .get(naf)
            .ok_or_else(|| MappingError::RomeNotMappedToNaf {
                rome: rome.to_string(),
                naf: naf.to_string(),
            })?;
        let hirings = index
            .hirings(rome)
            .ok_or_else(|| MappingError::RomeNotMappedToNaf {
                rome: rome.to_string(),
                naf: naf.to_string(),
            })?;

        let affinity = f64::from(hirings) / index.total as f64;
        if affinity > 0.0 && affinity <= 1.0 {
            Ok(affinity)
        } else {
            Err(MappingError::AffinityOutOfRange {
                rome: rome.to_string(),
                naf: naf.to_string(),
                affinity,
            })
        }
    }

    /// ROME codes of `naf`, most hirings first. Empty for an orphan NAF.
    ///
    /// E.g. for NAF 4711D:
    /// `D1505 Personnel de caisse 3120`, `D1507 Mise en rayon libre-service 2410`, ...
    pub fn romes_for_naf(&self, naf: &str) -> Vec<RomeForNaf> {
        let Some(index) = self.romes_by_naf.get(naf) else {
            return Vec::new();
        };
        index
            .by_hirings_desc()
            .into_iter()
            .map(|(code, hirings)| RomeForNaf {
                code: code.to_string(),
                label: self.catalogs.rome.label(code).unwrap_or_default().to_string(),
                hirings,
            })
            .collect()
    }

    /// NAF codes of `rome`, most hirings first, with the affinity of `rome`
    /// within each of them.
    pub fn nafs_for_rome(&self, rome: &str) -> Result<Vec<NafForRome>, MappingError> {
        let Some(index) = self.nafs_by_rome.get(rome) else {
            return Ok(Vec::new());
        };
        index
            .by_hirings_desc()
            .into_iter()
            .map(|(code, hirings)| {
                Ok(NafForRome {
                    code: code.to_string(),
                    label: self.catalogs.naf.label(code).unwrap_or_default().to_string(),
                    hirings,
                    affinity: self.affinity(rome, code)?,
                })
            })
            .collect()
    }

    /// NAF codes hiring for any of `romes`, optionally restricted to
    /// `optional_nafs`. Sorted for stable output.
    ///
    /// A ROME missing from the catalog is an error; a labelled ROME without
    /// NAF is logged as a soft fail and contributes nothing.
    pub fn naf_codes_for_romes<S: AsRef<str>>(
        &self,
        romes: &[S],
        optional_nafs: Option<&HashSet<String>>,
    ) -> Result<Vec<String>, MappingError> {
        let mut nafs = BTreeSet::new();
        for rome in romes {
            let rome = rome.as_ref();
            if !self.catalogs.rome_is_valid(rome) {
                return Err(MappingError::UnknownRome(rome.to_string()));
            }
            let Some(index) = self.nafs_by_rome.get(rome) else {
                warn!(rome, "soft fail: no NAF codes for ROME");
                continue;
            };
            for naf in index.codes() {
                let allowed = optional_nafs.map_or(true, |allowed| allowed.contains(naf));
                if allowed {
                    nafs.insert(naf.to_string());
                }
            }
        }
        Ok(nafs.into_iter().collect())
    }

    /// Compares the codes of the catalogs with the codes of the mapping.
    pub fn coverage_report(&self) -> CoverageReport {
        let mut romes_without_mapping: Vec<String> = self
            .catalogs
            .rome
            .codes()
            .filter(|code| !self.nafs_by_rome.contains_key(*code))
            .map(str::to_string)
            .collect();
        romes_without_mapping.sort();

        let mut nafs_without_mapping: Vec<String> = self
            .catalogs
            .naf
            .codes()
            .filter(|code| !self.romes_by_naf.contains_key(*code))
            .map(str::to_string)
            .collect();
        nafs_without_mapping.sort();

        CoverageReport {
            rome_codes_in_catalog: self.catalogs.rome.len(),
            rome_codes_in_mapping: self.nafs_by_rome.len(),
            naf_codes_in_catalog: self.catalogs.naf.len(),
            naf_codes_in_mapping: self.romes_by_naf.len(),
            romes_without_mapping,
            nafs_without_mapping,
        }
    }
}

fn ensure_label_matches(
    code: &str,
    mapping_label: &str,
    catalog_label: &str,
) -> Result<(), MappingError> {
    if mapping_label == catalog_label {
        Ok(())
    } else {
        Err(MappingError::LabelMismatch {
            code: code.to_string(),
            mapping_label: mapping_label.to_string(),
            catalog_label: catalog_label.to_string(),
        })
    }
}

/// Handle to the current mapping, shared across threads.
///
/// Readers take a cheap `Arc` snapshot; [`Self::reload`] swaps in a whole new
/// mapping at once, never mutating the one readers hold.
#[derive(Debug, Clone)]
pub struct SharedRomeNafMapping {
    current: Arc<RwLock<Arc<RomeNafMapping>>>,
    generations: Arc<AtomicU64>,
}

impl SharedRomeNafMapping {
    pub fn new(mapping: RomeNafMapping) -> Self {
        let generation = mapping.generation;
        Self {
            current: Arc::new(RwLock::new(Arc::new(mapping))),
            generations: Arc::new(AtomicU64::new(generation)),
        }
    }

    pub fn current(&self) -> Arc<RomeNafMapping> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the mapping and returns its generation.
    pub fn reload(&self, mut mapping: RomeNafMapping) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        mapping.generation = generation;
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(mapping);
        info!(generation, "rome/naf mapping reloaded");
        generation
    }
}
