//! Scoring settings: confidential hiring breakpoints, score minimums, cache
//! sizes and data file locations.
//!
//! The values compiled in are the *fake* development breakpoints. Staging and
//! production override them from a settings file kept outside of the
//! repository (`LBB_SETTINGS_FILE`) or from environment variables, so that
//! hirings cannot be guessed from the scores shown in production.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scoring::{
    hirings_from_score, round_half_up, score_from_hirings, Score, MAX_SCORE,
};

pub const SETTINGS_FILE_ENV: &str = "LBB_SETTINGS_FILE";

/// Error types for settings loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("{key} has an invalid value: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error(
        "{kind} breakpoints must be finite, positive and strictly increasing (got {breakpoints})"
    )]
    InvalidBreakpoints {
        kind: &'static str,
        breakpoints: String,
    },
    #[error("{kind} breakpoints map score {score} to {hirings} hirings, scored as {round_trip}")]
    IrreversibleBreakpoints {
        kind: &'static str,
        score: Score,
        hirings: f64,
        round_trip: i64,
    },
    #[error("{key} must be between 0 and 100 (got {value})")]
    InvalidScoreMinimum { key: &'static str, value: Score },
    #[error("cache capacity {key} must be greater than zero")]
    InvalidCacheCapacity { key: &'static str },
}

/// Predicted hirings at which a score reaches 50, 60, 80 and 100.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Breakpoints {
    pub score_50_hirings: f64,
    pub score_60_hirings: f64,
    pub score_80_hirings: f64,
    pub score_100_hirings: f64,
}

impl Breakpoints {
    /// Fake DPAE breakpoints, for development and tests only.
    pub const DEV_DPAE: Self = Self {
        score_50_hirings: 10.0,
        score_60_hirings: 50.0,
        score_80_hirings: 100.0,
        score_100_hirings: 500.0,
    };

    /// Fake alternance breakpoints, for development and tests only.
    pub const DEV_ALTERNANCE: Self = Self {
        score_50_hirings: 1.0,
        score_60_hirings: 5.0,
        score_80_hirings: 10.0,
        score_100_hirings: 100.0,
    };

    /// Checks `0 < H50 < H60 < H80 < H100` and `H100 > 1` (the logarithmic
    /// segment divides by `log10(H100)`), then that every integer score
    /// converts to hirings and back to itself.
    pub fn validate(&self, kind: &'static str) -> Result<(), ConfigError> {
        let values = [
            self.score_50_hirings,
            self.score_60_hirings,
            self.score_80_hirings,
            self.score_100_hirings,
        ];
        let finite = values.iter().all(|v| v.is_finite());
        let increasing = values.windows(2).all(|w| w[0] < w[1]);
        if !(finite && increasing && values[0] > 0.0 && self.score_100_hirings > 1.0) {
            return Err(ConfigError::InvalidBreakpoints {
                kind,
                breakpoints: format!("{:?}", values),
            });
        }

        for score in 0..=MAX_SCORE {
            let hirings = hirings_from_score(self, f64::from(score));
            let round_trip = round_half_up(score_from_hirings(self, hirings));
            if round_trip != i64::from(score) {
                return Err(ConfigError::IrreversibleBreakpoints {
                    kind,
                    score,
                    hirings,
                    round_trip,
                });
            }
        }
        Ok(())
    }
}

/// Capacities of the memoization caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub converter_capacity: usize,
    pub score_to_hirings_capacity: usize,
    pub rome_scorer_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            converter_capacity: 512 * 1024,
            score_to_hirings_capacity: 1024,
            rome_scorer_capacity: 256 * 1024,
        }
    }
}

/// Locations of the label catalogs and of the rome/naf mapping. `None` means
/// the dataset embedded from `seed_data/` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub rome_labels: Option<PathBuf>,
    pub naf_labels: Option<PathBuf>,
    pub rome_naf_mapping: Option<PathBuf>,
}

/// Top-level scoring configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub dpae: Breakpoints,
    pub alternance: Breakpoints,
    pub score_for_rome_minimum: Score,
    pub score_alternance_for_rome_minimum: Score,
    /// Compare labels carried by the mapping file with the catalogs.
    /// Off by default: the two label sources are known to disagree.
    pub ensure_labels_in_mapping_match: bool,
    pub cache: CacheSettings,
    pub data: DataSettings,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            dpae: Breakpoints::DEV_DPAE,
            alternance: Breakpoints::DEV_ALTERNANCE,
            score_for_rome_minimum: 20,
            score_alternance_for_rome_minimum: 20,
            ensure_labels_in_mapping_match: false,
            cache: CacheSettings::default(),
            data: DataSettings::default(),
        }
    }
}

impl ScoringSettings {
    /// Loads settings: dev defaults, then the optional settings file named by
    /// `LBB_SETTINGS_FILE`, then environment variables (a `.env` file is read
    /// first if present).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut settings = match std::env::var(SETTINGS_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies `KEY=value` overrides from `lookup` (typically the process
    /// environment). Unset keys leave the current value untouched; unparsable
    /// values are an error rather than a silent fallback.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_f64(&lookup, "SCORE_50_HIRINGS", &mut self.dpae.score_50_hirings)?;
        override_f64(&lookup, "SCORE_60_HIRINGS", &mut self.dpae.score_60_hirings)?;
        override_f64(&lookup, "SCORE_80_HIRINGS", &mut self.dpae.score_80_hirings)?;
        override_f64(&lookup, "SCORE_100_HIRINGS", &mut self.dpae.score_100_hirings)?;
        override_f64(
            &lookup,
            "SCORE_ALTERNANCE_50_HIRINGS",
            &mut self.alternance.score_50_hirings,
        )?;
        override_f64(
            &lookup,
            "SCORE_ALTERNANCE_60_HIRINGS",
            &mut self.alternance.score_60_hirings,
        )?;
        override_f64(
            &lookup,
            "SCORE_ALTERNANCE_80_HIRINGS",
            &mut self.alternance.score_80_hirings,
        )?;
        override_f64(
            &lookup,
            "SCORE_ALTERNANCE_100_HIRINGS",
            &mut self.alternance.score_100_hirings,
        )?;

        override_parsed(&lookup, "SCORE_FOR_ROME_MINIMUM", &mut self.score_for_rome_minimum)?;
        override_parsed(
            &lookup,
            "SCORE_ALTERNANCE_FOR_ROME_MINIMUM",
            &mut self.score_alternance_for_rome_minimum,
        )?;
        override_bool(
            &lookup,
            "ENSURE_LABELS_IN_MAPPING_MATCH",
            &mut self.ensure_labels_in_mapping_match,
        )?;

        override_parsed(
            &lookup,
            "LBB_CONVERTER_CACHE_SIZE",
            &mut self.cache.converter_capacity,
        )?;
        override_parsed(
            &lookup,
            "LBB_SCORE_TO_HIRINGS_CACHE_SIZE",
            &mut self.cache.score_to_hirings_capacity,
        )?;
        override_parsed(
            &lookup,
            "LBB_ROME_SCORER_CACHE_SIZE",
            &mut self.cache.rome_scorer_capacity,
        )?;

        override_path(&lookup, "LBB_ROME_LABELS_FILE", &mut self.data.rome_labels);
        override_path(&lookup, "LBB_NAF_LABELS_FILE", &mut self.data.naf_labels);
        override_path(
            &lookup,
            "LBB_ROME_NAF_MAPPING_FILE",
            &mut self.data.rome_naf_mapping,
        );
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dpae.validate("dpae")?;
        self.alternance.validate("alternance")?;
        if self.score_for_rome_minimum > 100 {
            return Err(ConfigError::InvalidScoreMinimum {
                key: "score_for_rome_minimum",
                value: self.score_for_rome_minimum,
            });
        }
        if self.score_alternance_for_rome_minimum > 100 {
            return Err(ConfigError::InvalidScoreMinimum {
                key: "score_alternance_for_rome_minimum",
                value: self.score_alternance_for_rome_minimum,
            });
        }
        let capacities = [
            ("converter_capacity", self.cache.converter_capacity),
            ("score_to_hirings_capacity", self.cache.score_to_hirings_capacity),
            ("rome_scorer_capacity", self.cache.rome_scorer_capacity),
        ];
        for (key, capacity) in capacities {
            if capacity == 0 {
                return Err(ConfigError::InvalidCacheCapacity { key });
            }
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn override_f64<F>(lookup: &F, key: &str, target: &mut f64) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    override_parsed(lookup, key, target)
}

fn override_bool<F>(lookup: &F, key: &str, target: &mut bool) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                })
            }
        };
    }
    Ok(())
}

fn override_path<F>(lookup: &F, key: &str, target: &mut Option<PathBuf>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        let raw = raw.trim();
        if !raw.is_empty() {
            *target = Some(PathBuf::from(raw));
        }
    }
}
