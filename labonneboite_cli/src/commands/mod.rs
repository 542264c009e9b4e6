//! CLI subcommand implementations.

pub mod adjust;
pub mod build_index;
pub mod mapping;
pub mod sanity;
pub mod score;

use anyhow::{Context, Result};
use labonneboite_lib::validation::validate_siret;
use labonneboite_lib::{OfficeRecord, OfficeUpdate};
use std::collections::HashMap;
use std::path::Path;

/// Reads an offices CSV file (`siret,naf,name,department,hiring,hiring_alternance`).
pub fn read_offices(path: &Path) -> Result<Vec<OfficeRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open offices file {}", path.display()))?;
    let offices = reader
        .deserialize()
        .collect::<Result<Vec<OfficeRecord>, _>>()
        .with_context(|| format!("malformed offices file {}", path.display()))?;
    Ok(offices)
}

/// Reads a JSON array of office updates, keyed by normalized SIRET.
pub fn read_updates(path: &Path) -> Result<HashMap<String, OfficeUpdate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read updates file {}", path.display()))?;
    let updates: Vec<OfficeUpdate> = serde_json::from_str(&content)
        .with_context(|| format!("malformed updates file {}", path.display()))?;

    let mut by_siret = HashMap::with_capacity(updates.len());
    for update in updates {
        let siret = validate_siret(&update.siret)?;
        by_siret.insert(siret, update);
    }
    Ok(by_siret)
}
