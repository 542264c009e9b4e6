//! The `build-index` and `rank` subcommands: office documents for the search
//! index, and the result list a search for one ROME would return.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use labonneboite_lib::validation::validate_rome_code;
use labonneboite_lib::{rank_for_rome, IndexBuilder, OfficeUpdate, ScoreKind, ScoringEngine};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::commands::{read_offices, read_updates};
use crate::output::{print_index_stats, print_ranking, OutputFormat};

#[derive(Args)]
pub struct BuildIndexArgs {
    /// Offices CSV file (siret,naf,name,department,hiring,hiring_alternance)
    #[arg(long)]
    pub offices: PathBuf,

    /// JSON file with admin updates (boosts, added NAFs, removed ROMEs)
    #[arg(long)]
    pub updates: Option<PathBuf>,

    /// Output file, one JSON document per line
    #[arg(long, short = 'o')]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct RankArgs {
    /// Offices CSV file (siret,naf,name,department,hiring,hiring_alternance)
    #[arg(long)]
    pub offices: PathBuf,

    /// JSON file with admin updates (boosts, added NAFs, removed ROMEs)
    #[arg(long)]
    pub updates: Option<PathBuf>,

    /// ROME code searched for (e.g. D1505)
    #[arg(long)]
    pub rome: String,

    /// Score kind: dpae or alternance
    #[arg(long, default_value = "dpae")]
    pub kind: ScoreKind,

    /// Maximum number of offices to show
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

fn load_updates(path: Option<&PathBuf>) -> Result<HashMap<String, OfficeUpdate>> {
    match path {
        Some(path) => read_updates(path),
        None => Ok(HashMap::new()),
    }
}

pub fn run(args: &BuildIndexArgs, engine: &ScoringEngine, format: &OutputFormat) -> Result<()> {
    let offices = read_offices(&args.offices)?;
    let updates = load_updates(args.updates.as_ref())?;

    let pb = ProgressBar::new(offices.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
        )?,
    );
    pb.set_message("scoring offices...");

    let builder = IndexBuilder::new(engine);
    let documents = builder.build_documents_with_progress(&offices, &updates, || pb.inc(1))?;
    pb.finish_with_message("done");

    let file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let mut writer = BufWriter::new(file);
    for document in &documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(
        documents = documents.len(),
        path = %args.out.display(),
        "office documents written"
    );
    let rome_cache = engine.rome_cache_stats();
    tracing::debug!(
        hits = rome_cache.hits,
        misses = rome_cache.misses,
        entries = rome_cache.len,
        "adjusted score cache"
    );
    print_index_stats(&builder.stats(), &rome_cache, format)
}

pub fn run_rank(args: &RankArgs, engine: &ScoringEngine, format: &OutputFormat) -> Result<()> {
    let rome = validate_rome_code(&args.rome)?;
    let offices = read_offices(&args.offices)?;
    let updates = load_updates(args.updates.as_ref())?;

    let builder = IndexBuilder::new(engine);
    let documents = builder.build_documents(&offices, &updates)?;

    let mut ranked = rank_for_rome(engine, &documents, &rome, args.kind);
    if ranked.is_empty() {
        eprintln!("No office is indexed for ROME {}.", rome);
        return Ok(());
    }
    ranked.truncate(args.limit);
    print_ranking(&ranked, format)
}
