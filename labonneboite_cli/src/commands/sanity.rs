//! The `sanity-check` subcommand: compares the label catalogs with the
//! rome/naf mapping.

use anyhow::Result;
use clap::Args;
use labonneboite_lib::ScoringEngine;
use tracing::{info, warn};

use crate::output::{print_coverage, OutputFormat};

#[derive(Args)]
pub struct SanityCheckArgs {
    /// Exit with an error when a labelled ROME code has no NAF
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: &SanityCheckArgs, engine: &ScoringEngine, format: &OutputFormat) -> Result<()> {
    let mapping = engine.mapping();
    let report = mapping.coverage_report();

    info!(
        rome_codes_in_catalog = report.rome_codes_in_catalog,
        rome_codes_in_mapping = report.rome_codes_in_mapping,
        naf_codes_in_catalog = report.naf_codes_in_catalog,
        naf_codes_in_mapping = report.naf_codes_in_mapping,
        "mapping coverage"
    );
    for rome in &report.romes_without_mapping {
        warn!(rome = %rome, "ROME code has no NAF in the mapping");
    }
    for naf in &report.nafs_without_mapping {
        warn!(naf = %naf, "NAF code has no ROME in the mapping");
    }

    print_coverage(&report, format)?;

    if args.strict && !report.romes_without_mapping.is_empty() {
        anyhow::bail!(
            "{} ROME code(s) have no NAF in the mapping",
            report.romes_without_mapping.len()
        );
    }
    Ok(())
}
