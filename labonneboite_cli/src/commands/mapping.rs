//! The `romes-for-naf` and `nafs-for-rome` subcommands: queries on the
//! rome/naf mapping.

use anyhow::Result;
use clap::Args;
use labonneboite_lib::validation::{validate_naf_code, validate_rome_code};
use labonneboite_lib::ScoringEngine;

use crate::output::{print_nafs, print_romes, OutputFormat};

#[derive(Args)]
pub struct RomesForNafArgs {
    /// NAF code (e.g. 4711D)
    pub naf: String,
}

#[derive(Args)]
pub struct NafsForRomeArgs {
    /// ROME code (e.g. D1505)
    pub rome: String,
}

pub fn run_romes_for_naf(
    args: &RomesForNafArgs,
    engine: &ScoringEngine,
    format: &OutputFormat,
) -> Result<()> {
    let naf = validate_naf_code(&args.naf)?;
    let mapping = engine.mapping();
    if !mapping.catalogs().naf_is_valid(&naf) {
        anyhow::bail!("unknown NAF code: {}", naf);
    }

    let romes = mapping.romes_for_naf(&naf);
    if romes.is_empty() {
        eprintln!("No ROME code is mapped to NAF {}.", naf);
        return Ok(());
    }
    print_romes(&romes, format)
}

pub fn run_nafs_for_rome(
    args: &NafsForRomeArgs,
    engine: &ScoringEngine,
    format: &OutputFormat,
) -> Result<()> {
    let rome = validate_rome_code(&args.rome)?;
    let mapping = engine.mapping();
    if !mapping.catalogs().rome_is_valid(&rome) {
        anyhow::bail!("unknown ROME code: {}", rome);
    }

    let nafs = mapping.nafs_for_rome(&rome)?;
    if nafs.is_empty() {
        eprintln!("No NAF code is mapped to ROME {}.", rome);
        return Ok(());
    }
    print_nafs(&nafs, format)
}
