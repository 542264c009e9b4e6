mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use labonneboite_lib::{ScoringEngine, ScoringSettings};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "labonneboite")]
#[command(about = "Score offices from predicted hirings and adjust scores to ROME codes")]
struct Cli {
    /// Output format: table, json or csv
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Log debug messages (fallbacks, cache evictions)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert predicted hirings to scores and stars
    Score(commands::score::ScoreArgs),
    /// Convert scores back to predicted hirings
    Hirings(commands::score::HiringsArgs),
    /// Adjust an office score to ROME codes
    Adjust(commands::adjust::AdjustArgs),
    /// List the ROME codes of a NAF code, most hirings first
    RomesForNaf(commands::mapping::RomesForNafArgs),
    /// List the NAF codes of a ROME code, most hirings first
    NafsForRome(commands::mapping::NafsForRomeArgs),
    /// Build the search documents of an offices file
    BuildIndex(commands::build_index::BuildIndexArgs),
    /// Rank the offices of an offices file for one ROME code
    Rank(commands::build_index::RankArgs),
    /// Compare the label catalogs with the rome/naf mapping
    SanityCheck(commands::sanity::SanityCheckArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "labonneboite=debug"
    } else {
        "labonneboite=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::parse(&cli.output);

    let settings = ScoringSettings::load()?;
    let engine = ScoringEngine::load(settings)?;

    match &cli.command {
        Commands::Score(args) => commands::score::run(args, &engine, &format)?,
        Commands::Hirings(args) => commands::score::run_hirings(args, &engine, &format)?,
        Commands::Adjust(args) => commands::adjust::run(args, &engine, &format)?,
        Commands::RomesForNaf(args) => {
            commands::mapping::run_romes_for_naf(args, &engine, &format)?
        }
        Commands::NafsForRome(args) => {
            commands::mapping::run_nafs_for_rome(args, &engine, &format)?
        }
        Commands::BuildIndex(args) => commands::build_index::run(args, &engine, &format)?,
        Commands::Rank(args) => commands::build_index::run_rank(args, &engine, &format)?,
        Commands::SanityCheck(args) => commands::sanity::run(args, &engine, &format)?,
    }

    Ok(())
}
