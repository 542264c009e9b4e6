//! The `score` and `hirings` subcommands: conversions between predicted
//! hirings and scores.

use anyhow::Result;
use clap::Args;
use labonneboite_lib::{Bucketing, ScoreKind, ScoringEngine};

use crate::output::{format_stars, print_rows, HiringsRow, OutputFormat, ScoreRow};

#[derive(Args)]
pub struct ScoreArgs {
    /// Predicted hirings (one or more)
    #[arg(required = true)]
    pub hirings: Vec<f64>,

    /// Score kind: dpae or alternance
    #[arg(long, default_value = "dpae")]
    pub kind: ScoreKind,

    /// Convert raw hirings without bucketing them first
    #[arg(long)]
    pub no_bucketing: bool,
}

#[derive(Args)]
pub struct HiringsArgs {
    /// Scores between 0 and 100 (one or more)
    #[arg(required = true)]
    pub scores: Vec<f64>,

    /// Score kind: dpae or alternance
    #[arg(long, default_value = "dpae")]
    pub kind: ScoreKind,
}

pub fn run(args: &ScoreArgs, engine: &ScoringEngine, format: &OutputFormat) -> Result<()> {
    let bucketing = if args.no_bucketing {
        Bucketing::Skip
    } else {
        Bucketing::Apply
    };
    let converter = engine.converter(args.kind);

    let mut rows = Vec::with_capacity(args.hirings.len());
    for &hirings in &args.hirings {
        let score = converter.hirings_to_score_with(hirings, bucketing)?;
        let exact = converter.hirings_to_score_float(hirings, bucketing)?;
        rows.push(ScoreRow {
            kind: args.kind.to_string(),
            hirings,
            score,
            exact_score: format!("{:.2}", exact),
            stars: format_stars(engine.stars(args.kind, score)),
        });
    }
    print_rows(&rows, format)
}

pub fn run_hirings(
    args: &HiringsArgs,
    engine: &ScoringEngine,
    format: &OutputFormat,
) -> Result<()> {
    let converter = engine.converter(args.kind);

    let mut rows = Vec::with_capacity(args.scores.len());
    for &score in &args.scores {
        let hirings = converter.score_to_hirings(score)?;
        rows.push(HiringsRow {
            kind: args.kind.to_string(),
            score,
            hirings: format!("{:.2}", hirings),
        });
    }
    print_rows(&rows, format)
}
