//! The `adjust` subcommand: score of an office for one ROME code.

use anyhow::Result;
use clap::Args;
use labonneboite_lib::validation::{validate_naf_code, validate_rome_code};
use labonneboite_lib::{fallback_reason, ScoreKind, ScoringEngine};

use crate::output::{format_stars, print_rows, AdjustRow, OutputFormat};

#[derive(Args)]
pub struct AdjustArgs {
    /// General score of the office (0-100)
    #[arg(long, conflicts_with = "hirings", required_unless_present = "hirings")]
    pub score: Option<u8>,

    /// Predicted hirings of the office, converted to a general score first
    #[arg(long)]
    pub hirings: Option<f64>,

    /// NAF code of the office (e.g. 4711D)
    #[arg(long)]
    pub naf: String,

    /// ROME codes to adjust for (e.g. D1505); the general score is shown when omitted
    #[arg(long)]
    pub rome: Vec<String>,

    /// Score kind: dpae or alternance
    #[arg(long, default_value = "dpae")]
    pub kind: ScoreKind,
}

pub fn run(args: &AdjustArgs, engine: &ScoringEngine, format: &OutputFormat) -> Result<()> {
    let naf = validate_naf_code(&args.naf)?;
    let score = match (args.score, args.hirings) {
        (Some(score), _) => score,
        (None, Some(hirings)) => engine.general_score(args.kind, hirings)?,
        (None, None) => anyhow::bail!("either --score or --hirings is required"),
    };

    let romes: Vec<Option<String>> = if args.rome.is_empty() {
        vec![None]
    } else {
        args.rome
            .iter()
            .map(|r| validate_rome_code(r).map(Some))
            .collect::<Result<_, _>>()?
    };

    let mapping = engine.mapping();
    let mut rows = Vec::with_capacity(romes.len());
    for rome in &romes {
        let rome = rome.as_deref();
        let adjusted = engine.adjust_score(args.kind, score, rome, &naf)?;
        let fallback = fallback_reason(&mapping, rome, &naf)
            .map(|reason| reason.to_string())
            .unwrap_or_default();
        rows.push(AdjustRow {
            kind: args.kind.to_string(),
            rome: rome.unwrap_or("-").to_string(),
            naf: naf.clone(),
            score,
            adjusted,
            stars: format_stars(engine.stars(args.kind, adjusted)),
            fallback,
        });
    }
    print_rows(&rows, format)
}
