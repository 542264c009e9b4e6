use anyhow::Result;
use labonneboite_lib::{
    CacheStats, CoverageReport, IndexStatsSnapshot, NafForRome, RankedOffice, RomeForNaf,
};
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
pub struct ScoreRow {
    #[tabled(rename = "Kind")]
    #[serde(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Hirings")]
    #[serde(rename = "Hirings")]
    pub hirings: f64,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    pub score: u8,
    #[tabled(rename = "Exact Score")]
    #[serde(rename = "Exact Score")]
    pub exact_score: String,
    #[tabled(rename = "Stars")]
    #[serde(rename = "Stars")]
    pub stars: String,
}

#[derive(Tabled, Serialize)]
pub struct HiringsRow {
    #[tabled(rename = "Kind")]
    #[serde(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    pub score: f64,
    #[tabled(rename = "Hirings")]
    #[serde(rename = "Hirings")]
    pub hirings: String,
}

#[derive(Tabled, Serialize)]
pub struct AdjustRow {
    #[tabled(rename = "Kind")]
    #[serde(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "ROME")]
    #[serde(rename = "ROME")]
    pub rome: String,
    #[tabled(rename = "NAF")]
    #[serde(rename = "NAF")]
    pub naf: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    pub score: u8,
    #[tabled(rename = "Adjusted")]
    #[serde(rename = "Adjusted")]
    pub adjusted: u8,
    #[tabled(rename = "Stars")]
    #[serde(rename = "Stars")]
    pub stars: String,
    #[tabled(rename = "Fallback")]
    #[serde(rename = "Fallback")]
    pub fallback: String,
}

#[derive(Tabled, Serialize)]
struct RomeRow {
    #[tabled(rename = "ROME")]
    #[serde(rename = "ROME")]
    code: String,
    #[tabled(rename = "Label")]
    #[serde(rename = "Label")]
    label: String,
    #[tabled(rename = "Hirings")]
    #[serde(rename = "Hirings")]
    hirings: u32,
}

#[derive(Tabled, Serialize)]
struct NafRow {
    #[tabled(rename = "NAF")]
    #[serde(rename = "NAF")]
    code: String,
    #[tabled(rename = "Label")]
    #[serde(rename = "Label")]
    label: String,
    #[tabled(rename = "Hirings")]
    #[serde(rename = "Hirings")]
    hirings: u32,
    #[tabled(rename = "Affinity")]
    #[serde(rename = "Affinity")]
    affinity: String,
}

#[derive(Tabled, Serialize)]
struct RankRow {
    #[tabled(rename = "#")]
    #[serde(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "SIRET")]
    #[serde(rename = "SIRET")]
    siret: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: u8,
    #[tabled(rename = "Stars")]
    #[serde(rename = "Stars")]
    stars: String,
    #[tabled(rename = "Boosted")]
    #[serde(rename = "Boosted")]
    boosted: String,
}

#[derive(Tabled, Serialize)]
struct CoverageRow {
    #[tabled(rename = "Codes")]
    #[serde(rename = "Codes")]
    codes: String,
    #[tabled(rename = "In Catalog")]
    #[serde(rename = "In Catalog")]
    in_catalog: usize,
    #[tabled(rename = "In Mapping")]
    #[serde(rename = "In Mapping")]
    in_mapping: usize,
    #[tabled(rename = "Without Mapping")]
    #[serde(rename = "Without Mapping")]
    without_mapping: String,
}

#[derive(Tabled, Serialize)]
struct IndexStatsRow {
    #[tabled(rename = "Offices")]
    #[serde(rename = "Offices")]
    offices: u64,
    #[tabled(rename = "Rome Scores")]
    #[serde(rename = "Rome Scores")]
    rome_scores: u64,
    #[tabled(rename = "Alternance Rome Scores")]
    #[serde(rename = "Alternance Rome Scores")]
    alternance_rome_scores: u64,
    #[tabled(rename = "Unreachable")]
    #[serde(rename = "Unreachable")]
    unreachable_offices: u64,
    #[tabled(rename = "Rome Cache Hits")]
    #[serde(rename = "Rome Cache Hits")]
    rome_cache_hits: String,
}

// -- Row builders --

fn build_rome_rows(romes: &[RomeForNaf]) -> Vec<RomeRow> {
    romes
        .iter()
        .map(|r| RomeRow {
            code: r.code.clone(),
            label: r.label.clone(),
            hirings: r.hirings,
        })
        .collect()
}

fn build_naf_rows(nafs: &[NafForRome]) -> Vec<NafRow> {
    nafs.iter()
        .map(|n| NafRow {
            code: n.code.clone(),
            label: n.label.clone(),
            hirings: n.hirings,
            affinity: format_affinity(n.affinity),
        })
        .collect()
}

fn build_rank_rows(ranked: &[RankedOffice]) -> Vec<RankRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, r)| RankRow {
            rank: i + 1,
            siret: r.siret.clone(),
            name: r.name.clone(),
            score: r.score,
            stars: format_stars(r.stars),
            boosted: if r.boosted { "yes" } else { "" }.to_string(),
        })
        .collect()
}

fn build_coverage_rows(report: &CoverageReport) -> Vec<CoverageRow> {
    vec![
        CoverageRow {
            codes: "ROME".to_string(),
            in_catalog: report.rome_codes_in_catalog,
            in_mapping: report.rome_codes_in_mapping,
            without_mapping: report.romes_without_mapping.join(" "),
        },
        CoverageRow {
            codes: "NAF".to_string(),
            in_catalog: report.naf_codes_in_catalog,
            in_mapping: report.naf_codes_in_mapping,
            without_mapping: report.nafs_without_mapping.join(" "),
        },
    ]
}

fn build_index_stats_rows(
    stats: &IndexStatsSnapshot,
    rome_cache: &CacheStats,
) -> Vec<IndexStatsRow> {
    vec![IndexStatsRow {
        offices: stats.offices,
        rome_scores: stats.rome_scores,
        alternance_rome_scores: stats.alternance_rome_scores,
        unreachable_offices: stats.unreachable_offices,
        rome_cache_hits: format_ratio(rome_cache.hit_ratio()),
    }]
}

// -- Output --

pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Csv => print_csv(rows)?,
    }
    Ok(())
}

pub fn print_romes(romes: &[RomeForNaf], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&romes);
            Ok(())
        }
        _ => print_rows(&build_rome_rows(romes), format),
    }
}

pub fn print_nafs(nafs: &[NafForRome], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&nafs);
            Ok(())
        }
        _ => print_rows(&build_naf_rows(nafs), format),
    }
}

pub fn print_ranking(ranked: &[RankedOffice], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&ranked);
            Ok(())
        }
        _ => print_rows(&build_rank_rows(ranked), format),
    }
}

pub fn print_coverage(report: &CoverageReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(report);
            Ok(())
        }
        _ => print_rows(&build_coverage_rows(report), format),
    }
}

pub fn print_index_stats(
    stats: &IndexStatsSnapshot,
    rome_cache: &CacheStats,
    format: &OutputFormat,
) -> Result<()> {
    print_rows(&build_index_stats_rows(stats, rome_cache), format)
}

fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

pub fn format_stars(stars: f64) -> String {
    format!("{:.1}", stars)
}

pub fn format_affinity(affinity: f64) -> String {
    format!("{:.2}%", affinity * 100.0)
}

fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
