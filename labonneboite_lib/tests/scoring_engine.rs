//! End-to-end scoring tests against the embedded dataset and fixture files.

use labonneboite_lib::{
    Bucketing, LaBonneBoiteError, MappingError, ScoreKind, ScoringEngine, ScoringSettings,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ROME_LABELS: &str = "\
D1505;Personnel de caisse
D1507;Mise en rayon libre-service
N1103;Magasinage et préparation de commandes
";

const NAF_LABELS: &str = "\
4711D|Supermarchés
4711F|Hypermarchés
";

const MAPPING: &str = "\
rome_code,rome_label,naf_code,naf_label,hirings
D1505,Personnel de caisse,4711D,Supermarchés,60
D1507,Mise en rayon,4711D,Supermarchés,30
N1103,Magasinage et préparation de commandes,4711D,Supermarchés,10
D1505,Personnel de caisse,4711F,Hypermarchés,90
";

fn write_fixtures(dir: &Path, mapping: &str) -> ScoringSettings {
    let rome_labels = dir.join("rome_labels.csv");
    let naf_labels = dir.join("naf_labels.csv");
    let rome_naf_mapping = dir.join("rome_naf_mapping.csv");
    fs::write(&rome_labels, ROME_LABELS).expect("write rome labels");
    fs::write(&naf_labels, NAF_LABELS).expect("write naf labels");
    fs::write(&rome_naf_mapping, mapping).expect("write mapping");

    let mut settings = ScoringSettings::default();
    settings.data.rome_labels = Some(rome_labels);
    settings.data.naf_labels = Some(naf_labels);
    settings.data.rome_naf_mapping = Some(rome_naf_mapping);
    settings
}

#[test]
fn office_hiring_120_for_a_rare_rome() {
    let engine = ScoringEngine::load(ScoringSettings::default()).expect("engine");

    let general = engine.general_score(ScoreKind::Dpae, 120.0).expect("general score");
    assert_eq!(general, 90);

    let mapping = engine.mapping();
    assert_eq!(mapping.rome_hirings_for_naf("N1103", "4711D"), Some(52));
    assert_eq!(mapping.naf_total_hirings("4711D"), Some(7844));

    let adjusted = engine
        .adjust_score(ScoreKind::Dpae, general, Some("N1103"), "4711D")
        .expect("adjusted score");
    assert_eq!(adjusted, 4);

    let converter = engine.converter(ScoreKind::Dpae);
    let hirings = converter.score_to_hirings(f64::from(adjusted)).expect("hirings");
    assert!((hirings - 0.8).abs() < 1e-9);
    let float_score = converter
        .hirings_to_score_float(0.8, Bucketing::Skip)
        .expect("float score");
    assert!((float_score - 4.0).abs() < 1e-9);

    // below the rome minimum: bottom of the star scale
    assert_eq!(engine.stars(ScoreKind::Dpae, adjusted), 2.5);
}

#[test]
fn fixture_files_replace_embedded_dataset() {
    let dir = TempDir::new().expect("tempdir");
    let settings = write_fixtures(dir.path(), MAPPING);
    let engine = ScoringEngine::load(settings).expect("engine");

    let mapping = engine.mapping();
    assert_eq!(mapping.len(), 4);
    assert_eq!(mapping.naf_total_hirings("4711D"), Some(100));
    assert!(!mapping.has_naf("5610A"));

    let romes: Vec<String> = mapping
        .romes_for_naf("4711D")
        .into_iter()
        .map(|r| r.code)
        .collect();
    assert_eq!(romes, vec!["D1505", "D1507", "N1103"]);

    let nafs = mapping.nafs_for_rome("D1505").expect("nafs for rome");
    assert_eq!(nafs[0].code, "4711F");
    assert_eq!(nafs[0].affinity, 1.0);
    assert!((nafs[1].affinity - 0.6).abs() < 1e-12);

    // score 80 is 100 hirings, 60 of them for D1505
    assert_eq!(
        engine
            .adjust_score(ScoreKind::Dpae, 80, Some("D1505"), "4711D")
            .expect("adjusted"),
        64
    );
}

#[test]
fn mismatching_labels_are_accepted_by_default() {
    let dir = TempDir::new().expect("tempdir");
    let settings = write_fixtures(dir.path(), MAPPING);
    assert!(!settings.ensure_labels_in_mapping_match);
    assert!(ScoringEngine::load(settings).is_ok());
}

#[test]
fn mismatching_labels_rejected_when_checked() {
    let dir = TempDir::new().expect("tempdir");
    let mut settings = write_fixtures(dir.path(), MAPPING);
    settings.ensure_labels_in_mapping_match = true;

    match ScoringEngine::load(settings) {
        Err(LaBonneBoiteError::Mapping(MappingError::LabelMismatch { code, .. })) => {
            assert_eq!(code, "D1507");
        }
        other => panic!("expected a label mismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn duplicate_rows_are_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let mapping = format!("{MAPPING}D1505,Personnel de caisse,4711D,Supermarchés,1\n");
    let settings = write_fixtures(dir.path(), &mapping);

    assert!(matches!(
        ScoringEngine::load(settings),
        Err(LaBonneBoiteError::Mapping(MappingError::DuplicateMapping { .. }))
    ));
}

#[test]
fn unknown_codes_are_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let mapping = format!("{MAPPING}G1602,Personnel de cuisine,4711D,Supermarchés,1\n");
    let settings = write_fixtures(dir.path(), &mapping);

    assert!(matches!(
        ScoringEngine::load(settings),
        Err(LaBonneBoiteError::Mapping(MappingError::MissingRomeLabel(_)))
    ));
}

#[test]
fn reload_picks_up_new_file_content() {
    let dir = TempDir::new().expect("tempdir");
    let settings = write_fixtures(dir.path(), MAPPING);
    let mapping_path = settings.data.rome_naf_mapping.clone().expect("mapping path");
    let engine = ScoringEngine::load(settings).expect("engine");

    let before = engine
        .adjust_score(ScoreKind::Dpae, 80, Some("N1103"), "4711D")
        .expect("adjusted");

    let updated = MAPPING.replace(
        "N1103,Magasinage et préparation de commandes,4711D,Supermarchés,10",
        "N1103,Magasinage et préparation de commandes,4711D,Supermarchés,910",
    );
    fs::write(&mapping_path, updated).expect("rewrite mapping");
    let generation = engine.reload_mapping_from_settings().expect("reload");
    assert_eq!(generation, 1);

    let after = engine
        .adjust_score(ScoreKind::Dpae, 80, Some("N1103"), "4711D")
        .expect("adjusted");
    assert!(after > before, "expected {after} > {before}");
}

#[test]
fn alternance_uses_its_own_breakpoints() {
    let engine = ScoringEngine::load(ScoringSettings::default()).expect("engine");
    assert_eq!(engine.general_score(ScoreKind::Alternance, 4.0).expect("score"), 58);
    assert_eq!(engine.general_score(ScoreKind::Dpae, 4.0).expect("score"), 20);
}
