//! Index build tests over the example offices file.

use labonneboite_lib::{
    rank_for_rome, IndexBuilder, OfficeRecord, OfficeUpdate, ScoreKind, ScoringEngine,
    ScoringSettings,
};
use std::collections::HashMap;

const SUPERMARKET: &str = "78548035101646";
const TRUCKING: &str = "73343108700014";
const HOME_CARE: &str = "49909893200025";

fn offices() -> Vec<OfficeRecord> {
    let content = include_str!("../../seed_data/offices.example.csv");
    csv::Reader::from_reader(content.as_bytes())
        .deserialize()
        .collect::<Result<Vec<OfficeRecord>, _>>()
        .expect("offices fixture")
}

fn engine() -> ScoringEngine {
    ScoringEngine::load(ScoringSettings::default()).expect("engine")
}

fn updates(list: Vec<OfficeUpdate>) -> HashMap<String, OfficeUpdate> {
    list.into_iter().map(|u| (u.siret.clone(), u)).collect()
}

#[test]
fn builds_every_office_grouped_by_department() {
    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let documents = builder
        .build_documents(&offices(), &HashMap::new())
        .expect("documents");

    let departments: Vec<&str> = documents.iter().map(|d| d.department.as_str()).collect();
    assert_eq!(departments, vec!["54", "54", "57", "57", "57"]);

    let stats = builder.stats();
    assert_eq!(stats.offices, 5);
    // the software shop has an orphan NAF, home care scores too low
    assert_eq!(stats.unreachable_offices, 2);

    let supermarket = documents
        .iter()
        .find(|d| d.siret == SUPERMARKET)
        .expect("supermarket document");
    assert_eq!(supermarket.score, 90);
    assert_eq!(supermarket.scores_by_rome.get("D1505"), Some(&60));
    assert!(!supermarket.scores_by_rome.contains_key("N1103"));
}

#[test]
fn progress_is_reported_once_per_office() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let done = AtomicUsize::new(0);
    builder
        .build_documents_with_progress(&offices(), &HashMap::new(), || {
            done.fetch_add(1, Ordering::Relaxed);
        })
        .expect("documents");
    assert_eq!(done.load(Ordering::Relaxed), 5);
}

#[test]
fn added_naf_contributes_its_romes_and_best_score_wins() {
    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let update = OfficeUpdate {
        siret: SUPERMARKET.to_string(),
        nafs_to_add: vec!["4941a".to_string(), "6201Z".to_string()],
        ..OfficeUpdate::default()
    };
    let documents = builder
        .build_documents(&offices(), &updates(vec![update]))
        .expect("documents");
    let supermarket = documents
        .iter()
        .find(|d| d.siret == SUPERMARKET)
        .expect("supermarket document");

    // N1103 gets 4 through 4711D and 52 through 4941A
    assert_eq!(supermarket.scores_by_rome.get("N1103"), Some(&52));
    assert!(supermarket.scores_by_rome.contains_key("N4101"));
    assert_eq!(supermarket.scores_by_rome.get("D1505"), Some(&60));
}

#[test]
fn boost_limited_to_listed_romes() {
    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let update = OfficeUpdate {
        siret: SUPERMARKET.to_string(),
        boost: true,
        romes_to_boost: vec!["N1103".to_string(), "M1805".to_string()],
        romes_to_remove: vec!["D1102".to_string()],
        ..OfficeUpdate::default()
    };
    let office = offices()
        .into_iter()
        .find(|o| o.siret == SUPERMARKET)
        .expect("supermarket office");
    let document = builder.build_document(&office, Some(&update)).expect("document");

    // boosted romes are kept whatever their score
    assert_eq!(document.scores_by_rome.get("N1103"), Some(&4));
    // M1805 is unrelated to the NAF and keeps the general score
    assert_eq!(document.scores_by_rome.get("M1805"), Some(&90));
    assert!(!document.scores_by_rome.contains_key("D1102"));
    let boosted: Vec<&str> = document.boosted_romes.iter().map(String::as_str).collect();
    assert_eq!(boosted, vec!["M1805", "N1103"]);
    assert!(document.boosted_alternance_romes.is_empty());
}

#[test]
fn boost_without_romes_boosts_everything() {
    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let update = OfficeUpdate {
        siret: HOME_CARE.to_string(),
        boost: true,
        ..OfficeUpdate::default()
    };
    let office = offices()
        .into_iter()
        .find(|o| o.siret == HOME_CARE)
        .expect("home care office");

    let plain = builder.build_document(&office, None).expect("document");
    assert!(!plain.is_reachable());

    let boosted = builder.build_document(&office, Some(&update)).expect("document");
    assert_eq!(boosted.scores_by_rome.get("K1302"), Some(&9));
    assert_eq!(boosted.scores_by_rome.get("K1304"), Some(&3));
    assert_eq!(boosted.boosted_romes.len(), 2);
    assert!(boosted.scores_alternance_by_rome.is_empty());
}

#[test]
fn ranking_puts_boosted_offices_first() {
    let engine = engine();
    let builder = IndexBuilder::new(&engine);
    let update = OfficeUpdate {
        siret: SUPERMARKET.to_string(),
        boost: true,
        romes_to_boost: vec!["N1103".to_string()],
        ..OfficeUpdate::default()
    };
    let documents = builder
        .build_documents(&offices(), &updates(vec![update]))
        .expect("documents");

    let ranked = rank_for_rome(&engine, &documents, "n1103", ScoreKind::Dpae);
    let sirets: Vec<&str> = ranked.iter().map(|r| r.siret.as_str()).collect();
    assert_eq!(sirets, vec![SUPERMARKET, TRUCKING]);
    assert!(ranked[0].boosted);
    assert_eq!(ranked[0].score, 4);
    assert_eq!(ranked[1].score, 45);
    assert_eq!(ranked[1].stars, 3.3);

    let unranked = rank_for_rome(&engine, &documents, "N1103", ScoreKind::Alternance);
    assert!(unranked.iter().all(|r| r.score >= 20));
}
