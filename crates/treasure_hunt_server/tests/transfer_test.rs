//! Tests for hunt export and import.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::NamedTempFile;

use treasure_hunt::{AnswerType, HuntDocument, Position};
use treasure_hunt_server::views::RedirectTarget;
use treasure_hunt_server::{HuntError, HuntRepository, HuntService, ManualClock};

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn setup() -> (NamedTempFile, HuntService) {
    let db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db.path().to_str().expect("Invalid path").to_string();
    let repo = HuntRepository::new(db_path).expect("Failed to create repository");
    let service = HuntService::open(repo, BTreeMap::new())
        .expect("Open failed")
        .with_clock(ManualClock::new(t0()));
    (db, service)
}

const DOCUMENT: &str = r#"{
  "clues": [
    {
      "id": 3,
      "title": "Fountain",
      "body_variant_a": "Where water dances",
      "body_variant_b": "Where coins are wished",
      "answer_type": "mcq",
      "answer_payload": ["North", "South"],
      "hint_text": "Listen",
      "order_index": 2,
      "is_final": true
    },
    {
      "id": 8,
      "title": "Gate",
      "body_variant_a": "Iron bars",
      "body_variant_b": "Painted green",
      "answer_type": "text",
      "answer_payload": "gate, door",
      "hint_text": "Entrance",
      "order_index": 1,
      "is_final": false
    }
  ],
  "config": {
    "HINT_DELAY_SECONDS": 30,
    "POINTS_SOLVE": 12,
    "PENALTY_HINT": 2,
    "PENALTY_SKIP": 5,
    "TIME_PENALTY_WINDOW_SECONDS": 60,
    "TIME_PENALTY_POINTS": 2
  }
}"#;

#[test]
fn test_import_replaces_clues_and_settings() {
    let (_db, service) = setup();
    assert_eq!(service.import_json(DOCUMENT).expect("Import failed"), 2);

    let clues = service.list_clues().expect("List failed");
    let ids: Vec<i32> = clues.iter().map(|c| *c.id()).collect();
    assert_eq!(ids, vec![8, 3]);
    assert_eq!(*clues[1].answer_type(), AnswerType::Mcq);
    assert_eq!(clues[1].choices(), vec!["North".to_string(), "South".to_string()]);

    let settings = service.settings();
    assert_eq!(*settings.points_solve(), 12);
    assert_eq!(*settings.hint_delay_seconds(), 30);
}

#[test]
fn test_export_then_import_is_identical() {
    let (_db, service) = setup();
    service.import_json(DOCUMENT).expect("Import failed");
    let exported = service.export().expect("Export failed");
    let json = exported.to_json().expect("Serialize failed");

    let (_other_db, other) = setup();
    other.import_json(&json).expect("Import failed");
    assert_eq!(other.export().expect("Export failed"), exported);
}

#[test]
fn test_export_shape() {
    let (_db, service) = setup();
    let json = service.export().expect("Export failed").to_json().expect("Serialize failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");

    assert_eq!(value["clues"].as_array().map(Vec::len), Some(6));
    assert_eq!(value["clues"][0]["answer_type"], "tap");
    assert_eq!(value["clues"][5]["is_final"], true);
    assert_eq!(value["config"]["POINTS_SOLVE"], 10);
    assert_eq!(value["config"]["TIME_PENALTY_WINDOW_SECONDS"], 120);
}

#[test]
fn test_mcq_payload_exports_as_array() {
    let (_db, service) = setup();
    service.import_json(DOCUMENT).expect("Import failed");
    let json = service.export().expect("Export failed").to_json().expect("Serialize failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("Invalid JSON");

    let mcq = &value["clues"][1];
    assert_eq!(mcq["answer_type"], "mcq");
    assert!(mcq["answer_payload"].is_array(), "Payload: {}", mcq["answer_payload"]);
    assert_eq!(mcq["answer_payload"], serde_json::json!(["North", "South"]));
    assert_eq!(value["clues"][0]["answer_payload"], "gate, door");
}

#[test]
fn test_malformed_import_changes_nothing() {
    let (_db, service) = setup();
    let before = service.export().expect("Export failed");

    let missing_field = DOCUMENT.replace("\"title\": \"Gate\",", "");
    let bad_type = DOCUMENT.replace("\"text\"", "\"riddle\"");
    let bad_config = DOCUMENT.replace("\"TIME_PENALTY_WINDOW_SECONDS\": 60", "\"TIME_PENALTY_WINDOW_SECONDS\": 0");
    let duplicate = DOCUMENT.replace("\"id\": 8", "\"id\": 3");

    for json in ["not json", missing_field.as_str(), bad_type.as_str(), bad_config.as_str(), duplicate.as_str()] {
        let result = service.import_json(json);
        assert!(matches!(result, Err(HuntError::Document(_))), "Accepted: {json}");
    }
    assert_eq!(service.export().expect("Export failed"), before);
}

#[test]
fn test_import_finishes_team_whose_clue_vanished() {
    let (_db, service) = setup();
    service.start("alpha").expect("Start failed");
    service.import_json(DOCUMENT).expect("Import failed");

    let outcome = service.view_clue(Some("alpha"), 8).expect("View failed");
    assert_eq!(outcome.target(), Some(RedirectTarget::Finished));
    let team = service
        .repository()
        .get_team("alpha")
        .expect("Query failed")
        .expect("Team missing");
    assert_eq!(team.position(), Position::Finished);
}

#[test]
fn test_document_parses_export_of_seeded_hunt() {
    let (_db, service) = setup();
    let json = service.export().expect("Export failed").to_json().expect("Serialize failed");
    let parsed = HuntDocument::from_json(&json).expect("Parse failed");
    assert_eq!(parsed, service.export().expect("Export failed"));
}
