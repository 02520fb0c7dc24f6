//! Tests for database repository operations.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tempfile::NamedTempFile;

use treasure_hunt::{AnswerType, Clue, GameSettings, Position, select_variant};
use treasure_hunt_server::{DbError, HuntRepository, ProgressChange, TeamMove};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, HuntRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = HuntRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn text_clue(id: i32, order_index: i32) -> Clue {
    Clue::new(
        id,
        format!("Clue {id}"),
        "Look under the bench".to_string(),
        "Look behind the tree".to_string(),
        AnswerType::Text,
        "acorn, oak".to_string(),
        "It grows on trees".to_string(),
        order_index,
        false,
    )
}

#[test]
fn test_empty_path_is_rejected() {
    assert!(HuntRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_seed_inserts_six_placeholder_clues_once() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.seed_default_clues().expect("Seed failed"), 6);
    assert_eq!(repo.seed_default_clues().expect("Seed failed"), 0);

    let clues = repo.list_clues().expect("List failed");
    assert_eq!(clues.len(), 6);
    assert_eq!(clues[0].title(), "Clue 1");
    assert_eq!(*clues[0].answer_type(), AnswerType::Tap);
    assert!(*clues[5].is_final());
    assert!(clues[..5].iter().all(|c| !*c.is_final()));
}

#[test]
fn test_clue_crud() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.next_clue_id().expect("Query failed"), 1);

    let created = repo.insert_clue(&text_clue(4, 1)).expect("Insert failed");
    assert_eq!(*created.id(), 4);
    assert_eq!(repo.next_clue_id().expect("Query failed"), 5);
    assert!(repo.insert_clue(&text_clue(4, 2)).is_err(), "Duplicate id should fail");

    let renamed = Clue::new(
        4,
        "Renamed".to_string(),
        "a".to_string(),
        "b".to_string(),
        AnswerType::Tap,
        String::new(),
        String::new(),
        1,
        true,
    );
    let updated = repo
        .update_clue(&renamed)
        .expect("Update failed")
        .expect("Clue missing");
    assert_eq!(updated.title(), "Renamed");
    let unknown = Clue::new(
        99,
        "Nowhere".to_string(),
        "a".to_string(),
        "b".to_string(),
        AnswerType::Tap,
        String::new(),
        String::new(),
        1,
        false,
    );
    assert!(repo.update_clue(&unknown).expect("Update failed").is_none());

    assert!(repo.delete_clue(4).expect("Delete failed"));
    assert!(!repo.delete_clue(4).expect("Delete failed"));
    assert!(repo.get_clue(4).expect("Query failed").is_none());
}

#[test]
fn test_mcq_payload_survives_storage() {
    let (_db, repo) = setup_test_db();
    let clue = Clue::new(
        1,
        "Colour".to_string(),
        "Pick one".to_string(),
        "Choose one".to_string(),
        AnswerType::Mcq,
        r#"["Red","Green"]"#.to_string(),
        String::new(),
        1,
        true,
    );
    repo.insert_clue(&clue).expect("Insert failed");
    let stored = repo.get_clue(1).expect("Query failed").expect("Clue missing");
    assert_eq!(stored.choices(), vec!["Red".to_string(), "Green".to_string()]);
}

#[test]
fn test_reorder_rewrites_order_indices() {
    let (_db, repo) = setup_test_db();
    for id in 1..=3 {
        repo.insert_clue(&text_clue(id, id)).expect("Insert failed");
    }
    repo.reorder_clues(&[3, 1, 2]).expect("Reorder failed");

    let ids: Vec<i32> = repo
        .list_clues()
        .expect("List failed")
        .iter()
        .map(|c| *c.id())
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn test_settings_upsert() {
    let (_db, repo) = setup_test_db();
    assert!(repo.load_settings().expect("Load failed").is_empty());

    let mut values = BTreeMap::new();
    values.insert("POINTS_SOLVE".to_string(), 15);
    repo.save_settings(&values).expect("Save failed");
    values.insert("POINTS_SOLVE".to_string(), 25);
    values.insert("PENALTY_HINT".to_string(), 4);
    repo.save_settings(&values).expect("Save failed");

    let loaded = repo.load_settings().expect("Load failed");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded["POINTS_SOLVE"], 25);
}

#[test]
fn test_replace_hunt_swaps_clues_and_settings() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");

    let settings = GameSettings::default();
    repo.replace_hunt(&[text_clue(10, 1), text_clue(11, 2)], &settings)
        .expect("Replace failed");

    let ids: Vec<i32> = repo
        .list_clues()
        .expect("List failed")
        .iter()
        .map(|c| *c.id())
        .collect();
    assert_eq!(ids, vec![10, 11]);
    assert_eq!(repo.load_settings().expect("Load failed"), settings.to_map());
}

#[test]
fn test_get_or_create_team_records_arrival_and_variant() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");

    let (team, created) = repo
        .get_or_create_team("Red Foxes", Position::AtClue(1), t0())
        .expect("Create failed");
    assert!(created);
    assert_eq!(team.position(), Position::AtClue(1));
    assert_eq!(*team.score(), 0);

    let visits = repo.team_visits("Red Foxes").expect("Query failed");
    assert_eq!(visits.len(), 1);
    assert_eq!(*visits[0].arrived_at(), t0());
    assert_eq!(
        visits[0].parse_variant().expect("Bad variant"),
        select_variant("Red Foxes", 1)
    );

    let later = t0() + TimeDelta::minutes(5);
    let (again, created) = repo
        .get_or_create_team("Red Foxes", Position::AtClue(1), later)
        .expect("Lookup failed");
    assert!(!created);
    assert_eq!(*again.started_at(), t0());
}

#[test]
fn test_apply_progress_advances_and_opens_next_visit() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");
    repo.get_or_create_team("alpha", Position::AtClue(1), t0())
        .expect("Create failed");

    let at = t0() + TimeDelta::seconds(30);
    let change = repo
        .apply_progress::<DbError, _>("alpha", 1, at, |team, visit, completed| {
            assert!(completed.is_empty());
            assert_eq!(*visit.hints_used(), 0);
            Ok(ProgressChange {
                score: team.score() + 10,
                skips_used: *team.skips_used(),
                hints_used: 0,
                solved_at: Some(at),
                skipped: false,
                next: Some(TeamMove {
                    to: Position::AtClue(2),
                    at,
                }),
            })
        })
        .expect("Apply failed");
    assert_eq!(change.score, 10);

    let team = repo.get_team("alpha").expect("Query failed").expect("Team missing");
    assert_eq!(team.position(), Position::AtClue(2));
    let visits = repo.team_visits("alpha").expect("Query failed");
    assert_eq!(visits.len(), 2);
    let first = visits.iter().find(|v| *v.clue_id() == 1).expect("Visit missing");
    assert_eq!(*first.solved_at(), Some(at));
    let second = visits.iter().find(|v| *v.clue_id() == 2).expect("Visit missing");
    assert_eq!(*second.arrived_at(), at);
    assert_eq!(second.parse_variant().expect("Bad variant"), select_variant("alpha", 2));
}

#[test]
fn test_apply_progress_rejection_writes_nothing() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");
    repo.get_or_create_team("alpha", Position::AtClue(1), t0())
        .expect("Create failed");

    let result = repo.apply_progress::<DbError, _>("alpha", 1, t0(), |_, _, _| {
        Err(DbError::new("rejected"))
    });
    assert!(result.is_err());

    let team = repo.get_team("alpha").expect("Query failed").expect("Team missing");
    assert_eq!(*team.score(), 0);
    assert_eq!(team.position(), Position::AtClue(1));
}

#[test]
fn test_apply_progress_to_finished() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");
    repo.get_or_create_team("alpha", Position::AtClue(6), t0())
        .expect("Create failed");

    let at = t0() + TimeDelta::minutes(3);
    repo.apply_progress::<DbError, _>("alpha", 6, at, |team, _, _| {
        Ok(ProgressChange {
            score: *team.score() - 8,
            skips_used: team.skips_used() + 1,
            hints_used: 0,
            solved_at: Some(at),
            skipped: true,
            next: Some(TeamMove {
                to: Position::Finished,
                at,
            }),
        })
    })
    .expect("Apply failed");

    let team = repo.get_team("alpha").expect("Query failed").expect("Team missing");
    assert_eq!(team.position(), Position::Finished);
    assert_eq!(*team.score(), -8);
    assert_eq!(team.elapsed_seconds(), Some(180));
}

#[test]
fn test_finish_team_only_from_expected_clue() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");
    repo.get_or_create_team("alpha", Position::AtClue(2), t0())
        .expect("Create failed");

    assert!(!repo.finish_team("alpha", 1, t0()).expect("Update failed"));
    assert!(repo.finish_team("alpha", 2, t0()).expect("Update failed"));
    assert!(!repo.finish_team("alpha", 2, t0()).expect("Update failed"));
    let team = repo.get_team("alpha").expect("Query failed").expect("Team missing");
    assert!(team.position().is_finished());
}

#[test]
fn test_reset_progress_keeps_clues() {
    let (_db, repo) = setup_test_db();
    repo.seed_default_clues().expect("Seed failed");
    repo.get_or_create_team("alpha", Position::AtClue(1), t0())
        .expect("Create failed");
    repo.get_or_create_team("beta", Position::AtClue(1), t0())
        .expect("Create failed");

    assert_eq!(repo.reset_progress().expect("Reset failed"), 2);
    assert!(repo.list_teams().expect("List failed").is_empty());
    assert!(repo.list_visits().expect("List failed").is_empty());
    assert_eq!(repo.list_clues().expect("List failed").len(), 6);
}
