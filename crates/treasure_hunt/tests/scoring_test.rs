//! Tests for the scoring engine.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use treasure_hunt::{
    ClueProgress, GameSettings, HintAvailability, ScoringEngine, ScoringError, ScoringEvent,
};

fn arrival() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn after(seconds: i64) -> NaiveDateTime {
    arrival() + TimeDelta::seconds(seconds)
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(GameSettings::default())
}

#[test]
fn test_solve_with_no_elapsed_time_adds_solve_points() {
    let progress = ClueProgress::new(0, 0, 0, arrival());
    let update = engine()
        .apply(&progress, ScoringEvent::Solve { at: arrival() })
        .expect("Solve rejected");
    assert_eq!(*update.score(), 10);
    assert_eq!(*update.time_penalty(), 0);
    assert!(*update.advances());
}

#[test]
fn test_time_penalty_counts_whole_windows() {
    let progress = ClueProgress::new(0, 0, 0, arrival());
    let update = engine()
        .apply(&progress, ScoringEvent::Solve { at: after(305) })
        .expect("Solve rejected");
    assert_eq!(*update.time_penalty(), 2);
    assert_eq!(*update.score(), 8);
}

#[test]
fn test_time_penalty_uses_configured_points() {
    let mut settings = GameSettings::default();
    settings.set(treasure_hunt::TIME_PENALTY_WINDOW_SECONDS, 60);
    settings.set(treasure_hunt::TIME_PENALTY_POINTS, 3);
    let engine = ScoringEngine::new(settings);
    assert_eq!(engine.time_penalty(arrival(), after(59)), 0);
    assert_eq!(engine.time_penalty(arrival(), after(60)), 3);
    assert_eq!(engine.time_penalty(arrival(), after(185)), 9);
}

#[test]
fn test_elapsed_time_is_clamped_at_zero() {
    let progress = ClueProgress::new(5, 0, 0, arrival());
    let update = engine()
        .apply(&progress, ScoringEvent::Solve { at: after(-600) })
        .expect("Solve rejected");
    assert_eq!(*update.time_penalty(), 0);
    assert_eq!(*update.score(), 15);
}

#[test]
fn test_two_hints_cost_twice_the_penalty() {
    let engine = engine();
    let progress = ClueProgress::new(0, 0, 0, arrival());
    let first = engine
        .apply(&progress, ScoringEvent::HintUsed { at: after(30), seen: None })
        .expect("First hint rejected");
    let progress = ClueProgress::new(*first.score(), *first.hints_used(), 0, arrival());
    let second = engine
        .apply(&progress, ScoringEvent::HintUsed { at: after(40), seen: None })
        .expect("Second hint rejected");
    assert_eq!(*second.score(), -6);
    assert_eq!(*second.hints_used(), 2);
    assert!(!*second.advances());
}

#[test]
fn test_early_hint_is_rejected() {
    let progress = ClueProgress::new(0, 0, 0, arrival());
    let result = engine().apply(&progress, ScoringEvent::HintUsed { at: after(5), seen: None });
    assert_eq!(
        result,
        Err(ScoringError::HintNotYetAvailable { remaining_seconds: 15 })
    );
}

#[test]
fn test_stale_hint_request_is_rejected() {
    let progress = ClueProgress::new(-3, 1, 0, arrival());
    let result = engine().apply(
        &progress,
        ScoringEvent::HintUsed {
            at: after(60),
            seen: Some(0),
        },
    );
    assert_eq!(result, Err(ScoringError::DuplicateHint { seen: 0, hints_used: 1 }));

    let accepted = engine()
        .apply(
            &progress,
            ScoringEvent::HintUsed {
                at: after(60),
                seen: Some(1),
            },
        )
        .expect("Fresh hint rejected");
    assert_eq!(*accepted.hints_used(), 2);
}

#[test]
fn test_skip_applies_penalty_and_advances() {
    let progress = ClueProgress::new(2, 0, 1, arrival());
    let update = engine()
        .apply(&progress, ScoringEvent::Skip { at: after(500) })
        .expect("Skip rejected");
    assert_eq!(*update.score(), -6);
    assert_eq!(*update.skips_used(), 2);
    assert_eq!(*update.time_penalty(), 0);
    assert!(*update.advances());
}

#[test]
fn test_hint_availability_counts_down() {
    let engine = engine();
    assert_eq!(
        engine.hint_availability(arrival(), after(0)),
        HintAvailability::Locked { remaining_seconds: 20 }
    );
    assert_eq!(engine.hint_availability(arrival(), after(20)), HintAvailability::Available);
    assert_eq!(engine.hint_availability(arrival(), after(19)).remaining_seconds(), 1);
}

#[test]
fn test_extreme_values_saturate() {
    let mut settings = GameSettings::default();
    settings.set(treasure_hunt::TIME_PENALTY_POINTS, i64::MAX);
    let engine = ScoringEngine::new(settings);
    assert_eq!(engine.time_penalty(arrival(), after(240)), i64::MAX);

    let progress = ClueProgress::new(i64::MIN + 5, 0, 0, arrival());
    let update = engine
        .apply(&progress, ScoringEvent::Solve { at: after(240) })
        .expect("Solve rejected");
    assert_eq!(*update.score(), i64::MIN);
}
