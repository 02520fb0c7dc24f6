//! Tests for layered settings resolution.

use std::collections::BTreeMap;

use treasure_hunt::{
    GameSettings, HINT_DELAY_SECONDS, POINTS_SOLVE, SETTING_KEYS, SETTING_LIMIT, TIME_PENALTY_POINTS,
    TIME_PENALTY_WINDOW_SECONDS,
};

#[test]
fn test_defaults() {
    let settings = GameSettings::default();
    assert_eq!(*settings.hint_delay_seconds(), 20);
    assert_eq!(*settings.points_solve(), 10);
    assert_eq!(*settings.penalty_hint(), 3);
    assert_eq!(*settings.penalty_skip(), 8);
    assert_eq!(*settings.time_penalty_window_seconds(), 120);
    assert_eq!(*settings.time_penalty_points(), 1);
}

#[test]
fn test_environment_beats_persisted_beats_default() {
    let persisted = BTreeMap::from([
        (POINTS_SOLVE.to_string(), 25),
        (HINT_DELAY_SECONDS.to_string(), 45),
    ]);
    let env = BTreeMap::from([(HINT_DELAY_SECONDS.to_string(), " 5 ".to_string())]);
    let settings = GameSettings::resolve(&persisted, &env).expect("Resolve failed");
    assert_eq!(*settings.points_solve(), 25);
    assert_eq!(*settings.hint_delay_seconds(), 5);
    assert_eq!(*settings.penalty_skip(), 8);
}

#[test]
fn test_unknown_persisted_keys_are_ignored() {
    let persisted = BTreeMap::from([("FIRST_CLUE_ID".to_string(), 1)]);
    let settings = GameSettings::resolve(&persisted, &BTreeMap::new()).expect("Resolve failed");
    assert_eq!(settings, GameSettings::default());
}

#[test]
fn test_non_integer_override_is_rejected() {
    let env = BTreeMap::from([(POINTS_SOLVE.to_string(), "ten".to_string())]);
    assert!(GameSettings::resolve(&BTreeMap::new(), &env).is_err());
}

#[test]
fn test_zero_window_is_rejected() {
    let persisted = BTreeMap::from([(TIME_PENALTY_WINDOW_SECONDS.to_string(), 0)]);
    let err = GameSettings::resolve(&persisted, &BTreeMap::new()).unwrap_err();
    assert!(err.message.contains(TIME_PENALTY_WINDOW_SECONDS));
}

#[test]
fn test_map_round_trip() {
    let mut settings = GameSettings::default();
    assert!(settings.set(POINTS_SOLVE, 12));
    assert!(!settings.set("NOPE", 1));
    let map = settings.to_map();
    assert_eq!(map.len(), 6);
    assert_eq!(map[POINTS_SOLVE], 12);
    let rebuilt = GameSettings::resolve(&map, &BTreeMap::new()).expect("Resolve failed");
    assert_eq!(rebuilt, settings);
}

#[test]
fn test_values_beyond_limit_are_rejected() {
    for key in SETTING_KEYS {
        let persisted = BTreeMap::from([(key.to_string(), SETTING_LIMIT + 1)]);
        let err = GameSettings::resolve(&persisted, &BTreeMap::new()).unwrap_err();
        assert!(err.message.contains(key), "{key}: {}", err.message);
    }
    let persisted = BTreeMap::from([(TIME_PENALTY_POINTS.to_string(), SETTING_LIMIT)]);
    assert!(GameSettings::resolve(&persisted, &BTreeMap::new()).is_ok());
}

#[test]
fn test_negative_hint_delay_is_rejected() {
    let env = BTreeMap::from([(HINT_DELAY_SECONDS.to_string(), "-1".to_string())]);
    assert!(GameSettings::resolve(&BTreeMap::new(), &env).is_err());
}
