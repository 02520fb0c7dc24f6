//! Tests for clue answer checking and validation.

use treasure_hunt::{AnswerType, Clue, Variant};

fn clue(answer_type: AnswerType, payload: &str) -> Clue {
    clue_at(3, 3, answer_type, payload)
}

fn clue_at(id: i32, order_index: i32, answer_type: AnswerType, payload: &str) -> Clue {
    Clue::new(
        id,
        "Fountain".to_string(),
        "Where water sings".to_string(),
        "Where coins sleep".to_string(),
        answer_type,
        payload.to_string(),
        "Look down".to_string(),
        order_index,
        false,
    )
}

#[test]
fn test_tap_accepts_anything() {
    assert!(clue(AnswerType::Tap, "").accepts(""));
}

#[test]
fn test_text_matches_any_listed_answer() {
    let clue = clue(AnswerType::Text, "Fountain, well");
    assert!(clue.accepts("fountain"));
    assert!(clue.accepts("  WELL "));
    assert!(!clue.accepts("pond"));
    assert!(!clue.accepts(""));
}

#[test]
fn test_mcq_requires_a_listed_choice() {
    let clue = clue(AnswerType::Mcq, r#"["North", "South"]"#);
    assert!(clue.accepts("North"));
    assert!(!clue.accepts("north"));
    assert!(!clue.accepts("East"));
    assert_eq!(clue.choices(), vec!["North", "South"]);
}

#[test]
fn test_body_follows_variant() {
    let clue = clue(AnswerType::Tap, "");
    assert_eq!(clue.body(Variant::A), "Where water sings");
    assert_eq!(clue.body(Variant::B), "Where coins sleep");
}

#[test]
fn test_validate_rules() {
    assert!(clue(AnswerType::Tap, "").validate().is_ok());
    assert!(clue(AnswerType::Text, "").validate().is_err());
    assert!(clue(AnswerType::Mcq, "[1, 2]").validate().is_err());
    assert!(clue_at(3, 0, AnswerType::Tap, "").validate().is_err());
    assert!(clue_at(0, 3, AnswerType::Tap, "").validate().is_err());
}
