//! Clue records and answer checking.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::Variant;

/// Identifier of a clue. Positive and unique.
pub type ClueId = i32;

/// How a team answers a clue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnswerType {
    /// Tapping "found it" is enough.
    Tap,
    /// Free text matched against a comma-separated list of accepted answers.
    Text,
    /// One of a JSON array of choices.
    Mcq,
}

/// Problems with an answer payload or a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AnswerError {
    /// Text and multiple-choice clues need something to match against.
    #[display("Options are required for {} clues", _0)]
    MissingPayload(AnswerType),

    /// The multiple-choice payload is not a JSON array of strings.
    #[display("Multiple-choice options must be a JSON array of strings: {}", _0)]
    InvalidChoices(String),
}

impl std::error::Error for AnswerError {}

/// A clue record that breaks a field rule.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("Clue {}: {}", clue_id, reason)]
pub struct InvalidClue {
    /// Offending clue.
    pub clue_id: ClueId,
    /// What is wrong with it.
    pub reason: String,
}

impl std::error::Error for InvalidClue {}

impl AnswerType {
    /// Checks that `payload` has the shape this answer type needs.
    ///
    /// # Errors
    ///
    /// Returns [`AnswerError`] if text/mcq payloads are empty or an mcq
    /// payload is not a JSON array of strings.
    #[instrument(skip(payload))]
    pub fn validate_payload(&self, payload: &str) -> Result<(), AnswerError> {
        match self {
            Self::Tap => Ok(()),
            Self::Text => {
                if accepted_answers(payload).is_empty() {
                    Err(AnswerError::MissingPayload(*self))
                } else {
                    Ok(())
                }
            }
            Self::Mcq => {
                if payload.trim().is_empty() {
                    return Err(AnswerError::MissingPayload(*self));
                }
                parse_choices(payload).map(|_| ())
            }
        }
    }

    /// Returns whether `submitted` answers a clue with this type and payload.
    ///
    /// A malformed mcq payload accepts nothing.
    #[instrument(skip(payload, submitted))]
    pub fn accepts(&self, payload: &str, submitted: &str) -> bool {
        let accepted = match self {
            Self::Tap => true,
            Self::Text => {
                let submitted = submitted.trim().to_lowercase();
                !submitted.is_empty() && accepted_answers(payload).contains(&submitted)
            }
            Self::Mcq => parse_choices(payload)
                .map(|choices| choices.iter().any(|c| c == submitted.trim()))
                .unwrap_or(false),
        };
        debug!(answer_type = %self, accepted, "Answer checked");
        accepted
    }
}

/// Splits a text payload into trimmed, lower-cased, non-empty answers.
fn accepted_answers(payload: &str) -> Vec<String> {
    payload
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses a multiple-choice payload.
///
/// # Errors
///
/// Returns [`AnswerError::InvalidChoices`] if the payload is not a JSON
/// array of strings.
pub fn parse_choices(payload: &str) -> Result<Vec<String>, AnswerError> {
    serde_json::from_str::<Vec<String>>(payload)
        .map_err(|e| AnswerError::InvalidChoices(e.to_string()))
}

/// A single puzzle step.
///
/// Serializes to the export shape, where a multiple-choice payload is a JSON
/// array. On input it may be given either as an array or as a string holding
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Getters, new)]
pub struct Clue {
    id: ClueId,
    title: String,
    body_variant_a: String,
    body_variant_b: String,
    answer_type: AnswerType,
    #[serde(deserialize_with = "payload_from_string_or_list")]
    answer_payload: String,
    hint_text: String,
    order_index: i32,
    is_final: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadInput {
    Text(String),
    List(Vec<String>),
}

#[derive(Serialize)]
#[serde(untagged)]
enum PayloadOutput<'a> {
    Text(&'a str),
    List(Vec<String>),
}

#[derive(Serialize)]
struct ClueRecord<'a> {
    id: ClueId,
    title: &'a str,
    body_variant_a: &'a str,
    body_variant_b: &'a str,
    answer_type: AnswerType,
    answer_payload: PayloadOutput<'a>,
    hint_text: &'a str,
    order_index: i32,
    is_final: bool,
}

impl Serialize for Clue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let answer_payload = match self.answer_type {
            AnswerType::Mcq => match parse_choices(&self.answer_payload) {
                Ok(choices) => PayloadOutput::List(choices),
                Err(_) => PayloadOutput::Text(&self.answer_payload),
            },
            AnswerType::Tap | AnswerType::Text => PayloadOutput::Text(&self.answer_payload),
        };
        ClueRecord {
            id: self.id,
            title: &self.title,
            body_variant_a: &self.body_variant_a,
            body_variant_b: &self.body_variant_b,
            answer_type: self.answer_type,
            answer_payload,
            hint_text: &self.hint_text,
            order_index: self.order_index,
            is_final: self.is_final,
        }
        .serialize(serializer)
    }
}

fn payload_from_string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match PayloadInput::deserialize(deserializer)? {
        PayloadInput::Text(text) => Ok(text),
        PayloadInput::List(items) => serde_json::to_string(&items).map_err(serde::de::Error::custom),
    }
}

impl Clue {
    /// Checks field rules: positive id, order index from 1, non-empty title
    /// and bodies, and a payload that fits the answer type.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidClue`] naming the first broken rule.
    #[instrument(skip(self), fields(clue_id = self.id))]
    pub fn validate(&self) -> Result<(), InvalidClue> {
        let invalid = |reason: String| InvalidClue {
            clue_id: self.id,
            reason,
        };
        if self.id < 1 {
            return Err(invalid(format!("id must be >= 1, got {}", self.id)));
        }
        if self.order_index < 1 {
            return Err(invalid(format!(
                "order_index must be >= 1, got {}",
                self.order_index
            )));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title is required".to_string()));
        }
        if self.body_variant_a.trim().is_empty() || self.body_variant_b.trim().is_empty() {
            return Err(invalid("both body variants are required".to_string()));
        }
        self.answer_type
            .validate_payload(&self.answer_payload)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Returns the body text for the given variant.
    pub fn body(&self, variant: Variant) -> &str {
        match variant {
            Variant::A => &self.body_variant_a,
            Variant::B => &self.body_variant_b,
        }
    }

    /// Returns the choices of a multiple-choice clue, empty for other types.
    #[instrument(skip(self), fields(clue_id = self.id))]
    pub fn choices(&self) -> Vec<String> {
        match self.answer_type {
            AnswerType::Mcq => parse_choices(&self.answer_payload).unwrap_or_default(),
            AnswerType::Tap | AnswerType::Text => Vec::new(),
        }
    }

    /// Returns whether `submitted` solves this clue.
    pub fn accepts(&self, submitted: &str) -> bool {
        self.answer_type.accepts(&self.answer_payload, submitted)
    }

}
