//! Pulls a structured payload out of untrusted completion text.
//!
//! The service is asked for a bare JSON object but may wrap it in prose or
//! code fences. The payload is taken to be everything from the first `{` to
//! the last `}`. Nothing is repaired: a reply either yields a fully valid
//! draft or an error naming what was wrong.

use super::prompt::MAX_TOPIC_CHARS;
use crate::progression::{
    validate_chord, ChordFingering, ExplanationDraft, ExplanationEntry, ProgressionDraft,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Explanations are asked to stay within 100 words; replies are accepted up
/// to this many.
pub const MAX_EXPLANATION_WORDS_ACCEPTED: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("{0}")]
    Malformed(String),

    #[error("field '{field}' {reason}")]
    SchemaViolation { field: String, reason: String },
}

fn violation(field: impl Into<String>, reason: impl Into<String>) -> CompletionError {
    CompletionError::SchemaViolation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Locates and parses the JSON object embedded in `raw`.
pub fn extract_object(raw: &str) -> Result<Map<String, Value>, CompletionError> {
    let start = raw
        .find('{')
        .ok_or_else(|| CompletionError::Malformed("no opening brace in completion".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| CompletionError::Malformed("no closing brace in completion".into()))?;
    if end < start {
        return Err(CompletionError::Malformed(
            "closing brace precedes opening brace".into(),
        ));
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CompletionError::Malformed(
            "completion payload is not a JSON object".into(),
        )),
        Err(e) => Err(CompletionError::Malformed(format!(
            "completion payload is not valid JSON: {}",
            e
        ))),
    }
}

pub fn extract_progression(raw: &str) -> Result<ProgressionDraft, CompletionError> {
    let obj = extract_object(raw)?;

    // "result" is what the prompt asks for; stored records use "progression".
    let (chords_field, chords) = match (obj.get("progression"), obj.get("result")) {
        (Some(v), _) if !v.is_null() => ("progression", v),
        (_, Some(v)) if !v.is_null() => ("result", v),
        _ => return Err(violation("result", "is missing")),
    };
    let progression = chord_list(chords_field, chords)?;

    Ok(ProgressionDraft {
        progression,
        context: required_text(&obj, "context")?,
        key: required_text(&obj, "key")?,
        scale: required_text(&obj, "scale")?,
        tempo: required_text(&obj, "tempo")?,
        style: required_text(&obj, "style")?,
        fingering: match obj.get("fingering") {
            None | Some(Value::Null) => None,
            Some(v) => Some(fingering_list("fingering", v)?),
        },
        strumming_pattern: match obj.get("strumming_pattern") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(violation("strumming_pattern", "must be a string")),
        },
    })
}

pub fn extract_explanation(raw: &str) -> Result<ExplanationDraft, CompletionError> {
    let obj = extract_object(raw)?;
    let items = non_empty_array(&obj, "result")?;

    let mut result = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let field = format!("result[{}]", i);
        let entry = item
            .as_object()
            .ok_or_else(|| violation(&field, "must be an object"))?;
        let topic = required_string(entry, &field, "topic")?;
        let explanation = required_string(entry, &field, "explanation")?;

        if topic.trim().is_empty() {
            return Err(violation(format!("{}.topic", field), "must not be empty"));
        }
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(violation(
                format!("{}.topic", field),
                format!("exceeds {} characters", MAX_TOPIC_CHARS),
            ));
        }
        let words = explanation.split_whitespace().count();
        if words == 0 {
            return Err(violation(
                format!("{}.explanation", field),
                "must not be empty",
            ));
        }
        if words > MAX_EXPLANATION_WORDS_ACCEPTED {
            return Err(violation(
                format!("{}.explanation", field),
                format!("has {} words, limit is {}", words, MAX_EXPLANATION_WORDS_ACCEPTED),
            ));
        }

        result.push(ExplanationEntry { topic, explanation });
    }

    Ok(ExplanationDraft { result })
}

pub fn extract_tablature(raw: &str) -> Result<Vec<ChordFingering>, CompletionError> {
    let obj = extract_object(raw)?;
    let value = obj
        .get("result")
        .filter(|v| !v.is_null())
        .ok_or_else(|| violation("result", "is missing"))?;
    let fingering = fingering_list("result", value)?;
    if fingering.is_empty() {
        return Err(violation("result", "must not be empty"));
    }
    Ok(fingering)
}

fn chord_list(field: &str, value: &Value) -> Result<Vec<String>, CompletionError> {
    let items = value
        .as_array()
        .ok_or_else(|| violation(field, "must be an array of chord names"))?;
    if items.is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let chord = item
                .as_str()
                .ok_or_else(|| violation(format!("{}[{}]", field, i), "must be a string"))?;
            validate_chord(i, chord)
                .map_err(|e| violation(format!("{}[{}]", field, i), e.to_string()))?;
            Ok(chord.to_string())
        })
        .collect()
}

fn fingering_list(field: &str, value: &Value) -> Result<Vec<ChordFingering>, CompletionError> {
    let items = value
        .as_array()
        .ok_or_else(|| violation(field, "must be an array of {chord, tab} objects"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_field = format!("{}[{}]", field, i);
            let entry = item
                .as_object()
                .ok_or_else(|| violation(&item_field, "must be an object"))?;
            Ok(ChordFingering {
                chord: required_string(entry, &item_field, "chord")?,
                tab: required_string(entry, &item_field, "tab")?,
            })
        })
        .collect()
}

fn non_empty_array<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a Vec<Value>, CompletionError> {
    let items = match obj.get(field) {
        None | Some(Value::Null) => return Err(violation(field, "is missing")),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(violation(field, "must be an array")),
    };
    if items.is_empty() {
        return Err(violation(field, "must not be empty"));
    }
    Ok(items)
}

fn required_string(
    obj: &Map<String, Value>,
    parent: &str,
    name: &str,
) -> Result<String, CompletionError> {
    match obj.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(violation(format!("{}.{}", parent, name), "is missing")),
        Some(_) => Err(violation(format!("{}.{}", parent, name), "must be a string")),
    }
}

/// A top-level string field. Empty strings pass, absence does not.
fn required_text(obj: &Map<String, Value>, field: &str) -> Result<String, CompletionError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(violation(field, "is missing")),
        Some(_) => Err(violation(field, "must be a string")),
    }
}
