use crate::progression::ConversationTurn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TAB_INSTRUMENT: &str = "Guitar";

/// What a generation request asks the service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Progression,
    Explanation,
    Tablature,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Progression => "progression",
            GenerationKind::Explanation => "explanation",
            GenerationKind::Tablature => "tablature",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRequest {
    pub mood: String,
    pub style: String,
    pub instrument: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub progression: Vec<String>,
    pub style: String,
    pub key: String,
    /// Earlier turns of the same conversation, oldest first. May be empty.
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablatureRequest {
    pub progression: Vec<String>,
    #[serde(default = "default_tab_instrument")]
    pub instrument: String,
}

fn default_tab_instrument() -> String {
    DEFAULT_TAB_INSTRUMENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Progression(ProgressionRequest),
    Explanation(ExplanationRequest),
    Tablature(TablatureRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationRequest::Progression(_) => GenerationKind::Progression,
            GenerationRequest::Explanation(_) => GenerationKind::Explanation,
            GenerationRequest::Tablature(_) => GenerationKind::Tablature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tablature_instrument_defaults_to_guitar() {
        let req: TablatureRequest = serde_json::from_str(r#"{"progression":["C","G"]}"#).unwrap();
        assert_eq!(req.instrument, "Guitar");
    }

    #[test]
    fn explanation_requires_history() {
        let missing = r#"{"progression":["C"],"style":"Pop","key":"C"}"#;
        assert!(serde_json::from_str::<ExplanationRequest>(missing).is_err());

        let empty = r#"{"progression":["C"],"style":"Pop","key":"C","history":[]}"#;
        let req: ExplanationRequest = serde_json::from_str(empty).unwrap();
        assert!(req.history.is_empty());
    }
}
