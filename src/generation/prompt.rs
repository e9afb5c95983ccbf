//! Turns a generation request into the exact conversation and sampling
//! parameters sent to the text-generation service.
//!
//! Compilation is pure: the same request always yields the same prompt, and
//! every validation failure is reported before any network call happens.

use super::request::{
    ExplanationRequest, GenerationKind, GenerationRequest, ProgressionRequest, TablatureRequest,
};
use crate::error::{invalid_progression, PipelineError};
use crate::llm::{CompletionOptions, Message};
use crate::progression::{ConversationTurn, ProgressionSignature};
use std::time::Duration;

pub const MAX_TOPICS: usize = 5;
pub const MIN_TOPICS: usize = 3;
pub const MAX_TOPIC_CHARS: usize = 50;
pub const MAX_EXPLANATION_WORDS: usize = 100;

const SYSTEM_INSTRUCTIONS: &str = "You are a music theory assistant. \
You answer every request with a single valid JSON object and nothing else: \
no prose, no markdown fences, no text before or after the object.";

const JSON_RULES: &str = "Rules:
property names must be lowercase.
property names must be enclosed in double quotes.
property values must be enclosed in double quotes.
Do not nest any other undefined objects within the JSON object.
Send no other text apart from the JSON object.";

/// A request ready to be sent: system turn, replayed history, new user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPrompt {
    pub kind: GenerationKind,
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

impl CompiledPrompt {
    /// The turns a caller needs to continue the conversation later. The system
    /// turn is owned by the compiler and is not part of it.
    pub fn conversation(&self) -> Vec<ConversationTurn> {
        self.messages.iter().filter_map(Message::as_turn).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PromptCompiler {
    timeout: Duration,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(CompletionOptions::default().timeout)
    }
}

impl PromptCompiler {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn compile(&self, request: &GenerationRequest) -> Result<CompiledPrompt, PipelineError> {
        match request {
            GenerationRequest::Progression(r) => self.compile_progression(r),
            GenerationRequest::Explanation(r) => self.compile_explanation(r),
            GenerationRequest::Tablature(r) => self.compile_tablature(r),
        }
    }

    pub fn compile_progression(
        &self,
        request: &ProgressionRequest,
    ) -> Result<CompiledPrompt, PipelineError> {
        require_text("mood", &request.mood)?;
        require_text("style", &request.style)?;
        require_text("instrument", &request.instrument)?;

        let content = format!(
            r#"Create a {mood} chord progression playable on {instrument} in the style of {style}.

Respond only with a valid JSON object with the following data structure:
{{
  "result": string[],
  "context": string,
  "key": string,
  "scale": string,
  "tempo": string,
  "style": string,
  "fingering": [{{ "chord": string, "tab": string }}],
  "strumming_pattern": string
}}

Property definitions:
result: an array of strings representing the chords within the progression formatted in the style of "Am" for "A minor".
context: an interesting description of the chord progression provided as a single string.
key: what key the chord progression is in as a single string.
scale: what scale the chord progression is in as a single string.
tempo: what tempo the chord progression should be played in as a single string.
style: what style of music the chord progression is as a single string.
fingering: an array of objects representing chord tabs with a property called "chord" for the chord name and a property called "tab" for the chord tab in the following string format "X-X-X-X-X-X".
strumming_pattern: an example strumming pattern that could be used for the chord progression as a single string.

{JSON_RULES}"#,
            mood = request.mood.trim(),
            instrument = request.instrument.trim(),
            style = request.style.trim(),
        );

        Ok(CompiledPrompt {
            kind: GenerationKind::Progression,
            messages: vec![Message::system(SYSTEM_INSTRUCTIONS), Message::user(content)],
            options: self.options(0.8, 2048, 0.5),
        })
    }

    pub fn compile_explanation(
        &self,
        request: &ExplanationRequest,
    ) -> Result<CompiledPrompt, PipelineError> {
        let signature = ProgressionSignature::from_chords(&request.progression)
            .map_err(|e| invalid_progression("progression", e))?;
        require_text("style", &request.style)?;
        require_text("key", &request.key)?;
        for (i, turn) in request.history.iter().enumerate() {
            if turn.content.trim().is_empty() {
                return Err(PipelineError::invalid_request(
                    format!("history[{}].content", i),
                    "must not be empty",
                ));
            }
        }

        let content = format!(
            r#"Provide {MIN_TOPICS}-{MAX_TOPICS} detailed education points, with a focus on music theory around the suggested chord progression.

Context:
Chord Progression: {chords}
Style: {style}
Key: {key}

Respond only with a valid JSON object with the following data structure:
{{
  "result": [
    {{ "topic": string, "explanation": string }}
  ]
}}

Property definitions:
result: an array of {MIN_TOPICS} to {MAX_TOPICS} objects. Never more than {MAX_TOPICS}.
topic: a single string naming the topic of the explanation. Do not exceed {MAX_TOPIC_CHARS} characters.
explanation: a well formatted single string with the content of the topic. Do not exceed {MAX_EXPLANATION_WORDS} words.

{JSON_RULES}
Trim any whitespace from the beginning and end of every string.
Every topic must have an explanation. Both properties must be present."#,
            chords = signature,
            style = request.style.trim(),
            key = request.key.trim(),
        );

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(Message::system(SYSTEM_INSTRUCTIONS));
        messages.extend(request.history.iter().map(Message::from));
        messages.push(Message::user(content));

        Ok(CompiledPrompt {
            kind: GenerationKind::Explanation,
            messages,
            options: self.options(0.7, 2048, 2.0),
        })
    }

    pub fn compile_tablature(
        &self,
        request: &TablatureRequest,
    ) -> Result<CompiledPrompt, PipelineError> {
        let signature = ProgressionSignature::from_chords(&request.progression)
            .map_err(|e| invalid_progression("progression", e))?;
        require_text("instrument", &request.instrument)?;

        let content = format!(
            r#"Represent the following chord progression in text-based {instrument} tablature.

Chord Progression: {chords}

Respond only with a valid JSON object with the following data structure:
{{
  "result": [{{ "chord": string, "tab": string }}]
}}

Property definitions:
result: an array with one object per chord, in the order given.
chord: the name of the chord.
tab: the tablature of the chord as a single string in the format "X-X-X-X-X-X", lowest string first.

{JSON_RULES}"#,
            instrument = request.instrument.trim(),
            chords = signature,
        );

        Ok(CompiledPrompt {
            kind: GenerationKind::Tablature,
            messages: vec![Message::system(SYSTEM_INSTRUCTIONS), Message::user(content)],
            options: self.options(0.2, 512, 0.0),
        })
    }

    fn options(&self, temperature: f32, max_tokens: u32, penalty: f32) -> CompletionOptions {
        CompletionOptions {
            temperature,
            max_tokens: Some(max_tokens),
            top_p: Some(1.0),
            frequency_penalty: Some(penalty),
            presence_penalty: Some(penalty),
            timeout: self.timeout,
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::invalid_request(field, "must not be empty"));
    }
    Ok(())
}
