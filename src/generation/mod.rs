//! The generation pipeline and its stages.

mod completion;
mod pipeline;
mod prompt;
mod request;

pub use completion::{
    extract_explanation, extract_object, extract_progression, extract_tablature, CompletionError,
    MAX_EXPLANATION_WORDS_ACCEPTED,
};
pub use pipeline::{
    GeneratedExplanation, GeneratedProgression, GeneratedTablature, GenerationPipeline,
};
pub use prompt::{CompiledPrompt, PromptCompiler, MAX_TOPICS, MAX_TOPIC_CHARS};
pub use request::{
    ExplanationRequest, GenerationKind, GenerationRequest, ProgressionRequest, TablatureRequest,
    DEFAULT_TAB_INSTRUMENT,
};
