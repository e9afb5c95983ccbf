//! Request to stored record: compile, complete, extract, persist.

use super::completion::{extract_explanation, extract_progression, extract_tablature};
use super::prompt::{CompiledPrompt, PromptCompiler};
use super::request::{ExplanationRequest, GenerationKind, ProgressionRequest, TablatureRequest};
use crate::content_store::ContentStore;
use crate::error::{invalid_progression, PipelineError};
use crate::llm::{FinishReason, LlmProvider};
use crate::progression::{
    ChordFingering, ConversationTurn, ExplanationRecord, NormalizedKey, ProgressionRecord,
    ProgressionSignature,
};
use crate::server::metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedProgression {
    pub record: ProgressionRecord,
    pub signature: ProgressionSignature,
    pub key: NormalizedKey,
    /// Conversation so far, for a later explanation request.
    pub prompt: Vec<ConversationTurn>,
    /// `None` when the library index could not be updated.
    pub newly_registered: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedExplanation {
    pub record: ExplanationRecord,
    pub signature: ProgressionSignature,
    pub key: NormalizedKey,
    pub prompt: Vec<ConversationTurn>,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTablature {
    pub fingering: Vec<ChordFingering>,
    pub prompt: Vec<ConversationTurn>,
}

pub struct GenerationPipeline {
    compiler: PromptCompiler,
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ContentStore>,
}

impl GenerationPipeline {
    pub fn new(
        compiler: PromptCompiler,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            compiler,
            provider,
            store,
        }
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub async fn generate_progression(
        &self,
        request: ProgressionRequest,
    ) -> Result<GeneratedProgression, PipelineError> {
        let result = self.run_progression(&request).await;
        record_outcome(GenerationKind::Progression, &result);
        result
    }

    pub async fn explain_progression(
        &self,
        request: ExplanationRequest,
    ) -> Result<GeneratedExplanation, PipelineError> {
        let result = self.run_explanation(&request).await;
        record_outcome(GenerationKind::Explanation, &result);
        result
    }

    pub async fn tabulate_progression(
        &self,
        request: TablatureRequest,
    ) -> Result<GeneratedTablature, PipelineError> {
        let result = self.run_tablature(&request).await;
        record_outcome(GenerationKind::Tablature, &result);
        result
    }

    async fn run_progression(
        &self,
        request: &ProgressionRequest,
    ) -> Result<GeneratedProgression, PipelineError> {
        let prompt = self.compiler.compile_progression(request)?;
        let raw = self.complete(&prompt).await?;
        let draft = extract_progression(&raw)?;

        let record = draft.into_record(Uuid::new_v4().to_string());
        let signature = record
            .signature()
            .map_err(|e| PipelineError::SchemaViolation {
                field: "progression".to_string(),
                reason: e.to_string(),
            })?;

        let key = self.store.append_progression(&record).map_err(|e| {
            metrics::record_store_error("append_progression");
            warn!(id = %record.id, "Failed to store progression: {:#}", e);
            PipelineError::store(e)
        })?;

        let newly_registered = match self.store.register_signature(&signature) {
            Ok(added) => {
                if added {
                    metrics::inc_library_size();
                }
                Some(added)
            }
            Err(e) => {
                metrics::record_store_error("register_signature");
                warn!(
                    signature = %signature,
                    "Progression stored but library index not updated: {:#}", e
                );
                None
            }
        };

        info!(
            id = %record.id,
            key = %key,
            newly_registered = ?newly_registered,
            "Generated progression"
        );

        Ok(GeneratedProgression {
            record,
            signature,
            key,
            prompt: prompt.conversation(),
            newly_registered,
        })
    }

    async fn run_explanation(
        &self,
        request: &ExplanationRequest,
    ) -> Result<GeneratedExplanation, PipelineError> {
        let prompt = self.compiler.compile_explanation(request)?;
        let signature = ProgressionSignature::from_chords(&request.progression)
            .map_err(|e| invalid_progression("progression", e))?;
        let raw = self.complete(&prompt).await?;
        let draft = extract_explanation(&raw)?;
        let record = draft.into_record(Uuid::new_v4().to_string());

        let persisted = match self.store.append_explanation(&signature, &record) {
            Ok(()) => true,
            Err(e) => {
                metrics::record_store_error("append_explanation");
                warn!(
                    id = %record.id,
                    signature = %signature,
                    "Explanation generated but not stored: {:#}", e
                );
                false
            }
        };

        info!(
            id = %record.id,
            signature = %signature,
            topics = record.result.len(),
            persisted,
            "Generated explanation"
        );

        Ok(GeneratedExplanation {
            key: NormalizedKey::encode(&signature),
            record,
            signature,
            prompt: prompt.conversation(),
            persisted,
        })
    }

    async fn run_tablature(
        &self,
        request: &TablatureRequest,
    ) -> Result<GeneratedTablature, PipelineError> {
        let prompt = self.compiler.compile_tablature(request)?;
        let raw = self.complete(&prompt).await?;
        let fingering = extract_tablature(&raw)?;
        debug!(chords = fingering.len(), "Generated tablature");

        Ok(GeneratedTablature {
            fingering,
            prompt: prompt.conversation(),
        })
    }

    async fn complete(&self, prompt: &CompiledPrompt) -> Result<String, PipelineError> {
        let kind = prompt.kind.as_str();
        debug!(
            kind,
            provider = self.provider.name(),
            model = self.provider.model(),
            "Requesting completion"
        );

        let started = Instant::now();
        let response = self
            .provider
            .complete(&prompt.messages, &prompt.options)
            .await
            .map_err(|e| {
                warn!(kind, "Completion request failed: {}", e);
                PipelineError::Service(e)
            })?;
        metrics::record_llm_request(kind, started.elapsed(), response.usage);

        if response.finish_reason == FinishReason::MaxTokens {
            warn!(kind, "Completion hit the token limit, payload may be truncated");
        }
        Ok(response.content)
    }
}

fn record_outcome<T>(kind: GenerationKind, result: &Result<T, PipelineError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_generation(kind.as_str(), outcome);
}
