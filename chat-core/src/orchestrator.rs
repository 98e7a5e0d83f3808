use std::sync::Arc;

use tracing::{debug, info};

use crate::capability::Generator;
use crate::error::Result;
use crate::history::{ConversationTurn, TokenEstimator, WordCountEstimator, TOKEN_BUDGET};
use crate::index::{DocumentChunk, DocumentIndex};
use crate::profile::UserProfile;
use crate::session::SessionState;

pub const NO_INPUT_REPLY: &str = "No input provided.";

const PERSONA_PREAMBLE: &str =
    "Respond as if you are from the company DoctHers. Regards should always end from DoctHers Bot.";

fn claim_intent_prompt(text: &str) -> String {
    format!(
        "Determine if the following text indicates a claim request, meaning the user is asking \
         to create a claim. Return the single word 'true' if it does, otherwise return 'false'. \
         Text: {text}"
    )
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub persona: String,
    pub token_budget: usize,
    pub top_k: usize,
    pub excerpt_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: PERSONA_PREAMBLE.to_string(),
            token_budget: TOKEN_BUDGET,
            top_k: 1,
            excerpt_limit: 300,
        }
    }
}

/// Top-level decision logic: routes each incoming message to the claim
/// dialogue or the retrieval + generation path and composes the final prompt.
pub struct Assistant {
    generator: Arc<dyn Generator>,
    index: DocumentIndex,
    estimator: Arc<dyn TokenEstimator>,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(generator: Arc<dyn Generator>, index: DocumentIndex) -> Self {
        Self::with_config(generator, index, AssistantConfig::default())
    }

    pub fn with_config(
        generator: Arc<dyn Generator>,
        index: DocumentIndex,
        config: AssistantConfig,
    ) -> Self {
        Self {
            generator,
            index,
            estimator: Arc::new(WordCountEstimator),
            config,
        }
    }

    /// Handle one incoming message against the given session state.
    ///
    /// Capability failures on the generation path propagate; retrieval
    /// failures degrade to an answer without document grounding.
    pub async fn respond(
        &self,
        state: &mut SessionState,
        text: &str,
        image: Option<&[u8]>,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Ok(NO_INPUT_REPLY.to_string());
        }

        // An active claim dialogue consumes the turn entirely; no retrieval
        // or generation happens until the claim is finalized.
        if state.claim.is_active() {
            return state.claim.advance(text, &mut state.profile);
        }

        if !text.is_empty() && self.is_claim_request(text).await? {
            info!("claim intent detected, opening claim dialogue");
            return Ok(state.claim.begin().to_string());
        }

        self.answer_query(state, text, image).await
    }

    /// One generation call with a fixed classification prompt; the answer is
    /// interpreted by substring match, not parsed.
    async fn is_claim_request(&self, text: &str) -> Result<bool> {
        let verdict = self
            .generator
            .generate(&claim_intent_prompt(text), None)
            .await?;
        let is_claim = verdict.to_lowercase().contains("true");
        debug!(verdict = %verdict, is_claim, "claim intent classified");
        Ok(is_claim)
    }

    async fn answer_query(
        &self,
        state: &mut SessionState,
        text: &str,
        image: Option<&[u8]>,
    ) -> Result<String> {
        let excerpts = if text.is_empty() {
            Vec::new()
        } else {
            self.index.search(text, self.config.top_k).await
        };

        let preamble = self.compose_preamble(&excerpts, &state.profile);
        if !text.is_empty() {
            state.window.append(ConversationTurn::user(text));
        }
        let prompt =
            state
                .window
                .build_prompt(&preamble, self.estimator.as_ref(), self.config.token_budget);

        let reply = self.generator.generate(&prompt, image).await?;
        // Markdown emphasis reads poorly in the chat widget.
        let reply = reply.replace('*', "");

        state.window.append(ConversationTurn::assistant(reply.clone()));
        Ok(reply)
    }

    fn compose_preamble(&self, excerpts: &[(DocumentChunk, f32)], profile: &UserProfile) -> String {
        let mut parts = vec![self.config.persona.clone()];
        if !excerpts.is_empty() {
            let block = excerpts
                .iter()
                .map(|(chunk, _score)| {
                    let excerpt: String = chunk.text.chars().take(self.config.excerpt_limit).collect();
                    match chunk.source_page {
                        Some(page) => format!("[page {page}] {excerpt}"),
                        None => excerpt,
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("Relevant document excerpts:\n{block}"));
        }
        parts.push(profile.prompt_context());
        parts.join("\n")
    }
}
