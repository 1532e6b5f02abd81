// RecommendationEngine backed by the Claude client.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use draftwatch_core::config::Config;
use draftwatch_core::protocol::{Recommendation, RecommendationContext};
use draftwatch_core::recommend::RecommendationEngine;

use crate::client::{ClaudeClient, LlmClient};
use crate::prompt;

pub struct LlmRecommender {
    client: ClaudeClient,
    max_tokens: u32,
}

impl LlmRecommender {
    pub fn new(client: ClaudeClient, max_tokens: u32) -> Self {
        LlmRecommender { client, max_tokens }
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        match LlmClient::from_config(config) {
            LlmClient::Active(client) => Some(Self::new(client, config.llm.max_tokens)),
            LlmClient::Disabled => None,
        }
    }
}

#[async_trait]
impl RecommendationEngine for LlmRecommender {
    async fn recommend(&self, context: RecommendationContext) -> anyhow::Result<Recommendation> {
        let system = prompt::system_prompt();
        let user = prompt::build_recommendation_prompt(&context);

        let completion = self
            .client
            .complete(&system, &user, self.max_tokens)
            .await
            .with_context(|| format!("recommendation for pick #{}", context.key.overall))?;

        info!(
            overall = context.key.overall,
            model = self.client.model(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "recommendation generated"
        );

        Ok(Recommendation {
            overall: context.key.overall,
            text: completion.text.trim().to_string(),
            generated_at: Utc::now(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
        })
    }
}
