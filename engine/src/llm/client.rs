//! Model Client
//!
//! Turns a conversation history into one completion round trip and splits
//! the reply into text plus R code blocks.

use super::extract::extract_code_blocks;
use super::{LLMProvider, Result};
use sdk::{CodeBlock, Message, MessageRole};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Text of one model reply and the code blocks found in it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
}

/// Wraps a provider with the fixed system instruction
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LLMProvider>,
    system_prompt: Arc<str>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: Arc::from(system_prompt.into()),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The system instruction followed by the user/assistant history, in order
    pub fn build_messages(&self, history: &[Message]) -> Vec<Message> {
        std::iter::once(Message::system(self.system_prompt.as_ref()))
            .chain(
                history
                    .iter()
                    .filter(|m| m.role != MessageRole::System)
                    .cloned(),
            )
            .collect()
    }

    /// Perform exactly one completion and extract its code blocks.
    ///
    /// Provider failures are returned as-is; there is no retry here.
    pub async fn generate(&self, history: &[Message]) -> Result<ModelReply> {
        let messages = self.build_messages(history);
        let started = Instant::now();

        let text = self.provider.generate(&messages).await.map_err(|e| {
            error!(provider = %self.provider.name(), error = %e, "Error generating model response");
            e
        })?;

        let code_blocks = extract_code_blocks(&text);
        info!(
            provider = %self.provider.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            code_blocks = code_blocks.len(),
            "Model response received"
        );

        Ok(ModelReply { text, code_blocks })
    }
}
