//! Conversation Turn Orchestrator
//!
//! One turn: store the user's message, ask the model, run the first R block
//! the model returned, pull back its plots, store the model's reply.
//!
//! Only a model failure fails the turn. Execution problems end up inside
//! the returned [`ExecutionResult`](sdk::ExecutionResult).

use crate::llm::ModelClient;
use crate::plots::PlotHarvester;
use crate::store::ConversationStore;
use sdk::{AssistantResponse, Conversation, EngineError, MessageRole};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Orchestrator {
    store: Arc<dyn ConversationStore>,
    model: ModelClient,
    harvester: PlotHarvester,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        model: ModelClient,
        harvester: PlotHarvester,
    ) -> Self {
        Self {
            store,
            model,
            harvester,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Process one user message.
    ///
    /// Returns the conversation as it stands after the turn together with
    /// the assistant's response. An unknown `conversation_id` starts a new
    /// conversation.
    #[instrument(skip_all, fields(conversation_id = tracing::field::Empty))]
    pub async fn process_turn(
        &self,
        conversation_id: Option<&str>,
        user_text: &str,
    ) -> Result<(Conversation, AssistantResponse), EngineError> {
        let mut conversation = match conversation_id.and_then(|id| self.store.get(id)) {
            Some(conversation) => conversation,
            None => {
                if let Some(id) = conversation_id {
                    warn!(requested = %id, "Unknown conversation, starting a new one");
                }
                self.store.create()
            }
        };
        let id = conversation.id.clone();
        tracing::Span::current().record("conversation_id", id.as_str());

        conversation.push(self.store.append(&id, MessageRole::User, user_text));

        let history = self
            .store
            .get(&id)
            .map(|c| c.messages)
            .unwrap_or_else(|| conversation.messages.clone());

        let reply = self.model.generate(&history).await?;

        let execution_results = match reply.code_blocks.first() {
            Some(block) => {
                let result = self.harvester.run_and_harvest(&block.code, None).await;
                info!(
                    success = result.is_success(),
                    plots = result.plots.len(),
                    "Executed first code block"
                );
                Some(result)
            }
            None => None,
        };

        conversation.push(self.store.append(&id, MessageRole::Assistant, &reply.text));

        let response = AssistantResponse {
            message: reply.text,
            code_blocks: reply.code_blocks,
            execution_results,
        };

        let conversation = self.store.get(&id).unwrap_or(conversation);
        Ok((conversation, response))
    }
}
