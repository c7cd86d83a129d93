//! Service wiring
//!
//! Everything the HTTP layer and the CLI need, built once at startup and
//! shared by `Arc`. There are no process-wide singletons.

use crate::config::Config;
use crate::llm::anthropic::AnthropicProvider;
use crate::llm::prompt::r_system_prompt;
use crate::llm::{LLMProvider, ModelClient};
use crate::orchestrator::Orchestrator;
use crate::plots::PlotHarvester;
use crate::sandbox::e2b::E2bBackend;
use crate::sandbox::{SandboxBackend, SandboxManager};
use crate::secrets::Credentials;
use crate::store::{ConversationStore, InMemoryConversationStore};
use sdk::EngineError;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub sandbox: Arc<SandboxManager>,
    pub harvester: PlotHarvester,
    pub orchestrator: Arc<Orchestrator>,
}

impl Services {
    /// Build the production stack: Anthropic for the model, E2B for execution
    pub fn build(config: Config, credentials: Credentials) -> Result<Self, EngineError> {
        let provider = AnthropicProvider::new(config.llm.clone(), credentials.anthropic_api_key)?;
        let backend = E2bBackend::new(config.sandbox.clone(), credentials.e2b_api_key)?;

        Ok(Self::from_parts(
            config,
            Arc::new(provider),
            Arc::new(backend),
        ))
    }

    /// Build with caller supplied model and sandbox backends
    pub fn from_parts(
        config: Config,
        provider: Arc<dyn LLMProvider>,
        backend: Arc<dyn SandboxBackend>,
    ) -> Self {
        let prompt = r_system_prompt(config.sandbox.timeout_ms, &config.sandbox.uploads_dir);
        let model = ModelClient::new(provider, prompt);

        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let sandbox = Arc::new(SandboxManager::new(backend, &config.sandbox));
        let harvester = PlotHarvester::new(Arc::clone(&sandbox));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            model,
            harvester.clone(),
        ));

        info!(
            model = %config.llm.model,
            template = %config.sandbox.template,
            "Services initialized"
        );

        Self {
            config: Arc::new(config),
            store,
            sandbox,
            harvester,
            orchestrator,
        }
    }

    /// Release the remote session. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.sandbox.close().await;
    }
}
