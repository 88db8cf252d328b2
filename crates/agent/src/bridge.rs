use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use lendbot_core::config::AppConfig;
use lendbot_core::errors::GenAiError;
use lendbot_core::ports::GenAiBridge;

use crate::llm::LlmClient;
use crate::memory::{ConversationMemory, AI_PREFIX, HUMAN_PREFIX};
use crate::runtime::{AgentError, AgentSettings, ConversationalAgent};
use crate::tools::ToolRegistry;

/// Answers free-form questions with one agent run per utterance.
pub struct LlmBridge {
    agent: ConversationalAgent,
    memory_window: usize,
}

impl LlmBridge {
    pub fn new(agent: ConversationalAgent, memory_window: usize) -> Self {
        Self { agent, memory_window }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &AppConfig) -> Self {
        let settings = AgentSettings {
            persona_prefix: config.assistant.persona_prefix.clone(),
            company_name: config.assistant.company_name.clone(),
            max_iterations: config.llm.max_iterations,
        };
        let agent =
            ConversationalAgent::new(llm, Arc::new(ToolRegistry::with_defaults()), settings);
        Self::new(agent, config.llm.memory_window)
    }
}

pub fn wrap_utterance(utterance: &str) -> String {
    format!("\n\n{HUMAN_PREFIX}: {utterance} \n\n{AI_PREFIX}:")
}

#[async_trait]
impl GenAiBridge for LlmBridge {
    async fn answer(&self, utterance: &str) -> Result<String, GenAiError> {
        let mut memory = ConversationMemory::new(self.memory_window);

        match self.agent.run(&wrap_utterance(utterance), &mut memory).await {
            Ok(answer) => Ok(answer),
            Err(AgentError::OutputParse { raw }) => {
                info!(
                    event_name = "agent.output.unstructured",
                    "model answered without the agent format; using its text as the answer"
                );
                Ok(raw.trim().to_string())
            }
            Err(AgentError::Llm(message)) => {
                warn!(event_name = "agent.llm.failed", error = %message, "llm call failed");
                Err(GenAiError::Invocation(message))
            }
        }
    }
}
