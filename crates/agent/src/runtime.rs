use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::memory::{ConversationMemory, AI_PREFIX};
use crate::tools::ToolRegistry;

pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

const TOOL_INSTRUCTIONS: &str = "To use a tool, please use the following format:\n\n\
```\nThought: Do I need to use a tool? Yes\nAction: the action to take, should be one of \
[{tool_names}]\nAction Input: the input to the action\nObservation: the result of the \
action\n```\n\nWhen you have a response to say to the Human, or if you do not need to use a \
tool, you MUST use the format:\n\n```\nThought: Do I need to use a tool? No\n{ai_prefix}: \
[your response here]\n```";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The completion was neither a final answer nor a tool call.
    #[error("could not parse llm output: `{raw}`")]
    OutputParse { raw: String },
    #[error("llm completion failed: {0}")]
    Llm(String),
}

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub persona_prefix: Option<String>,
    pub company_name: String,
    pub max_iterations: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum AgentStep {
    Finish(String),
    Action { tool: String, input: String, log: String },
}

/// ReAct loop: ask the model, run the tool it names, feed the observation
/// back, until it answers or the iteration budget runs out.
pub struct ConversationalAgent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl ConversationalAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        Self { llm, tools, settings }
    }

    pub async fn run(
        &self,
        input: &str,
        memory: &mut ConversationMemory,
    ) -> Result<String, AgentError> {
        let mut scratchpad = String::new();

        for iteration in 0..self.settings.max_iterations {
            let prompt = self.prompt(input, memory, &scratchpad);
            let completion = self
                .llm
                .complete(&prompt)
                .await
                .map_err(|error| AgentError::Llm(format!("{error:#}")))?;

            match parse_output(&completion, AI_PREFIX)? {
                AgentStep::Finish(answer) => {
                    debug!(
                        event_name = "agent.run.finished",
                        iterations = iteration + 1,
                        "agent produced a final answer"
                    );
                    memory.save(input, answer.clone());
                    return Ok(answer);
                }
                AgentStep::Action { tool, input: tool_input, log } => {
                    let observation = self.observe(&tool, &tool_input).await;
                    scratchpad.push_str(&log);
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought: ");
                }
            }
        }

        warn!(
            event_name = "agent.run.iteration_limit",
            max_iterations = self.settings.max_iterations,
            "agent stopped before a final answer"
        );
        memory.save(input, ITERATION_LIMIT_ANSWER);
        Ok(ITERATION_LIMIT_ANSWER.to_string())
    }

    async fn observe(&self, tool: &str, input: &str) -> String {
        let Some(handler) = self.tools.get(tool) else {
            return format!("{tool} is not a valid tool, try another one.");
        };
        match handler.execute(input).await {
            Ok(output) => {
                debug!(event_name = "agent.tool.completed", tool, "tool call succeeded");
                output
            }
            Err(error) => {
                warn!(event_name = "agent.tool.failed", tool, error = %error, "tool call failed");
                format!("{tool} failed: {error}")
            }
        }
    }

    fn prompt(&self, input: &str, memory: &ConversationMemory, scratchpad: &str) -> String {
        let persona = self
            .settings
            .persona_prefix
            .clone()
            .unwrap_or_else(|| default_persona(&self.settings.company_name));
        let instructions = TOOL_INSTRUCTIONS
            .replace("{tool_names}", &self.tools.names().join(", "))
            .replace("{ai_prefix}", AI_PREFIX);

        format!(
            "{persona}\n\nTOOLS:\n------\n\n{AI_PREFIX} has access to the following tools:\n\n\
             {tools}\n\n{instructions}\n\nBegin!\n\nPrevious conversation history:\n{history}\n\n\
             New input: {input}\n{scratchpad}",
            tools = self.tools.describe(),
            history = memory.transcript(),
        )
    }
}

/// Splits a completion into a final answer or a tool call.
pub(crate) fn parse_output(text: &str, ai_prefix: &str) -> Result<AgentStep, AgentError> {
    let answer_marker = format!("{ai_prefix}:");
    if let Some(position) = text.rfind(&answer_marker) {
        return Ok(AgentStep::Finish(text[position + answer_marker.len()..].trim().to_string()));
    }

    let action = text.find("Action:").and_then(|start| {
        let rest = &text[start + "Action:".len()..];
        let input_at = rest.find("Action Input:")?;
        let tool = rest[..input_at].trim();
        let mut tool_input = &rest[input_at + "Action Input:".len()..];
        if let Some(end) = tool_input.find("\nObservation:") {
            tool_input = &tool_input[..end];
        }
        Some((tool.to_string(), tool_input.trim().trim_matches('"').to_string()))
    });

    match action {
        Some((tool, input)) if !tool.is_empty() => {
            let log = match text.find("\nObservation:") {
                Some(end) => text[..end].to_string(),
                None => text.trim_end().to_string(),
            };
            Ok(AgentStep::Action { tool, input, log })
        }
        _ => Err(AgentError::OutputParse { raw: text.to_string() }),
    }
}

fn default_persona(company_name: &str) -> String {
    format!(
        "{AI_PREFIX} is a large language model answering questions for customers of \
         {company_name}.\n\n{AI_PREFIX} helps with mortgages, personal loans, checking accounts \
         and the loan application process, answering clearly and briefly. {AI_PREFIX} never \
         invents balances, rates or approval decisions for a specific customer and points to \
         the Loan Application or Loan Calculator options instead."
    )
}
