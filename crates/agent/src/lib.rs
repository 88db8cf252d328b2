//! GenAI fallback for utterances the dialog intents do not cover.
//!
//! A conversational ReAct agent runs over a pluggable [`llm::LlmClient`]
//! (Bedrock, Ollama or any OpenAI-compatible endpoint). It keeps a windowed
//! transcript in [`memory::ConversationMemory`] and may call the tools in a
//! [`tools::ToolRegistry`]. [`bridge::LlmBridge`] adapts the agent to the
//! core `GenAiBridge` port.
//!
//! The model only phrases answers. Account data, validation and application
//! submission stay in the deterministic intent handlers.

pub mod bridge;
pub mod llm;
pub mod memory;
pub mod runtime;
pub mod tools;

pub use bridge::LlmBridge;
pub use llm::{BedrockClient, LlmClient, OllamaClient, OpenAiClient};
pub use memory::ConversationMemory;
pub use runtime::{AgentError, AgentSettings, ConversationalAgent};
pub use tools::{LoanPaymentTool, Tool, ToolRegistry};
