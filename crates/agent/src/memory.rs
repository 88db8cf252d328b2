use std::collections::VecDeque;

pub const HUMAN_PREFIX: &str = "Human";
pub const AI_PREFIX: &str = "Assistant";

/// Sliding window over the most recent exchanges of one conversation.
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    window: usize,
    exchanges: VecDeque<(String, String)>,
}

impl ConversationMemory {
    pub fn new(window: usize) -> Self {
        Self { window, exchanges: VecDeque::with_capacity(window) }
    }

    pub fn save(&mut self, input: impl Into<String>, output: impl Into<String>) {
        if self.window == 0 {
            return;
        }
        if self.exchanges.len() == self.window {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back((input.into(), output.into()));
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// `Human: ...` / `Assistant: ...` lines, oldest first.
    pub fn transcript(&self) -> String {
        self.exchanges
            .iter()
            .map(|(input, output)| format!("{HUMAN_PREFIX}: {input}\n{AI_PREFIX}: {output}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
