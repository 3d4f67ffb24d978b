use serde::{Deserialize, Serialize};

/// Token accounting for a single LLM call, accumulated across cancelled
/// siblings in a search fan-out.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Field-wise addition. Mirrors the Python `accumulate_usage` helper:
    /// no normalization, every call's usage is added exactly once.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    pub content: String,
    pub usage: TokenUsage,
}

/// 1-indexed source position, matching Lean's own diagnostic positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub severity: String,
    pub pos: Position,
    pub end_pos: Option<Position>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationResult {
    pub pass: bool,
    pub complete: bool,
    pub errors: Vec<ErrorMessage>,
    pub sorries: Vec<serde_json::Value>,
    pub system_errors: Option<String>,
}

impl CompilationResult {
    /// Builds a result from a raw REPL reply's `messages`/`sorries` arrays,
    /// enforcing `pass == errors.is_empty()` and
    /// `complete == pass && sorries.is_empty()`.
    pub fn from_messages(errors: Vec<ErrorMessage>, sorries: Vec<serde_json::Value>) -> Self {
        let pass = errors.is_empty();
        let complete = pass && sorries.is_empty();
        CompilationResult {
            pass,
            complete,
            errors,
            sorries,
            system_errors: None,
        }
    }

    /// A result representing a worker/system-level failure (subprocess
    /// crash, REPL protocol error) rather than a Lean compile failure.
    pub fn system_error(message: impl Into<String>) -> Self {
        CompilationResult {
            pass: false,
            complete: false,
            errors: Vec::new(),
            sorries: Vec::new(),
            system_errors: Some(message.into()),
        }
    }
}
