//! Prompt Assembler
//!
//! Builds the single delimited text the completion model receives.
//!
//! ## Layout
//!
//! ```text
//! <|system|>
//! <normalized system prompt>
//! <|endofprompt|>
//! <|user|>
//! <normalized user prompt>
//! <primary context text>
//! <primary context body>
//!
//! Context 1:
//! <context text>
//! <context body>
//! <|endofprompt|>
//! <|assistant|>
//! ```
//!
//! The end-of-prompt tag is also the stop sequence the response consumer
//! watches for, so the model echoes it back when it is done.

use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opens the system instruction section
pub const SYSTEM_TAG: &str = "<|system|>";
/// Closes the system and user sections; doubles as the stream stop sequence
pub const END_OF_PROMPT_TAG: &str = "<|endofprompt|>";
/// Opens the user instruction section
pub const USER_TAG: &str = "<|user|>";
/// Hands the turn to the model
pub const ASSISTANT_TAG: &str = "<|assistant|>";

/// A named, ordered unit of supplementary prompt material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Key the block was declared under (`context1`, `context2`, ...)
    pub name: String,
    /// Description line introducing the body
    pub text: String,
    /// Literal source text or supplementary material
    pub body: String,
}

impl ContextBlock {
    /// Create a context block
    pub fn new(name: impl Into<String>, text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            body: body.into(),
        }
    }

    /// Body without trailing line breaks
    fn trimmed_body(&self) -> &str {
        self.body.trim_end_matches(['\n', '\r'])
    }
}

/// Prompt fragments prior to assembly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Grounding instructions
    pub system_prompt: String,
    /// Task-specific instructions
    pub user_prompt: String,
    /// Ordered context; index 0 is the primary subject
    pub context_blocks: Vec<ContextBlock>,
}

impl PromptSpec {
    /// Create a prompt spec
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        context_blocks: Vec<ContextBlock>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            context_blocks,
        }
    }

    /// Assemble into the wire prompt
    pub fn assemble(&self) -> AssembledPrompt {
        assemble(&self.system_prompt, &self.user_prompt, &self.context_blocks)
    }
}

/// The final prompt text sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt(String);

impl AssembledPrompt {
    /// Borrow the prompt text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the prompt text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Prompt length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the prompt is empty (never the case for assembled prompts)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AssembledPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssembledPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn push_nonempty(lines: &mut Vec<String>, text: String) {
    if !text.is_empty() {
        lines.push(text);
    }
}

/// Assemble system, user and context fragments into a tagged prompt
///
/// System and user text and each context description are normalized;
/// context bodies are kept verbatim apart from trailing line breaks.
/// Block 0 follows the user prompt unlabeled; every later block gets a
/// blank line and a `Context N:` header, N being its index.
pub fn assemble(system_prompt: &str, user_prompt: &str, context_blocks: &[ContextBlock]) -> AssembledPrompt {
    let mut lines: Vec<String> = Vec::new();

    lines.push(SYSTEM_TAG.to_string());
    push_nonempty(&mut lines, normalize(system_prompt));
    lines.push(END_OF_PROMPT_TAG.to_string());

    lines.push(USER_TAG.to_string());
    push_nonempty(&mut lines, normalize(user_prompt));

    for (index, block) in context_blocks.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
            lines.push(format!("Context {}:", index));
        }
        push_nonempty(&mut lines, normalize(&block.text));
        push_nonempty(&mut lines, block.trimmed_body().to_string());
    }

    lines.push(END_OF_PROMPT_TAG.to_string());
    lines.push(ASSISTANT_TAG.to_string());

    // The model expects a newline after the assistant tag
    let mut prompt = lines.join("\n");
    prompt.push('\n');

    AssembledPrompt(prompt)
}
