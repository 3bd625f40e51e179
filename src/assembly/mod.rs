//! Prompt Assembly Module
//!
//! Sentinel-tagged prompt construction and the Apex-derived user prompt
//! supplement.

pub mod assembler;
pub mod supplement;

pub use assembler::{
    assemble, AssembledPrompt, ContextBlock, PromptSpec, ASSISTANT_TAG, END_OF_PROMPT_TAG,
    SYSTEM_TAG, USER_TAG,
};
pub use supplement::{derive_user_prompt, SupplementRule, SUPPLEMENT_RULES};
