//! # prompt_lab
//!
//! A prompt experimentation harness for OpenAPI v3 generation. An Apex
//! class or a YAML experiment is assembled into a sentinel-tagged prompt,
//! sent to a text-completion model, and the OpenAPI document in the
//! response is extracted and written to a timestamped results file.
//!
//! ## Pipeline
//!
//! ```text
//! input ─► assemble ─► model (single-shot | stream ─► consume) ─► extract ─► results/
//! ```
//!
//! ## Core APIs
//!
//! ### Assemble a prompt from an Apex class
//!
//! ```rust
//! use prompt_lab::{assemble_apex, END_OF_PROMPT_TAG};
//!
//! let prompt = assemble_apex("public class Accounts {\n  @AuraEnabled\n  public static void list() {}\n}");
//! assert!(prompt.as_str().starts_with("<|system|>\n"));
//! assert!(prompt.as_str().contains("@AuraEnabled annotation"));
//! assert_eq!(prompt.as_str().matches(END_OF_PROMPT_TAG).count(), 2);
//! ```
//!
//! ### Assemble a prompt from an experiment
//!
//! ```rust
//! use prompt_lab::assemble_experiment;
//!
//! let yaml = r#"
//! systemPrompt: You write OpenAPI documents.
//! userPrompt: Describe every method.
//! context:
//!   - context1:
//!       text: 'The class:'
//!       context: public class A {}
//!   - context2:
//!       text: 'A helper:'
//!       context: public class B {}
//! "#;
//!
//! let prompt = assemble_experiment(yaml).unwrap();
//! assert!(prompt.as_str().contains("\n\nContext 1:\nA helper:\npublic class B {}\n"));
//! ```
//!
//! A context list that skips a key fails before any model call:
//!
//! ```rust
//! use prompt_lab::{assemble_experiment, HarnessErrorKind};
//!
//! let yaml = "context:\n  - context2:\n      context: x\n";
//! let err = assemble_experiment(yaml).unwrap_err();
//! assert_eq!(err.kind, HarnessErrorKind::MissingContext);
//! ```
//!
//! ### Consume a streamed response
//!
//! ```rust
//! use futures::stream;
//! use prompt_lab::{consume, StreamChunk};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let chunks = stream::iter(vec![
//!     Ok(StreamChunk::Text("openapi: ".to_string())),
//!     Ok(StreamChunk::Text("3.0.0<|endofprompt|>".to_string())),
//!     Ok(StreamChunk::Text("never read".to_string())),
//! ]);
//! assert_eq!(consume(chunks).await, "openapi: 3.0.0");
//! # });
//! ```
//!
//! ### Extract the payload
//!
//! ```rust
//! use prompt_lab::{extract, ExtractionResult};
//!
//! let result = extract("Sure:\n```yaml\nopenapi: 3.0.0\n```");
//! assert_eq!(result, ExtractionResult::Payload("openapi: 3.0.0\n".to_string()));
//! ```
//!
//! ## Input Modes
//!
//! | Mode | Prompt | Result file |
//! |------|--------|-------------|
//! | [`InputMode::SingleSource`] | default instructions + Apex class | `documentContents_<stem>_<stamp>.yaml` |
//! | [`InputMode::StructuredExperiment`] | experiment fields | `documentContents_...`, with prompt and ideal solution |
//! | [`InputMode::RawPrompt`] | file text as-is | `rawPrompt_<stem>_<stamp>.yaml` |
//!
//! ## Backends
//!
//! Models implement [`LanguageModel`]. [`connect`] builds the one selected
//! by [`Config`]; [`ScriptedModel`] replays canned output for tests and dry
//! runs.

pub mod assembly;
pub mod backend;
pub mod config;
pub mod errors;
pub mod experiment;
pub mod extract;
pub mod normalize;
pub mod prompts;
pub mod runner;
pub mod stream;

// Re-exports for convenience
pub use assembly::{
    assemble, derive_user_prompt, AssembledPrompt, ContextBlock, PromptSpec, ASSISTANT_TAG,
    END_OF_PROMPT_TAG, SYSTEM_TAG, USER_TAG,
};
pub use backend::{connect, ChatRequest, ChunkStream, LanguageModel, ScriptedModel, XGenClient};
pub use config::{Backend, CallMode, Config};
pub use errors::{HarnessError, HarnessErrorKind, HarnessResult};
pub use experiment::{generate_sample, Experiment};
pub use extract::{extract, yaml_diagnostics, ExtractionResult, NOT_GENERATED_MESSAGE};
pub use normalize::normalize;
pub use prompts::{DEFAULT_INSTRUCTIONS, GENERATION_OPERATION};
pub use runner::{InputDocument, InputMode, RunReport, Runner};
pub use stream::{consume, consume_with_outcome, StreamChunk, StreamOutcome, Termination};

/// Assemble the prompt for an Apex class
pub fn assemble_apex(source: &str) -> AssembledPrompt {
    runner::single_source_spec(source).assemble()
}

/// Parse an experiment and assemble its prompt
pub fn assemble_experiment(yaml: &str) -> HarnessResult<AssembledPrompt> {
    let experiment = Experiment::parse(yaml)?;
    Ok(experiment.to_prompt_spec()?.assemble())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
