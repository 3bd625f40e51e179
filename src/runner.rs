//! Experiment Runner
//!
//! One orchestrator for all three input modes:
//!
//! 1. Build the prompt (assembled from an Apex source or an experiment, or
//!    taken verbatim in raw mode)
//! 2. Call the model, single-shot or streaming
//! 3. Extract the OpenAPI payload
//! 4. Write exactly one timestamped file under the results directory
//!
//! Any error before step 4 leaves the results directory untouched. A
//! response without a payload is not an error: the failure message is
//! written instead so the experiment record is kept.

use crate::assembly::{derive_user_prompt, ContextBlock, PromptSpec, END_OF_PROMPT_TAG};
use crate::backend::{ChatRequest, LanguageModel};
use crate::config::{CallMode, Config};
use crate::errors::{HarnessError, HarnessResult};
use crate::experiment::Experiment;
use crate::extract::{extract, yaml_diagnostics, ExtractionResult};
use crate::prompts::{indent, APEX_CONTEXT_LABEL, DEFAULT_INSTRUCTIONS, GENERATION_OPERATION};
use crate::stream::{consume_with_outcome, Termination};
use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Timestamp layout used in result file names
pub const TIMESTAMP_FORMAT: &str = "%m%d%Y_%H:%M:%S";

/// Extension of result files
pub const RESULT_EXTENSION: &str = "yaml";

/// How the input document is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// An Apex class, wrapped with the default instructions
    SingleSource,
    /// A YAML experiment with its own prompt fragments
    StructuredExperiment,
    /// Prompt text sent as-is
    RawPrompt,
}

impl InputMode {
    /// File name prefix of the results written in this mode
    pub fn output_prefix(&self) -> &'static str {
        match self {
            InputMode::SingleSource | InputMode::StructuredExperiment => "documentContents",
            InputMode::RawPrompt => "rawPrompt",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::SingleSource => write!(f, "single-source"),
            InputMode::StructuredExperiment => write!(f, "experiment"),
            InputMode::RawPrompt => write!(f, "raw"),
        }
    }
}

/// The document a run works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    /// Short name used in the result file name (the input file stem)
    pub label: String,
    /// Full document text
    pub text: String,
}

impl InputDocument {
    /// Create a document from text
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Read a document from disk, labeled with the file stem
    pub async fn load(path: &Path) -> HarnessResult<Self> {
        let text = fs::read_to_string(path).await.map_err(|e| {
            HarnessError::no_active_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let label = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("input");
        Ok(Self::new(label, text))
    }
}

/// A prompt ready to send, plus what the result file needs from its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrompt {
    /// Exact text sent to the model
    pub text: String,
    /// Ideal solution serialized as YAML (experiments only)
    pub ideal_solution: Option<String>,
}

/// What a completed run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Mode the input was run in
    pub mode: InputMode,
    /// Result file written
    pub output_path: PathBuf,
    /// Extracted payload or the not-generated marker
    pub extraction: ExtractionResult,
    /// YAML syntax problems in the payload (experiments only)
    pub yaml_diagnostics: Option<String>,
    /// Prompt text that was sent
    pub prompt: String,
    /// How the response stream ended, for streaming calls
    pub termination: Option<Termination>,
}

/// Build the prompt for an Apex class
pub fn single_source_spec(source: &str) -> PromptSpec {
    let body = format!("```\n{}\n```", source.trim_end_matches(['\n', '\r']));
    PromptSpec::new(
        DEFAULT_INSTRUCTIONS,
        derive_user_prompt(source),
        vec![ContextBlock::new("context1", APEX_CONTEXT_LABEL, body)],
    )
}

/// Build the prompt for an input in the given mode
pub fn prepare_prompt(mode: InputMode, text: &str) -> HarnessResult<PreparedPrompt> {
    match mode {
        InputMode::SingleSource => Ok(PreparedPrompt {
            text: single_source_spec(text).assemble().into_string(),
            ideal_solution: None,
        }),
        InputMode::StructuredExperiment => {
            let experiment = Experiment::parse(text)?;
            let spec = experiment.to_prompt_spec()?;
            if let Some(id) = experiment.id() {
                debug!(experiment = %id, blocks = spec.context_blocks.len(), "experiment loaded");
            }
            Ok(PreparedPrompt {
                text: spec.assemble().into_string(),
                ideal_solution: experiment.ideal_solution_yaml()?,
            })
        }
        InputMode::RawPrompt => Ok(PreparedPrompt {
            text: text.to_string(),
            ideal_solution: None,
        }),
    }
}

/// Render the result file of a structured experiment
///
/// The prompt is kept as a YAML block scalar so the file stays readable
/// next to the payload and the ideal solution.
pub fn render_experiment_result(prompt: &str, payload: &str, ideal_solution: Option<&str>) -> String {
    let mut out = format!(
        "prompt: |\n{}\n\n{}\n",
        indent(prompt.trim_end(), 2),
        payload.trim_end_matches(['\n', '\r'])
    );
    if let Some(ideal) = ideal_solution {
        out.push_str("\nideal_solution:\n");
        out.push_str(&indent(ideal.trim_end(), 2));
        out.push('\n');
    }
    out
}

/// Base name (no extension) of a result file
pub fn result_file_stem<Tz>(mode: InputMode, label: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}_{}_{}", mode.output_prefix(), label, at.format(TIMESTAMP_FORMAT))
}

/// Create `dir/<stem>.yaml` without clobbering anything
///
/// When the name is taken, `_2`, `_3`, ... is appended to the stem. A write
/// that fails part way removes the file again.
pub async fn write_result(dir: &Path, stem: &str, contents: &str) -> HarnessResult<PathBuf> {
    fs::create_dir_all(dir).await?;

    let mut attempt = 1usize;
    let (path, mut file) = loop {
        let name = if attempt == 1 {
            format!("{}.{}", stem, RESULT_EXTENSION)
        } else {
            format!("{}_{}.{}", stem, attempt, RESULT_EXTENSION)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    };

    let written = async {
        file.write_all(contents.as_bytes()).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial result file");
        }
        return Err(e.into());
    }

    Ok(path)
}

/// Drives a model over input documents
pub struct Runner {
    model: Arc<dyn LanguageModel>,
    config: Config,
    workspace: PathBuf,
}

impl Runner {
    /// Create a runner writing results under `workspace`
    pub fn new(model: Arc<dyn LanguageModel>, config: Config, workspace: impl Into<PathBuf>) -> Self {
        Self {
            model,
            config,
            workspace: workspace.into(),
        }
    }

    /// Workspace root
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Directory result files are written to
    pub fn results_dir(&self) -> PathBuf {
        self.workspace.join(&self.config.results_dir)
    }

    /// Load `path` and run it
    pub async fn run_file(&self, mode: InputMode, path: &Path) -> HarnessResult<RunReport> {
        let document = InputDocument::load(path).await?;
        self.run(mode, &document).await
    }

    /// Run one document end to end
    pub async fn run(&self, mode: InputMode, document: &InputDocument) -> HarnessResult<RunReport> {
        if !self.workspace.is_dir() {
            return Err(HarnessError::missing_workspace(&self.workspace));
        }
        if document.text.trim().is_empty() {
            return Err(HarnessError::no_active_input(format!(
                "Input '{}' is empty",
                document.label
            )));
        }

        let prepared = prepare_prompt(mode, &document.text)?;
        info!(
            %mode,
            input = %document.label,
            backend = self.model.name(),
            call_mode = ?self.config.call_mode,
            prompt_bytes = prepared.text.len(),
            "sending prompt"
        );

        let (response, termination) = self.complete(&prepared.text).await?;
        if response.trim().is_empty() {
            return Err(HarnessError::empty_response());
        }

        let extraction = extract(&response);
        if !extraction.is_payload() {
            warn!(input = %document.label, "no OpenAPI payload in response");
        }

        let mut diagnostics = None;
        let contents = match mode {
            InputMode::StructuredExperiment => {
                if let ExtractionResult::Payload(payload) = &extraction {
                    diagnostics = yaml_diagnostics(payload);
                    if let Some(problem) = &diagnostics {
                        warn!(error = %problem, "generated YAML document has syntax errors");
                    }
                }
                render_experiment_result(
                    &prepared.text,
                    extraction.as_str(),
                    prepared.ideal_solution.as_deref(),
                )
            }
            InputMode::SingleSource | InputMode::RawPrompt => extraction.as_str().to_string(),
        };

        let stem = result_file_stem(mode, &document.label, &Local::now());
        let output_path = write_result(&self.results_dir(), &stem, &contents).await?;
        info!(path = %output_path.display(), "result written");

        Ok(RunReport {
            mode,
            output_path,
            extraction,
            yaml_diagnostics: diagnostics,
            prompt: prepared.text,
            termination,
        })
    }

    async fn complete(&self, prompt: &str) -> HarnessResult<(String, Option<Termination>)> {
        match self.config.call_mode {
            CallMode::SingleShot => Ok((self.model.call(prompt).await?, None)),
            CallMode::Streaming => {
                let request = ChatRequest::new(prompt, END_OF_PROMPT_TAG, self.config.max_tokens);
                let stream = self.model.chat_stream(request, GENERATION_OPERATION).await?;
                let outcome = consume_with_outcome(stream).await;
                debug!(chunks = outcome.chunks_read, termination = ?outcome.termination, "stream consumed");
                Ok((outcome.text, Some(outcome.termination)))
            }
        }
    }
}
