//! Structured Experiments
//!
//! A structured experiment is a YAML file that keeps the prompt fragments
//! apart so they can be varied independently:
//!
//! ```yaml
//! experiment: 1
//! systemPrompt: |
//!   ...
//! userPrompt: |
//!   ...
//! context:
//!   - context1:
//!       text: 'This is the Apex class ...'
//!       context: |
//!         public class A {}
//!   - context2:
//!       text: 'A helper it depends on:'
//!       context: |
//!         public class B {}
//! ideal_solution:
//!   openapi: 3.0.0
//! ```
//!
//! Entry `i` of `context` must be keyed `context<i+1>`. A gap means the file
//! was truncated or hand-edited wrongly, and conversion fails before any
//! model call.

use crate::assembly::{ContextBlock, PromptSpec};
use crate::errors::{HarnessError, HarnessResult};
use crate::prompts::{sample_experiment, DEFAULT_INSTRUCTIONS};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A parsed experiment file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Free-form experiment identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<Value>,
    /// Grounding instructions; defaults to the built-in instructions
    #[serde(rename = "systemPrompt", default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Task-specific instructions
    #[serde(rename = "userPrompt", default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    /// Ordered single-key mappings `contextN: {text, context}`
    #[serde(default)]
    pub context: Vec<Value>,
    /// Reference output, echoed into results uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_solution: Option<Value>,
}

/// Body of a `contextN` entry
#[derive(Debug, Clone, Deserialize)]
struct ContextEntry {
    #[serde(default)]
    text: String,
    #[serde(default)]
    context: String,
}

/// Expected key for the context entry at `index`
pub fn context_key(index: usize) -> String {
    format!("context{}", index + 1)
}

impl Experiment {
    /// Parse an experiment from YAML text
    pub fn parse(text: &str) -> HarnessResult<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            HarnessError::invalid_experiment(format!("Experiment file is not valid: {}", e))
        })
    }

    /// Experiment identifier rendered as text
    pub fn id(&self) -> Option<String> {
        match self.experiment.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Convert the `context` list into ordered context blocks
    ///
    /// Fails with `Context is missing` at the first entry lacking its
    /// expected key or holding nothing under it.
    pub fn context_blocks(&self) -> HarnessResult<Vec<ContextBlock>> {
        self.context
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let key = context_key(index);
                let value = entry
                    .get(key.as_str())
                    .filter(|value| !value.is_null())
                    .ok_or_else(|| HarnessError::missing_context(&key))?;
                let parsed: ContextEntry = serde_yaml::from_value(value.clone()).map_err(|e| {
                    HarnessError::invalid_experiment(format!("{} is malformed: {}", key, e))
                })?;
                Ok(ContextBlock::new(key, parsed.text, parsed.context))
            })
            .collect()
    }

    /// Prompt fragments for the assembler
    pub fn to_prompt_spec(&self) -> HarnessResult<PromptSpec> {
        let system = self
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
        let user = self.user_prompt.clone().unwrap_or_default();
        Ok(PromptSpec::new(system, user, self.context_blocks()?))
    }

    /// The ideal solution serialized back to YAML
    pub fn ideal_solution_yaml(&self) -> HarnessResult<Option<String>> {
        match &self.ideal_solution {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_yaml::to_string(value)?)),
        }
    }
}

/// Write the sample experiment to `dir/filename`
///
/// Never overwrites: an existing file is an error.
pub fn generate_sample(dir: &Path, filename: &str) -> HarnessResult<PathBuf> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(HarnessError::missing_filename());
    }
    if !dir.is_dir() {
        return Err(HarnessError::missing_workspace(dir));
    }

    let path = dir.join(filename);
    let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(HarnessError::already_exists(&path));
        }
        Err(e) => return Err(e.into()),
    };
    write_or_remove(file, &path, sample_experiment().as_bytes())?;

    info!(path = %path.display(), "sample experiment written");
    Ok(path)
}

/// Write `contents` to a freshly created file, removing it if the write fails
fn write_or_remove<W: Write>(mut file: W, path: &Path, contents: &[u8]) -> HarnessResult<()> {
    let written = file.write_all(contents).and_then(|_| file.flush());
    drop(file);
    if let Err(e) = written {
        if let Err(cleanup) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial sample file");
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessErrorKind;

    #[test]
    fn test_parse_minimal() {
        let exp = Experiment::parse("userPrompt: Do it\ncontext: []\n").unwrap();
        assert_eq!(exp.user_prompt.as_deref(), Some("Do it"));
        assert!(exp.context.is_empty());
        assert!(exp.system_prompt.is_none());
    }

    #[test]
    fn test_system_prompt_defaults() {
        let exp = Experiment::parse("userPrompt: x\n").unwrap();
        let spec = exp.to_prompt_spec().unwrap();
        assert_eq!(spec.system_prompt, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn test_id_rendering() {
        assert_eq!(Experiment::parse("experiment: 7\n").unwrap().id().as_deref(), Some("7"));
        assert_eq!(Experiment::parse("experiment: auth\n").unwrap().id().as_deref(), Some("auth"));
        assert_eq!(Experiment::parse("userPrompt: x\n").unwrap().id(), None);
    }

    #[test]
    fn test_missing_key() {
        let yaml = "context:\n  - context1:\n      context: a\n  - context3:\n      context: c\n";
        let err = Experiment::parse(yaml).unwrap().context_blocks().unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::MissingContext);
        assert!(err.message.contains("Context is missing"));
        assert!(err.message.contains("context2"));
    }

    #[test]
    fn test_non_mapping_entry_is_missing() {
        let yaml = "context:\n  - just a string\n";
        let err = Experiment::parse(yaml).unwrap().context_blocks().unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::MissingContext);
    }

    #[test]
    fn test_empty_entry_is_missing() {
        let yaml = "context:\n  - context1:\n";
        let err = Experiment::parse(yaml).unwrap().context_blocks().unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::MissingContext);
        assert!(err.message.contains("context1"));

        let yaml = "context:\n  - context1:\n      context: a\n  - context2: ~\n";
        let err = Experiment::parse(yaml).unwrap().context_blocks().unwrap_err();
        assert!(err.message.contains("context2"));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_sample_write_removes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "half").unwrap();

        let err = write_or_remove(FailingWriter, &path, b"contents").unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::Io);
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_entry() {
        let yaml = "context:\n  - context1:\n      context: [1, 2]\n";
        let err = Experiment::parse(yaml).unwrap().context_blocks().unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::InvalidExperiment);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Experiment::parse("context: [").unwrap_err();
        assert_eq!(err.kind, HarnessErrorKind::InvalidExperiment);
    }

    #[test]
    fn test_ideal_solution_yaml() {
        let exp = Experiment::parse("ideal_solution:\n  openapi: 3.0.0\n").unwrap();
        let yaml = exp.ideal_solution_yaml().unwrap().unwrap();
        assert!(yaml.contains("openapi"));
        assert!(yaml.contains("3.0.0"));
        assert_eq!(Experiment::default().ideal_solution_yaml().unwrap(), None);
    }

    #[test]
    fn test_sample_parses() {
        let exp = Experiment::parse(&sample_experiment()).unwrap();
        let blocks = exp.context_blocks().unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].body.contains("@AuraEnabled"));
        assert!(exp.system_prompt.unwrap().contains("OpenAPI v3"));
        assert!(exp.ideal_solution.is_some());
    }
}
