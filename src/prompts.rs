//! Prompt Text Module
//!
//! Embeds the default system instructions and the sample experiment file at
//! compile time. These are the static texts the runner combines with the
//! user's source.

/// Default system instructions for OpenAPI v3 generation
///
/// Used as the system prompt for Apex sources and for experiments that do
/// not define `systemPrompt`.
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("../prompts/default_instructions.txt");

/// Sample experiment template
///
/// The `{{DEFAULT_INSTRUCTIONS}}` placeholder is replaced by
/// [`sample_experiment`].
pub const SAMPLE_EXPERIMENT_TEMPLATE: &str = include_str!("../prompts/sample_experiment.yaml");

/// Description line placed before an Apex class in the prompt
pub const APEX_CONTEXT_LABEL: &str =
    "This is the Apex class the OpenAPI v3 specification should be generated for:";

/// Operation tag sent with streaming requests
pub const GENERATION_OPERATION: &str = "generateOpenAPIv3Specifications";

const INSTRUCTIONS_PLACEHOLDER: &str = "{{DEFAULT_INSTRUCTIONS}}";

/// Indent every non-empty line by `width` spaces
pub fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the sample experiment file with the default instructions filled in
pub fn sample_experiment() -> String {
    SAMPLE_EXPERIMENT_TEMPLATE.replace(
        INSTRUCTIONS_PLACEHOLDER,
        &indent(DEFAULT_INSTRUCTIONS.trim_end(), 2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_loaded() {
        assert!(!DEFAULT_INSTRUCTIONS.is_empty());
        assert!(DEFAULT_INSTRUCTIONS.contains("OpenAPI v3"));
        assert!(SAMPLE_EXPERIMENT_TEMPLATE.contains(INSTRUCTIONS_PLACEHOLDER));
    }

    #[test]
    fn test_sample_has_no_placeholder() {
        let sample = sample_experiment();
        assert!(!sample.contains(INSTRUCTIONS_PLACEHOLDER));
        assert!(sample.contains("  You are Dev Assistant"));
        assert!(sample.contains("@AuraEnabled"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\n  b", 2), "  a\n\n    b");
    }
}
