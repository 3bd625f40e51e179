//! Text Normalization
//!
//! Canonicalizes free-form prompt fragments before they are concatenated:
//! 1. Strip trailing whitespace from every line
//! 2. Drop every line that is empty after stripping
//! 3. Rejoin with a single `\n`
//!
//! Leading indentation is kept, so nested lists in instructions survive.

/// Normalize a multi-line prompt fragment
///
/// Total and idempotent; the empty string (or a blank-only string)
/// normalizes to the empty string.
///
/// # Examples
/// ```
/// use prompt_lab::normalize::normalize;
/// assert_eq!(normalize("  a  \n\n\tb\t\n   \n"), "  a\n\tb");
/// assert_eq!(normalize(""), "");
/// assert_eq!(normalize(" \n \n"), "");
/// ```
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(trimmed);
    }

    out
}
