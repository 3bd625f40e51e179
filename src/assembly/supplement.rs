//! User Prompt Supplement
//!
//! Derives extra user instructions from an Apex source by looking for
//! annotation substrings. This is plain substring matching, not parsing:
//! an annotation mentioned in a comment or string literal still fires.
//!
//! Rules are independent of each other. Each fires at most once, and the
//! fired sentences are emitted in table order regardless of where the
//! markers appear in the source.

/// A guidance sentence keyed on annotation markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplementRule {
    /// Fires when any of these substrings occurs in the source
    pub markers: &'static [&'static str],
    /// Sentence appended to the user prompt
    pub guidance: &'static str,
}

impl SupplementRule {
    /// Check whether the rule applies to `source`
    pub fn applies_to(&self, source: &str) -> bool {
        self.markers.iter().any(|marker| source.contains(marker))
    }
}

/// Built-in rules
pub static SUPPLEMENT_RULES: &[SupplementRule] = &[
    SupplementRule {
        markers: &["@AuraEnabled"],
        guidance: "Only include methods that have the @AuraEnabled annotation in the paths of the OpenAPI v3 specification.",
    },
    SupplementRule {
        markers: &["@RestResource"],
        guidance: "Only include methods that have @HttpGet, @HttpPost, @HttpPatch, @HttpPut, or @HttpDelete annotations in the paths of the OpenAPI v3 specification. Unannotated methods are utility methods.",
    },
    SupplementRule {
        markers: &["@HttpGet", "@HttpDelete"],
        guidance: "Methods annotated with @HttpGet or @HttpDelete must have no parameters. This is because GET and DELETE requests have no request body, so there's nothing to deserialize.",
    },
];

/// Build the user prompt for an Apex source
///
/// Returns one line per fired rule, newline-terminated, or an empty string
/// when nothing fires.
///
/// # Examples
/// ```
/// use prompt_lab::assembly::derive_user_prompt;
/// let prompt = derive_user_prompt("@AuraEnabled public static String hi() {}");
/// assert!(prompt.contains("@AuraEnabled annotation"));
/// assert_eq!(derive_user_prompt("public class Plain {}"), "");
/// ```
pub fn derive_user_prompt(source: &str) -> String {
    SUPPLEMENT_RULES
        .iter()
        .filter(|rule| rule.applies_to(source))
        .map(|rule| format!("{}\n", rule.guidance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers() {
        assert_eq!(derive_user_prompt("public class Util { }"), "");
    }

    #[test]
    fn test_http_get_or_delete() {
        let get = derive_user_prompt("@HttpGet global static Account fetch() {}");
        let delete = derive_user_prompt("@HttpDelete global static void drop() {}");
        assert_eq!(get, delete);
        assert!(get.contains("must have no parameters"));
    }

    #[test]
    fn test_both_http_markers_fire_once() {
        let prompt = derive_user_prompt("@HttpGet a() {} @HttpDelete b() {}");
        assert_eq!(prompt.matches("must have no parameters").count(), 1);
    }

    #[test]
    fn test_table_order_not_source_order() {
        let prompt = derive_user_prompt("@HttpGet x() {}\n@AuraEnabled y() {}");
        let aura = prompt.find("@AuraEnabled annotation").unwrap();
        let http = prompt.find("must have no parameters").unwrap();
        assert!(aura < http);
    }
}
