//! Prompt Assembly Tests

use pretty_assertions::assert_eq;
use prompt_lab::assembly::SUPPLEMENT_RULES;
use prompt_lab::{
    assemble, derive_user_prompt, normalize, ContextBlock, ASSISTANT_TAG, END_OF_PROMPT_TAG,
    SYSTEM_TAG, USER_TAG,
};

fn blocks(k: usize) -> Vec<ContextBlock> {
    (0..k)
        .map(|i| {
            ContextBlock::new(
                format!("context{}", i + 1),
                format!("Class number {}:", i),
                format!("public class C{} {{}}\n", i),
            )
        })
        .collect()
}

#[test]
fn test_normalize_idempotent() {
    let samples = [
        "",
        "   \n\t\n",
        "a  \n\n  b\t\n",
        "  indented\r\n\r\ntrailing   ",
        "single",
    ];
    for sample in samples {
        let once = normalize(sample);
        assert_eq!(normalize(&once), once, "input: {:?}", sample);
    }
    assert_eq!(normalize(" \n\t \n"), "");
    assert_eq!(normalize("a  \n\n  b\t\n"), "a\n  b");
}

#[test]
fn test_tag_counts_and_order() {
    let prompt = assemble("system text", "user text", &blocks(3));
    let text = prompt.as_str();

    assert_eq!(text.matches(SYSTEM_TAG).count(), 1);
    assert_eq!(text.matches(USER_TAG).count(), 1);
    assert_eq!(text.matches(ASSISTANT_TAG).count(), 1);
    assert_eq!(text.matches(END_OF_PROMPT_TAG).count(), 2);

    let system = text.find(SYSTEM_TAG).unwrap();
    let first_end = text.find(END_OF_PROMPT_TAG).unwrap();
    let user = text.find(USER_TAG).unwrap();
    let last_end = text.rfind(END_OF_PROMPT_TAG).unwrap();
    let assistant = text.find(ASSISTANT_TAG).unwrap();
    assert!(system < first_end);
    assert!(first_end < user);
    assert!(user < last_end);
    assert!(last_end < assistant);
    assert!(text.ends_with("<|assistant|>\n"));
}

#[test]
fn test_k_blocks_give_k_minus_one_headers() {
    for k in 0..6 {
        let prompt = assemble("sys", "usr", &blocks(k));
        let text = prompt.as_str();

        for i in 0..k {
            assert!(text.contains(&format!("public class C{} {{}}", i)), "k={} i={}", k, i);
        }
        let headers = text.lines().filter(|l| l.starts_with("Context ") && l.ends_with(':')).count();
        assert_eq!(headers, k.saturating_sub(1), "k={}", k);
        for n in 1..k {
            assert!(text.contains(&format!("\n\nContext {}:\nClass number {}:\n", n, n)));
        }
    }
}

#[test]
fn test_primary_block_follows_user_prompt() {
    let prompt = assemble("sys", "usr", &blocks(2));
    assert!(prompt
        .as_str()
        .contains("<|user|>\nusr\nClass number 0:\npublic class C0 {}\n\nContext 1:"));
}

#[test]
fn test_system_prompt_normalized() {
    let prompt = assemble("  line one   \n\n\nline two\t\n", "", &[]);
    assert!(prompt.as_str().starts_with("<|system|>\n  line one\nline two\n<|endofprompt|>\n"));
}

#[test]
fn test_aura_enabled_supplement() {
    let aura = SUPPLEMENT_RULES[0].guidance;
    let with = "public class A {\n  @AuraEnabled\n  public static void go() {}\n}";
    let without = "public class A {\n  public static void go() {}\n}";

    assert!(derive_user_prompt(with).contains(aura));
    assert!(!derive_user_prompt(without).contains(aura));
}

#[test]
fn test_supplement_rules_independent() {
    let rest = "@RestResource(urlMapping='/a/*')\nglobal class A {\n  @HttpPost\n  global static void make() {}\n}";
    let prompt = derive_user_prompt(rest);
    assert!(prompt.contains("Unannotated methods are utility methods."));
    assert!(!prompt.contains("must have no parameters"));
    assert!(!prompt.contains("@AuraEnabled annotation"));

    let delete_only = "global class B {\n  @HttpDelete\n  global static void drop() {}\n}";
    assert_eq!(
        derive_user_prompt(delete_only),
        format!("{}\n", SUPPLEMENT_RULES[2].guidance)
    );
}

#[test]
fn test_supplement_table_order() {
    let source = "@HttpGet\n@AuraEnabled\n@RestResource\n@HttpGet";
    let expected: String = SUPPLEMENT_RULES
        .iter()
        .map(|rule| format!("{}\n", rule.guidance))
        .collect();
    assert_eq!(derive_user_prompt(source), expected);
}
