//! JSON extraction and repair for model output.
//!
//! Models asked for "JSON only" still routinely wrap the document in prose or
//! markdown fences, and sometimes leave trailing commas behind. The helpers
//! here pull out the most likely JSON candidate and apply one bounded repair.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

/// A comma followed only by whitespace before a closing bracket or brace.
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"));

/// Extract the JSON candidate from raw model output.
///
/// Takes the span from the first `{` to the last `}` (inclusive). When either
/// brace is missing, or the last `}` precedes the first `{`, the markdown fence
/// markers ```` ```json ```` and ```` ``` ```` are stripped from the whole text
/// instead and the result is trimmed.
///
/// ## Examples
///
/// ```
/// use paperai_lib::normalize::extract_json_candidate;
///
/// assert_eq!(extract_json_candidate("Sure! {\"a\":1} Enjoy."), "{\"a\":1}");
/// assert_eq!(extract_json_candidate("```json\n[1, 2]\n```"), "[1, 2]");
/// ```
pub fn extract_json_candidate(text: &str) -> String {
    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}'))
        && first <= last
    {
        return text[first..=last].to_string();
    }

    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Remove every comma that directly precedes a closing `]` or `}`.
///
/// Whitespace between the comma and the bracket is dropped with it. Valid JSON
/// without trailing commas is returned unchanged, except when a string value
/// itself contains `,]` or `,}` text.
///
/// ## Examples
///
/// ```
/// use paperai_lib::normalize::repair_trailing_commas;
///
/// assert_eq!(repair_trailing_commas("{\"a\":[1,2,],}"), "{\"a\":[1,2]}");
/// ```
pub fn repair_trailing_commas(json: &str) -> String {
    TRAILING_COMMA.replace_all(json, "$1").into_owned()
}

/// Why a lenient parse gave up.
#[derive(Debug)]
pub struct LenientParseError {
    /// Error from parsing the candidate as-is
    pub strict: serde_json::Error,
    /// Error from parsing the repaired candidate
    pub repaired: serde_json::Error,
}

/// Parse `candidate` into `T`, retrying once after trailing-comma repair.
///
/// The candidate is first parsed into an untyped [`serde_json::Value`] and then
/// converted to `T`, so both syntax errors and shape errors (missing required
/// fields, wrong types) count as failures. Exactly one repair attempt is made.
pub fn parse_lenient<T: DeserializeOwned>(candidate: &str) -> Result<T, LenientParseError> {
    let strict = match parse_typed(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let repaired = repair_trailing_commas(candidate);
    parse_typed(&repaired).map_err(|repaired| LenientParseError { strict, repaired })
}

fn parse_typed<T: DeserializeOwned>(json: &str) -> Result<T, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    #[test]
    fn extracts_span_between_prose() {
        let text = "Here you go:\n{\"topicOverview\": \"X\"}\nHope that helps!";
        assert_eq!(extract_json_candidate(text), "{\"topicOverview\": \"X\"}");
    }

    #[test]
    fn extracts_through_last_closing_brace() {
        let text = "{\"a\": {\"b\": 1}} trailing } brace";
        assert_eq!(
            extract_json_candidate(text),
            "{\"a\": {\"b\": 1}} trailing }"
        );
    }

    #[test]
    fn extracts_from_fenced_object() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_candidate(text), "{\"a\": 1}");
    }

    #[test]
    fn strips_fences_without_braces() {
        assert_eq!(extract_json_candidate("```json\n  [1, 2, 3]  \n```"), "[1, 2, 3]");
        assert_eq!(extract_json_candidate("```\nnull\n```"), "null");
    }

    #[test]
    fn reversed_braces_fall_back_to_fence_stripping() {
        assert_eq!(extract_json_candidate("} nothing here {"), "} nothing here {");
    }

    #[test]
    fn empty_text_yields_empty_candidate() {
        assert_eq!(extract_json_candidate(""), "");
        assert_eq!(extract_json_candidate("   \n"), "");
    }

    #[test]
    fn repair_removes_trailing_commas_with_whitespace() {
        let broken = "{\n  \"a\": [1, 2,\n  ],\n  \"b\": 3,\n}";
        let fixed = repair_trailing_commas(broken);
        let value: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": 3}));
    }

    #[test]
    fn trailing_comma_fails_strict_and_passes_after_repair() {
        let candidate = "{\"a\":1,}";
        assert!(serde_json::from_str::<Value>(candidate).is_err());
        assert_eq!(repair_trailing_commas(candidate), "{\"a\":1}");

        let value: Value = parse_lenient(candidate).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn parse_lenient_reports_both_errors() {
        let err = parse_lenient::<Value>("{not json,}").unwrap_err();
        assert!(err.strict.is_syntax());
        assert!(err.repaired.is_syntax());
    }

    #[test]
    fn parse_lenient_rejects_wrong_shape() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Needs {
            field: String,
        }

        let err = parse_lenient::<Needs>("{\"other\": 1}").unwrap_err();
        assert!(err.strict.is_data());
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn json_object() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,5}", json_value(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn extraction_returns_object_between_brace_free_prose(
            object in json_object(),
            prefix in "[a-zA-Z0-9 .!:\n]{0,30}",
            suffix in "[a-zA-Z0-9 .!:\n]{0,30}",
        ) {
            let json = serde_json::to_string(&object).unwrap();
            let text = format!("{prefix}{json}{suffix}");
            prop_assert_eq!(extract_json_candidate(&text), json);
        }

        #[test]
        fn fence_stripping_leaves_parseable_json(
            value in prop_oneof![json_object(), "[a-z ]{0,8}".prop_map(Value::String)],
            pretty in any::<bool>(),
        ) {
            let json = if pretty {
                serde_json::to_string_pretty(&value).unwrap()
            } else {
                serde_json::to_string(&value).unwrap()
            };
            let text = format!("```json\n{json}\n```\n");
            let candidate = extract_json_candidate(&text);
            let parsed: Value = serde_json::from_str(&candidate).unwrap();
            prop_assert_eq!(parsed, value);
        }

        #[test]
        fn repair_is_idempotent_on_valid_json(object in json_object()) {
            let json = serde_json::to_string_pretty(&object).unwrap();
            let repaired = repair_trailing_commas(&json);
            let original: Value = serde_json::from_str(&json).unwrap();
            let after: Value = serde_json::from_str(&repaired).unwrap();
            prop_assert_eq!(original, after);
            prop_assert_eq!(repair_trailing_commas(&repaired), repaired);
        }
    }
}
