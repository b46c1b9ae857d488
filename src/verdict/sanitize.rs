//! Response sanitizer
//!
//! Models wrap JSON in markdown fences, prepend prose, annotate fields with `//` comments,
//! leave trailing commas and answer with Python literals. [`sanitize`] removes all of that in
//! one pass so the result can go straight into `serde_json`. It never touches text inside
//! JSON string literals, and `sanitize(sanitize(x)) == sanitize(x)`.

use regex::Regex;
use std::sync::OnceLock;

fn fence_marker() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid fence regex"))
}

/// Cleans a raw model reply down to the JSON object it carries.
///
/// A reply that already is a JSON object comes back trimmed and otherwise unchanged. When no
/// `{` is present the fence-stripped, trimmed text is returned as is and the subsequent JSON
/// decode reports the failure.
pub fn sanitize(raw: &str) -> String {
    let text = raw.trim_start_matches('\u{feff}').trim();
    if is_json_object(text) {
        return text.to_string();
    }

    let text = skip_opening_fence(text);
    let Some(start) = text.find('{') else {
        let body = text.split("```").next().unwrap_or_default();
        return strip_comments(body).trim().to_string();
    };

    let without_comments = strip_comments(&text[start..]);
    let candidates = object_candidates(&without_comments);

    for candidate in &candidates {
        let normalized = normalize_literals(candidate);
        if is_json_object(normalized.trim()) {
            return normalized.trim().to_string();
        }
    }

    // Nothing parses; hand the decoder the most plausible remainder
    let fallback = candidates.first().copied().unwrap_or(without_comments.as_str());
    normalize_literals(fallback).trim().to_string()
}

fn is_json_object(text: &str) -> bool {
    text.starts_with('{')
        && matches!(
            serde_json::from_str::<serde_json::Value>(text),
            Ok(serde_json::Value::Object(_))
        )
}

/// Drops everything up to and including an opening fence and its language tag.
///
/// Only a fence that opens before the first `{` counts; backticks after that belong to the
/// object or to trailing prose and are left to [`object_candidates`].
fn skip_opening_fence(text: &str) -> &str {
    let Some(fence) = fence_marker().find(text) else {
        return text;
    };
    if text.find('{').is_some_and(|brace| brace < fence.start()) {
        return text;
    }
    text[fence.end()..].trim_start()
}

/// Removes `//` line comments and `/* */` block comments outside string literals
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Top-level balanced `{...}` slices in reading order. Braces inside string literals do not
/// count, and a `{` that never closes is skipped so a later object can still be found.
fn object_candidates(input: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut resume = 0;

    for (start, c) in input.char_indices() {
        if c != '{' || start < resume {
            continue;
        }
        if let Some(len) = balanced_end(&input[start..]) {
            candidates.push(&input[start..start + len]);
            resume = start + len;
        }
    }

    candidates
}

/// Byte length of the object opening at the start of `input`, if it closes
fn balanced_end(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Drops trailing commas and rewrites `True`/`False`/`None` outside string literals
fn normalize_literals(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let end = chars[i..]
                    .iter()
                    .position(|n| !(n.is_ascii_alphanumeric() || *n == '_'))
                    .map_or(chars.len(), |p| i + p);
                let word: String = chars[i..end].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    const CLEAN: &str = r#"{"result": "Sensitive", "confidence": 91, "evidence": "x"}"#;

    #[parameterized(
        already_clean = { r#"{"result": "Sensitive", "confidence": 91, "evidence": "x"}"# },
        json_fence = { "```json\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}\n```" },
        upper_json_fence = { "```JSON\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}\n```" },
        bare_fence = { "```\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}\n```" },
        inline_fence = { "```{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}```" },
        unterminated_fence = { "```json\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}" },
        surrounding_whitespace = { "\n\n  {\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}  \n" },
        byte_order_mark = { "\u{feff}{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}" },
        leading_prose = { "Here is the analysis:\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}" },
        trailing_prose = { "{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}\nLet me know if you need more." },
        prose_around_fence = { "Result:\n```json\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}\n```\nDone." },
        trailing_line_comment = { "{\"result\": \"Sensitive\", // final call\n\"confidence\": 91, \"evidence\": \"x\"}" },
        trailing_comment_after_object = { "{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"} // end" },
        block_comment = { "{\"result\": \"Sensitive\", /* label */ \"confidence\": 91, \"evidence\": \"x\"}" },
        trailing_comma = { "{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\",}" },
        trailing_comma_newline = { "{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\",\n}" },
        fence_and_comment = { "```json\n{\"result\": \"Sensitive\", // why\n\"confidence\": 91, \"evidence\": \"x\"}\n```" },
        braced_note_before_object = { "如下{注}：{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}" },
        unclosed_brace_before_object = { "结论{见下：{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\"}" },
        braced_note_and_trailing_comma = { "{待核}\n{\"result\": \"Sensitive\", \"confidence\": 91, \"evidence\": \"x\",}" },
    )]
    fn test_artifacts_parse_to_same_value(raw: &str) {
        let expected: serde_json::Value = serde_json::from_str(CLEAN).unwrap();
        let cleaned = sanitize(raw);
        let actual: serde_json::Value = serde_json::from_str(&cleaned)
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", cleaned, e));
        assert_eq!(actual, expected);
    }

    #[parameterized(
        url_in_string = { r#"{"evidence": "see http://gov.example/a//b"}"#, "see http://gov.example/a//b" },
        comment_markers_in_string = { r#"{"evidence": "a /* b */ c"}"#, "a /* b */ c" },
        python_words_in_string = { r#"{"evidence": "True story, None left"}"#, "True story, None left" },
        escaped_quote_in_string = { r#"{"evidence": "he said \"// no\""}"#, "he said \"// no\"" },
        braces_in_string = { r#"{"evidence": "set {a} closed }"}"#, "set {a} closed }" },
        trailing_comma_in_string = { r#"{"evidence": "a, }"}"#, "a, }" },
        fence_in_string = { r#"{"result":"Public","confidence":98,"evidence":"quotes a ```yaml``` snippet"}"#, "quotes a ```yaml``` snippet" },
        fence_in_fenced_string = { "```json\n{\"evidence\": \"see ```sql``` block\"}\n```", "see ```sql``` block" },
        fence_in_string_after_prose = { "Answer: {\"evidence\": \"a ``` b\", \"x\": 1,}", "a ``` b" },
    )]
    fn test_string_contents_untouched(raw: &str, evidence: &str) {
        let value: serde_json::Value = serde_json::from_str(&sanitize(raw)).unwrap();
        assert_eq!(value["evidence"], evidence);
    }

    #[test]
    fn test_python_literals() {
        let cleaned = sanitize(r#"{"is_sensitive": True, "other": False, "note": None}"#);
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["is_sensitive"], true);
        assert_eq!(value["other"], false);
        assert!(value["note"].is_null());
    }

    #[test]
    fn test_nested_trailing_commas() {
        let cleaned = sanitize("{\"a\": [1, 2,], \"b\": {\"c\": 1,},}");
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value, serde_json::json!({"a": [1, 2], "b": {"c": 1}}));
    }

    #[test]
    fn test_multibyte_content_survives() {
        let cleaned = sanitize("```json\n{\"evidence\": \"标识类：“内部参阅”\"} // 注释\n```");
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["evidence"], "标识类：“内部参阅”");
    }

    #[test]
    fn test_no_object_returns_trimmed_text() {
        assert_eq!(sanitize("  I cannot help with that.  "), "I cannot help with that.");
    }

    #[test]
    fn test_unclosed_object_kept_for_decoder() {
        let cleaned = sanitize("{\"result\": \"Sensitive\"");
        assert_eq!(cleaned, "{\"result\": \"Sensitive\"");
        assert!(serde_json::from_str::<serde_json::Value>(&cleaned).is_err());
    }

    #[parameterized(
        clean = { CLEAN },
        fenced = { "```json\n{\"a\": 1, // c\n\"b\": True,}\n```" },
        prose = { "Answer: {\"a\": \"x\"} thanks" },
        no_object = { "```\nnothing here\n```" },
        fence_in_string = { r#"{"evidence": "```yaml``` quoted"}"# },
        braced_note = { "如下{注}：{\"a\": 1,}" },
    )]
    fn test_idempotent(raw: &str) {
        let once = sanitize(raw);
        assert_eq!(sanitize(&once), once);
    }
}
