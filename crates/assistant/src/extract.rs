//! Pull a JSON object out of a raw model completion.
//!
//! Models wrap their JSON in markdown fences or surround it with prose often
//! enough that strict parsing of the whole text is not an option. Extraction
//! never fails: text that yields no object comes back as [`Extracted::Plain`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```json\s*").unwrap());
static BARE_OPENING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```\s*").unwrap());
static CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A JSON object was found.
    Structured(Value),
    /// No object could be parsed; carries the fence-stripped text.
    Plain(String),
}

impl Extracted {
    pub fn into_object(self) -> Option<Value> {
        match self {
            Extracted::Structured(value) => Some(value),
            Extracted::Plain(_) => None,
        }
    }
}

/// Trim and remove markdown code fences.
pub fn strip_fences(raw: &str) -> String {
    let text = raw.trim();
    let text = OPENING_FENCE.replace_all(text, "");
    let text = BARE_OPENING_FENCE.replace(&text, "");
    let text = CLOSING_FENCE.replace(&text, "");
    text.trim().to_string()
}

/// Extract the first JSON object from a completion.
///
/// Order: a string-aware bracket-depth scan for a balanced object, then the
/// slice between the first `{` and the last `}`, then the whole text.
pub fn extract(raw: &str) -> Extracted {
    let cleaned = strip_fences(raw);

    if let Some(value) = scan_balanced_objects(&cleaned) {
        return Extracted::Structured(value);
    }

    if let (Some(first), Some(last)) = (cleaned.find('{'), cleaned.rfind('}'))
        && first < last
        && let Some(value) = parse_object(&cleaned[first..=last])
    {
        return Extracted::Structured(value);
    }

    match parse_object(&cleaned) {
        Some(value) => Extracted::Structured(value),
        None => Extracted::Plain(cleaned),
    }
}

/// First `max_chars` characters of `text`, for log lines.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

fn scan_balanced_objects(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut from = 0;

    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(bytes, start)
            && let Some(value) = parse_object(&text[start..=end])
        {
            return Some(value);
        }
        from = start + 1;
    }

    None
}

/// Index of the `}` closing the object opened at `start`. Braces inside
/// string literals are ignored. Only ASCII bytes are inspected, so every
/// returned index is a char boundary.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn clean_json_is_returned_unchanged() {
        assert_eq!(extract(r#"{"a":1}"#), Extracted::Structured(json!({"a": 1})));
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        let raw = "```json\n{\"action\":\"list_tasks\"}\n```";
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["action"], "list_tasks");
    }

    #[test]
    fn fence_label_is_case_insensitive() {
        let raw = "```JSON\n{\"action\":\"none\"}\n```\n";
        assert!(matches!(extract(raw), Extracted::Structured(_)));
    }

    #[test]
    fn bare_fence_is_unwrapped() {
        let raw = "```\n{\"priority\":\"low\"}\n```";
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["priority"], "low");
    }

    #[test]
    fn prose_around_object_is_ignored() {
        let raw = "Sure thing! {\"action\":\"list_tasks\",\"response\":\"Here\"} Hope that helps.";
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["action"], "list_tasks");
    }

    #[test]
    fn braces_inside_strings_do_not_truncate() {
        let raw = r#"{"action":"none","response":"use {curly} braces"} and a stray }"#;
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["response"], "use {curly} braces");
    }

    #[test]
    fn first_of_two_objects_wins() {
        let raw = r#"{"action":"list_tasks"} or maybe {"action":"none"}"#;
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["action"], "list_tasks");
    }

    #[test]
    fn escaped_quotes_are_respected() {
        let raw = r#"{"response":"she said \"hi {\" twice"}"#;
        let value = extract(raw).into_object().unwrap();
        assert_eq!(value["response"], "she said \"hi {\" twice");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            extract("  Sure, I can help!  "),
            Extracted::Plain("Sure, I can help!".to_string())
        );
    }

    #[test]
    fn non_object_json_is_plain() {
        assert!(matches!(extract("[1, 2, 3]"), Extracted::Plain(_)));
        assert!(matches!(extract("{broken"), Extracted::Plain(_)));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("hi", 10), "hi");
    }
}
