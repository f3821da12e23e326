//! JSON object extraction from model replies.
//!
//! Models often wrap the object in markdown fences or surround it with
//! conversational text.

use serde_json::{Map, Value};

/// Extract the first JSON object from a model reply.
///
/// Tries a ` ```json ` fence, a bare fence whose content starts with `{`,
/// then every `{` in the text, parsed with string-aware brace matching.
pub fn extract_object(response: &str) -> Option<Map<String, Value>> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json")
        && let Some(end) = trimmed[start + 7..].find("```")
        && let Some(obj) = parse_object(&trimmed[start + 7..start + 7 + end])
    {
        return Some(obj);
    }

    if let Some(start) = trimmed.find("```")
        && let Some(end) = trimmed[start + 3..].find("```")
    {
        let inner = trimmed[start + 3..start + 3 + end].trim();
        if inner.starts_with('{')
            && let Some(obj) = parse_object(inner)
        {
            return Some(obj);
        }
    }

    trimmed
        .match_indices('{')
        .find_map(|(idx, _)| balanced_braces(&trimmed[idx..]).and_then(parse_object))
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The prefix of `text` up to the brace that closes its leading `{`.
fn balanced_braces(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_json_fence() {
        let reply = "Here you go:\n```json\n{\"type\": \"feat\", \"subject\": \"add x\"}\n```";
        let obj = extract_object(reply).unwrap();
        assert_eq!(obj["type"], "feat");
        assert_eq!(obj["subject"], "add x");
    }

    #[test]
    fn test_extract_from_bare_fence() {
        let reply = "```\n{\"subject\": \"fix y\"}\n```";
        assert_eq!(extract_object(reply).unwrap()["subject"], "fix y");
    }

    #[test]
    fn test_extract_with_surrounding_text() {
        let reply = r#"Sure! {"subject": "update docs", "body": null} Hope this helps."#;
        let obj = extract_object(reply).unwrap();
        assert_eq!(obj["subject"], "update docs");
        assert!(obj["body"].is_null());
    }

    #[test]
    fn test_braces_inside_strings() {
        let reply = r#"{"subject": "use { and } carefully"} trailing"#;
        assert_eq!(
            extract_object(reply).unwrap()["subject"],
            "use { and } carefully"
        );
    }

    #[test]
    fn test_escaped_quotes() {
        let reply = r#"{"subject": "rename \"old\" helper"}"#;
        assert_eq!(
            extract_object(reply).unwrap()["subject"],
            "rename \"old\" helper"
        );
    }

    #[test]
    fn test_skips_non_json_braces() {
        let reply = r#"fn main() { } then {"subject": "real"}"#;
        assert_eq!(extract_object(reply).unwrap()["subject"], "real");
    }

    #[test]
    fn test_no_object() {
        assert!(extract_object("feat: plain text message").is_none());
        assert!(extract_object("}}").is_none());
        assert!(extract_object("```json\n```").is_none());
        assert!(extract_object("[1, 2, 3]").is_none());
    }
}
