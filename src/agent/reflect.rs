//! Reviewer verdict handling for the optional reflection pass.

use serde_json::Value;

use crate::constants::{REVIEWER_INSTRUCTIONS, REVIEWER_SYSTEM_PROMPT};
use crate::message::Message;

/// Conversation sent to the reviewer for one draft.
pub fn review_messages(draft: &str) -> Vec<Message> {
    vec![
        Message::system(REVIEWER_SYSTEM_PROMPT),
        Message::user(format!("{REVIEWER_INSTRUCTIONS}{draft}")),
    ]
}

/// Interprets the reviewer's reply.
///
/// Returns the replacement answer, or `None` to keep the draft. A JSON reply
/// only replaces the draft with a `revise` verdict carrying a non-empty
/// answer. A reply that is not JSON keeps the draft when it starts with `OK`
/// and otherwise is taken as the revised answer itself.
pub fn apply_review(review: &str) -> Option<String> {
    let review = review.trim();
    if review.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(strip_code_fence(review)) {
        Ok(verdict) => {
            if verdict.get("verdict").and_then(Value::as_str) != Some("revise") {
                return None;
            }
            verdict
                .get("answer")
                .and_then(Value::as_str)
                .filter(|answer| !answer.is_empty())
                .map(str::to_string)
        }
        Err(_) => {
            let keeps = review
                .get(..2)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ok"));
            (!keeps).then(|| review.to_string())
        }
    }
}

/// Models often wrap JSON in a ```json fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string (e.g. "json") on the opening line.
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_ok_verdict_keeps_draft() {
        assert_eq!(apply_review(r#"{"verdict":"ok"}"#), None);
        assert_eq!(apply_review(r#"  {"verdict": "ok", "answer": "ignored"} "#), None);
    }

    #[test]
    fn test_revise_verdict_replaces_draft() {
        assert_eq!(
            apply_review(r#"{"verdict":"revise","answer":"Better answer."}"#),
            Some("Better answer.".to_string())
        );
    }

    #[test]
    fn test_revise_without_answer_keeps_draft() {
        assert_eq!(apply_review(r#"{"verdict":"revise"}"#), None);
        assert_eq!(apply_review(r#"{"verdict":"revise","answer":""}"#), None);
        assert_eq!(apply_review(r#"["revise"]"#), None);
    }

    #[test]
    fn test_whitespace_answer_still_replaces() {
        assert_eq!(
            apply_review(r#"{"verdict":"revise","answer":"  "}"#),
            Some("  ".to_string())
        );
    }

    #[test]
    fn test_fenced_json_is_parsed() {
        let fenced = "```json\n{\"verdict\":\"revise\",\"answer\":\"Fixed.\"}\n```";
        assert_eq!(apply_review(fenced), Some("Fixed.".to_string()));
        assert_eq!(apply_review("```\n{\"verdict\":\"ok\"}\n```"), None);
    }

    #[test]
    fn test_plain_text_fallback() {
        assert_eq!(apply_review("OK, looks good."), None);
        assert_eq!(apply_review("ok"), None);
        assert_eq!(
            apply_review("The answer should be 42."),
            Some("The answer should be 42.".to_string())
        );
        assert_eq!(apply_review("   "), None);
    }

    #[test]
    fn test_review_messages_embed_draft() {
        let messages = review_messages("draft text");
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].text(), REVIEWER_SYSTEM_PROMPT);
        assert!(messages[1].text().ends_with("DRAFT:\ndraft text"));
    }
}
