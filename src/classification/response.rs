//! Reading the answer out of a chat provider reply.
//!
//! The structured `content` field is authoritative. Some providers and proxies only hand back a
//! textual rendering of the message object (`content='...' additional_kwargs=...`); for those
//! the raw body is scanned for `content='` up to the next quote. That scan is fragile: an
//! apostrophe inside the answer ends the capture early.

use regex::Regex;
use std::sync::OnceLock;

/// Answer returned when neither the structured field nor the raw body yields content.
pub const NO_CONTENT_FOUND: &str = "No content found";

static CONTENT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Reply from a chat provider.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    /// Message content decoded from the provider's structured response, when present.
    pub content: Option<String>,
    /// Response body exactly as received.
    pub raw: String,
}

/// Resolve the classification text carried by `reply`.
pub fn answer_text(reply: &ChatReply) -> String {
    if let Some(content) = reply
        .content
        .as_deref()
        .map(str::trim)
        .filter(|content| !content.is_empty())
    {
        return content.to_string();
    }

    match scan_content(&reply.raw) {
        Some(content) => {
            tracing::warn!("Structured content missing; recovered answer from raw response text");
            content
        }
        None => NO_CONTENT_FOUND.to_string(),
    }
}

/// Capture everything between `content='` and the next `'` in `raw`.
pub fn scan_content(raw: &str) -> Option<String> {
    let pattern = CONTENT_PATTERN
        .get_or_init(|| Regex::new(r"content='(.*?)'").expect("static content pattern"));
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_content_wins() {
        let reply = ChatReply {
            content: Some("  SDG 6: Clean Water  ".into()),
            raw: "content='ignored'".into(),
        };
        assert_eq!(answer_text(&reply), "SDG 6: Clean Water");
    }

    #[test]
    fn raw_rendering_is_scanned_when_content_is_missing() {
        let reply = ChatReply {
            content: None,
            raw: "content='SDG 13: Climate Action' additional_kwargs={} response_metadata={}"
                .into(),
        };
        assert_eq!(answer_text(&reply), "SDG 13: Climate Action");
    }

    #[test]
    fn empty_content_falls_back_to_the_scan() {
        let reply = ChatReply {
            content: Some(String::new()),
            raw: "content='SDG 4: Quality Education'".into(),
        };
        assert_eq!(answer_text(&reply), "SDG 4: Quality Education");
    }

    #[test]
    fn scan_stops_at_the_first_quote() {
        assert_eq!(
            scan_content("content='The world's oceans' extra='x'").as_deref(),
            Some("The world")
        );
    }

    #[test]
    fn unmatched_reply_yields_the_fallback() {
        let reply = ChatReply {
            content: None,
            raw: "{\"error\":null}".into(),
        };
        assert_eq!(answer_text(&reply), NO_CONTENT_FOUND);
    }
}
