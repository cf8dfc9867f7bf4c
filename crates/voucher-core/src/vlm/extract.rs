//! Recovery of a JSON payload from free-form model output.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::models::payload::OcrPayload;

lazy_static! {
    /// Reasoning blocks some Qwen builds emit before answering.
    static ref THINK_BLOCK: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();

    /// Markdown code fence, optionally tagged `json`.
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").unwrap();
}

/// Pull the first decodable payload object out of `text`.
///
/// Returns `None` when nothing decodes; that is an ordinary answer, not an error.
pub fn extract_payload(text: &str) -> Option<OcrPayload> {
    let stripped = THINK_BLOCK.replace_all(text, "");
    let mut text = stripped.trim();

    if let Some(inner) = CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        text = inner.as_str().trim();
    }

    // A stray quote leaves the string-aware scan open to the end of the
    // text, so a braces-only scan gets a second look.
    let candidates = BalancedObjects::new(text).chain(BalancedObjects::braces_only(text));
    for candidate in candidates {
        match decode(candidate) {
            Some(payload) => return Some(payload),
            None => trace!("Skipping undecodable object of {} bytes", candidate.len()),
        }
    }

    decode(text)
}

fn decode(candidate: &str) -> Option<OcrPayload> {
    // Derived struct deserialisers also accept arrays; only objects count.
    if !candidate.trim_start().starts_with('{') {
        return None;
    }
    serde_json::from_str(candidate).ok()
}

/// Iterator over top-level `{ ... }` spans, left to right.
///
/// By default quotes are tracked inside a span so braces in string values do
/// not shift the depth. A `}` with nothing open is ignored.
struct BalancedObjects<'a> {
    text: &'a str,
    pos: usize,
    track_strings: bool,
}

impl<'a> BalancedObjects<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            track_strings: true,
        }
    }

    /// Counts braces only, ignoring quotes.
    fn braces_only(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            track_strings: false,
        }
    }
}

impl<'a> Iterator for BalancedObjects<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut start = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        while self.pos < bytes.len() {
            let i = self.pos;
            self.pos += 1;
            let b = bytes[i];

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' if depth > 0 && self.track_strings => in_string = true,
                b'{' => {
                    if depth == 0 {
                        start = i;
                    }
                    depth += 1;
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&self.text[start..=i]);
                    }
                }
                _ => {}
            }
        }

        None
    }
}
