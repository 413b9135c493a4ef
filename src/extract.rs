//! Best-effort text recovery from arbitrary upstream responses.
//!
//! The response schema is not ours and varies by model and API version, so
//! instead of deserializing into fixed types the extractor walks the JSON
//! tree and gathers every string it finds, visiting conventional text
//! fields first. The result is for human-readable logs only.

use serde_json::Value;

use crate::constants::{MAX_EXTRACTED_CHARS, MAX_EXTRACT_DEPTH};

/// Field names walked before any other field of an object.
pub const PRIORITY_KEYS: [&str; 9] = [
    "text",
    "content",
    "output",
    "message",
    "response",
    "candidates",
    "outputs",
    "results",
    "items",
];

/// Extracts readable text from `value`, bounded to 8000 characters.
pub fn extract_text(value: &Value) -> String {
    extract_text_bounded(value, MAX_EXTRACTED_CHARS)
}

/// Extracts readable text from `value`, bounded to `max_chars` characters.
///
/// Fragments are joined with single spaces, truncated and trimmed.
pub fn extract_text_bounded(value: &Value, max_chars: usize) -> String {
    let mut collector = Collector {
        parts: Vec::new(),
        collected: 0,
        max_chars,
    };
    collector.walk(value, 0);

    let joined = collector.parts.join(" ");
    truncate_chars(&joined, max_chars).trim().to_string()
}

/// Returns the first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

struct Collector<'a> {
    parts: Vec<&'a str>,
    collected: usize,
    max_chars: usize,
}

impl<'a> Collector<'a> {
    fn walk(&mut self, node: &'a Value, depth: usize) {
        if self.collected > self.max_chars || depth > MAX_EXTRACT_DEPTH {
            return;
        }

        match node {
            Value::String(s) if !s.is_empty() => {
                self.collected += s.chars().count();
                self.parts.push(s);
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, depth + 1);
                }
            }
            Value::Object(map) => {
                for key in PRIORITY_KEYS {
                    if let Some(child) = map.get(key) {
                        self.walk(child, depth + 1);
                    }
                }
                for (key, child) in map {
                    if !PRIORITY_KEYS.contains(&key.as_str()) {
                        self.walk(child, depth + 1);
                    }
                }
            }
            _ => {}
        }
    }
}
