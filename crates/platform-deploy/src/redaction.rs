//! Guardrail redaction/unredaction for enterprise-search deployments
//! (§4.7's "Enterprise-search composition").
//!
//! A [`LabelMap`] assigns stable `[TAG#N]` labels across every redaction
//! performed for one query, reusing a label when the raw entity text
//! overlaps an existing one by more than 5 characters — this is what lets
//! the same phone number redacted in both the query and a reference text
//! come back with the same label.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\[([A-Za-z0-9_]+)#(\d+)\]").expect("static regex is valid")
});

/// An entity a token-classification guardrail model detected in some text.
/// Byte offsets into the text it was detected in.
#[derive(Debug, Clone)]
pub struct DetectedEntity {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LabelEntry {
    tag: String,
    index: u32,
    raw: String,
}

impl LabelEntry {
    fn label(&self) -> String {
        format!("[{}#{}]", self.tag, self.index)
    }
}

/// Minimum shared-character overlap for two raw entity strings to be
/// considered "the same entity" and reuse a label (spec.md §4.7).
const OVERLAP_THRESHOLD: usize = 5;

/// Longest common substring length between `a` and `b` (small strings —
/// entity spans are a handful of tokens, so the naive DP is fine).
fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = 0;
    for i in 1..=a.len() {
        let mut curr = vec![0usize; b.len() + 1];
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                curr[j] = prev[j - 1] + 1;
                best = best.max(curr[j]);
            }
        }
        prev = curr;
    }
    best
}

/// Assigns and remembers `[TAG#N]` labels across one or more redaction
/// calls, and inverts them back to the original text on `/unredact`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMap {
    entries: Vec<LabelEntry>,
}

impl LabelMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_label(&mut self, tag: &str, raw: &str) -> String {
        if let Some(existing) = self
            .entries
            .iter()
            .filter(|e| e.tag == tag)
            .find(|e| longest_common_substring(&e.raw, raw) > OVERLAP_THRESHOLD)
        {
            return existing.label();
        }

        let index = self.entries.iter().filter(|e| e.tag == tag).count();
        let entry = LabelEntry {
            tag: tag.to_owned(),
            index: u32::try_from(index).unwrap_or(u32::MAX),
            raw: raw.to_owned(),
        };
        let label = entry.label();
        self.entries.push(entry);
        label
    }

    /// Redact every detected entity in `text`, replacing each span with its
    /// assigned `[TAG#N]` label. Entities must not overlap each other
    /// (the guardrail model is expected to produce non-overlapping spans).
    pub fn redact(&mut self, text: &str, mut entities: Vec<DetectedEntity>) -> String {
        entities.sort_by_key(|e| e.start);

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for entity in &entities {
            if entity.start < cursor || entity.end > text.len() || entity.start > entity.end {
                continue;
            }
            out.push_str(&text[cursor..entity.start]);
            let raw = &text[entity.start..entity.end];
            let label = self.assign_label(&entity.tag, raw);
            out.push_str(&label);
            cursor = entity.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Every label this map currently knows, as `(label, raw)` pairs — what
    /// a search response hands back to the client so it can later replay
    /// the same map into `/unredact`.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.label(), e.raw.clone()))
            .collect()
    }

    /// Invert every `[TAG#N]` label found in `text` back to its stored raw
    /// value. A label with no known mapping becomes `[UNKNOWN ENTITY]`
    /// (spec.md §4.7, §8 testable property).
    #[must_use]
    pub fn unredact(&self, text: &str) -> String {
        LABEL_RE
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let tag = &caps[1];
                let index: u32 = caps[2].parse().unwrap_or(u32::MAX);
                self.entries
                    .iter()
                    .find(|e| e.tag == tag && e.index == index)
                    .map_or_else(|| "[UNKNOWN ENTITY]".to_owned(), |e| e.raw.clone())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_then_unredact_round_trips() {
        let mut map = LabelMap::new();
        let text = "my number is 123-45-6789";
        let entities = vec![DetectedEntity {
            start: 13,
            end: 25,
            tag: "PHONE".to_owned(),
        }];

        let redacted = map.redact(text, entities);
        assert_eq!(redacted, "my number is [PHONE#0]");

        let restored = map.unredact(&redacted);
        assert_eq!(restored, text);
    }

    #[test]
    fn unknown_label_becomes_sentinel() {
        let map = LabelMap::new();
        let restored = map.unredact("contact [EMAIL#0] for details");
        assert_eq!(restored, "contact [UNKNOWN ENTITY] for details");
    }

    #[test]
    fn overlapping_raw_text_reuses_the_same_label_across_calls() {
        let mut map = LabelMap::new();
        let query = "call 555-123-4567 now";
        let reference = "reach us at 555-123-4567 ext 2";

        let redacted_query = map.redact(
            query,
            vec![DetectedEntity {
                start: 5,
                end: 17,
                tag: "PHONE".to_owned(),
            }],
        );
        let redacted_reference = map.redact(
            reference,
            vec![DetectedEntity {
                start: 12,
                end: 24,
                tag: "PHONE".to_owned(),
            }],
        );

        assert!(redacted_query.contains("[PHONE#0]"));
        assert!(redacted_reference.contains("[PHONE#0]"));
    }

    #[test]
    fn non_overlapping_same_tag_gets_a_new_index() {
        let mut map = LabelMap::new();
        map.redact(
            "call 555-123-4567",
            vec![DetectedEntity {
                start: 5,
                end: 17,
                tag: "PHONE".to_owned(),
            }],
        );
        let second = map.redact(
            "or 800-999-0000",
            vec![DetectedEntity {
                start: 3,
                end: 15,
                tag: "PHONE".to_owned(),
            }],
        );
        assert!(second.contains("[PHONE#1]"));
    }
}
