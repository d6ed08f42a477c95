//! Local keyword retrieval: keyword-hit context windows over document lines.
//!
//! This path never touches the remote store. It is the fallback used when
//! the store is unavailable or its answers are too coarse.
//!
//! # Algorithm
//!
//! 1. Split the query into lowercase, whitespace-delimited keywords (OR).
//! 2. Every line whose lowercase form contains any keyword anchors a
//!    [`ContextSection`] covering `[i - radius, i + radius]`, clamped to the
//!    document.
//! 3. Sections are emitted in document order and are not deduplicated;
//!    overlapping windows each produce their own section. Callers that want
//!    a compact result run [`merge_overlapping`] afterwards.
//! 4. [`compose_context`] concatenates the first `max_sections` sections
//!    under `[line N]` headers and cuts the text at `max_chars`.

use crate::models::ContextSection;

/// Default number of sections included by [`compose_context`].
pub const DEFAULT_MAX_SECTIONS: usize = 5;

/// Appended after a context string that was cut at `max_chars`.
pub const ELISION_MARKER: &str = "\n\n... (truncated) ...";

/// Lowercase, whitespace-delimited query keywords.
pub fn keywords(query: &str) -> Vec<String> {
    query.split_whitespace().map(|k| k.to_lowercase()).collect()
}

/// Scan `lines` for keyword hits and return one section per hit line.
///
/// An empty query or a query with no hits yields an empty vector.
pub fn search<S: AsRef<str>>(lines: &[S], query: &str, radius: usize) -> Vec<ContextSection> {
    let keywords = keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.as_ref().to_lowercase();
        if !keywords.iter().any(|k| lower.contains(k.as_str())) {
            continue;
        }
        let start = i.saturating_sub(radius);
        let end = i.saturating_add(radius).saturating_add(1).min(lines.len());
        sections.push(ContextSection {
            anchor_line: i + 1,
            start_line: start + 1,
            lines: lines[start..end]
                .iter()
                .map(|l| l.as_ref().to_string())
                .collect(),
        });
    }
    sections
}

/// Collapse overlapping or adjacent windows into a single section anchored
/// at the earliest hit. Input must be in document order.
pub fn merge_overlapping(sections: Vec<ContextSection>) -> Vec<ContextSection> {
    let mut merged: Vec<ContextSection> = Vec::with_capacity(sections.len());
    for section in sections {
        match merged.last_mut() {
            Some(prev) if section.start_line <= prev.end_line() + 1 => {
                let prev_end = prev.end_line();
                if section.end_line() > prev_end {
                    let skip = prev_end + 1 - section.start_line;
                    prev.lines.extend(section.lines.into_iter().skip(skip));
                }
            }
            _ => merged.push(section),
        }
    }
    merged
}

/// Concatenate up to `max_sections` sections, each under a `[line N]`
/// header, into one context string.
///
/// When the accumulated text grows past `max_chars` it is cut at exactly
/// `max_chars` characters (possibly mid-section), [`ELISION_MARKER`] is
/// appended, and no further sections are added.
pub fn compose_context(sections: &[ContextSection], max_chars: usize, max_sections: usize) -> String {
    let mut context = String::new();
    for section in sections.iter().take(max_sections) {
        context.push_str(&format!("\n\n[line {}]\n", section.anchor_line));
        context.push_str(&section.content());
        if context.chars().count() > max_chars {
            let mut cut: String = context.chars().take(max_chars).collect();
            cut.push_str(ELISION_MARKER);
            return cut;
        }
    }
    context
}
