use crate::error::{PipelineError, Result};
use crate::models::{CachedTranscript, SearchHit};
use regex::{Regex, RegexBuilder};

/// Characters of context kept on each side of an occurrence.
pub const DEFAULT_CONTEXT_CHARS: usize = 50;

/// Literal, case-insensitive phrase search over cached transcripts.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    context_chars: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_CHARS)
    }
}

impl SearchEngine {
    pub fn new(context_chars: usize) -> Self {
        Self { context_chars }
    }

    /// One hit per non-overlapping occurrence, videos in input order.
    pub fn search(&self, transcripts: &[CachedTranscript], phrase: &str) -> Result<Vec<SearchHit>> {
        let matcher = build_matcher(phrase)?;
        let mut hits = Vec::new();

        for entry in transcripts {
            let Some(text) = entry.transcript.as_deref() else {
                continue;
            };

            let matches: Vec<_> = matcher.find_iter(text).collect();
            let occurrence_count = matches.len();

            for m in matches {
                let (snippet_offset, snippet) = self.snippet(text, m.start(), m.end());
                hits.push(SearchHit {
                    video_id: entry.video_id.clone(),
                    title: entry.title.clone(),
                    published_date: entry.published_date.clone(),
                    snippet_offset,
                    snippet,
                    occurrence_count,
                });
            }
        }

        Ok(hits)
    }

    /// Returns the char offset of the occurrence and its clipped snippet.
    fn snippet(&self, text: &str, start: usize, end: usize) -> (usize, String) {
        let occurrence_chars = text[start..end].chars().count();
        let from = back_chars(text, start, self.context_chars);
        let to = forward_chars(text, start, occurrence_chars + self.context_chars);
        (text[..start].chars().count(), text[from..to].to_string())
    }
}

/// Compiles `phrase` as an escaped, case-insensitive literal.
pub fn build_matcher(phrase: &str) -> Result<Regex> {
    if phrase.trim().is_empty() {
        return Err(PipelineError::validation("Search phrase is required"));
    }
    RegexBuilder::new(&regex::escape(phrase))
        .case_insensitive(true)
        .build()
        .map_err(|e| PipelineError::validation(format!("Search phrase cannot be used: {e}")))
}

/// Byte index `n` chars before `idx`, clamped to the start of `text`.
fn back_chars(text: &str, idx: usize, n: usize) -> usize {
    if n == 0 {
        return idx;
    }
    text[..idx]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte index `n` chars after `idx`, clamped to the end of `text`.
fn forward_chars(text: &str, idx: usize, n: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| idx + i)
        .unwrap_or(text.len())
}
