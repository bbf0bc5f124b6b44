//! Sentence-accumulating text fragmenter with bounded overlap.
//!
//! Splits input into sentence-like units on terminal punctuation, packs
//! units into fragments up to a soft token target, and seeds each new
//! fragment with a suffix of the previous one so neighbouring fragments
//! share context. Token counts come from a pluggable [`TokenEstimator`];
//! the default counts word-boundary runs, which is close enough for
//! sizing decisions and cheap enough to run on every sentence.

use crate::traits::TokenEstimator;
use crate::types::{Fragment, PageText};

pub const DEFAULT_TARGET_TOKENS: usize = 750;
pub const DEFAULT_OVERLAP_TOKENS: usize = 100;

/// Counts `\w+`-style runs: maximal sequences of alphanumeric
/// characters or underscores. Roughly one token per word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .count()
    }
}

pub struct Fragmenter {
    target_tokens: usize,
    overlap_tokens: usize,
    estimator: Box<dyn TokenEstimator>,
}

impl Fragmenter {
    pub fn new(target_tokens: usize, overlap_tokens: usize) -> Self {
        Self::with_estimator(target_tokens, overlap_tokens, Box::new(WordCountEstimator))
    }

    pub fn with_estimator(
        target_tokens: usize,
        overlap_tokens: usize,
        estimator: Box<dyn TokenEstimator>,
    ) -> Self {
        Self { target_tokens, overlap_tokens, estimator }
    }

    pub fn target_tokens(&self) -> usize {
        self.target_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Fragment a body of text into ordered, overlapping fragments.
    ///
    /// A fragment closes when the next sentence would push it strictly
    /// past `target_tokens` and it already holds at least one sentence.
    /// A single sentence larger than the target is emitted alone rather
    /// than split mid-sentence; the target is a soft limit, not a cap.
    /// Empty or whitespace-only input yields no fragments.
    pub fn fragment(&self, text: &str) -> Vec<Fragment> {
        let units = split_sentence_units(text);

        let mut fragments: Vec<Fragment> = Vec::new();
        let mut current: Vec<(&str, usize)> = Vec::new();
        let mut current_tokens = 0usize;
        let mut index = 0usize;

        for unit in units {
            let unit_tokens = self.estimator.estimate(unit);

            if current_tokens + unit_tokens > self.target_tokens && !current.is_empty() {
                fragments.push(self.close_fragment(&current, current_tokens, index, None));
                index += 1;

                // Seed the next fragment with trailing sentences of the
                // one just closed, never exceeding the overlap budget.
                let (seed, seed_tokens) = self.overlap_suffix(&current);
                current = seed;
                current_tokens = seed_tokens;
            }

            current.push((unit, unit_tokens));
            current_tokens += unit_tokens;
        }

        if !current.is_empty() {
            fragments.push(self.close_fragment(&current, current_tokens, index, None));
        }

        fragments
    }

    /// Page-aware variant: each page is fragmented independently (overlap
    /// never crosses a page boundary), then `index` is renumbered
    /// contiguously across the whole document and each fragment is
    /// stamped with its originating page number.
    pub fn fragment_pages(&self, pages: &[PageText]) -> Vec<Fragment> {
        let mut all = Vec::new();
        let mut index = 0usize;

        for page in pages {
            for mut fragment in self.fragment(&page.text) {
                fragment.index = index;
                fragment.page_number = Some(page.page_number);
                all.push(fragment);
                index += 1;
            }
        }

        tracing::debug!(pages = pages.len(), fragments = all.len(), "fragmented document");
        all
    }

    fn close_fragment(
        &self,
        units: &[(&str, usize)],
        tokens: usize,
        index: usize,
        page_number: Option<u32>,
    ) -> Fragment {
        let text: Vec<&str> = units.iter().map(|(u, _)| *u).collect();
        Fragment {
            index,
            text: text.join(" "),
            token_estimate: tokens,
            page_number,
            char_span: None,
        }
    }

    /// Walk backward from the end of `units`, collecting sentences while
    /// their cumulative estimate stays within `overlap_tokens`.
    fn overlap_suffix<'a>(&self, units: &[(&'a str, usize)]) -> (Vec<(&'a str, usize)>, usize) {
        let mut seed: Vec<(&str, usize)> = Vec::new();
        let mut seed_tokens = 0usize;

        for &(unit, unit_tokens) in units.iter().rev() {
            if seed_tokens + unit_tokens > self.overlap_tokens {
                break;
            }
            seed.insert(0, (unit, unit_tokens));
            seed_tokens += unit_tokens;
        }

        (seed, seed_tokens)
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_TOKENS, DEFAULT_OVERLAP_TOKENS)
    }
}

/// Split on terminal punctuation (`.`, `!`, `?`) followed by whitespace.
/// The separating whitespace is consumed; trailing punctuation stays with
/// its sentence. Whitespace-only units are dropped.
fn split_sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            if let Some(&(next_pos, next_ch)) = chars.peek() {
                if next_ch.is_whitespace() {
                    push_unit(&mut units, &text[start..next_pos]);
                    // Consume the whitespace run between sentences.
                    let mut resume = next_pos;
                    while let Some(&(ws_pos, ws_ch)) = chars.peek() {
                        if ws_ch.is_whitespace() {
                            resume = ws_pos + ws_ch.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    start = resume;
                }
            }
        }
    }

    if start < text.len() {
        push_unit(&mut units, &text[start..]);
    }

    units
}

fn push_unit<'a>(units: &mut Vec<&'a str>, unit: &'a str) {
    let trimmed = unit.trim();
    if !trimmed.is_empty() {
        units.push(trimmed);
    }
}
