//! Recursive text chunking with overlap.
//!
//! Text is first split into units along the coarsest natural boundary that
//! makes them small enough: paragraph breaks, then line breaks, then
//! sentence ends, then word gaps, and as a last resort fixed runs of
//! characters. Units are then packed greedily into fragments of at most
//! `chunk_size` characters, and each fragment after the first begins with a
//! tail of the previous one at least `chunk_overlap` characters long.
//!
//! Sizes are counted in `char`s. Fragment offsets are byte offsets into the
//! input, so `&text[start_offset..end_offset] == content` always holds.

use std::ops::Range;

use docrag_embeddings::Fragment;
use serde::{Deserialize, Serialize};

/// Characters that end a sentence when followed by whitespace.
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Configuration for the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target fragment size in characters.
    pub chunk_size: usize,

    /// Characters shared between consecutive fragments.
    pub chunk_overlap: usize,

    /// Keep a unit that cannot be split below the target as one oversized
    /// fragment instead of cutting it at fixed character positions.
    pub preserve_oversized_units: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 100,
            preserve_oversized_units: false,
        }
    }
}

/// Boundary kinds, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SplitLevel {
    Paragraph,
    Line,
    Sentence,
    Word,
    Character,
}

impl SplitLevel {
    fn finer(self) -> Self {
        match self {
            Self::Paragraph => Self::Line,
            Self::Line => Self::Sentence,
            Self::Sentence => Self::Word,
            Self::Word | Self::Character => Self::Character,
        }
    }
}

/// Splits raw text into overlapping [`Fragment`]s.
pub struct TextChunker {
    config: ChunkerConfig,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl TextChunker {
    /// Create a new chunker with default configuration.
    pub fn new() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }

    /// Create a chunker with custom configuration.
    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk text content with a source identifier.
    pub fn chunk_with_source(&self, text: &str, source: &str) -> Vec<Fragment> {
        self.chunk(text)
            .into_iter()
            .map(|fragment| fragment.with_source(source))
            .collect()
    }

    /// Chunk text content.
    ///
    /// Whitespace-only input yields no fragments. Input no longer than the
    /// target yields exactly one fragment equal to the input.
    pub fn chunk(&self, text: &str) -> Vec<Fragment> {
        let target = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(target - 1);

        let Some(first) = next_non_whitespace(text, 0) else {
            return Vec::new();
        };

        if text.chars().count() <= target {
            return vec![Fragment::new(text, 0, 0, text.len())];
        }

        let mut units = Vec::new();
        self.split_units(
            text,
            0..text.len(),
            SplitLevel::Paragraph,
            target - overlap,
            &mut units,
        );

        pack_units(text, &units, first, target, overlap)
    }

    /// Recursively split `range` until every unit is at most `limit` chars.
    fn split_units(
        &self,
        text: &str,
        range: Range<usize>,
        level: SplitLevel,
        limit: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        if char_len(&text[range.clone()]) <= limit {
            out.push(range);
            return;
        }

        if level == SplitLevel::Character {
            if self.config.preserve_oversized_units {
                out.push(range);
            } else {
                split_fixed(text, range, limit, out);
            }
            return;
        }

        let cuts = boundaries(text, range.clone(), level);
        if cuts.is_empty() {
            self.split_units(text, range, level.finer(), limit, out);
            return;
        }

        let mut segment_start = range.start;
        for cut in cuts.into_iter().chain(std::iter::once(range.end)) {
            self.split_units(text, segment_start..cut, level.finer(), limit, out);
            segment_start = cut;
        }
    }
}

/// Chunk `text` with an explicit target size and overlap.
pub fn chunk(text: &str, target_size: usize, overlap: usize) -> Vec<Fragment> {
    TextChunker::with_config(ChunkerConfig {
        chunk_size: target_size,
        chunk_overlap: overlap,
        preserve_oversized_units: false,
    })
    .chunk(text)
}

/// Greedily pack contiguous units into fragments.
fn pack_units(
    text: &str,
    units: &[Range<usize>],
    first: usize,
    target: usize,
    overlap: usize,
) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut start = first;
    let mut next = 0;

    // Units wholly before the first visible character carry nothing.
    while next < units.len() && units[next].end <= start {
        next += 1;
    }

    while next < units.len() {
        let mut end = units[next].end;
        next += 1;

        while next < units.len() {
            let unit = &units[next];
            let blank = text[unit.clone()].trim().is_empty();
            if !blank && visible_len(text, start, unit.end) > target {
                break;
            }
            end = unit.end;
            next += 1;
        }

        let content_end = start + text[start..end].trim_end().len();
        fragments.push(Fragment::new(
            &text[start..content_end],
            fragments.len(),
            start,
            content_end,
        ));

        if let Some(unit) = units.get(next) {
            start = overlap_start(text, start, content_end, unit.end, target, overlap);
        }
    }

    fragments
}

/// Where the fragment after `[prev_start, prev_end)` begins.
///
/// Prefers the latest word start that leaves at least `overlap` chars of
/// tail, then the exact `overlap`-char tail. When neither can sit beside the
/// next unit, takes the longest tail that still fits, and only then gives up
/// on overlap.
fn overlap_start(
    text: &str,
    prev_start: usize,
    prev_end: usize,
    next_unit_end: usize,
    target: usize,
    overlap: usize,
) -> usize {
    let no_overlap = next_non_whitespace(text, prev_end).unwrap_or(prev_end);
    if overlap == 0 {
        return no_overlap;
    }

    let fits = |from: usize| visible_len(text, from, next_unit_end) <= target;
    let prev_len = char_len(&text[prev_start..prev_end]);

    // Tail length and what follows it add up, since `prev_end` ends visible text.
    let longest_fitting = || {
        let room = target.saturating_sub(visible_len(text, prev_end, next_unit_end));
        let tail = room.min(prev_len);
        if tail == 0 {
            return no_overlap;
        }
        let from = byte_offset(text, prev_start, prev_len - tail);
        next_non_whitespace(text, from)
            .filter(|&q| q < prev_end)
            .unwrap_or(no_overlap)
    };

    if prev_len <= overlap {
        return if fits(prev_start) {
            prev_start
        } else {
            longest_fitting()
        };
    }

    let exact = byte_offset(text, prev_start, prev_len - overlap);
    let word = word_start_at_or_before(text, prev_start, exact);
    if fits(word) {
        word
    } else if fits(exact) {
        exact
    } else {
        longest_fitting()
    }
}

/// Positions strictly inside `range` where a whitespace run of at least
/// `level` strength begins.
fn boundaries(text: &str, range: Range<usize>, level: SplitLevel) -> Vec<usize> {
    let segment = &text[range.clone()];
    let mut cuts = Vec::new();
    let mut prev: Option<char> = None;

    for (i, c) in segment.char_indices() {
        if let Some(p) = prev
            && c.is_whitespace()
            && !p.is_whitespace()
            && run_strength(p, &segment[i..]) <= level
        {
            cuts.push(range.start + i);
        }
        prev = Some(c);
    }

    cuts
}

/// Classify the whitespace run at the start of `rest`, given the character
/// that precedes it.
fn run_strength(preceding: char, rest: &str) -> SplitLevel {
    let newlines = rest
        .chars()
        .take_while(|c| c.is_whitespace())
        .filter(|&c| c == '\n')
        .count();

    match newlines {
        0 if SENTENCE_TERMINATORS.contains(&preceding) => SplitLevel::Sentence,
        0 => SplitLevel::Word,
        1 => SplitLevel::Line,
        _ => SplitLevel::Paragraph,
    }
}

/// Cut `range` into runs of `limit` chars.
fn split_fixed(text: &str, range: Range<usize>, limit: usize, out: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    let mut count = 0;

    for (i, _) in text[range.clone()].char_indices() {
        if count == limit {
            out.push(start..range.start + i);
            start = range.start + i;
            count = 0;
        }
        count += 1;
    }

    if start < range.end {
        out.push(start..range.end);
    }
}

fn word_start_at_or_before(text: &str, lower: usize, pos: usize) -> usize {
    let mut q = pos;
    while q > lower {
        let prev = text[..q].chars().next_back();
        let cur = text[q..].chars().next();
        match (prev, cur) {
            (Some(p), Some(c)) if p.is_whitespace() && !c.is_whitespace() => return q,
            (Some(p), _) => q -= p.len_utf8(),
            (None, _) => break,
        }
    }
    lower
}

fn next_non_whitespace(text: &str, from: usize) -> Option<usize> {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
}

/// Byte position `chars` characters after `from`.
fn byte_offset(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}

/// Length of `text[from..to]` once trailing whitespace is dropped.
fn visible_len(text: &str, from: usize, to: usize) -> usize {
    char_len(text[from..to].trim_end())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
