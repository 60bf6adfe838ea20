//! Sentence segmentation with character-level provenance
//!
//! Boundaries come from Unicode UAX #29 sentence segmentation. Offsets are
//! taken from the boundary positions themselves, so a sentence is always an
//! exact substring of the input at `start_char..end_char`. Irregular input
//! (no terminators, stray control characters, separator runs) never fails:
//! it degrades to fewer or longer units.
//!
//! Page numbers are an approximation: the char offset divided by a fixed
//! chars-per-page constant. They do not reflect real pagination.

use crate::{Error, Result, Sentence};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Unit emitted by the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// UAX #29 sentences
    #[default]
    Sentence,
    /// Blank-line separated blocks
    Paragraph,
}

/// Configuration for the segmenter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Units shorter than this (in chars, after trimming) are dropped as noise
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,

    /// Divisor used to estimate page numbers from char offsets
    #[serde(default = "default_chars_per_page")]
    pub chars_per_page: usize,

    /// Sentence or paragraph units
    #[serde(default)]
    pub granularity: Granularity,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_sentence_chars: default_min_sentence_chars(),
            chars_per_page: default_chars_per_page(),
            granularity: Granularity::Sentence,
        }
    }
}

fn default_min_sentence_chars() -> usize {
    10
}

fn default_chars_per_page() -> usize {
    3000
}

/// Splits raw document text into ordered, offset-tracked sentences
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    blank_line: Regex,
}

impl Segmenter {
    /// Create a new segmenter
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        if config.chars_per_page == 0 {
            return Err(Error::config("chars_per_page must be greater than zero"));
        }

        let blank_line = Regex::new(r"\n[ \t\r\x0B\x0C]*\n").map_err(|e| {
            Error::segmentation(format!("Failed to compile blank-line regex: {}", e))
        })?;

        Ok(Self { config, blank_line })
    }

    /// Get the active configuration
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment `text` into sentences.
    ///
    /// Empty or whitespace-only input yields no sentences. Units shorter than
    /// `min_sentence_chars` after trimming are dropped.
    pub fn segment(&self, text: &str) -> Vec<Sentence> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = match self.config.granularity {
            Granularity::Sentence => text.split_sentence_bound_indices().collect::<Vec<_>>(),
            Granularity::Paragraph => self.paragraph_pieces(text),
        };

        let mut sentences = Vec::new();
        let mut offsets = CharCursor::new(text);
        let mut paragraph = 1usize;
        let mut prev_end: Option<usize> = None;

        for (piece_start, raw) in pieces {
            let trimmed = raw.trim();
            if trimmed.chars().count() < self.config.min_sentence_chars {
                continue;
            }

            let start_byte = piece_start + (raw.len() - raw.trim_start().len());
            let end_byte = start_byte + trimmed.len();

            if let Some(prev) = prev_end {
                if self.blank_line.is_match(&text[prev..start_byte]) {
                    paragraph += 1;
                }
            }
            prev_end = Some(end_byte);

            let (start_char, line) = offsets.advance_to(start_byte);
            let (end_char, _) = offsets.advance_to(end_byte);

            let sequence = sentences.len();
            sentences.push(Sentence {
                id: Sentence::id_for(sequence),
                sequence,
                text: trimmed.to_string(),
                start_char,
                end_char,
                page: start_char / self.config.chars_per_page + 1,
                paragraph,
                line,
            });
        }

        debug!(count = sentences.len(), "Segmented document");
        sentences
    }

    /// Split into blank-line separated blocks, keeping byte starts
    fn paragraph_pieces<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut pieces = Vec::new();
        let mut start = 0usize;

        for sep in self.blank_line.find_iter(text) {
            pieces.push((start, &text[start..sep.start()]));
            start = sep.end();
        }
        pieces.push((start, &text[start..]));

        pieces
    }
}

/// Converts monotonically increasing byte offsets into char offsets and line numbers
struct CharCursor<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
    newlines: usize,
}

impl<'a> CharCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
            newlines: 0,
        }
    }

    /// Returns `(char_offset, line)` for `byte`, which must not precede the last call
    fn advance_to(&mut self, byte: usize) -> (usize, usize) {
        let slice = &self.text[self.byte..byte];
        self.chars += slice.chars().count();
        self.newlines += slice.matches('\n').count();
        self.byte = byte;
        (self.chars, self.newlines + 1)
    }
}
