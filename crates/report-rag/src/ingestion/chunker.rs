//! Paragraph-aware block chunking for locally extracted text

use crate::config::ExtractorConfig;

/// Merges paragraphs into blocks bounded by character counts.
///
/// Mirrors the by-title policy of the partition service: blocks never exceed
/// `max_characters`, a new block starts once `new_after_n_chars` is reached,
/// and blocks shorter than `combine_under_n_chars` are folded into the next
/// one when it fits.
#[derive(Debug, Clone)]
pub struct BlockChunker {
    max_characters: usize,
    new_after_n_chars: usize,
    combine_under_n_chars: usize,
}

impl BlockChunker {
    /// Create a chunker; `max_characters` is clamped to at least 1
    pub fn new(max_characters: usize, new_after_n_chars: usize, combine_under_n_chars: usize) -> Self {
        let max_characters = max_characters.max(1);
        Self {
            max_characters,
            new_after_n_chars: new_after_n_chars.min(max_characters),
            combine_under_n_chars: combine_under_n_chars.min(max_characters),
        }
    }

    /// Create from extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            config.max_characters,
            config.new_after_n_chars,
            config.combine_text_under_n_chars,
        )
    }

    /// Split text into blocks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut current = String::new();

        for paragraph in split_paragraphs(text) {
            for piece in self.split_oversized(&paragraph) {
                let current_len = char_len(&current);
                if current_len > 0
                    && (current_len >= self.new_after_n_chars
                        || current_len + 2 + char_len(&piece) > self.max_characters)
                {
                    blocks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(&piece);
            }
        }

        if !current.is_empty() {
            blocks.push(current);
        }

        self.combine_small(blocks)
    }

    /// Fold short blocks into their successor
    fn combine_small(&self, blocks: Vec<String>) -> Vec<String> {
        let mut combined: Vec<String> = Vec::with_capacity(blocks.len());

        for block in blocks {
            if let Some(last) = combined.last_mut() {
                let last_len = char_len(last);
                if last_len < self.combine_under_n_chars
                    && last_len + 2 + char_len(&block) <= self.max_characters
                {
                    last.push_str("\n\n");
                    last.push_str(&block);
                    continue;
                }
            }
            combined.push(block);
        }

        combined
    }

    /// Break a paragraph longer than `max_characters` at word boundaries
    fn split_oversized(&self, paragraph: &str) -> Vec<String> {
        if char_len(paragraph) <= self.max_characters {
            return vec![paragraph.to_string()];
        }

        let mut pieces = Vec::new();
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            for fragment in hard_split(word, self.max_characters) {
                let needed = if current.is_empty() { 0 } else { 1 } + char_len(&fragment);
                if char_len(&current) + needed > self.max_characters {
                    pieces.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&fragment);
            }
        }

        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

/// Paragraphs separated by blank lines, trimmed, empty ones dropped
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// Split a single over-long token on character boundaries
fn hard_split(word: &str, max: usize) -> Vec<String> {
    if char_len(word) <= max {
        return vec![word.to_string()];
    }
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
