//! Bounded text packing for TTS requests.

use super::sentences::split_sentences;
use crate::error::{Error, Result};

/// Split text into chunks of at most `max_length` characters.
///
/// Whole sentences are packed greedily, joined by a single space. A sentence
/// longer than the limit is packed word by word, and a word longer than the
/// limit is cut to fill the remaining room of the current chunk, with the
/// rest carried into the next one.
///
/// Lengths are counted in characters. A `max_length` of zero is treated as one.
pub fn chunk_text(text: &str, max_length: usize) -> Result<Vec<String>> {
    pack(text, max_length, false)
}

/// Like [`chunk_text`], for markup text content that may hold entity
/// references such as `&amp;`.
///
/// A cut that would fall inside a reference moves to just before it. When
/// the reference alone is longer than `max_length` it is kept whole, so that
/// chunk exceeds the limit.
pub(crate) fn chunk_escaped_text(text: &str, max_length: usize) -> Result<Vec<String>> {
    pack(text, max_length, true)
}

fn pack(text: &str, max_length: usize, keep_entities: bool) -> Result<Vec<String>> {
    let mut packer = Packer::new(max_length.max(1), text);
    packer.keep_entities = keep_entities;

    for sentence in split_sentences(text)? {
        let len = normalized_len(sentence);
        packer.tick()?;

        if len <= packer.max_length {
            let normalized = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
            packer.push_unit(&normalized, len);
        } else {
            for word in sentence.split_whitespace() {
                packer.push_word(word)?;
            }
        }
    }

    Ok(packer.finish())
}

/// Byte range of the entity reference that a cut at `cut` would split.
fn entity_around(word: &str, cut: usize) -> Option<(usize, usize)> {
    let (head, tail) = word.split_at(cut);
    let amp = head.rfind('&')?;
    let semi = tail.find(';')?;
    let name = &word[amp + 1..cut + semi];
    let is_reference = !name.is_empty()
        && name.len() <= 32
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#');
    is_reference.then_some((amp, cut + semi + 1))
}

/// Length of a string after collapsing whitespace runs to single spaces.
fn normalized_len(s: &str) -> usize {
    let mut len = 0;
    for (i, word) in s.split_whitespace().enumerate() {
        if i > 0 {
            len += 1;
        }
        len += word.chars().count();
    }
    len
}

/// Greedy accumulator shared by sentence and word packing.
struct Packer {
    max_length: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
    steps: usize,
    limit: usize,
    keep_entities: bool,
}

impl Packer {
    fn new(max_length: usize, text: &str) -> Self {
        // Every step consumes a sentence, a word, or at least one character,
        // or flushes a full chunk; twice the character count is a safe bound.
        let limit = 2 * text.chars().count() + 16;
        Self {
            max_length,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
            steps: 0,
            limit,
            keep_entities: false,
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.limit {
            return Err(Error::PackingInvariant { limit: self.limit });
        }
        Ok(())
    }

    /// Append a unit known to fit within the limit on its own.
    fn push_unit(&mut self, unit: &str, len: usize) {
        if self.current.is_empty() {
            self.current.push_str(unit);
            self.current_len = len;
        } else if self.current_len + 1 + len <= self.max_length {
            self.current.push(' ');
            self.current.push_str(unit);
            self.current_len += 1 + len;
        } else {
            self.flush();
            self.current.push_str(unit);
            self.current_len = len;
        }
    }

    fn push_word(&mut self, word: &str) -> Result<()> {
        let mut rest = word;

        loop {
            self.tick()?;
            let len = rest.chars().count();

            if len <= self.max_length {
                self.push_unit(rest, len);
                return Ok(());
            }

            let room = if self.current.is_empty() {
                self.max_length
            } else {
                self.max_length.saturating_sub(self.current_len + 1)
            };
            if room == 0 {
                self.flush();
                continue;
            }

            let mut cut = rest
                .char_indices()
                .nth(room)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            if self.keep_entities
                && let Some((start, end)) = entity_around(rest, cut)
            {
                if start > 0 {
                    cut = start;
                } else if self.current.is_empty() {
                    cut = end;
                } else {
                    self.flush();
                    continue;
                }
            }
            let (head, tail) = rest.split_at(cut);

            if !self.current.is_empty() {
                self.current.push(' ');
                self.current_len += 1;
            }
            self.current.push_str(head);
            self.current_len += head.chars().count();
            self.flush();
            rest = tail;
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}
