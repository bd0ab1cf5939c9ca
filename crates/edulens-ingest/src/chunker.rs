//! Content chunking for retrieval.
//!
//! Text is split on paragraph boundaries first, then sentences, and only
//! as a last resort at a fixed character count. No chunk is longer than
//! `chunk_size` characters.

use edulens_config::ProcessingConfig;
use edulens_core::ChunkInput;

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum size of each chunk in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
        }
    }
}

impl ChunkConfig {
    /// Create config from processing settings.
    pub fn from_processing_config(config: &ProcessingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
        }
    }
}

/// Content chunker for splitting text.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split text into chunks with consecutive sequence indexes from 0.
    ///
    /// Deterministic: the same text always yields the same chunks.
    pub fn chunk(&self, text: &str) -> Vec<ChunkInput> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        if char_len(trimmed) <= self.config.chunk_size {
            return vec![ChunkInput {
                sequence_index: 0,
                text: trimmed.to_string(),
            }];
        }

        let mut builder = ChunkBuilder::new(self.config);

        for para in trimmed.split("\n\n") {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }

            if char_len(para) <= self.config.chunk_size {
                builder.push(para, "\n\n");
                continue;
            }

            // Paragraph too long, fall back to sentences
            let mut separator = "\n\n";
            for sentence in split_sentences(para) {
                if char_len(sentence) <= self.config.chunk_size {
                    builder.push(sentence, separator);
                } else {
                    // No usable sentence boundary (tables, code, transcripts)
                    for piece in force_split(sentence, self.config.chunk_size) {
                        builder.push(&piece, separator);
                        separator = " ";
                    }
                }
                separator = " ";
            }
        }

        builder.finish()
    }
}

/// Accumulates pieces into chunks no longer than the configured size.
struct ChunkBuilder {
    config: ChunkConfig,
    current: String,
    current_len: usize,
    chunks: Vec<ChunkInput>,
}

impl ChunkBuilder {
    fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    /// Append `piece`, which must itself fit in one chunk.
    fn push(&mut self, piece: &str, separator: &str) {
        let piece_len = char_len(piece);
        let sep_len = separator.chars().count();

        if self.current_len > 0 && self.current_len + sep_len + piece_len > self.config.chunk_size
        {
            let tail = self.flush();
            let tail_len = char_len(&tail);
            if tail_len > 0 && tail_len + sep_len + piece_len <= self.config.chunk_size {
                self.current = tail;
                self.current_len = tail_len;
            }
        }

        if self.current_len > 0 {
            self.current.push_str(separator);
            self.current_len += sep_len;
        }
        self.current.push_str(piece);
        self.current_len += piece_len;
    }

    /// Emit the current chunk and return its overlap tail.
    fn flush(&mut self) -> String {
        let text = std::mem::take(&mut self.current);
        self.current_len = 0;

        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let tail = overlap_tail(text, self.config.chunk_overlap);
        self.chunks.push(ChunkInput {
            sequence_index: self.chunks.len() as u32,
            text: text.to_string(),
        });
        tail
    }

    fn finish(mut self) -> Vec<ChunkInput> {
        self.flush();
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `overlap` characters of `text`, starting at a word if possible.
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let len = char_len(text);
    let skip = len.saturating_sub(overlap);
    let tail: String = text.chars().skip(skip).collect();
    match tail.find(char::is_whitespace) {
        Some(idx) if skip > 0 && idx + 1 < tail.len() => tail[idx..].trim_start().to_string(),
        _ => tail.trim_start().to_string(),
    }
}

/// Force split text by character limit.
fn force_split(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect::<String>())
        .collect()
}

/// Split text into sentences ending in `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            let at_boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if at_boundary {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let remaining = text[start..].trim();
    if !remaining.is_empty() {
        sentences.push(remaining);
    }

    sentences
}
