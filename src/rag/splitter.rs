//! Recursive character text splitter
//!
//! Splits knowledge-base documents into overlapping chunks, preferring
//! structural boundaries (section markers, line breaks) over whitespace,
//! and whitespace over raw character cuts.

/// Separators in priority order. The empty string is the terminal
/// fallback: a raw character window.
const SEPARATORS: [&str; 5] = ["\n## ", "\n### ", "\n", " ", ""];

pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split text into ordered chunks of at most `chunk_size` characters,
    /// consecutive chunks sharing up to `chunk_overlap` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Pick the highest-priority separator that actually occurs.
        let (sep_index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len() - 1, ""));

        if separator.is_empty() {
            return self.char_windows(text);
        }

        let remaining = &separators[sep_index + 1..];
        let splits: Vec<&str> = text.split(separator).filter(|s| !s.is_empty()).collect();

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;
        let joiner = separator.len();

        for split in splits {
            let piece_len = split.chars().count();

            if piece_len > self.chunk_size {
                // Flush what we have, then recurse with lower-priority
                // separators for the oversized piece.
                if !current.is_empty() {
                    chunks.push(current.join(separator));
                    current.clear();
                    current_len = 0;
                }
                chunks.extend(self.split_with(split, remaining));
                continue;
            }

            let projected = current_len + piece_len + if current.is_empty() { 0 } else { joiner };
            if projected > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(separator));

                // Carry trailing pieces forward as overlap.
                let mut kept = Vec::new();
                let mut kept_len = 0;
                for piece in current.iter().rev() {
                    let len = piece.chars().count();
                    if kept_len + len > self.chunk_overlap {
                        break;
                    }
                    kept_len += len + joiner;
                    kept.push(piece.clone());
                }
                kept.reverse();
                current = kept;
                current_len = kept_len.saturating_sub(joiner.min(kept_len));
            }

            current_len += piece_len + if current.is_empty() { 0 } else { joiner };
            current.push(split.to_string());
        }

        if !current.is_empty() {
            chunks.push(current.join(separator));
        }

        chunks
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Terminal fallback: raw character windows with overlap.
    fn char_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}
