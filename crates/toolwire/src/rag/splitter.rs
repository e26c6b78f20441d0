use std::collections::VecDeque;

const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits text into overlapping chunks, preferring paragraph breaks, then
/// line breaks, then spaces. Lengths are counted in chars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

impl TextSplitter {
    /// Creates a splitter. The overlap is clamped below the chunk size.
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Splits `text` into chunks no longer than the chunk size.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);
        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut short = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short, separator));
                short.clear();
            }
            if rest.is_empty() {
                chunks.push(piece.trim().to_owned());
            } else {
                chunks.extend(self.split_with(piece, rest));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short, separator));
        }
        chunks.retain(|chunk| !chunk.is_empty());
        chunks
    }

    /// Greedily joins short pieces, carrying up to `chunk_overlap` chars of
    /// the previous chunk into the next one.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };
            if joined_len(&current, total) > self.chunk_size
                && !current.is_empty()
            {
                push_chunk(&mut chunks, &current, separator);
                while total > self.chunk_overlap
                    || (joined_len(&current, total) > self.chunk_size
                        && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first)
                        + if current.is_empty() { 0 } else { sep_len };
                }
            }
            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
        }
        push_chunk(&mut chunks, &current, separator);
        chunks
    }
}

fn pick_separator<'a>(
    text: &str,
    separators: &'a [&'a str],
) -> (&'a str, &'a [&'a str]) {
    for (idx, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[idx + 1..]);
        }
    }
    ("", &[])
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, sep: &str) {
    let chunk = pieces.iter().copied().collect::<Vec<_>>().join(sep);
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_owned());
    }
}

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}
