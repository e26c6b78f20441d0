/// A piece of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Position of the chunk in the document.
    pub index: usize,
}

/// An in-memory index ranking chunks by cosine similarity.
#[derive(Clone, Debug, Default)]
pub struct VectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl VectorIndex {
    /// Creates an empty index.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chunk with its embedding.
    #[inline]
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) {
        self.entries.push((chunk, vector));
    }

    /// Returns the number of indexed chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. Entries whose dimension differs
    /// from the query are skipped.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&Chunk, f32)> {
        let mut scored: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, vector)| vector.len() == query.len())
            .map(|(chunk, vector)| (chunk, cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

impl FromIterator<(Chunk, Vec<f32>)> for VectorIndex {
    fn from_iter<T: IntoIterator<Item = (Chunk, Vec<f32>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize) -> Chunk {
        Chunk {
            text: format!("chunk {index}"),
            index,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let parallel = cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]);
        assert!((parallel - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index: VectorIndex = [
            (chunk(0), vec![0.0, 1.0]),
            (chunk(1), vec![1.0, 0.1]),
            (chunk(2), vec![1.0, 1.0]),
            (chunk(3), vec![-1.0, 0.0]),
        ]
        .into_iter()
        .collect();

        let hits: Vec<_> = index
            .search(&[1.0, 0.0], 3)
            .into_iter()
            .map(|(chunk, _)| chunk.index)
            .collect();
        assert_eq!(hits, [1, 2, 0]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        for i in 0..4 {
            index.insert(chunk(i), vec![1.0, 1.0]);
        }
        let hits: Vec<_> = index
            .search(&[1.0, 1.0], 2)
            .into_iter()
            .map(|(chunk, _)| chunk.index)
            .collect();
        assert_eq!(hits, [0, 1]);
    }

    #[test]
    fn test_skips_dimension_mismatch() {
        let mut index = VectorIndex::new();
        index.insert(chunk(0), vec![1.0, 0.0, 0.0]);
        index.insert(chunk(1), vec![0.5, 0.5]);
        let hits = index.search(&[1.0, 0.0], 4);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.index, 1);
        assert_eq!(index.len(), 2);
    }
}
