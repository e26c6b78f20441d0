use std::future::ready;
use std::hash::{DefaultHasher, Hash, Hasher};

use toolwire_model::{EmbeddingProvider, EmbeddingRequest};

use crate::Error;

const DIMENSIONS: usize = 64;

/// A deterministic embedder that hashes lowercase words into buckets.
///
/// Texts sharing words end up close to each other, which is enough to
/// exercise retrieval without a real model.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestEmbeddingProvider;

impl TestEmbeddingProvider {
    /// Embeds a single text.
    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for TestEmbeddingProvider {
    type Error = Error;

    fn embed(
        &self,
        req: &EmbeddingRequest,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'static
    {
        let vectors = req.inputs.iter().map(|s| Self::embed_text(s)).collect();
        ready(Ok(vectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_similar_texts_are_close() {
        let query = TestEmbeddingProvider::embed_text("rust developer");
        let near = TestEmbeddingProvider::embed_text("Senior Rust developer");
        let far = TestEmbeddingProvider::embed_text("gardening tips");
        assert!(dot(&query, &near) > dot(&query, &far));
    }

    #[test]
    fn test_empty_text() {
        let v = TestEmbeddingProvider::embed_text("");
        assert_eq!(v.len(), DIMENSIONS);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
