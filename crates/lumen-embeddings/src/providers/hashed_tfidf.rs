//! Hashed TF-IDF provider.
//!
//! Generates fixed-dimension vectors by hashing terms into buckets and
//! weighting by term frequency. No model files, no network: always available.

use std::collections::HashMap;

use lumen_core::errors::LumenResult;
use lumen_core::similarity::{normalize, tokenize};
use lumen_core::traits::IEmbeddingProvider;

/// Deterministic sparse-to-dense embedding provider.
pub struct HashedTfIdf {
    dimensions: usize,
}

impl HashedTfIdf {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// FNV-1a bucket and sign for a term. The sign halves collision bias.
    fn bucket(term: &str, dims: usize) -> (usize, f32) {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        ((h as usize) % dims, sign)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vec = vec![0.0f32; self.dimensions];
        if tokens.is_empty() {
            return vec;
        }

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for tok in &tokens {
            *tf.entry(tok.as_str()).or_default() += 1.0;
        }

        let total = tokens.len() as f32;
        for (term, count) in &tf {
            // Longer terms are rarer; short ones are mostly function words.
            let idf = 1.0 + (term.chars().count() as f32).ln();
            let (bucket, sign) = Self::bucket(term, self.dimensions);
            vec[bucket] += sign * (count / total) * idf;
        }

        normalize(&mut vec);
        vec
    }
}

impl IEmbeddingProvider for HashedTfIdf {
    fn embed(&self, text: &str) -> LumenResult<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn embed_batch(&self, texts: &[String]) -> LumenResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashed-tfidf"
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::similarity::cosine_similarity;

    #[test]
    fn empty_text_returns_zero_vector() {
        let p = HashedTfIdf::new(64);
        let v = p.embed("").unwrap();
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn output_is_normalized() {
        let p = HashedTfIdf::new(256);
        let v = p.embed("rust programming language systems").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit norm, got {norm}");
    }

    #[test]
    fn deterministic() {
        let p = HashedTfIdf::new(256);
        assert_eq!(
            p.embed("deterministic test").unwrap(),
            p.embed("deterministic test").unwrap()
        );
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let p = HashedTfIdf::new(256);
        let a = p.embed("The Eiffel Tower is in Paris.").unwrap();
        let b = p.embed("the eiffel tower is in paris").unwrap();
        assert!(cosine_similarity(&a, &b) > 0.999);
    }

    #[test]
    fn related_texts_score_higher_than_unrelated() {
        let p = HashedTfIdf::new(256);
        let a = p.embed("volcanic eruptions reshape island geology").unwrap();
        let b = p.embed("island geology after volcanic eruptions").unwrap();
        let c = p.embed("quarterly revenue of the bakery chain").unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
