//! Shared test doubles.

use crate::embedding::TextEmbedder;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Deterministic embedding provider for tests.
///
/// Hashes each word into one of 8 buckets and normalizes the bucket
/// counts, so related texts land near each other and the output is stable
/// across runs.
pub(crate) struct HashEmbedder;

#[async_trait]
impl TextEmbedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut buckets = [0.0f32; 8];
        for word in text.split_whitespace() {
            let mut h: u64 = 0xcbf2_9ce4_8422_2325;
            for b in word.bytes() {
                h ^= u64::from(b);
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (h % 8) as usize;
            buckets[bucket] += 1.0;
        }

        let mut vector = buckets.to_vec();
        crate::distance::normalize_in_place(&mut vector);
        Ok(vector)
    }
}

/// Embedding provider that always fails, for error-propagation tests.
pub(crate) struct FailingEmbedder;

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Embedding("model unavailable".into()))
    }
}
