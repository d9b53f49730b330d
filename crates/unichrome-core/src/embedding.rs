//! Contract for external embedding providers.
//!
//! The engine consumes finished vectors; how they are produced (local model,
//! remote API) is opaque. Provider failures are surfaced to the caller
//! unchanged as [`Error::Embedding`](crate::Error::Embedding).

use crate::error::Result;
use async_trait::async_trait;

/// Turns text into fixed-length embedding vectors.
///
/// Implementations may suspend (e.g. remote APIs); the engine performs no
/// retries and attaches no timeout. All vectors produced for one collection
/// must share a single dimensionality.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Encodes a single string into an embedding vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Encodes a batch of strings, one vector per element.
    ///
    /// The default implementation encodes sequentially; providers with a
    /// native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
