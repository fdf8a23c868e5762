//! Embedding backends and backend resolution.
//!
//! A backend turns texts into fixed-width vectors. The hash variant is
//! deterministic and dependency-free so the tool works fully offline; the
//! transformer variant trades that for higher quality when a model can be
//! loaded. Vectors are only comparable within a single backend identifier.

use sha2::{Digest, Sha256};

use super::vector::l2_normalize;
use super::{EmbeddingError, TransformerBackend};

/// Environment variable consulted when no backend is requested explicitly.
pub const BACKEND_ENV_VAR: &str = "MAILSIFT_EMBEDDING_BACKEND";

/// Default dimension for the hash backend.
const DEFAULT_HASH_DIMENSION: usize = 256;

/// Model used when no backend is configured anywhere.
const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// A capability producing one vector per input text.
///
/// Implementations must be deterministic for a fixed configuration, and
/// `identifier` must be stable across calls and distinct across
/// configurations (a different dimension is a different configuration).
pub trait EmbeddingBackend {
    /// Stable name binding stored vectors to this configuration,
    /// e.g. `hash/256`.
    fn identifier(&self) -> &str;

    /// Width of every vector this backend produces.
    fn dimension(&self) -> usize;

    /// Embeds each text, returning vectors in input order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Deterministic embedding based on token hashing.
///
/// Tokens are case-folded alphanumeric runs. Each token's SHA-256 digest is
/// split into 4-byte little-endian chunks, and every chunk increments one
/// bucket of the output vector (chunk value modulo dimension). The result
/// is L2-normalized; a text with no tokens stays the zero vector. This
/// needs no model weights and cannot fail, so it is the designed safety net
/// of the backend fallback chain.
pub struct HashBackend {
    dimension: usize,
    identifier: String,
}

impl HashBackend {
    /// Creates a hash backend with the given dimension.
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidDimension);
        }
        Ok(Self {
            dimension,
            identifier: format!("hash/{dimension}"),
        })
    }

    /// Creates a hash backend with the default dimension.
    pub fn with_default_dimension() -> Self {
        Self {
            dimension: DEFAULT_HASH_DIMENSION,
            identifier: format!("hash/{DEFAULT_HASH_DIMENSION}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            for chunk in digest.chunks_exact(4) {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(chunk);
                let bucket = u32::from_le_bytes(bytes) as usize % self.dimension;
                vector[bucket] += 1.0;
            }
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingBackend for HashBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Splits text into lowercase alphanumeric token runs.
///
/// Every non-alphanumeric character is a separator and is discarded.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Loads a backend from a spec string.
///
/// Supported values:
///
/// - `hash`: hash backend at the default dimension
/// - `hash:<dim>`: hash backend at an explicit dimension
/// - `sentence-transformers/<model>`: transformer backend
///
/// Any other value is treated as a `sentence-transformers` model name for
/// convenience.
pub fn load_backend(spec: &str) -> Result<Box<dyn EmbeddingBackend>, EmbeddingError> {
    if spec == "hash" {
        return Ok(Box::new(HashBackend::with_default_dimension()));
    }
    if let Some(dim) = spec.strip_prefix("hash:") {
        let dimension: usize = dim
            .parse()
            .map_err(|_| EmbeddingError::UnknownBackend(spec.to_string()))?;
        return Ok(Box::new(HashBackend::new(dimension)?));
    }
    let model_id = if spec.contains('/') {
        spec.to_string()
    } else {
        format!("sentence-transformers/{spec}")
    };
    Ok(Box::new(TransformerBackend::load(&model_id)?))
}

/// Resolves the active backend following the configured fallback chain:
/// explicit spec, then the environment, then the default transformer
/// model, then the hash backend.
///
/// An explicit spec that fails to load is a configuration error and
/// propagates; failures further down the chain are logged and the next
/// candidate is tried. The hash tail means resolution without an explicit
/// spec always succeeds.
pub fn resolve_backend(
    explicit: Option<&str>,
) -> Result<Box<dyn EmbeddingBackend>, EmbeddingError> {
    if let Some(spec) = explicit {
        return load_backend(spec);
    }

    if let Ok(spec) = std::env::var(BACKEND_ENV_VAR) {
        match load_backend(&spec) {
            Ok(backend) => return Ok(backend),
            Err(err) => {
                tracing::warn!(spec = %spec, error = %err, "environment backend failed to load");
            }
        }
    }

    match TransformerBackend::load(DEFAULT_MODEL) {
        Ok(backend) => Ok(Box::new(backend)),
        Err(err) => {
            tracing::debug!(error = %err, "default model unavailable, using hash backend");
            Ok(Box::new(HashBackend::with_default_dimension()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_non_alphanumeric() {
        assert_eq!(
            tokenize("Let's discuss the search-engine milestones."),
            vec!["let", "s", "discuss", "the", "search", "engine", "milestones"]
        );
    }

    #[test]
    fn tokenize_case_folds() {
        assert_eq!(tokenize("Weekly SYNC"), vec!["weekly", "sync"]);
    }

    #[test]
    fn tokenize_empty_input() {
        assert!(tokenize("...  !!").is_empty());
    }

    #[test]
    fn hash_backend_identifier_encodes_dimension() {
        let backend = HashBackend::new(128).unwrap();
        assert_eq!(backend.identifier(), "hash/128");
        assert_eq!(backend.dimension(), 128);
    }

    #[test]
    fn hash_backend_rejects_zero_dimension() {
        assert!(matches!(
            HashBackend::new(0),
            Err(EmbeddingError::InvalidDimension)
        ));
    }

    #[test]
    fn hash_embedding_is_deterministic() {
        let backend = HashBackend::new(64).unwrap();
        let first = backend.embed(&["the quick brown fox"]).unwrap();
        let second = backend.embed(&["the quick brown fox"]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_embedding_is_unit_norm() {
        let backend = HashBackend::new(64).unwrap();
        let vectors = backend.embed(&["hello world"]).unwrap();
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_embedding_zero_tokens_yields_zero_vector() {
        let backend = HashBackend::new(32).unwrap();
        let vectors = backend.embed(&["!!! ..."]).unwrap();
        assert!(vectors[0].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn hash_embedding_preserves_input_order() {
        let backend = HashBackend::new(64).unwrap();
        let vectors = backend.embed(&["alpha", "beta"]).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_ne!(vectors[0], vectors[1]);
        assert_eq!(vectors[0], backend.embed(&["alpha"]).unwrap()[0]);
    }

    #[test]
    fn similar_texts_score_higher_than_dissimilar() {
        use crate::embedding::vector::cosine_similarity;

        let backend = HashBackend::new(256).unwrap();
        let vectors = backend
            .embed(&[
                "search engine milestones",
                "discuss the search engine milestones",
                "fancy some ramen today",
            ])
            .unwrap();
        let close = cosine_similarity(&vectors[0], &vectors[1]);
        let far = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(close > far);
    }

    #[test]
    fn load_backend_parses_hash_specs() {
        let default = load_backend("hash").unwrap();
        assert_eq!(default.identifier(), "hash/256");

        let sized = load_backend("hash:512").unwrap();
        assert_eq!(sized.identifier(), "hash/512");
    }

    #[test]
    fn load_backend_rejects_malformed_dimension() {
        assert!(load_backend("hash:many").is_err());
        assert!(load_backend("hash:0").is_err());
    }

    #[test]
    fn explicit_bad_spec_propagates_from_resolution() {
        assert!(resolve_backend(Some("hash:bogus")).is_err());
    }

    #[test]
    fn explicit_hash_spec_resolves() {
        let backend = resolve_backend(Some("hash:64")).unwrap();
        assert_eq!(backend.identifier(), "hash/64");
    }
}
