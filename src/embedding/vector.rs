//! Vector math and serialization utilities.
//!
//! Embeddings are fixed-width `f32` sequences. They are persisted as
//! little-endian byte blobs, four bytes per component.

/// Normalizes a vector in place using the Euclidean norm.
///
/// A zero vector is left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
    if norm_sq == 0.0 {
        return;
    }
    let norm = norm_sq.sqrt();
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns a value between -1.0 and 1.0, where 1.0 means identical
/// direction. Mismatched lengths or a zero operand yield 0.0.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> f32 {
    if lhs.len() != rhs.len() {
        return 0.0;
    }

    let dot: f32 = lhs.iter().zip(rhs.iter()).map(|(a, b)| a * b).sum();
    let norm_lhs: f32 = lhs.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_rhs: f32 = rhs.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_lhs == 0.0 || norm_rhs == 0.0 {
        return 0.0;
    }

    dot / (norm_lhs * norm_rhs)
}

/// Serializes a vector into its storage BLOB representation.
pub fn to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Reconstructs a vector from its storage BLOB representation.
///
/// Trailing bytes that do not fill a full component are ignored.
pub fn from_blob(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            f32::from_le_bytes(bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn cosine_similarity_identical() {
        let v = vec![0.5, 0.25, 0.25];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_bounds() {
        let a = vec![0.3, -1.7, 2.2];
        let b = vec![-0.9, 4.1, 0.4];
        let similarity = cosine_similarity(&a, &b);
        assert!((-1.0..=1.0).contains(&similarity));
    }

    #[test]
    fn cosine_similarity_length_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_similarity_zero_operand() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn blob_round_trip() {
        let original = vec![0.1, -2.5, 3.75, 0.0, f32::MIN_POSITIVE];
        let blob = to_blob(&original);
        assert_eq!(blob.len(), original.len() * 4);
        let restored = from_blob(&blob);
        assert_eq!(restored, original);
    }

    #[test]
    fn from_blob_ignores_trailing_bytes() {
        let mut blob = to_blob(&[1.0, 2.0]);
        blob.push(0xff);
        assert_eq!(from_blob(&blob), vec![1.0, 2.0]);
    }
}
