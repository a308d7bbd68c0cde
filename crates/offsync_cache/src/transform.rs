//! Pluggable value transform applied on the write path.

use crate::error::CacheResult;

/// An invertible payload transform, typically compression.
///
/// When a `set` requests it, the entry's payload is passed through
/// [`ValueTransform::encode`] before it is stored, and through
/// [`ValueTransform::decode`] on every read of that entry. For all byte
/// strings `v`, `decode(encode(v))` must equal `v`.
///
/// The engine ships no implementation; the host injects one when it
/// wants compression (or any other reversible encoding).
pub trait ValueTransform: Send + Sync {
    /// Transforms a payload before storage.
    fn encode(&self, value: &[u8]) -> Vec<u8>;

    /// Inverts the transform on a stored payload.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the stored bytes cannot be inverted.
    fn decode(&self, value: &[u8]) -> CacheResult<Vec<u8>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::CacheError;

    /// A trivially invertible transform for tests: prefixes a marker byte.
    pub struct MarkerTransform;

    impl ValueTransform for MarkerTransform {
        fn encode(&self, value: &[u8]) -> Vec<u8> {
            let mut out = Vec::with_capacity(value.len() + 1);
            out.push(0xC2);
            out.extend_from_slice(value);
            out
        }

        fn decode(&self, value: &[u8]) -> CacheResult<Vec<u8>> {
            match value.split_first() {
                Some((0xC2, rest)) => Ok(rest.to_vec()),
                _ => Err(CacheError::transform("missing marker byte")),
            }
        }
    }

    #[test]
    fn marker_roundtrip() {
        let t = MarkerTransform;
        let encoded = t.encode(b"payload");
        assert_eq!(t.decode(&encoded).unwrap(), b"payload");
        assert!(t.decode(b"payload").is_err());
    }
}
