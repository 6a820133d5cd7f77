//! Diagram cache key computation.
//!
//! Provides [`CacheKey`] for computing the content hash that names embedded
//! diagram output files.

use sha1::{Digest, Sha1};

/// Diagram parameters for cache key computation.
///
/// Contains everything that affects the rendered image: the raw diagram
/// content and the exact argument list passed to ditaa.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    /// Raw diagram content (before source normalization).
    pub content: &'a str,
    /// Ditaa arguments in invocation order (see [`ditaa_arguments`](crate::ditaa_arguments)).
    pub arguments: &'a [String],
}

impl CacheKey<'_> {
    /// Compute a content hash for this key.
    ///
    /// # Hash Format
    ///
    /// SHA-1 of the content immediately followed by the arguments joined with
    /// single spaces. There is no separator between content and arguments;
    /// existing output directories are named with this exact layout.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.content.as_bytes());
        hasher.update(self.arguments.join(" ").as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Compute the cache key hash of `content` rendered with `arguments`.
#[must_use]
pub fn fingerprint(content: &str, arguments: &[String]) -> String {
    CacheKey { content, arguments }.compute_hash()
}
