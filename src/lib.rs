// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod category;
pub mod classify;
pub mod crm;
pub mod engagement;
pub mod lexical;
pub mod metrics;
pub mod model;
pub mod processor;
pub mod profiles;
pub mod reply;
pub mod templates;

// ---- Re-exports for stable public API ----
pub use crate::category::{
    Category, ClassificationResult, ClassifySource, ContextTag, ProcessedComment, ReplyResult,
    ReplySource,
};
pub use crate::processor::{CommentProcessor, ProcessError};
pub use crate::profiles::Profiles;

/// Short anonymized id for a comment, safe to put in logs (raw comment text
/// is never logged above debug level).
pub(crate) fn anon_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_id_is_short_and_stable() {
        let a = anon_id("hello");
        let b = anon_id("hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(anon_id("hello"), anon_id("hello!"));
    }
}
