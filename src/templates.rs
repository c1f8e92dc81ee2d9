//! Canned-reply selection. Deterministic and model-free: the bucket is
//! resolved through a fixed default chain and the template inside the bucket
//! is picked by `len(comment) % bucket_len`, so a given comment always maps
//! to the same string.

use std::sync::Arc;

use crate::category::{Category, ContextTag};
use crate::profiles::Profiles;

#[derive(Debug, Clone)]
pub struct TemplateResponder {
    profiles: Arc<Profiles>,
}

impl TemplateResponder {
    pub fn new(profiles: Arc<Profiles>) -> Self {
        Self { profiles }
    }

    /// Canned reply for `(category, context)`. Bucket resolution chain:
    /// context tag → "general" → "default" → configured fallback line.
    pub fn respond(&self, category: Category, context: &ContextTag, comment: &str) -> String {
        let profile = self.profiles.profile(category);
        let chain = [context.as_str(), "general", "default"];
        let bucket = chain
            .iter()
            .filter_map(|key| profile.replies.get(*key))
            .find(|bucket| !bucket.is_empty());

        match bucket {
            Some(bucket) => {
                let index = comment.chars().count() % bucket.len();
                bucket[index].clone()
            }
            None => self.profiles.reply.fallback_line.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> TemplateResponder {
        TemplateResponder::new(Profiles::builtin())
    }

    #[test]
    fn same_comment_always_yields_same_template() {
        let r = responder();
        let comment = "This really spoke to me.";
        let first = r.respond(Category::Praise, &ContextTag::new("emotional"), comment);
        for _ in 0..10 {
            assert_eq!(
                r.respond(Category::Praise, &ContextTag::new("emotional"), comment),
                first
            );
        }
    }

    #[test]
    fn index_is_length_mod_bucket_size() {
        let r = responder();
        let profiles = Profiles::builtin();
        let bucket = profiles
            .profile(Category::Question)
            .replies
            .get("general")
            .unwrap()
            .clone();

        // Comments of consecutive lengths walk the bucket in order.
        for extra in 0..(bucket.len() * 2) {
            let comment: String = "x".repeat(10 + extra);
            let got = r.respond(Category::Question, &ContextTag::general(), &comment);
            assert_eq!(got, bucket[(10 + extra) % bucket.len()]);
        }
    }

    #[test]
    fn unknown_context_falls_back_to_general() {
        let r = responder();
        let comment = "Tell me more";
        let via_unknown = r.respond(Category::Lead, &ContextTag::new("no-such-tag"), comment);
        let via_general = r.respond(Category::Lead, &ContextTag::general(), comment);
        assert_eq!(via_unknown, via_general);
    }

    #[test]
    fn context_bucket_wins_when_present() {
        let r = responder();
        let profiles = Profiles::builtin();
        let comment = "We hear you";
        let hurt_bucket = profiles
            .profile(Category::Complaint)
            .replies
            .get("hurt")
            .unwrap();
        let got = r.respond(Category::Complaint, &ContextTag::new("hurt"), comment);
        assert!(hurt_bucket.contains(&got));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let r = responder();
        // Multibyte characters: 7 chars, more than 7 bytes.
        let comment = "díky ♥!"; // len() = chars
        let profiles = Profiles::builtin();
        let bucket = profiles
            .profile(Category::Praise)
            .replies
            .get("general")
            .unwrap();
        let got = r.respond(Category::Praise, &ContextTag::general(), comment);
        assert_eq!(got, bucket[7 % bucket.len()]);
    }
}
