//! Deterministic keyword scorer: the guaranteed classification path, the
//! context-tag scorer, and keyword-family matching. Pure functions of the
//! input text and the loaded tables; never fails.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::category::{Category, ContextTag};
use crate::profiles::Profiles;

#[derive(Debug, Clone)]
pub struct LexicalScorer {
    profiles: Arc<Profiles>,
}

impl LexicalScorer {
    pub fn new(profiles: Arc<Profiles>) -> Self {
        Self { profiles }
    }

    /// Score every category against `text`, in canonical declaration order.
    /// A QUESTION entry gets the configured bonus when the text contains a
    /// literal `?` (a bare substring match under-counts question intent).
    pub fn score(&self, text: &str) -> Vec<(Category, i32)> {
        let lower = text.to_lowercase();
        self.profiles
            .categories
            .iter()
            .map(|profile| {
                let mut score: i32 = profile.keywords.iter().map(|k| k.score(&lower)).sum();
                if profile.category == Category::Question && text.contains('?') {
                    score += self.profiles.classifier.question_mark_bonus;
                }
                (profile.category, score)
            })
            .collect()
    }

    /// Category with the maximum score; ties go to the first-declared
    /// category. All-zero scores yield the configured default.
    pub fn classify(&self, text: &str) -> Category {
        let scored = self.score(text);
        let mut best: Option<(Category, i32)> = None;
        for (category, score) in scored {
            match best {
                // Strictly greater keeps the earliest category on ties.
                Some((_, top)) if score <= top => {}
                _ => best = Some((category, score)),
            }
        }
        match best {
            Some((category, score)) if score > 0 => category,
            _ => self.profiles.default_category,
        }
    }

    /// Top-scoring context tag over the tone taxonomy, or `general` when
    /// nothing scores above zero. Independent of `classify`.
    pub fn context_of(&self, text: &str) -> ContextTag {
        let lower = text.to_lowercase();
        let mut best: Option<(&ContextTag, i32)> = None;
        for ctx in &self.profiles.contexts {
            let score: i32 = ctx.keywords.iter().map(|k| k.score(&lower)).sum();
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((&ctx.tag, score)),
            }
        }
        match best {
            Some((tag, score)) if score > 0 => tag.clone(),
            _ => ContextTag::general(),
        }
    }

    /// Names of every keyword family with at least one phrase present in the
    /// text. Consumed by the engagement scorer and CRM tagging.
    pub fn families(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.profiles
            .families
            .iter()
            .filter(|f| f.matches(&lower))
            .map(|f| f.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> LexicalScorer {
        LexicalScorer::new(Profiles::builtin())
    }

    fn score_of(scored: &[(Category, i32)], category: Category) -> i32 {
        scored
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn spam_example_classifies_as_spam() {
        let s = scorer();
        assert_eq!(
            s.classify("Click here for free followers!!! www.spam.com"),
            Category::Spam
        );
    }

    #[test]
    fn question_example_classifies_as_question() {
        let s = scorer();
        assert_eq!(
            s.classify("What are your business hours?"),
            Category::Question
        );
    }

    #[test]
    fn question_mark_bonus_raises_question_score() {
        let s = scorer();
        // No keyword from any table; only the `?` differs.
        let with = s.score("zzqqzz?");
        let without = s.score("zzqqzz");
        assert!(
            score_of(&with, Category::Question) > score_of(&without, Category::Question),
            "bare `?` must add the question bonus"
        );
        assert_eq!(score_of(&without, Category::Question), 0);
    }

    #[test]
    fn ties_break_to_first_declared_category() {
        let s = scorer();
        // "interested" scores LEAD 2; "amazing" scores PRAISE 2.
        let scored = s.score("interested and amazing");
        assert_eq!(
            score_of(&scored, Category::Lead),
            score_of(&scored, Category::Praise)
        );
        assert_eq!(s.classify("interested and amazing"), Category::Lead);
    }

    #[test]
    fn zero_matches_fall_back_to_default_category() {
        let s = scorer();
        assert_eq!(s.classify("zzqqzz"), Category::Question);
    }

    #[test]
    fn classify_is_deterministic() {
        let s = scorer();
        let text = "I'm struggling to believe this applies to me.";
        let first = s.classify(text);
        for _ in 0..10 {
            assert_eq!(s.classify(text), first);
        }
    }

    #[test]
    fn context_picks_tone_independent_of_category() {
        let s = scorer();
        assert_eq!(
            s.context_of("I'm crying. This was so powerful."),
            ContextTag::new("emotional")
        );
        assert_eq!(
            s.context_of("How can I get this?"),
            ContextTag::new("seeking")
        );
        assert_eq!(s.context_of("zzqqzz"), ContextTag::general());
    }

    #[test]
    fn families_for_hot_lead_sample() {
        let s = scorer();
        let got = s.families("I'm really interested in your product! How can I purchase it ASAP?");
        let want: BTreeSet<String> = ["interested", "hot_lead", "question"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn families_empty_on_plain_text() {
        let s = scorer();
        assert!(s.families("zzqqzz").is_empty());
    }
}
