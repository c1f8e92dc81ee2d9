//! Reply generator adapter. The model path is strictly a variation layer
//! over a guaranteed-good template fallback: the canned reply is computed
//! first, and any backend error or validation rejection resolves to it
//! within the same call. No request can surface an unvalidated or empty
//! reply.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::warn;

use crate::anon_id;
use crate::category::{Category, ReplyResult, ReplySource};
use crate::lexical::LexicalScorer;
use crate::metrics::REPLY_FALLBACK_TOTAL;
use crate::model::{DynGenerator, GenParams};
use crate::profiles::{Profiles, ReplyPolicy};
use crate::templates::TemplateResponder;

/// Why the model path was abandoned for a given call. Validation rejections
/// are deliberately the same kind of branch as backend failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFallback {
    Backend(String),
    /// Cleaned text shorter than the configured minimum (empty included).
    TooShort(usize),
    /// Cleaned text contains a marketing-pressure phrase.
    Banned(String),
    /// No positive-register word and no empathetic phrase.
    FlatTone,
}

impl fmt::Display for ReplyFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyFallback::Backend(e) => write!(f, "backend: {e}"),
            ReplyFallback::TooShort(n) => write!(f, "too short ({n} chars)"),
            ReplyFallback::Banned(p) => write!(f, "banned phrase: {p}"),
            ReplyFallback::FlatTone => write!(f, "no tone indicator"),
        }
    }
}

pub struct ReplyGenerator {
    profiles: Arc<Profiles>,
    backend: DynGenerator,
    lexical: LexicalScorer,
    templates: TemplateResponder,
}

impl ReplyGenerator {
    pub fn new(profiles: Arc<Profiles>, backend: DynGenerator) -> Self {
        let lexical = LexicalScorer::new(profiles.clone());
        let templates = TemplateResponder::new(profiles.clone());
        Self {
            profiles,
            backend,
            lexical,
            templates,
        }
    }

    /// Generate a reply for an already-classified comment. Total over any
    /// input; the template response is the floor.
    pub async fn generate(&self, comment: &str, category: Category) -> ReplyResult {
        let context = self.lexical.context_of(comment);
        let template_response = self.templates.respond(category, &context, comment);

        match self.try_model(comment, category).await {
            Ok(text) => ReplyResult {
                text,
                source: ReplySource::Model,
            },
            Err(reason) => {
                warn!(
                    id = %anon_id(comment),
                    backend = self.backend.name(),
                    category = %category,
                    %reason,
                    "reply generation fell back to template"
                );
                counter!(REPLY_FALLBACK_TOTAL).increment(1);
                ReplyResult {
                    text: template_response,
                    source: ReplySource::Template,
                }
            }
        }
    }

    async fn try_model(&self, comment: &str, category: Category) -> Result<String, ReplyFallback> {
        let profile = self.profiles.profile(category);
        let policy = &self.profiles.reply;

        // Same deterministic selection as the template buckets when a
        // category configures more than one prompt.
        let index = comment.chars().count() % profile.prompts.len();
        let prompt = profile.prompts[index].replace("{comment}", comment);

        let params = GenParams {
            max_new_tokens: prompt.split_whitespace().count() as u32 + policy.prompt_extra_tokens,
            temperature: policy.temperature,
            top_p: policy.top_p,
        };

        let raw = self
            .backend
            .complete(&prompt, &params)
            .await
            .map_err(|e| ReplyFallback::Backend(e.to_string()))?;

        let cleaned = clean_reply(&raw, &prompt, policy);
        validate_reply(&cleaned, category, policy)?;
        Ok(cleaned)
    }
}

/// Post-process a raw continuation: drop the prompt echo, strip leaking
/// prefixes, keep at most the first N sentences.
pub fn clean_reply(raw: &str, prompt: &str, policy: &ReplyPolicy) -> String {
    let without_prompt = raw.replace(prompt, "");
    let without_prefixes = strip_leak_prefixes(without_prompt.trim(), &policy.leak_prefixes);
    clamp_sentences(&without_prefixes, policy.max_sentences)
}

/// Validate a cleaned reply against the tone/length/safety policy.
pub fn validate_reply(
    text: &str,
    category: Category,
    policy: &ReplyPolicy,
) -> Result<(), ReplyFallback> {
    let chars = text.chars().count();
    if chars < policy.min_chars {
        return Err(ReplyFallback::TooShort(chars));
    }

    let lower = text.to_lowercase();
    if let Some(p) = policy
        .banned_phrases
        .iter()
        .find(|p| lower.contains(p.as_str()))
    {
        return Err(ReplyFallback::Banned(p.clone()));
    }

    if !policy.tone_exempt.contains(&category) {
        let positive = policy.positive_words.iter().any(|w| lower.contains(w.as_str()));
        let empathetic = policy
            .empathy_phrases
            .iter()
            .any(|w| lower.contains(w.as_str()));
        if !positive && !empathetic {
            return Err(ReplyFallback::FlatTone);
        }
    }

    Ok(())
}

/// Strip leaking prefixes at the start, case-insensitively, until stable.
/// Stacked prefixes ("Reply: Customer: thanks") unwind one per pass.
fn strip_leak_prefixes(text: &str, prefixes: &[String]) -> String {
    let mut out = text.trim_start().to_string();
    loop {
        let lower = out.to_lowercase();
        let hit = prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find(|p| lower.starts_with(&p.to_lowercase()));
        match hit {
            // Prefixes are ASCII; `get` guards the one exotic case where
            // lowercasing shifted byte offsets.
            Some(p) => match out.get(p.len()..) {
                Some(rest) => {
                    out = rest
                        .trim_start()
                        .trim_start_matches(':')
                        .trim_start()
                        .to_string();
                }
                None => return out,
            },
            None => return out,
        }
    }
}

/// Split on sentence terminators, drop empty fragments, keep at most `max`
/// sentences, reassemble with terminal punctuation. Empty input stays empty.
fn clamp_sentences(text: &str, max: usize) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(max)
        .collect();
    if sentences.is_empty() {
        String::new()
    } else {
        format!("{}.", sentences.join(". "))
    }
}
