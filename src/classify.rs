//! Classifier adapter: zero-shot model path with an explicit, first-class
//! fallback to the lexical scorer. The fallback is a data branch
//! (`ClassifyFallback`), not exception control flow, so the policy is
//! directly testable; callers only ever see the `source` tag.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::warn;

use crate::anon_id;
use crate::category::{Category, ClassificationResult, ClassifySource};
use crate::lexical::LexicalScorer;
use crate::metrics::CLASSIFY_FALLBACK_TOTAL;
use crate::model::DynClassifier;
use crate::profiles::Profiles;

/// Why the model path was abandoned for a given call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyFallback {
    /// The backend errored (unavailable, timeout, non-2xx, bad body).
    Backend(String),
    /// The backend returned an empty ranking.
    EmptyRanking,
    /// The top label did not exact-match any configured description.
    /// Defensive: should not occur given the closed candidate set.
    UnknownLabel(String),
}

impl fmt::Display for ClassifyFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyFallback::Backend(e) => write!(f, "backend: {e}"),
            ClassifyFallback::EmptyRanking => write!(f, "empty ranking"),
            ClassifyFallback::UnknownLabel(l) => write!(f, "unmapped label: {l}"),
        }
    }
}

pub struct ClassifierAdapter {
    profiles: Arc<Profiles>,
    backend: DynClassifier,
    lexical: LexicalScorer,
}

impl ClassifierAdapter {
    pub fn new(profiles: Arc<Profiles>, backend: DynClassifier) -> Self {
        let lexical = LexicalScorer::new(profiles.clone());
        Self {
            profiles,
            backend,
            lexical,
        }
    }

    /// Classify a comment. Total over any input: every failure of the model
    /// path resolves to the keyword fallback within this call.
    pub async fn classify(&self, comment: &str) -> ClassificationResult {
        match self.try_model(comment).await {
            Ok(category) => ClassificationResult {
                category,
                source: ClassifySource::Model,
            },
            Err(reason) => {
                warn!(
                    id = %anon_id(comment),
                    backend = self.backend.name(),
                    %reason,
                    "zero-shot classification fell back to keywords"
                );
                counter!(CLASSIFY_FALLBACK_TOTAL).increment(1);
                ClassificationResult {
                    category: self.lexical.classify(comment),
                    source: ClassifySource::KeywordFallback,
                }
            }
        }
    }

    async fn try_model(&self, comment: &str) -> Result<Category, ClassifyFallback> {
        let labels = self.profiles.descriptions();
        let ranked = self
            .backend
            .rank(
                comment,
                &labels,
                &self.profiles.classifier.hypothesis_template,
            )
            .await
            .map_err(|e| ClassifyFallback::Backend(e.to_string()))?;

        let top = ranked.first().ok_or(ClassifyFallback::EmptyRanking)?;
        self.profiles
            .category_for_description(&top.label)
            .ok_or_else(|| ClassifyFallback::UnknownLabel(top.label.clone()))
    }
}
