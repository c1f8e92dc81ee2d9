//! Comment processor: the one component the outside world calls.
//! Sequentially classify → generate → derive context, then package the
//! result. Never fails for well-formed non-empty input; blank input is the
//! single rejected case.

use std::sync::Arc;

use metrics::counter;
use tracing::info;

use crate::anon_id;
use crate::category::ProcessedComment;
use crate::classify::ClassifierAdapter;
use crate::lexical::LexicalScorer;
use crate::metrics::COMMENTS_PROCESSED_TOTAL;
use crate::model::{DisabledBackend, DynClassifier, DynGenerator};
use crate::profiles::Profiles;
use crate::reply::ReplyGenerator;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("comment must not be empty")]
    InvalidInput,
}

pub struct CommentProcessor {
    classifier: ClassifierAdapter,
    replier: ReplyGenerator,
    lexical: LexicalScorer,
}

impl CommentProcessor {
    pub fn new(
        profiles: Arc<Profiles>,
        classify_backend: DynClassifier,
        generate_backend: DynGenerator,
    ) -> Self {
        Self {
            classifier: ClassifierAdapter::new(profiles.clone(), classify_backend),
            replier: ReplyGenerator::new(profiles.clone(), generate_backend),
            lexical: LexicalScorer::new(profiles),
        }
    }

    /// Model-free processor: both backends disabled, so every request runs
    /// the deterministic keyword/template path. Used by the demo binary and
    /// handy in tests.
    pub fn deterministic(profiles: Arc<Profiles>) -> Self {
        let disabled = Arc::new(DisabledBackend);
        Self::new(profiles, disabled.clone(), disabled)
    }

    pub async fn process(&self, comment: &str) -> Result<ProcessedComment, ProcessError> {
        if comment.trim().is_empty() {
            return Err(ProcessError::InvalidInput);
        }

        let classification = self.classifier.classify(comment).await;
        let reply = self
            .replier
            .generate(comment, classification.category)
            .await;
        let context = self.lexical.context_of(comment);

        info!(
            id = %anon_id(comment),
            category = %classification.category,
            context = %context,
            classification_source = ?classification.source,
            reply_source = ?reply.source,
            "processed comment"
        );
        counter!(COMMENTS_PROCESSED_TOTAL).increment(1);

        Ok(ProcessedComment {
            comment: comment.to_string(),
            category: classification.category,
            reply: reply.text,
            context,
            classification_source: classification.source,
            reply_source: reply.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, ClassifySource, ReplySource};

    fn processor() -> CommentProcessor {
        CommentProcessor::deterministic(Profiles::builtin())
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let p = processor();
        assert!(matches!(
            p.process("").await,
            Err(ProcessError::InvalidInput)
        ));
        assert!(matches!(
            p.process("   \t\n").await,
            Err(ProcessError::InvalidInput)
        ));
    }

    #[tokio::test]
    async fn deterministic_path_packages_everything() {
        let p = processor();
        let got = p.process("What are your business hours?").await.unwrap();
        assert_eq!(got.category, Category::Question);
        assert_eq!(got.classification_source, ClassifySource::KeywordFallback);
        assert_eq!(got.reply_source, ReplySource::Template);
        assert!(!got.reply.is_empty());
        assert_eq!(got.comment, "What are your business hours?");
    }
}
