//! Core vocabulary: the closed category enum, the context tag, and the
//! per-request result shapes returned by the adapters and the processor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed comment classification. The declared order below is the canonical
/// order used for tie-breaking everywhere in the crate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Lead,
    Praise,
    Spam,
    Question,
    Complaint,
}

impl Category {
    /// Canonical declared order: `[LEAD, PRAISE, SPAM, QUESTION, COMPLAINT]`.
    pub const ALL: [Category; 5] = [
        Category::Lead,
        Category::Praise,
        Category::Spam,
        Category::Question,
        Category::Complaint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lead => "LEAD",
            Category::Praise => "PRAISE",
            Category::Spam => "SPAM",
            Category::Question => "QUESTION",
            Category::Complaint => "COMPLAINT",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEAD" => Ok(Category::Lead),
            "PRAISE" => Ok(Category::Praise),
            "SPAM" => Ok(Category::Spam),
            "QUESTION" => Ok(Category::Question),
            "COMPLAINT" => Ok(Category::Complaint),
            other => Err(anyhow::anyhow!("unknown category: {other}")),
        }
    }
}

/// Secondary tone classification, used only to pick among reply templates
/// within a category. Open set (the taxonomy lives in configuration);
/// `general` is the default when nothing scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextTag(String);

impl ContextTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn general() -> Self {
        Self("general".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_general(&self) -> bool {
        self.0 == "general"
    }
}

impl Default for ContextTag {
    fn default() -> Self {
        Self::general()
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifySource {
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "keyword-fallback")]
    KeywordFallback,
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Model,
    Template,
}

/// Per-request classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub source: ClassifySource,
}

/// Per-request reply outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyResult {
    pub text: String,
    pub source: ReplySource,
}

/// The packaged result handed back to the caller. Source tags are carried for
/// diagnostics; the shape is identical whether or not a fallback fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedComment {
    pub comment: String,
    pub category: Category,
    pub reply: String,
    pub context: ContextTag,
    pub classification_source: ClassifySource,
    pub reply_source: ReplySource,
}
