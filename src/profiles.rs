//! Static configuration tables: category profiles, context taxonomy, keyword
//! families, engagement table, and reply policy. Loaded once at startup from
//! TOML (embedded default, optional file override via env), compiled (regex
//! patterns, lowercased phrases), then shared read-only.

use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::category::{Category, ContextTag};

pub const ENV_PROFILES_CONFIG_PATH: &str = "PROFILES_CONFIG_PATH";

static BUILTIN: Lazy<Arc<Profiles>> = Lazy::new(|| {
    let raw = include_str!("../config/profiles.toml");
    Arc::new(Profiles::from_toml_str(raw).expect("valid built-in profiles"))
});

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, serde::Deserialize)]
struct ProfilesRoot {
    classifier: ClassifierPolicy,
    reply: ReplyPolicyCfg,
    categories: Vec<CategoryCfg>,
    #[serde(default)]
    contexts: Vec<ContextCfg>,
    #[serde(default)]
    families: Vec<FamilyCfg>,
    engagement: EngagementCfg,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClassifierPolicy {
    pub hypothesis_template: String,
    pub default_category: String,
    pub question_mark_bonus: i32,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ReplyPolicyCfg {
    min_chars: usize,
    max_sentences: usize,
    prompt_extra_tokens: u32,
    temperature: f32,
    top_p: f32,
    fallback_line: String,
    banned_phrases: Vec<String>,
    leak_prefixes: Vec<String>,
    positive_words: Vec<String>,
    empathy_phrases: Vec<String>,
    #[serde(default)]
    tone_exempt: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct CategoryCfg {
    name: String,
    description: String,
    keywords: Vec<KeywordCfg>,
    prompts: Vec<String>,
    #[serde(default)]
    crm_tags: Vec<String>,
    #[serde(default)]
    workflow: Option<String>,
    #[serde(default)]
    replies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ContextCfg {
    tag: String,
    keywords: Vec<KeywordCfg>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct KeywordCfg {
    pattern: String,
    weight: i32,
    #[serde(default)]
    regex: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct FamilyCfg {
    name: String,
    phrases: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct EngagementCfg {
    default_base: i32,
    base: BTreeMap<String, i32>,
    #[serde(default)]
    bonus: BTreeMap<String, i32>,
}

/* ----------------------------
Compiled structures
---------------------------- */

/// One keyword pattern with its weight. Substring patterns are matched
/// against the lowercased comment; regex patterns are compiled with `(?i)`.
#[derive(Debug, Clone)]
pub struct CompiledKeyword {
    matcher: Matcher,
    weight: i32,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Pattern(Regex),
}

impl CompiledKeyword {
    fn compile(cfg: &KeywordCfg, owner: &str) -> anyhow::Result<Self> {
        let matcher = if cfg.regex {
            let re = Regex::new(&format!("(?i){}", cfg.pattern))
                .with_context(|| format!("`{owner}` keyword regex `{}`", cfg.pattern))?;
            Matcher::Pattern(re)
        } else {
            Matcher::Substring(cfg.pattern.to_lowercase())
        };
        Ok(Self {
            matcher,
            weight: cfg.weight,
        })
    }

    /// Weight contributed by this keyword for `lower` (the lowercased text),
    /// or 0 when it does not match.
    pub fn score(&self, lower: &str) -> i32 {
        let hit = match &self.matcher {
            Matcher::Substring(needle) => lower.contains(needle.as_str()),
            Matcher::Pattern(re) => re.is_match(lower),
        };
        if hit {
            self.weight
        } else {
            0
        }
    }
}

/// Per-category static configuration.
#[derive(Debug, Clone)]
pub struct CategoryProfile {
    pub category: Category,
    /// Human-readable description; doubles as the zero-shot candidate label.
    pub description: String,
    pub keywords: Vec<CompiledKeyword>,
    pub prompts: Vec<String>,
    pub crm_tags: Vec<String>,
    pub workflow: Option<String>,
    /// Reply buckets keyed by context tag (plus "general"/"default").
    pub replies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ContextProfile {
    pub tag: ContextTag,
    pub keywords: Vec<CompiledKeyword>,
}

#[derive(Debug, Clone)]
pub struct KeywordFamily {
    pub name: String,
    /// Lowercased at load; matched as substrings.
    pub phrases: Vec<String>,
}

impl KeywordFamily {
    pub fn matches(&self, lower: &str) -> bool {
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct ReplyPolicy {
    pub min_chars: usize,
    pub max_sentences: usize,
    pub prompt_extra_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub fallback_line: String,
    pub banned_phrases: Vec<String>,
    pub leak_prefixes: Vec<String>,
    pub positive_words: Vec<String>,
    pub empathy_phrases: Vec<String>,
    pub tone_exempt: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct EngagementTable {
    pub default_base: i32,
    base: BTreeMap<Category, i32>,
    bonus: BTreeMap<String, i32>,
}

impl EngagementTable {
    pub fn base_for(&self, category: Category) -> i32 {
        self.base.get(&category).copied().unwrap_or(self.default_base)
    }

    pub fn bonus_for(&self, family: &str) -> i32 {
        self.bonus.get(family).copied().unwrap_or(0)
    }
}

/// The compiled, immutable configuration shared by every component.
#[derive(Debug, Clone)]
pub struct Profiles {
    pub classifier: ClassifierPolicy,
    pub reply: ReplyPolicy,
    /// Config declaration order; also the tie-break order.
    pub categories: Vec<CategoryProfile>,
    pub contexts: Vec<ContextProfile>,
    pub families: Vec<KeywordFamily>,
    pub engagement: EngagementTable,
    pub default_category: Category,
}

impl Profiles {
    /// The embedded default table set.
    pub fn builtin() -> Arc<Profiles> {
        BUILTIN.clone()
    }

    /// Load from `PROFILES_CONFIG_PATH` when set, else the embedded default.
    pub fn load() -> anyhow::Result<Arc<Profiles>> {
        match std::env::var(ENV_PROFILES_CONFIG_PATH).map(PathBuf::from) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path).with_context(|| {
                    format!("failed to read profiles config at {}", path.display())
                })?;
                Ok(Arc::new(Self::from_toml_str(&raw)?))
            }
            Err(_) => Ok(Self::builtin()),
        }
    }

    /// Parse + compile + validate a TOML profile set.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let root: ProfilesRoot = toml::from_str(raw)?;

        let mut categories = Vec::with_capacity(root.categories.len());
        for cfg in &root.categories {
            let category = Category::from_str(&cfg.name)?;
            if categories.iter().any(|p: &CategoryProfile| p.category == category) {
                anyhow::bail!("category `{}` declared twice", cfg.name);
            }
            if cfg.prompts.is_empty() {
                anyhow::bail!("category `{}` has no prompts", cfg.name);
            }
            let keywords = cfg
                .keywords
                .iter()
                .map(|k| CompiledKeyword::compile(k, &cfg.name))
                .collect::<anyhow::Result<Vec<_>>>()?;
            categories.push(CategoryProfile {
                category,
                description: cfg.description.clone(),
                keywords,
                prompts: cfg.prompts.clone(),
                crm_tags: cfg.crm_tags.clone(),
                workflow: cfg.workflow.clone(),
                replies: cfg.replies.clone(),
            });
        }
        for want in Category::ALL {
            if !categories.iter().any(|p| p.category == want) {
                anyhow::bail!("category `{want}` missing from profiles config");
            }
        }

        let contexts = root
            .contexts
            .iter()
            .map(|c| {
                let keywords = c
                    .keywords
                    .iter()
                    .map(|k| CompiledKeyword::compile(k, &c.tag))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(ContextProfile {
                    tag: ContextTag::new(c.tag.clone()),
                    keywords,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let families = root
            .families
            .iter()
            .map(|f| KeywordFamily {
                name: f.name.clone(),
                phrases: f.phrases.iter().map(|p| p.to_lowercase()).collect(),
            })
            .collect();

        let mut base = BTreeMap::new();
        for (name, score) in &root.engagement.base {
            base.insert(Category::from_str(name)?, *score);
        }

        let tone_exempt = root
            .reply
            .tone_exempt
            .iter()
            .map(|s| Category::from_str(s))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let reply = ReplyPolicy {
            min_chars: root.reply.min_chars,
            max_sentences: root.reply.max_sentences.max(1),
            prompt_extra_tokens: root.reply.prompt_extra_tokens,
            temperature: root.reply.temperature,
            top_p: root.reply.top_p,
            fallback_line: root.reply.fallback_line.clone(),
            banned_phrases: lowercase_all(&root.reply.banned_phrases),
            leak_prefixes: root.reply.leak_prefixes.clone(),
            positive_words: lowercase_all(&root.reply.positive_words),
            empathy_phrases: lowercase_all(&root.reply.empathy_phrases),
            tone_exempt,
        };

        let default_category = Category::from_str(&root.classifier.default_category)?;

        Ok(Self {
            classifier: root.classifier,
            reply,
            categories,
            contexts,
            families,
            engagement: EngagementTable {
                default_base: root.engagement.default_base,
                base,
                bonus: root.engagement.bonus,
            },
            default_category,
        })
    }

    /// Profile for a category. The constructor guarantees all five exist.
    pub fn profile(&self, category: Category) -> &CategoryProfile {
        self.categories
            .iter()
            .find(|p| p.category == category)
            .expect("all categories present after validation")
    }

    /// Ordered candidate labels for the zero-shot classifier.
    pub fn descriptions(&self) -> Vec<String> {
        self.categories.iter().map(|p| p.description.clone()).collect()
    }

    /// Exact-match mapping from a returned label back to its category.
    pub fn category_for_description(&self, label: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|p| p.description == label)
            .map(|p| p.category)
    }
}

fn lowercase_all(v: &[String]) -> Vec<String> {
    v.iter().map(|s| s.to_lowercase()).collect()
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_parses_and_covers_all_categories() {
        let p = Profiles::builtin();
        let order: Vec<Category> = p.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, Category::ALL.to_vec(), "config order must be canonical");
        assert_eq!(p.default_category, Category::Question);
        assert!(p.classifier.question_mark_bonus > 0);
    }

    #[test]
    fn descriptions_map_back_exactly() {
        let p = Profiles::builtin();
        for profile in &p.categories {
            assert_eq!(
                p.category_for_description(&profile.description),
                Some(profile.category)
            );
        }
        assert_eq!(p.category_for_description("no such label"), None);
    }

    #[test]
    fn every_category_has_reply_default_chain() {
        let p = Profiles::builtin();
        for profile in &p.categories {
            let has_terminal = profile.replies.contains_key("general")
                || profile.replies.contains_key("default");
            assert!(has_terminal, "{} needs a general or default bucket", profile.category);
        }
    }

    #[test]
    fn regex_keywords_compile_and_match() {
        let p = Profiles::builtin();
        let spam = p.profile(Category::Spam);
        let hit: i32 = spam
            .keywords
            .iter()
            .map(|k| k.score("grab it at bit.ly/xyz today"))
            .sum();
        assert!(hit >= 3, "short-link regex should score");
    }

    #[test]
    fn missing_category_is_rejected() {
        let raw = r#"
[classifier]
hypothesis_template = "This comment is about {}."
default_category = "QUESTION"
question_mark_bonus = 3

[reply]
min_chars = 20
max_sentences = 2
prompt_extra_tokens = 40
temperature = 0.8
top_p = 0.9
fallback_line = "Thank you for reaching out."
banned_phrases = []
leak_prefixes = []
positive_words = []
empathy_phrases = []

[[categories]]
name = "LEAD"
description = "lead"
keywords = [{ pattern = "interested", weight = 2 }]
prompts = ["{comment}"]

[engagement]
default_base = 30
[engagement.base]
LEAD = 80
"#;
        let err = Profiles::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[test]
    fn engagement_table_defaults() {
        let p = Profiles::builtin();
        assert_eq!(p.engagement.base_for(Category::Spam), 0);
        assert_eq!(p.engagement.bonus_for("hot_lead"), 15);
        assert_eq!(p.engagement.bonus_for("unknown"), 0);
    }
}
