//! Model backend abstraction: two narrow capability traits (zero-shot
//! classification, text continuation) so the concrete inference provider is
//! swappable and mockable without touching core logic. Concrete backends: a
//! hosted-inference HTTP client, a disabled backend (always errs, which
//! routes every call to the deterministic path), and a fixed backend for
//! tests and `MODEL_TEST_MODE=mock`.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked candidate from the zero-shot classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Sampling parameters for a continuation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Rank `candidate_labels` against `text`, best first. Returned labels
    /// must be members of `candidate_labels`.
    async fn rank(
        &self,
        text: &str,
        candidate_labels: &[String],
        hypothesis_template: &str,
    ) -> Result<Vec<LabelScore>>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a single continuation for `prompt`. May echo the prompt; the
    /// reply adapter strips it.
    async fn complete(&self, prompt: &str, params: &GenParams) -> Result<String>;

    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn ZeroShotClassifier>;
pub type DynGenerator = Arc<dyn TextGenerator>;

/* ----------------------------
Config
---------------------------- */

/// Backend config loaded from `config/model.json`. Lenient: any read/parse
/// failure yields the (disabled) default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub enabled: bool,
    /// Base URL of the hosted inference API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    #[serde(default = "default_generator_model")]
    pub generator_model: String,
}

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_classifier_model() -> String {
    "facebook/bart-large-mnli".to_string()
}
fn default_generator_model() -> String {
    "gpt2-medium".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            classifier_model: default_classifier_model(),
            generator_model: default_generator_model(),
        }
    }
}

/// Load config from `config/model.json`; defaults when missing or invalid.
pub fn load_model_config() -> ModelConfig {
    let path = Path::new("config/model.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ModelConfig::default(),
    }
}

/// Factory: build the capability pair according to config and environment.
///
/// * If `MODEL_TEST_MODE=mock`, returns a deterministic fixed backend.
/// * Else if `config.enabled == false`, returns the disabled backend.
/// * Else builds the hosted inference client (token from `HF_API_TOKEN`).
pub fn build_backends(config: &ModelConfig) -> (DynClassifier, DynGenerator) {
    if std::env::var("MODEL_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let fixed = Arc::new(FixedBackend::echoing());
        return (fixed.clone(), fixed);
    }

    if !config.enabled {
        let disabled = Arc::new(DisabledBackend);
        return (disabled.clone(), disabled);
    }

    let hosted = Arc::new(InferenceBackend::new(config));
    (hosted.clone(), hosted)
}

/* ----------------------------
Hosted inference backend
---------------------------- */

/// HTTP client against a hosted inference API (zero-shot + text-generation
/// JSON shapes). Requires `HF_API_TOKEN`; an empty token fails each call,
/// which lands on the deterministic path.
pub struct InferenceBackend {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    classifier_model: String,
    generator_model: String,
}

impl InferenceBackend {
    pub fn new(config: &ModelConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("comment-triage/0.1 (+github.com/comment-triage)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: std::env::var("HF_API_TOKEN").unwrap_or_default(),
            classifier_model: config.classifier_model.clone(),
            generator_model: config.generator_model.clone(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.endpoint, model)
    }
}

#[async_trait]
impl ZeroShotClassifier for InferenceBackend {
    async fn rank(
        &self,
        text: &str,
        candidate_labels: &[String],
        hypothesis_template: &str,
    ) -> Result<Vec<LabelScore>> {
        if self.token.is_empty() {
            return Err(anyhow!("missing HF_API_TOKEN"));
        }

        #[derive(Serialize)]
        struct Params<'a> {
            candidate_labels: &'a [String],
            hypothesis_template: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
            parameters: Params<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            labels: Vec<String>,
            scores: Vec<f32>,
        }

        let req = Req {
            inputs: text,
            parameters: Params {
                candidate_labels,
                hypothesis_template,
            },
        };
        let resp = self
            .http
            .post(self.model_url(&self.classifier_model))
            .bearer_auth(&self.token)
            .json(&req)
            .send()
            .await
            .context("zero-shot request")?
            .error_for_status()
            .context("zero-shot non-2xx")?;

        let body: Resp = resp.json().await.context("zero-shot body")?;
        Ok(body
            .labels
            .into_iter()
            .zip(body.scores)
            .map(|(label, score)| LabelScore { label, score })
            .collect())
    }

    fn name(&self) -> &'static str {
        "hosted-inference"
    }
}

#[async_trait]
impl TextGenerator for InferenceBackend {
    async fn complete(&self, prompt: &str, params: &GenParams) -> Result<String> {
        if self.token.is_empty() {
            return Err(anyhow!("missing HF_API_TOKEN"));
        }

        #[derive(Serialize)]
        struct Params {
            max_new_tokens: u32,
            temperature: f32,
            top_p: f32,
            do_sample: bool,
            return_full_text: bool,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
            parameters: Params,
        }
        #[derive(Deserialize)]
        struct Completion {
            generated_text: String,
        }

        let req = Req {
            inputs: prompt,
            parameters: Params {
                max_new_tokens: params.max_new_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                do_sample: true,
                return_full_text: true,
            },
        };
        let resp = self
            .http
            .post(self.model_url(&self.generator_model))
            .bearer_auth(&self.token)
            .json(&req)
            .send()
            .await
            .context("generation request")?
            .error_for_status()
            .context("generation non-2xx")?;

        let body: Vec<Completion> = resp.json().await.context("generation body")?;
        body.into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or_else(|| anyhow!("empty generation response"))
    }

    fn name(&self) -> &'static str {
        "hosted-inference"
    }
}

/* ----------------------------
Deterministic backends
---------------------------- */

/// Errors on every call; used when the model path is off. The adapters treat
/// the error as an ordinary fallback trigger.
pub struct DisabledBackend;

#[async_trait]
impl ZeroShotClassifier for DisabledBackend {
    async fn rank(&self, _: &str, _: &[String], _: &str) -> Result<Vec<LabelScore>> {
        Err(anyhow!("model backend disabled"))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[async_trait]
impl TextGenerator for DisabledBackend {
    async fn complete(&self, _: &str, _: &GenParams) -> Result<String> {
        Err(anyhow!("model backend disabled"))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed responses for tests and mock mode. With `label`/`completion` unset,
/// ranking puts the first candidate on top and completion echoes the prompt
/// with a canned continuation.
#[derive(Debug, Clone, Default)]
pub struct FixedBackend {
    pub label: Option<String>,
    pub completion: Option<String>,
}

impl FixedBackend {
    /// Mock-mode backend: ranks the first candidate on top and echoes the
    /// prompt with a canned continuation.
    pub fn echoing() -> Self {
        Self {
            label: None,
            completion: None,
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for FixedBackend {
    async fn rank(
        &self,
        _text: &str,
        candidate_labels: &[String],
        _hypothesis_template: &str,
    ) -> Result<Vec<LabelScore>> {
        let label = match &self.label {
            Some(l) => l.clone(),
            None => candidate_labels
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("no candidate labels"))?,
        };
        Ok(vec![LabelScore { label, score: 0.9 }])
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[async_trait]
impl TextGenerator for FixedBackend {
    async fn complete(&self, prompt: &str, _params: &GenParams) -> Result<String> {
        match &self.completion {
            Some(text) => Ok(text.clone()),
            None => Ok(format!(
                "{prompt} Thank you so much for reaching out to us. We appreciate you and we're here to help."
            )),
        }
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}
