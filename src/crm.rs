//! CRM collaborator: contact upsert, tagging, custom fields, and workflow
//! triggers against a GoHighLevel-style REST API. Every step is individually
//! failable into the returned `CrmSyncReport`; nothing propagates past this
//! boundary, and a CRM failure never touches the classification/reply result
//! that triggered it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::Category;
use crate::engagement::engagement_score;
use crate::lexical::LexicalScorer;
use crate::profiles::Profiles;

/// Workflow fired unconditionally when the `hot_lead` family matched,
/// on top of the per-category table.
const HOT_LEAD_WORKFLOW: &str = "urgent_lead_notification";
const HOT_LEAD_FAMILY: &str = "hot_lead";
const LAST_COMMENT_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    pub api_key: String,
    pub location_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://api.gohighlevel.com/v1".to_string()
}

impl CrmConfig {
    /// Read `CRM_API_KEY` / `CRM_LOCATION_ID` (+ optional `CRM_BASE_URL`).
    /// `None` when the integration is not configured.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("CRM_API_KEY").ok()?;
        let location_id = std::env::var("CRM_LOCATION_ID").ok()?;
        let base_url = std::env::var("CRM_BASE_URL").unwrap_or_else(|_| default_base_url());
        Some(Self {
            api_key,
            location_id,
            base_url,
        })
    }
}

/// Contact details supplied by the platform collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    /// e.g. "Facebook", "Instagram". Defaults to "Social Media".
    #[serde(default)]
    pub source: Option<String>,
}

/// Structured outcome of one sync. `error` carries the first failure; the
/// flags record how far the sync got.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmSyncReport {
    pub contact_id: Option<String>,
    pub contact_created: bool,
    pub contact_updated: bool,
    pub tags_added: Vec<String>,
    pub custom_fields_updated: bool,
    pub workflow_triggered: bool,
    pub hot_lead_alert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CrmClient {
    http: reqwest::Client,
    config: CrmConfig,
    profiles: Arc<Profiles>,
    lexical: LexicalScorer,
}

impl CrmClient {
    pub fn new(config: CrmConfig, profiles: Arc<Profiles>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("comment-triage/0.1 (+github.com/comment-triage)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let lexical = LexicalScorer::new(profiles.clone());
        Self {
            http,
            config,
            profiles,
            lexical,
        }
    }

    /// Full sync for one processed comment: upsert → tags → custom fields →
    /// workflows. Sequenced but independently failable.
    pub async fn sync_comment(
        &self,
        comment: &str,
        category: Category,
        contact: &ContactInfo,
    ) -> CrmSyncReport {
        let mut report = CrmSyncReport::default();
        let families = self.lexical.families(comment);

        // 1) Contact upsert; without a contact id nothing else can run.
        let contact_id = match self.upsert_contact(contact).await {
            Ok((id, created)) => {
                report.contact_created = created;
                report.contact_updated = !created;
                report.contact_id = Some(id.clone());
                id
            }
            Err(e) => {
                warn!(error = %e, "CRM contact upsert failed");
                report.error = Some(e.to_string());
                return report;
            }
        };

        // 2) Category tags + keyword-family tags.
        let tags = tags_for(&self.profiles, category, &families);
        match self.add_tags(&contact_id, &tags).await {
            Ok(()) => report.tags_added = tags,
            Err(e) => {
                warn!(error = %e, %contact_id, "CRM tagging failed");
                report.error.get_or_insert(e.to_string());
            }
        }

        // 3) Custom fields (engagement snapshot).
        let fields = serde_json::json!({
            "last_social_interaction": chrono::Utc::now().to_rfc3339(),
            "last_comment": truncate_chars(comment, LAST_COMMENT_MAX_CHARS),
            "engagement_category": category.as_str(),
            "engagement_score": engagement_score(&self.profiles, category, &families),
        });
        match self.update_custom_fields(&contact_id, &fields).await {
            Ok(()) => report.custom_fields_updated = true,
            Err(e) => {
                warn!(error = %e, %contact_id, "CRM custom-field update failed");
                report.error.get_or_insert(e.to_string());
            }
        }

        // 4) At most one per-category workflow, plus the hot-lead alert.
        if let Some(workflow) = &self.profiles.profile(category).workflow {
            match self.trigger_workflow(&contact_id, workflow).await {
                Ok(()) => report.workflow_triggered = true,
                Err(e) => {
                    warn!(error = %e, %workflow, "CRM workflow trigger failed");
                    report.error.get_or_insert(e.to_string());
                }
            }
        }
        if families.contains(HOT_LEAD_FAMILY) {
            match self.trigger_workflow(&contact_id, HOT_LEAD_WORKFLOW).await {
                Ok(()) => report.hot_lead_alert = true,
                Err(e) => {
                    warn!(error = %e, "CRM hot-lead trigger failed");
                    report.error.get_or_insert(e.to_string());
                }
            }
        }

        info!(%contact_id, category = %category, "CRM sync finished");
        report
    }

    /// Idempotent upsert by email. Returns `(contact_id, created)`.
    async fn upsert_contact(&self, contact: &ContactInfo) -> Result<(String, bool)> {
        if contact.email.trim().is_empty() {
            return Err(anyhow!("contact email is required"));
        }

        #[derive(Deserialize)]
        struct SearchResp {
            #[serde(default)]
            contacts: Vec<FoundContact>,
        }
        #[derive(Deserialize)]
        struct FoundContact {
            id: String,
        }

        let found: SearchResp = self
            .http
            .get(format!("{}/contacts/search", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("email", contact.email.as_str()),
                ("locationId", self.config.location_id.as_str()),
            ])
            .send()
            .await
            .context("contact search")?
            .error_for_status()
            .context("contact search non-2xx")?
            .json()
            .await
            .context("contact search body")?;

        if let Some(existing) = found.contacts.first() {
            let body = serde_json::json!({
                "source": contact.source.clone().unwrap_or_else(|| "Social Media".to_string()),
                "lastActivity": chrono::Utc::now().to_rfc3339(),
            });
            self.http
                .put(format!("{}/contacts/{}", self.config.base_url, existing.id))
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
                .context("contact update")?
                .error_for_status()
                .context("contact update non-2xx")?;
            return Ok((existing.id.clone(), false));
        }

        #[derive(Deserialize)]
        struct CreateResp {
            id: String,
        }

        let body = serde_json::json!({
            "locationId": self.config.location_id,
            "email": contact.email,
            "firstName": contact.first_name,
            "lastName": contact.last_name,
            "phone": contact.phone,
            "source": contact.source.clone().unwrap_or_else(|| "Social Media".to_string()),
        });
        let created: CreateResp = self
            .http
            .post(format!("{}/contacts", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("contact create")?
            .error_for_status()
            .context("contact create non-2xx")?
            .json()
            .await
            .context("contact create body")?;

        Ok((created.id, true))
    }

    async fn add_tags(&self, contact_id: &str, tags: &[String]) -> Result<()> {
        for tag in tags {
            self.http
                .post(format!(
                    "{}/contacts/{}/tags",
                    self.config.base_url, contact_id
                ))
                .bearer_auth(&self.config.api_key)
                .json(&serde_json::json!({ "tag": tag }))
                .send()
                .await
                .with_context(|| format!("tag `{tag}`"))?
                .error_for_status()
                .with_context(|| format!("tag `{tag}` non-2xx"))?;
        }
        Ok(())
    }

    async fn update_custom_fields(
        &self,
        contact_id: &str,
        fields: &serde_json::Value,
    ) -> Result<()> {
        self.http
            .put(format!("{}/contacts/{}", self.config.base_url, contact_id))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "customFields": fields }))
            .send()
            .await
            .context("custom fields")?
            .error_for_status()
            .context("custom fields non-2xx")?;
        Ok(())
    }

    async fn trigger_workflow(&self, contact_id: &str, workflow: &str) -> Result<()> {
        let body = serde_json::json!({
            "contactId": contact_id,
            "workflowName": workflow,
            "locationId": self.config.location_id,
        });
        self.http
            .post(format!("{}/workflows/trigger", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("workflow trigger")?
            .error_for_status()
            .context("workflow trigger non-2xx")?;
        Ok(())
    }
}

/// Category tags plus `keyword-<family>` tags, in a stable order.
pub fn tags_for(
    profiles: &Profiles,
    category: Category,
    families: &BTreeSet<String>,
) -> Vec<String> {
    let mut tags = profiles.profile(category).crm_tags.clone();
    tags.extend(families.iter().map(|f| format!("keyword-{f}")));
    tags
}

/// Char-boundary-safe truncation (the CRM field caps at 255 characters).
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::LexicalScorer;

    #[test]
    fn tags_combine_category_and_families() {
        let profiles = Profiles::builtin();
        let fams = LexicalScorer::new(profiles.clone())
            .families("I'm really interested in your product! How can I purchase it ASAP?");
        let tags = tags_for(&profiles, Category::Lead, &fams);
        assert!(tags.contains(&"social-media-lead".to_string()));
        assert!(tags.contains(&"keyword-interested".to_string()));
        assert!(tags.contains(&"keyword-hot_lead".to_string()));
        assert!(tags.contains(&"keyword-question".to_string()));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long: String = "ř".repeat(300);
        let cut = truncate_chars(&long, 255);
        assert_eq!(cut.chars().count(), 255);
        let short = truncate_chars("hello", 255);
        assert_eq!(short, "hello");
    }

    #[tokio::test]
    async fn sync_with_unreachable_crm_reports_error() {
        let config = CrmConfig {
            api_key: "test-key".into(),
            location_id: "loc".into(),
            // Nothing listens on this port; the connect fails immediately.
            base_url: "http://127.0.0.1:1".into(),
        };
        let client = CrmClient::new(config, Profiles::builtin());
        let report = client
            .sync_comment(
                "I'm interested!",
                Category::Lead,
                &ContactInfo {
                    email: "test@example.com".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(report.error.is_some());
        assert!(report.tags_added.is_empty());
        assert!(!report.workflow_triggered);
    }

    #[tokio::test]
    async fn missing_email_fails_before_any_request() {
        let config = CrmConfig {
            api_key: "test-key".into(),
            location_id: "loc".into(),
            base_url: "http://127.0.0.1:1".into(),
        };
        let client = CrmClient::new(config, Profiles::builtin());
        let report = client
            .sync_comment("hello", Category::Question, &ContactInfo::default())
            .await;
        assert_eq!(report.error.as_deref(), Some("contact email is required"));
    }
}
