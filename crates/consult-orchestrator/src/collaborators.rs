//! External collaborator contracts consumed by the orchestrator (§6).
//! Failures here are never fatal to the session — callers log and move on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use consult_core::error::ConsultError;

/// One-shot industry-knowledge enrichment, keyed off a detected industry.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn detect_industry(&self, text: &str) -> Option<String>;
    async fn build_for_voice(&self, industry: &str) -> Option<String>;
    async fn record_learning(&self, industry: &str, message: &str, source: &str);
}

/// Background market-context research, triggered once a website or
/// company+industry pair becomes known (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchResult {
    pub website_data: Option<WebsiteData>,
    #[serde(default)]
    pub industry_insights: Vec<String>,
    #[serde(default)]
    pub sources_used: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
}

impl ResearchResult {
    pub fn has_data(&self) -> bool {
        self.website_data.is_some() || !self.industry_insights.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebsiteData {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[async_trait]
pub trait ResearchEngine: Send + Sync {
    async fn research(
        &self,
        website: Option<&str>,
        industry: Option<&str>,
        company_name: Option<&str>,
    ) -> ResearchResult;
}

/// Fire-and-forget delivery to whatever is watching session confirmation
/// (email, webhook, CRM push — unspecified by this system).
#[async_trait]
pub trait NotificationManager: Send + Sync {
    async fn on_session_confirmed(&self, session_id: &str, company_name: Option<&str>);
}

/// Renders a finalized anketa to its canonical Markdown shape (L10). Kept as
/// a trait at this boundary so the orchestrator does not need to depend on
/// the export crate's internals, only the shape of its output.
pub trait AnketaRenderer: Send + Sync {
    fn render_markdown(&self, anketa: &consult_anketa::Anketa) -> String;
}

/// No-op renderer for tests and standalone drivers without an export backend.
pub struct NullAnketaRenderer;

impl AnketaRenderer for NullAnketaRenderer {
    fn render_markdown(&self, _anketa: &consult_anketa::Anketa) -> String {
        String::new()
    }
}

/// No-op knowledge base. Used when no KB backend is configured; always
/// reports "no enrichment available" rather than failing loudly.
pub struct NullKnowledgeBase;

#[async_trait]
impl KnowledgeBase for NullKnowledgeBase {
    async fn detect_industry(&self, _text: &str) -> Option<String> {
        None
    }

    async fn build_for_voice(&self, _industry: &str) -> Option<String> {
        None
    }

    async fn record_learning(&self, _industry: &str, _message: &str, _source: &str) {}
}

/// No-op notification manager.
pub struct NullNotificationManager;

#[async_trait]
impl NotificationManager for NullNotificationManager {
    async fn on_session_confirmed(&self, _session_id: &str, _company_name: Option<&str>) {}
}

/// HTTP-backed research engine combining an SSRF-hardened website fetch
/// with nothing else by default — the web-search/RAG sources the original
/// system relied on are external services not wired in this workspace, but
/// the collaborator boundary keeps them pluggable (§6).
pub struct HttpResearchEngine {
    client: reqwest::Client,
    timeout_secs: u64,
}

const MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECT_HOPS: usize = 5;

impl HttpResearchEngine {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            timeout_secs,
        }
    }

    async fn fetch_website(&self, url: &str) -> Result<WebsiteData, ConsultError> {
        let mut current = normalize_url(url);
        if !crate::ssrf::is_safe_url(&current).await {
            return Err(ConsultError::CollaboratorUnavailable(
                "URL points to a private/internal address".to_string(),
            ));
        }

        let mut response = None;
        for _ in 0..MAX_REDIRECT_HOPS {
            let resp = self
                .client
                .get(&current)
                .timeout(std::time::Duration::from_secs(self.timeout_secs))
                .header("User-Agent", "Mozilla/5.0 (compatible; ConsultResearchBot/1.0)")
                .send()
                .await
                .map_err(|e| ConsultError::CollaboratorUnavailable(e.to_string()))?;

            if resp.status().is_redirection() {
                let location = resp
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let next = url::Url::parse(&current)
                    .and_then(|base| base.join(&location))
                    .map(|u| u.to_string())
                    .unwrap_or(location);
                if !crate::ssrf::is_safe_url(&next).await {
                    return Err(ConsultError::CollaboratorUnavailable(
                        "redirect to unsafe URL blocked".to_string(),
                    ));
                }
                current = next;
                continue;
            }

            response = Some(resp);
            break;
        }

        let resp = response.ok_or_else(|| {
            ConsultError::CollaboratorUnavailable("too many redirects".to_string())
        })?;

        if let Some(len) = resp.content_length() {
            if len as usize > MAX_RESPONSE_BYTES {
                return Err(ConsultError::CollaboratorUnavailable("response too large".to_string()));
            }
        }

        let mut html = resp
            .text()
            .await
            .map_err(|e| ConsultError::CollaboratorUnavailable(e.to_string()))?;
        if html.len() > MAX_RESPONSE_BYTES {
            html.truncate(MAX_RESPONSE_BYTES);
        }

        Ok(crate::website::extract(&current, &html))
    }
}

fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[async_trait]
impl ResearchEngine for HttpResearchEngine {
    async fn research(
        &self,
        website: Option<&str>,
        industry: Option<&str>,
        _company_name: Option<&str>,
    ) -> ResearchResult {
        let mut result = ResearchResult::default();

        if let Some(website) = website {
            match self.fetch_website(website).await {
                Ok(data) => {
                    result.website_data = Some(data);
                    result.sources_used.push("website_parser".to_string());
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = website, "website research failed");
                }
            }
        }

        if industry.is_some() {
            result.confidence_score = if result.has_data() { 0.6 } else { 0.0 };
        }

        result
    }
}
