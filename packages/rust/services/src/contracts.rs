//! Trait contracts and request/response value types for the five
//! services the pipeline consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use brandscan_shared::{CompanyInfo, Result};

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One hit from the web-search service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Which search index to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Web,
    News,
}

/// Web-search contract.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        search_type: SearchType,
    ) -> Result<Vec<SearchResult>>;
}

// ---------------------------------------------------------------------------
// Company lookup
// ---------------------------------------------------------------------------

/// Company-data lookup contract. `Ok(None)` means the domain is unknown
/// to the data provider — callers treat that as "no data", not an error.
#[async_trait]
pub trait CompanyLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Option<CompanyInfo>>;
}

// ---------------------------------------------------------------------------
// Page scraping
// ---------------------------------------------------------------------------

/// Options for a single scrape call.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScrapeOptions {
    /// Also return the raw markup alongside cleaned markdown.
    pub include_html: bool,
}

/// Response from the scrape service.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedPage {
    pub success: bool,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Page-scraping contract.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str, opts: &ScrapeOptions) -> Result<ScrapedPage>;
}

// ---------------------------------------------------------------------------
// Chat completion
// ---------------------------------------------------------------------------

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Requested response shape for a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub temperature: f64,
}

/// Chat-completion contract. Returns the first choice's message content.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Entity persistence
// ---------------------------------------------------------------------------

/// Durable persistence contract, used only by the optional sync phase.
/// Returns the stored entity's identifier.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn persist(&self, kind: &str, payload: &serde_json::Value) -> Result<String>;
}
