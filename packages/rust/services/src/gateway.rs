//! Gateway HTTP client implementing all five service contracts.
//!
//! The gateway exposes JSON endpoints under a single base URL; this client
//! maps each contract onto one endpoint, with bearer auth and a per-request
//! timeout so no pipeline phase can stall on a hung call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use brandscan_shared::{AppConfig, BrandScanError, CompanyInfo, Result};

use crate::contracts::{
    ChatCompletion, CompanyLookup, CompletionRequest, EntityStore, PageScraper, ScrapeOptions,
    ScrapedPage, SearchResult, SearchService, SearchType,
};

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("brandscan/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. This is the only hard deadline in the pipeline;
/// every network-bound phase is bounded by it per call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the backend gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GatewayClient {
    /// Build a client from the application config, reading the API key from
    /// the configured environment variable (missing key → unauthenticated).
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = std::env::var(&config.gateway.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(&config.gateway.base_url, api_key)
    }

    /// Build a client against an explicit base URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BrandScanError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(BrandScanError::Network(format!("{url}: HTTP {status}")));
        }
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Wire types private to the gateway protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct PersistResponse {
    id: String,
}

// ---------------------------------------------------------------------------
// Contract implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl SearchService for GatewayClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        search_type: SearchType,
    ) -> Result<Vec<SearchResult>> {
        let path = "/v1/search";
        let body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "search_type": search_type,
        });

        let response = self
            .request(reqwest::Method::POST, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandScanError::Network(format!("{path}: {e}")))?;

        let response = Self::check_status(path, response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| BrandScanError::parse(format!("{path}: invalid response body: {e}")))?;

        debug!(query, hits = parsed.results.len(), "search completed");
        Ok(parsed.results)
    }
}

#[async_trait]
impl CompanyLookup for GatewayClient {
    async fn lookup(&self, domain: &str) -> Result<Option<CompanyInfo>> {
        let path = format!("/v1/companies/{domain}");
        let response = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| BrandScanError::Network(format!("{path}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(domain, "company not found");
            return Ok(None);
        }

        let response = Self::check_status(&path, response).await?;
        let info: CompanyInfo = response
            .json()
            .await
            .map_err(|e| BrandScanError::parse(format!("{path}: invalid response body: {e}")))?;

        Ok(Some(info))
    }
}

#[async_trait]
impl PageScraper for GatewayClient {
    async fn scrape(&self, url: &str, opts: &ScrapeOptions) -> Result<ScrapedPage> {
        let path = "/v1/scrape";
        let body = serde_json::json!({
            "url": url,
            "include_html": opts.include_html,
        });

        let response = self
            .request(reqwest::Method::POST, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandScanError::Network(format!("{url}: {e}")))?;

        let response = Self::check_status(url, response).await?;
        let page: ScrapedPage = response
            .json()
            .await
            .map_err(|e| BrandScanError::parse(format!("{url}: invalid scrape body: {e}")))?;

        if !page.success {
            return Err(BrandScanError::Network(format!("{url}: scrape unsuccessful")));
        }

        Ok(page)
    }
}

#[async_trait]
impl ChatCompletion for GatewayClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let path = "/v1/chat/completions";
        let response = self
            .request(reqwest::Method::POST, path)
            .json(request)
            .send()
            .await
            .map_err(|e| BrandScanError::Completion(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrandScanError::Completion(format!("{path}: HTTP {status}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BrandScanError::parse(format!("{path}: invalid response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BrandScanError::Completion("model returned no choices".into()))
    }
}

#[async_trait]
impl EntityStore for GatewayClient {
    async fn persist(&self, kind: &str, payload: &serde_json::Value) -> Result<String> {
        let path = format!("/v1/entities/{kind}");
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(payload)
            .send()
            .await
            .map_err(|e| BrandScanError::Sync(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrandScanError::Sync(format!("{path}: HTTP {status}")));
        }

        let parsed: PersistResponse = response
            .json()
            .await
            .map_err(|e| BrandScanError::parse(format!("{path}: invalid response body: {e}")))?;

        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GatewayClient {
        GatewayClient::new(&server.uri(), Some("test-key".into())).unwrap()
    }

    #[tokio::test]
    async fn search_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .and(body_partial_json(serde_json::json!({"query": "acme products"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"title": "Acme", "url": "https://acme.com", "snippet": "Makers of anvils"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let hits = client.search("acme products", 5, SearchType::Web).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Acme");
    }

    #[tokio::test]
    async fn lookup_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/companies/unknown.example"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let info = client.lookup("unknown.example").await.unwrap();
        assert!(info.is_none());
    }

    #[tokio::test]
    async fn lookup_parses_company_facts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/companies/acme.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Acme Corp",
                "industry": "Software & Technology",
                "employee_count": 250
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let info = client.lookup("acme.com").await.unwrap().unwrap();
        assert_eq!(info.name.as_deref(), Some("Acme Corp"));
        assert_eq!(info.employee_count, Some(250));
    }

    #[tokio::test]
    async fn scrape_rejects_unsuccessful_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .scrape("https://acme.com/", &ScrapeOptions::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn completion_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "{\"products\":[]}"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let request = CompletionRequest {
            model: "test-model".into(),
            messages: vec![crate::contracts::ChatMessage::user("hi")],
            response_format: crate::contracts::ResponseFormat::JsonObject,
            temperature: 0.5,
        };
        let content = client.complete(&request).await.unwrap();
        assert_eq!(content, "{\"products\":[]}");
    }

    #[tokio::test]
    async fn completion_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let request = CompletionRequest {
            model: "test-model".into(),
            messages: vec![],
            response_format: crate::contracts::ResponseFormat::Text,
            temperature: 0.0,
        };
        let result = client.complete(&request).await;
        assert!(matches!(result, Err(BrandScanError::Completion(_))));
    }

    #[tokio::test]
    async fn persist_returns_entity_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/entities/product"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ent-42"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let id = client
            .persist("product", &serde_json::json!({"name": "Widget"}))
            .await
            .unwrap();
        assert_eq!(id, "ent-42");
    }

    #[tokio::test]
    async fn server_error_is_typed_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.search("q", 5, SearchType::Web).await;
        assert!(matches!(result, Err(BrandScanError::Network(_))));
    }
}
