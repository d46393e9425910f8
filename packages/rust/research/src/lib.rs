//! Pre-scan brand research.
//!
//! Builds a [`BrandContext`] for a domain by running a web search and a
//! company lookup concurrently, then reducing both with a single LLM
//! analysis call. Every later phase consumes the context read-only.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use brandscan_services::{
    ChatCompletion, ChatMessage, CompanyLookup, CompletionRequest, ResponseFormat, SearchResult,
    SearchService, SearchType,
};
use brandscan_shared::{
    BrandContext, BusinessType, CompanyInfo, PricingModel, Result, ScanDepth, types,
};

/// Temperature for the analysis call — low, we want consistent structure.
const ANALYSIS_TEMPERATURE: f64 = 0.2;

/// Researches a domain into a [`BrandContext`].
pub struct ContextResearcher {
    search: Arc<dyn SearchService>,
    companies: Arc<dyn CompanyLookup>,
    completion: Arc<dyn ChatCompletion>,
    model: String,
}

impl ContextResearcher {
    pub fn new(
        search: Arc<dyn SearchService>,
        companies: Arc<dyn CompanyLookup>,
        completion: Arc<dyn ChatCompletion>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            search,
            companies,
            completion,
            model: model.into(),
        }
    }

    /// Research a domain. Search and lookup run concurrently; a failure in
    /// either degrades to "no data" rather than failing the phase. An LLM
    /// failure falls back to rule-based inference from the company industry.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn research(&self, domain: &str, depth: ScanDepth) -> Result<BrandContext> {
        let max_results = match depth {
            ScanDepth::Quick => 5,
            ScanDepth::Thorough => 10,
        };
        let query = format!("{domain} company products pricing");

        let (search_result, lookup_result) = tokio::join!(
            self.search.search(&query, max_results, SearchType::Web),
            self.companies.lookup(domain),
        );

        let hits = match search_result {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "web search failed, continuing without results");
                Vec::new()
            }
        };

        let company = match lookup_result {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "company lookup failed, continuing without data");
                None
            }
        };

        let context = match self.analyze(domain, &hits, company.as_ref()).await {
            Ok(mut context) => {
                context.company_info = company;
                context
            }
            Err(e) => {
                warn!(error = %e, "analysis call failed, using rule-based fallback");
                fallback_context(domain, company)
            }
        };

        info!(
            business_type = %context.business_type,
            pricing_model = %context.pricing_model,
            known_products = context.known_products.len(),
            competitors = context.competitors.len(),
            "research complete"
        );

        Ok(context)
    }

    /// Reduce search hits and company facts into a context with one
    /// JSON-mode completion call.
    async fn analyze(
        &self,
        domain: &str,
        hits: &[SearchResult],
        company: Option<&CompanyInfo>,
    ) -> Result<BrandContext> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are a brand research analyst. Given web search results and \
                     company data for a domain, summarize what the business is. \
                     Respond with only a JSON object.",
                ),
                ChatMessage::user(build_analysis_prompt(domain, hits, company)),
            ],
            response_format: ResponseFormat::JsonObject,
            temperature: ANALYSIS_TEMPERATURE,
        };

        let raw = self.completion.complete(&request).await?;
        parse_analysis(domain, &raw)
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

fn build_analysis_prompt(
    domain: &str,
    hits: &[SearchResult],
    company: Option<&CompanyInfo>,
) -> String {
    let mut prompt = format!("Domain under research: {domain}\n\nWeb search results:\n");

    if hits.is_empty() {
        prompt.push_str("(none)\n");
    }
    for hit in hits {
        prompt.push_str(&format!("- {} — {}\n  {}\n", hit.title, hit.url, hit.snippet));
    }

    prompt.push_str("\nCompany data:\n");
    match company {
        Some(info) => {
            if let Some(name) = &info.name {
                prompt.push_str(&format!("- name: {name}\n"));
            }
            if let Some(industry) = &info.industry {
                prompt.push_str(&format!("- industry: {industry}\n"));
            }
            if let Some(description) = &info.description {
                prompt.push_str(&format!("- description: {description}\n"));
            }
            if let Some(count) = info.employee_count {
                prompt.push_str(&format!("- employees: {count}\n"));
            }
        }
        None => prompt.push_str("(not available)\n"),
    }

    prompt.push_str(
        "\nReturn a JSON object with these keys:\n\
         - name: the brand name\n\
         - business_type: one of saas, ecommerce, service, hybrid, unknown\n\
         - known_products: array of product names actually sold by this brand\n\
         - pricing_model: one of subscription, one-time, freemium, usage, enterprise, unknown\n\
         - competitors: array of competitor brand names\n\
         - recent_news: array of recent news headlines about the brand\n\
         Only include facts supported by the input. Use \"unknown\" when unsure.",
    );

    prompt
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse the analysis response. Enum fields are validated against the
/// closed sets (invalid labels map to `unknown`); list fields are capped.
fn parse_analysis(domain: &str, raw: &str) -> Result<BrandContext> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| brandscan_shared::BrandScanError::parse(format!("analysis JSON: {e}")))?;

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(domain)
        .to_string();

    let business_type = value
        .get("business_type")
        .and_then(Value::as_str)
        .map(BusinessType::from_label)
        .unwrap_or(BusinessType::Unknown);

    let pricing_model = value
        .get("pricing_model")
        .and_then(Value::as_str)
        .map(PricingModel::from_label)
        .unwrap_or(PricingModel::Unknown);

    Ok(BrandContext {
        name,
        domain: domain.to_string(),
        business_type,
        known_products: string_list(&value, "known_products", types::MAX_KNOWN_PRODUCTS),
        pricing_model,
        competitors: string_list(&value, "competitors", types::MAX_COMPETITORS),
        recent_news: string_list(&value, "recent_news", types::MAX_RECENT_NEWS),
        company_info: None,
    })
}

/// Extract a bounded list of non-empty strings from a JSON field.
fn string_list(value: &Value, key: &str, cap: usize) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}

/// Models sometimes wrap JSON in a markdown fence despite JSON mode.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

// ---------------------------------------------------------------------------
// Rule-based fallback
// ---------------------------------------------------------------------------

/// Context built without the model: business type inferred from the
/// company industry string, empty products and competitors.
fn fallback_context(domain: &str, company: Option<CompanyInfo>) -> BrandContext {
    let business_type = company
        .as_ref()
        .and_then(|c| c.industry.as_deref())
        .map(infer_business_type)
        .unwrap_or(BusinessType::Unknown);

    let name = company
        .as_ref()
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| domain.to_string());

    BrandContext {
        name,
        domain: domain.to_string(),
        business_type,
        known_products: Vec::new(),
        pricing_model: PricingModel::Unknown,
        competitors: Vec::new(),
        recent_news: Vec::new(),
        company_info: company,
    }
}

/// Keyword containment against known industry lists.
fn infer_business_type(industry: &str) -> BusinessType {
    const SAAS: &[&str] = &["software", "technology", "saas", "internet", "information"];
    const ECOMMERCE: &[&str] = &["retail", "ecommerce", "e-commerce", "consumer goods"];
    const SERVICE: &[&str] = &["consulting", "agency", "professional services", "services"];

    let lower = industry.to_lowercase();
    if SAAS.iter().any(|k| lower.contains(k)) {
        BusinessType::Saas
    } else if ECOMMERCE.iter().any(|k| lower.contains(k)) {
        BusinessType::Ecommerce
    } else if SERVICE.iter().any(|k| lower.contains(k)) {
        BusinessType::Service
    } else {
        BusinessType::Unknown
    }
}
