//! Core domain types for brandscan scans.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of known products kept on a [`BrandContext`].
pub const MAX_KNOWN_PRODUCTS: usize = 20;
/// Maximum number of competitors kept on a [`BrandContext`].
pub const MAX_COMPETITORS: usize = 10;
/// Maximum number of recent news items kept on a [`BrandContext`].
pub const MAX_RECENT_NEWS: usize = 5;

// ---------------------------------------------------------------------------
// ScanId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for scan identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub Uuid);

impl ScanId {
    /// Generate a new time-sortable scan identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Closed enumerations
// ---------------------------------------------------------------------------

/// What kind of business the scanned domain runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessType {
    Saas,
    Ecommerce,
    Service,
    Hybrid,
    Unknown,
}

impl BusinessType {
    /// Parse a free-form label from model output. Anything outside the
    /// closed set maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "saas" => Self::Saas,
            "ecommerce" | "e-commerce" => Self::Ecommerce,
            "service" => Self::Service,
            "hybrid" => Self::Hybrid,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saas => "saas",
            Self::Ecommerce => "ecommerce",
            Self::Service => "service",
            Self::Hybrid => "hybrid",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BusinessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the scanned brand charges for its products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingModel {
    Subscription,
    #[serde(rename = "one-time")]
    OneTime,
    Freemium,
    Usage,
    Enterprise,
    Unknown,
}

impl PricingModel {
    /// Parse a free-form label from model output. Anything outside the
    /// closed set maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "subscription" => Self::Subscription,
            "one-time" | "one_time" | "onetime" => Self::OneTime,
            "freemium" => Self::Freemium,
            "usage" | "usage-based" => Self::Usage,
            "enterprise" => Self::Enterprise,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::OneTime => "one-time",
            Self::Freemium => "freemium",
            Self::Usage => "usage",
            Self::Enterprise => "enterprise",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BrandContext
// ---------------------------------------------------------------------------

/// Company facts from the lookup service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Pre-research summary produced once per scan by the researcher and
/// consumed read-only by every later phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandContext {
    /// Brand name (falls back to the domain when research fails).
    pub name: String,
    /// Normalized target domain, e.g. `example.com`.
    pub domain: String,
    pub business_type: BusinessType,
    /// Known product names, capped at [`MAX_KNOWN_PRODUCTS`].
    pub known_products: Vec<String>,
    pub pricing_model: PricingModel,
    /// Competitor names, capped at [`MAX_COMPETITORS`].
    pub competitors: Vec<String>,
    /// Recent news headlines, capped at [`MAX_RECENT_NEWS`].
    pub recent_news: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_info: Option<CompanyInfo>,
}

impl BrandContext {
    /// The degraded context used when the research phase fails entirely.
    pub fn unknown(domain: &str) -> Self {
        Self {
            name: domain.to_string(),
            domain: domain.to_string(),
            business_type: BusinessType::Unknown,
            known_products: Vec::new(),
            pricing_model: PricingModel::Unknown,
            competitors: Vec::new(),
            recent_news: Vec::new(),
            company_info: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pages and site map
// ---------------------------------------------------------------------------

/// Coarse page category assigned by the URL classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Homepage,
    Pricing,
    Features,
    Products,
    Product,
    About,
    Docs,
    Blog,
    Contact,
    Careers,
    Legal,
    Other,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Pricing => "pricing",
            Self::Features => "features",
            Self::Products => "products",
            Self::Product => "product",
            Self::About => "about",
            Self::Docs => "docs",
            Self::Blog => "blog",
            Self::Contact => "contact",
            Self::Careers => "careers",
            Self::Legal => "legal",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scraped page with its cleaned content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Cleaned markdown content from the scrape service.
    pub markdown: String,
    /// Raw markup, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub page_type: PageType,
    pub scraped_at: DateTime<Utc>,
}

impl PageInfo {
    /// Empty stand-in for a page whose fetch failed, so one bad URL never
    /// aborts a batch.
    pub fn placeholder(url: &str, page_type: PageType) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            markdown: String::new(),
            html: None,
            page_type,
            scraped_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

/// A candidate URL ranked during discovery. Lower priority = more important.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub page_type: PageType,
    pub priority: u32,
    /// Heuristic [0,1] confidence that this URL matters for the brand.
    pub confidence: f64,
}

/// Pages selected and fetched for a single scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMap {
    pub homepage: PageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<PageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<PageInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<PageInfo>,
    /// Full prioritized candidate list, including URLs that were not fetched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_urls: Vec<DiscoveredUrl>,
}

impl SiteMap {
    /// The degraded site map used when the discovery phase fails: just a
    /// homepage placeholder, nothing else.
    pub fn homepage_only(domain: &str) -> Self {
        Self {
            homepage: PageInfo::placeholder(&format!("https://{domain}/"), PageType::Homepage),
            pricing: None,
            features: None,
            about: None,
            products: Vec::new(),
            all_urls: Vec::new(),
        }
    }

    /// All non-empty pages worth extracting, deduplicated by URL.
    pub fn extractable_pages(&self) -> Vec<&PageInfo> {
        let mut seen = std::collections::HashSet::new();
        let mut pages = Vec::new();
        let candidates = std::iter::once(&self.homepage)
            .chain(self.pricing.iter())
            .chain(self.features.iter())
            .chain(self.about.iter())
            .chain(self.products.iter());
        for page in candidates {
            if !page.is_empty() && seen.insert(page.url.as_str()) {
                pages.push(page);
            }
        }
        pages
    }
}

// ---------------------------------------------------------------------------
// Extraction entities
// ---------------------------------------------------------------------------

/// A candidate product pulled from page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductExtraction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Discriminator, e.g. "saas", "physical", "service".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub confidence: f64,
}

/// One tier in an extracted pricing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Billing period, e.g. "month", "year".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// Extracted pricing structure for the whole page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingExtraction {
    /// Model discriminator, matching the [`PricingModel`] labels.
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<PricingTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub confidence: f64,
}

/// A candidate feature pulled from page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtraction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub confidence: f64,
}

/// A marketing asset (image, logo, video) referenced by the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetExtraction {
    pub url: String,
    /// Discriminator, e.g. "image", "logo", "video".
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    pub confidence: f64,
}

/// Structured entities extracted from one page (or merged across pages).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingExtraction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureExtraction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetExtraction>,
    pub confidence: f64,
    pub source_url: String,
}

impl ExtractionResult {
    /// Empty-but-valid result, used when every extraction attempt failed.
    pub fn empty(source_url: &str) -> Self {
        Self {
            products: Vec::new(),
            pricing: None,
            features: Vec::new(),
            assets: Vec::new(),
            confidence: 0.0,
            source_url: source_url.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated entities
// ---------------------------------------------------------------------------

/// A product with its validation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedProduct {
    #[serde(flatten)]
    pub product: ProductExtraction,
    /// Heuristic [0,1] score, clamped.
    pub validation_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_concerns: Vec<String>,
    pub needs_review: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cross_check_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedPricing {
    #[serde(flatten)]
    pub pricing: PricingExtraction,
    pub validation_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFeature {
    #[serde(flatten)]
    pub feature: FeatureExtraction,
    pub validation_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedAsset {
    #[serde(flatten)]
    pub asset: AssetExtraction,
    pub validation_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_concerns: Vec<String>,
}

/// Output of the validation phase over one merged extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedExtraction {
    pub products: Vec<ValidatedProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ValidatedPricing>,
    pub features: Vec<ValidatedFeature>,
    pub assets: Vec<ValidatedAsset>,
    pub confidence: f64,
}

impl ValidatedExtraction {
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            pricing: None,
            features: Vec::new(),
            assets: Vec::new(),
            confidence: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan options and result
// ---------------------------------------------------------------------------

/// How thorough the research phase should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDepth {
    Quick,
    Thorough,
}

impl std::str::FromStr for ScanDepth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "thorough" => Ok(Self::Thorough),
            other => Err(format!("unknown scan depth '{other}'")),
        }
    }
}

/// Caller-facing options for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub depth: ScanDepth,
    pub max_pages: usize,
    /// Target identifier for the sync phase. Sync is skipped without it.
    pub brand_id: Option<String>,
    pub skip_sync: bool,
}

impl ScanOptions {
    /// The `quick_scan` preset: shallow research, 5 pages, no sync.
    pub fn quick() -> Self {
        Self {
            depth: ScanDepth::Quick,
            max_pages: 5,
            brand_id: None,
            skip_sync: true,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            depth: ScanDepth::Thorough,
            max_pages: 10,
            brand_id: None,
            skip_sync: false,
        }
    }
}

/// Wall-clock duration of each pipeline phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseDurations {
    pub research: Duration,
    pub discovery: Duration,
    pub extraction: Duration,
    pub validation: Duration,
    pub sync: Duration,
}

/// Final, immutable result of one orchestrated scan.
#[derive(Debug, Clone)]
pub struct BrandScanResult {
    pub scan_id: ScanId,
    pub brand: BrandContext,
    pub products: Vec<ValidatedProduct>,
    pub pricing: Option<ValidatedPricing>,
    pub features: Vec<ValidatedFeature>,
    pub assets: Vec<ValidatedAsset>,
    pub site_map: SiteMap,
    /// Overall [0,1] confidence from validation.
    pub confidence: f64,
    pub duration: Duration,
    /// Non-fatal diagnostics accumulated across phases.
    pub errors: Vec<String>,
    pub phase_durations: PhaseDurations,
    /// Entities persisted during the sync phase (0 when sync was skipped).
    pub synced_entities: usize,
}
