//! Adaptive site discovery.
//!
//! Starting from the homepage, the discoverer extracts internal links,
//! probes business-type-specific common paths, re-scores everything with
//! the brand context, and fetches the top URLs in bounded concurrent
//! batches into a [`SiteMap`].

pub mod classifier;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use brandscan_services::{PageScraper, ScrapeOptions, ScrapedPage};
use brandscan_shared::{
    BrandContext, BusinessType, DiscoveredUrl, PageInfo, PageType, Result, SiteMap,
};

pub use classifier::{LOWEST_PRIORITY, classify};

/// A probe only counts as "found" above this content length. Filters
/// soft-404s and placeholder pages.
const MIN_PROBE_CONTENT_LEN: usize = 500;

/// Default number of pages scraped concurrently per batch.
const DEFAULT_BATCH_SIZE: usize = 5;

/// Default pause between scrape batches.
const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Discovers and fetches the pages most worth extracting for a brand.
pub struct SiteDiscoverer {
    scraper: Arc<dyn PageScraper>,
    batch_size: usize,
    batch_delay: Duration,
}

impl SiteDiscoverer {
    pub fn new(scraper: Arc<dyn PageScraper>) -> Self {
        Self {
            scraper,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    /// Override batch size and inter-batch delay.
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    /// Discover a domain into a [`SiteMap`], fetching at most `max_pages`
    /// pages beyond the homepage. Fails only if the homepage itself cannot
    /// be scraped; individual page failures degrade to placeholders.
    #[instrument(skip_all, fields(domain = %domain, max_pages))]
    pub async fn discover(
        &self,
        domain: &str,
        context: &BrandContext,
        max_pages: usize,
    ) -> Result<SiteMap> {
        let homepage_url = format!("https://{domain}/");
        let scraped = self
            .scraper
            .scrape(&homepage_url, &ScrapeOptions { include_html: true })
            .await?;
        let homepage = page_info(&homepage_url, PageType::Homepage, scraped);

        if max_pages == 0 {
            return Ok(SiteMap {
                homepage,
                pricing: None,
                features: None,
                about: None,
                products: Vec::new(),
                all_urls: Vec::new(),
            });
        }

        // Two independent link-extraction passes, merged and deduplicated.
        let mut links = extract_markdown_links(&homepage.markdown);
        if let Some(html) = &homepage.html {
            links.extend(extract_html_links(html));
        }
        let internal = internal_urls(domain, &homepage_url, &links);
        debug!(raw = links.len(), internal = internal.len(), "homepage links extracted");

        // Probe common paths for the business type; keep found pages so we
        // don't scrape them twice.
        let (probe_urls, mut probe_cache) = self.probe_common_paths(domain, context).await;

        let mut candidates: Vec<DiscoveredUrl> = Vec::new();
        let mut seen = HashSet::new();
        for url in internal.into_iter().chain(probe_urls) {
            if !seen.insert(url.clone()) {
                continue;
            }
            let (page_type, priority) = classify(&url);
            if page_type == PageType::Homepage {
                continue;
            }
            candidates.push(rescore(
                DiscoveredUrl {
                    url,
                    page_type,
                    priority,
                    confidence: 0.5,
                },
                context,
            ));
        }

        // Stable sort: ties keep discovery order.
        candidates.sort_by_key(|c| c.priority);

        let to_fetch: Vec<DiscoveredUrl> = candidates.iter().take(max_pages).cloned().collect();
        let fetched = self.fetch_batched(&to_fetch, &mut probe_cache).await;

        info!(
            candidates = candidates.len(),
            fetched = fetched.len(),
            "discovery complete"
        );

        Ok(assemble_site_map(homepage, fetched, candidates))
    }

    /// Probe business-type common paths concurrently. Returns the URLs
    /// that responded with real content, plus their already-scraped pages.
    async fn probe_common_paths(
        &self,
        domain: &str,
        context: &BrandContext,
    ) -> (Vec<String>, HashMap<String, PageInfo>) {
        let paths = common_paths(context.business_type);
        let mut found = Vec::new();
        let mut cache = HashMap::new();

        for chunk in paths.chunks(self.batch_size) {
            let mut handles = Vec::new();
            for path in chunk {
                let url = format!("https://{domain}{path}");
                let scraper = self.scraper.clone();
                handles.push(tokio::spawn(async move {
                    let result = scraper.scrape(&url, &ScrapeOptions::default()).await;
                    (url, result)
                }));
            }
            for handle in handles {
                let Ok((url, result)) = handle.await else {
                    continue;
                };
                match result {
                    Ok(page) if page.markdown.len() > MIN_PROBE_CONTENT_LEN => {
                        debug!(%url, len = page.markdown.len(), "probe found");
                        let (page_type, _) = classify(&url);
                        cache.insert(url.clone(), page_info(&url, page_type, page));
                        found.push(url);
                    }
                    Ok(_) => debug!(%url, "probe content too short, skipping"),
                    Err(e) => debug!(%url, error = %e, "probe failed"),
                }
            }
            if self.batch_delay > Duration::ZERO {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        (found, cache)
    }

    /// Fetch ranked URLs in fixed-size concurrent batches. A failed fetch
    /// yields a placeholder page instead of aborting the batch.
    async fn fetch_batched(
        &self,
        to_fetch: &[DiscoveredUrl],
        probe_cache: &mut HashMap<String, PageInfo>,
    ) -> Vec<PageInfo> {
        let mut pages = Vec::new();
        let pending: Vec<&DiscoveredUrl> = to_fetch
            .iter()
            .filter(|d| {
                if let Some(cached) = probe_cache.remove(&d.url) {
                    pages.push(cached);
                    false
                } else {
                    true
                }
            })
            .collect();

        for chunk in pending.chunks(self.batch_size) {
            let mut handles = Vec::new();
            for discovered in chunk {
                let url = discovered.url.clone();
                let page_type = discovered.page_type;
                let scraper = self.scraper.clone();
                handles.push(tokio::spawn(async move {
                    match scraper.scrape(&url, &ScrapeOptions::default()).await {
                        Ok(scraped) => page_info(&url, page_type, scraped),
                        Err(e) => {
                            warn!(%url, error = %e, "page fetch failed, using placeholder");
                            PageInfo::placeholder(&url, page_type)
                        }
                    }
                }));
            }
            for handle in handles {
                match handle.await {
                    Ok(page) => pages.push(page),
                    Err(e) => warn!(error = %e, "fetch task panicked"),
                }
            }
            if self.batch_delay > Duration::ZERO {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        pages
    }
}

// ---------------------------------------------------------------------------
// Link extraction
// ---------------------------------------------------------------------------

/// Pull link targets out of rendered markdown.
fn extract_markdown_links(markdown: &str) -> Vec<String> {
    use std::sync::LazyLock;
    static MD_LINK: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").expect("static pattern"));

    MD_LINK
        .captures_iter(markdown)
        .map(|c| c[1].to_string())
        .collect()
}

/// Pull `a[href]` targets out of raw markup.
fn extract_html_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(String::from)
        .collect()
}

/// Resolve raw link targets against the homepage and keep only internal
/// http(s) URLs. A link is internal if relative, or its hostname (minus
/// `www.`) equals the target domain.
fn internal_urls(domain: &str, base_url: &str, links: &[String]) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for link in links {
        let trimmed = link.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("mailto:")
            || trimmed.starts_with("tel:")
            || trimmed.starts_with("javascript:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(trimmed) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        let host = resolved.host_str().unwrap_or("");
        if host.strip_prefix("www.").unwrap_or(host) != domain {
            continue;
        }

        resolved.set_fragment(None);
        let url = resolved.to_string();
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Context-driven scoring
// ---------------------------------------------------------------------------

/// Common paths worth probing, by business type.
fn common_paths(business_type: BusinessType) -> Vec<&'static str> {
    const SAAS: &[&str] = &[
        "/pricing",
        "/platform",
        "/features",
        "/product",
        "/solutions",
        "/integrations",
        "/docs",
    ];
    const ECOMMERCE: &[&str] = &["/shop", "/collections", "/products", "/store", "/catalog", "/sale"];
    const SERVICE: &[&str] = &["/services", "/about", "/case-studies", "/portfolio", "/contact"];
    const GENERIC: &[&str] = &["/pricing", "/products", "/features", "/about", "/services"];

    match business_type {
        BusinessType::Saas => SAAS.to_vec(),
        BusinessType::Ecommerce => ECOMMERCE.to_vec(),
        BusinessType::Service => SERVICE.to_vec(),
        BusinessType::Hybrid => {
            let mut paths = SAAS.to_vec();
            for p in ECOMMERCE {
                if !paths.contains(p) {
                    paths.push(p);
                }
            }
            paths
        }
        BusinessType::Unknown => GENERIC.to_vec(),
    }
}

/// Whether a page category is the kind this business type cares about most.
fn type_aligned(business_type: BusinessType, page_type: PageType) -> bool {
    match business_type {
        BusinessType::Saas => matches!(
            page_type,
            PageType::Pricing | PageType::Features | PageType::Docs
        ),
        BusinessType::Ecommerce => matches!(page_type, PageType::Products | PageType::Product),
        BusinessType::Service => matches!(page_type, PageType::Features | PageType::About),
        BusinessType::Hybrid => matches!(
            page_type,
            PageType::Pricing | PageType::Features | PageType::Products | PageType::Product
        ),
        BusinessType::Unknown => false,
    }
}

/// Re-score a discovered URL using the brand context. Lower priority is
/// more important; confidence grows with each signal.
fn rescore(mut discovered: DiscoveredUrl, context: &BrandContext) -> DiscoveredUrl {
    if type_aligned(context.business_type, discovered.page_type) {
        discovered.priority = discovered.priority.saturating_sub(1);
        discovered.confidence += 0.2;
    }

    let url_normalized = normalize_for_match(&discovered.url);
    if context
        .known_products
        .iter()
        .map(|p| normalize_for_match(p))
        .any(|p| !p.is_empty() && url_normalized.contains(&p))
    {
        discovered.priority = discovered.priority.saturating_sub(2);
        discovered.confidence += 0.3;
    }

    discovered.confidence = discovered.confidence.clamp(0.0, 1.0);
    discovered
}

/// Lowercase alphanumerics only, for product-name-in-URL containment.
fn normalize_for_match(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Site map assembly
// ---------------------------------------------------------------------------

fn assemble_site_map(
    homepage: PageInfo,
    fetched: Vec<PageInfo>,
    all_urls: Vec<DiscoveredUrl>,
) -> SiteMap {
    let first_of = |page_type: PageType| {
        fetched
            .iter()
            .find(|p| p.page_type == page_type && !p.is_empty())
            .cloned()
    };

    let products = fetched
        .iter()
        .filter(|p| matches!(p.page_type, PageType::Products | PageType::Product) && !p.is_empty())
        .cloned()
        .collect();

    SiteMap {
        homepage,
        pricing: first_of(PageType::Pricing),
        features: first_of(PageType::Features),
        about: first_of(PageType::About),
        products,
        all_urls,
    }
}

fn page_info(url: &str, page_type: PageType, scraped: ScrapedPage) -> PageInfo {
    PageInfo {
        url: url.to_string(),
        title: scraped.title,
        markdown: scraped.markdown,
        html: scraped.html,
        page_type,
        scraped_at: Utc::now(),
    }
}
