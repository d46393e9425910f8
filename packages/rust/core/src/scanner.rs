//! The scan orchestrator: research → discovery → extraction → validation
//! → optional sync, each phase timed and individually degradable.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{info, instrument, warn};

use brandscan_discovery::SiteDiscoverer;
use brandscan_extraction::{ContentExtractor, merge};
use brandscan_research::ContextResearcher;
use brandscan_services::{
    ChatCompletion, CompanyLookup, EntityStore, PageScraper, SearchService,
};
use brandscan_shared::{
    AppConfig, BrandContext, BrandScanResult, ExtractionResult, PageInfo, PhaseDurations, Result,
    ScanId, ScanOptions, SiteMap, ValidatedExtraction, normalize_domain,
};
use brandscan_validation::validate;

use crate::progress::{ScanPhase, ScanProgress, SilentProgress};

/// The five service handles a scan consumes.
pub struct ScanServices {
    pub search: Arc<dyn SearchService>,
    pub companies: Arc<dyn CompanyLookup>,
    pub scraper: Arc<dyn PageScraper>,
    pub completion: Arc<dyn ChatCompletion>,
    pub store: Arc<dyn EntityStore>,
}

/// Runs the full brand-intelligence pipeline for one domain at a time.
///
/// No failure escapes [`ScanOrchestrator::scan_brand`]: each phase
/// degrades to its default value and appends a diagnostic to the
/// result's `errors` list instead of aborting the scan.
pub struct ScanOrchestrator {
    researcher: ContextResearcher,
    discoverer: SiteDiscoverer,
    extractor: Arc<ContentExtractor>,
    store: Arc<dyn EntityStore>,
    max_retries: usize,
}

impl ScanOrchestrator {
    pub fn new(services: ScanServices, config: &AppConfig) -> Self {
        let model = config.completion.model.clone();
        let researcher = ContextResearcher::new(
            services.search,
            services.companies,
            services.completion.clone(),
            model.clone(),
        );
        let discoverer = SiteDiscoverer::new(services.scraper).with_batching(
            config.defaults.batch_size,
            std::time::Duration::from_millis(config.defaults.batch_delay_ms),
        );
        let extractor = Arc::new(ContentExtractor::new(services.completion, model));

        Self {
            researcher,
            discoverer,
            extractor,
            store: services.store,
            max_retries: config.defaults.max_retries as usize,
        }
    }

    /// Scan a domain end to end. Always returns a result; partial
    /// failures surface as entries in `result.errors`.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn scan_brand(
        &self,
        domain: &str,
        options: ScanOptions,
        progress: &dyn ScanProgress,
    ) -> BrandScanResult {
        let scan_id = ScanId::new();
        let domain = normalize_domain(domain);
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut phases = PhaseDurations::default();

        // Phase 1: research.
        progress.phase_started(ScanPhase::Research);
        let phase_start = Instant::now();
        let brand = match self.researcher.research(&domain, options.depth).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "research phase failed, using unknown context");
                errors.push(format!("research: {e}"));
                BrandContext::unknown(&domain)
            }
        };
        phases.research = phase_start.elapsed();
        progress.phase_completed(ScanPhase::Research, phases.research);

        // Phase 2: discovery.
        progress.phase_started(ScanPhase::Discovery);
        let phase_start = Instant::now();
        let site_map = match self
            .discoverer
            .discover(&domain, &brand, options.max_pages)
            .await
        {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "discovery phase failed, using homepage-only site map");
                errors.push(format!("discovery: {e}"));
                SiteMap::homepage_only(&domain)
            }
        };
        phases.discovery = phase_start.elapsed();
        progress.phase_completed(ScanPhase::Discovery, phases.discovery);

        // Phase 3: extraction. Per-page failures are absorbed inside the
        // extractor, so this phase cannot fail outright.
        progress.phase_started(ScanPhase::Extraction);
        let phase_start = Instant::now();
        let pages: Vec<PageInfo> = site_map
            .extractable_pages()
            .into_iter()
            .cloned()
            .collect();
        let merged = self.extract_pages(&pages, &brand).await;
        if !pages.is_empty() && merged.confidence == 0.0 {
            errors.push("extraction: no page produced a usable extraction".to_string());
        }
        phases.extraction = phase_start.elapsed();
        progress.phase_completed(ScanPhase::Extraction, phases.extraction);

        // Phase 4: validation (pure, cannot fail).
        progress.phase_started(ScanPhase::Validation);
        let phase_start = Instant::now();
        let validated = validate(&merged, &brand);
        phases.validation = phase_start.elapsed();
        progress.phase_completed(ScanPhase::Validation, phases.validation);

        // Phase 5: sync, explicit opt-in with a target identifier.
        let mut synced_entities = 0;
        if !options.skip_sync {
            if let Some(brand_id) = &options.brand_id {
                progress.phase_started(ScanPhase::Sync);
                let phase_start = Instant::now();
                synced_entities = self
                    .sync_phase(brand_id, &scan_id, &validated, &mut errors)
                    .await;
                phases.sync = phase_start.elapsed();
                progress.phase_completed(ScanPhase::Sync, phases.sync);
            }
        }

        info!(
            %scan_id,
            products = validated.products.len(),
            features = validated.features.len(),
            confidence = validated.confidence,
            errors = errors.len(),
            "scan complete"
        );

        BrandScanResult {
            scan_id,
            brand,
            products: validated.products,
            pricing: validated.pricing,
            features: validated.features,
            assets: validated.assets,
            site_map,
            confidence: validated.confidence,
            duration: started.elapsed(),
            errors,
            phase_durations: phases,
            synced_entities,
        }
    }

    /// The `quick_scan` preset: shallow research, five pages, no sync.
    pub async fn quick_scan(&self, domain: &str) -> BrandScanResult {
        self.scan_brand(domain, ScanOptions::quick(), &SilentProgress)
            .await
    }

    /// Extract all pages concurrently and merge the results. Pages are
    /// already bounded by discovery's `max_pages`, so no further cap is
    /// applied here.
    async fn extract_pages(&self, pages: &[PageInfo], brand: &BrandContext) -> ExtractionResult {
        let mut handles = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let extractor = self.extractor.clone();
            let page = page.clone();
            let context = brand.clone();
            let max_retries = self.max_retries;
            handles.push(tokio::spawn(async move {
                (index, extractor.extract(&page, &context, max_retries).await)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(indexed) => results.push(indexed),
                Err(e) => warn!(error = %e, "extraction task panicked"),
            }
        }
        // Merge in page order so dedup keeps the highest-ranked page's entry.
        results.sort_by_key(|(index, _)| *index);
        merge(results.into_iter().map(|(_, r)| r).collect())
    }

    /// Persist validated entities. Individual failures are collected into
    /// `errors`; the scan still reports success.
    async fn sync_phase(
        &self,
        brand_id: &str,
        scan_id: &ScanId,
        validated: &ValidatedExtraction,
        errors: &mut Vec<String>,
    ) -> usize {
        let mut synced = 0;

        let mut entities: Vec<(&str, Result<serde_json::Value>)> = Vec::new();
        for product in &validated.products {
            entities.push(("product", to_payload(product)));
        }
        if let Some(pricing) = &validated.pricing {
            entities.push(("pricing", to_payload(pricing)));
        }
        for feature in &validated.features {
            entities.push(("feature", to_payload(feature)));
        }
        for asset in &validated.assets {
            entities.push(("asset", to_payload(asset)));
        }

        for (kind, payload) in entities {
            let data = match payload {
                Ok(data) => data,
                Err(e) => {
                    errors.push(format!("sync: serialize {kind}: {e}"));
                    continue;
                }
            };
            let envelope = json!({
                "brand_id": brand_id,
                "scan_id": scan_id.to_string(),
                "data": data,
            });
            match self.store.persist(kind, &envelope).await {
                Ok(id) => {
                    tracing::debug!(kind, id, "entity persisted");
                    synced += 1;
                }
                Err(e) => {
                    warn!(kind, error = %e, "entity persist failed");
                    errors.push(format!("sync: persist {kind}: {e}"));
                }
            }
        }

        synced
    }
}

fn to_payload<T: serde::Serialize>(entity: &T) -> Result<serde_json::Value> {
    serde_json::to_value(entity)
        .map_err(|e| brandscan_shared::BrandScanError::parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brandscan_services::{
        CompletionRequest, ScrapeOptions, ScrapedPage, SearchResult, SearchType,
    };
    use brandscan_shared::{BrandScanError, CompanyInfo};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    // Test doubles -----------------------------------------------------------

    struct FailingSearch;
    #[async_trait]
    impl SearchService for FailingSearch {
        async fn search(&self, _: &str, _: usize, _: SearchType) -> Result<Vec<SearchResult>> {
            Err(BrandScanError::Network("search down".into()))
        }
    }

    struct FixedSearch;
    #[async_trait]
    impl SearchService for FixedSearch {
        async fn search(&self, _: &str, _: usize, _: SearchType) -> Result<Vec<SearchResult>> {
            Ok(vec![SearchResult {
                title: "Acme | Anvil Cloud".into(),
                url: "https://acme.com".into(),
                snippet: "Acme sells Anvil Cloud, a SaaS platform.".into(),
                source: None,
            }])
        }
    }

    struct FailingLookup;
    #[async_trait]
    impl CompanyLookup for FailingLookup {
        async fn lookup(&self, _: &str) -> Result<Option<CompanyInfo>> {
            Err(BrandScanError::Network("lookup down".into()))
        }
    }

    struct EmptyLookup;
    #[async_trait]
    impl CompanyLookup for EmptyLookup {
        async fn lookup(&self, _: &str) -> Result<Option<CompanyInfo>> {
            Ok(None)
        }
    }

    struct FailingScraper;
    #[async_trait]
    impl PageScraper for FailingScraper {
        async fn scrape(&self, url: &str, _: &ScrapeOptions) -> Result<ScrapedPage> {
            Err(BrandScanError::Network(format!("{url}: unreachable")))
        }
    }

    struct MapScraper {
        pages: HashMap<String, String>,
    }
    #[async_trait]
    impl PageScraper for MapScraper {
        async fn scrape(&self, url: &str, _: &ScrapeOptions) -> Result<ScrapedPage> {
            match self.pages.get(url) {
                Some(markdown) => Ok(ScrapedPage {
                    success: true,
                    markdown: markdown.clone(),
                    html: None,
                    title: None,
                }),
                None => Err(BrandScanError::Network(format!("{url}: HTTP 404"))),
            }
        }
    }

    struct FailingCompletion;
    #[async_trait]
    impl ChatCompletion for FailingCompletion {
        async fn complete(&self, _: &CompletionRequest) -> Result<String> {
            Err(BrandScanError::Completion("model down".into()))
        }
    }

    /// Answers the low-temperature analysis call with research JSON and
    /// every other call with extraction JSON.
    struct KeyedCompletion;
    #[async_trait]
    impl ChatCompletion for KeyedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            if request.temperature < 0.3 {
                Ok(r#"{
                    "name": "Acme",
                    "business_type": "saas",
                    "known_products": ["Anvil Cloud"],
                    "pricing_model": "subscription",
                    "competitors": ["Forge Inc"],
                    "recent_news": []
                }"#
                .to_string())
            } else {
                Ok(r#"{
                    "products": [{
                        "name": "Anvil Cloud",
                        "description": "A cloud platform for heavy workloads.",
                        "product_type": "saas",
                        "images": ["https://cdn.acme.com/anvil-hero.png"],
                        "confidence": 0.9
                    }],
                    "pricing": {
                        "model": "subscription",
                        "tiers": [
                            {"name": "Starter", "price": 9, "period": "month", "features": ["basic support"]},
                            {"name": "Pro", "price": 29, "period": "month", "features": ["priority support"]}
                        ],
                        "currency": "USD",
                        "confidence": 0.9
                    },
                    "features": [{"name": "Realtime Sync", "description": "Instant updates.", "confidence": 0.8}],
                    "assets": [],
                    "confidence": 0.9
                }"#
                .to_string())
            }
        }
    }

    struct RecordingStore {
        kinds: Mutex<Vec<String>>,
        fail: bool,
    }
    #[async_trait]
    impl EntityStore for RecordingStore {
        async fn persist(&self, kind: &str, _: &serde_json::Value) -> Result<String> {
            if self.fail {
                return Err(BrandScanError::Sync("store down".into()));
            }
            self.kinds.lock().unwrap().push(kind.to_string());
            Ok(format!("ent_{kind}"))
        }
    }

    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }
    impl ScanProgress for RecordingProgress {
        fn phase_started(&self, phase: ScanPhase) {
            self.events.lock().unwrap().push(format!("start:{phase}"));
        }
        fn phase_completed(&self, phase: ScanPhase, _duration: Duration) {
            self.events.lock().unwrap().push(format!("done:{phase}"));
        }
    }

    // Fixture builders -------------------------------------------------------

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.defaults.batch_delay_ms = 0;
        config
    }

    fn site_pages() -> HashMap<String, String> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://acme.com/".to_string(),
            "# Acme\n[Pricing](/pricing) for Anvil Cloud.".to_string(),
        );
        pages.insert(
            "https://acme.com/pricing".to_string(),
            format!("# Pricing\nStarter $9, Pro $29.\n{}", "filler ".repeat(100)),
        );
        pages
    }

    fn healthy_orchestrator(store: Arc<dyn EntityStore>) -> ScanOrchestrator {
        ScanOrchestrator::new(
            ScanServices {
                search: Arc::new(FixedSearch),
                companies: Arc::new(EmptyLookup),
                scraper: Arc::new(MapScraper {
                    pages: site_pages(),
                }),
                completion: Arc::new(KeyedCompletion),
                store,
            },
            &fast_config(),
        )
    }

    fn broken_orchestrator() -> ScanOrchestrator {
        ScanOrchestrator::new(
            ScanServices {
                search: Arc::new(FailingSearch),
                companies: Arc::new(FailingLookup),
                scraper: Arc::new(FailingScraper),
                completion: Arc::new(FailingCompletion),
                store: Arc::new(RecordingStore {
                    kinds: Mutex::new(Vec::new()),
                    fail: false,
                }),
            },
            &fast_config(),
        )
    }

    // Tests ------------------------------------------------------------------

    #[tokio::test]
    async fn zero_pages_still_completes_with_domain_set() {
        let orchestrator = broken_orchestrator();
        let mut options = ScanOptions::quick();
        options.max_pages = 0;
        let result = orchestrator
            .scan_brand("example.com", options, &SilentProgress)
            .await;
        assert_eq!(result.brand.domain, "example.com");
        assert!(result.site_map.all_urls.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn every_service_failing_degrades_without_panicking() {
        let orchestrator = broken_orchestrator();
        let result = orchestrator.quick_scan("example.com").await;
        assert_eq!(result.brand.domain, "example.com");
        assert!(result.products.is_empty());
        // Discovery could not even reach the homepage.
        assert!(result.errors.iter().any(|e| e.starts_with("discovery:")));
        assert_eq!(result.synced_entities, 0);
    }

    #[tokio::test]
    async fn happy_path_produces_validated_entities() {
        let orchestrator = healthy_orchestrator(Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        }));
        let result = orchestrator.quick_scan("acme.com").await;

        assert_eq!(result.brand.name, "Acme");
        assert_eq!(result.products.len(), 1);
        assert_eq!(result.products[0].product.name, "Anvil Cloud");
        assert!(!result.products[0].needs_review);
        let pricing = result.pricing.expect("pricing validated");
        assert_eq!(pricing.pricing.tiers.len(), 2);
        assert!(result.confidence > 0.6);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn domain_input_is_normalized() {
        let orchestrator = healthy_orchestrator(Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        }));
        let result = orchestrator.quick_scan("https://www.ACME.com/about").await;
        assert_eq!(result.brand.domain, "acme.com");
    }

    #[tokio::test]
    async fn sync_persists_entities_when_opted_in() {
        let store = Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        });
        let orchestrator = healthy_orchestrator(store.clone());
        let options = ScanOptions {
            brand_id: Some("brand_123".into()),
            skip_sync: false,
            ..ScanOptions::quick()
        };
        let result = orchestrator
            .scan_brand("acme.com", options, &SilentProgress)
            .await;

        // One product, one pricing, one feature.
        assert_eq!(result.synced_entities, 3);
        let kinds = store.kinds.lock().unwrap().clone();
        assert!(kinds.contains(&"product".to_string()));
        assert!(kinds.contains(&"pricing".to_string()));
        assert!(kinds.contains(&"feature".to_string()));
    }

    #[tokio::test]
    async fn sync_requires_brand_id() {
        let store = Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        });
        let orchestrator = healthy_orchestrator(store.clone());
        let options = ScanOptions {
            brand_id: None,
            skip_sync: false,
            ..ScanOptions::quick()
        };
        let result = orchestrator
            .scan_brand("acme.com", options, &SilentProgress)
            .await;
        assert_eq!(result.synced_entities, 0);
        assert!(store.kinds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_failures_are_collected_not_fatal() {
        let orchestrator = healthy_orchestrator(Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: true,
        }));
        let options = ScanOptions {
            brand_id: Some("brand_123".into()),
            skip_sync: false,
            ..ScanOptions::quick()
        };
        let result = orchestrator
            .scan_brand("acme.com", options, &SilentProgress)
            .await;
        assert_eq!(result.synced_entities, 0);
        assert!(result.errors.iter().any(|e| e.starts_with("sync:")));
        // The scan itself still succeeded.
        assert_eq!(result.products.len(), 1);
    }

    #[tokio::test]
    async fn progress_observes_phases_in_order() {
        let progress = RecordingProgress {
            events: Mutex::new(Vec::new()),
        };
        let orchestrator = healthy_orchestrator(Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        }));
        orchestrator
            .scan_brand("acme.com", ScanOptions::quick(), &progress)
            .await;

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start:research",
                "done:research",
                "start:discovery",
                "done:discovery",
                "start:extraction",
                "done:extraction",
                "start:validation",
                "done:validation",
            ]
        );
    }

    #[tokio::test]
    async fn phase_durations_are_recorded() {
        let orchestrator = healthy_orchestrator(Arc::new(RecordingStore {
            kinds: Mutex::new(Vec::new()),
            fail: false,
        }));
        let result = orchestrator.quick_scan("acme.com").await;
        let phases = result.phase_durations;
        assert!(result.duration >= phases.research);
        // Sync was skipped, so its slot stays zero.
        assert_eq!(phases.sync, Duration::ZERO);
    }
}
