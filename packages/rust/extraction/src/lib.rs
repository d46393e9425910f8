//! LLM-based content extraction with a bounded focused-retry loop.
//!
//! The first attempt uses a broad, higher-temperature prompt to favor
//! recall. When that comes back low-confidence or errors out, remaining
//! retries switch to a focused, lower-temperature prompt scoped to the
//! page's dominant entity kind. Exhausting the budget never raises: the
//! caller gets the last parsed result, or an empty one.

pub mod merger;
pub mod prompt;
pub mod schema;

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use brandscan_services::{ChatCompletion, ChatMessage, CompletionRequest, ResponseFormat};
use brandscan_shared::{BrandContext, ExtractionResult, PageInfo, Result};

pub use merger::merge;

/// First-pass temperature, tuned for recall.
pub const BROAD_TEMPERATURE: f64 = 0.5;
/// Retry temperature, tuned for precision.
pub const FOCUSED_TEMPERATURE: f64 = 0.3;
/// Results below this confidence trigger a focused retry while budget remains.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Which prompt the current attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    /// Everything at once, higher temperature.
    Broad,
    /// Dominant entity kind only, lower temperature.
    Focused,
}

impl PromptStrategy {
    pub fn temperature(self) -> f64 {
        match self {
            Self::Broad => BROAD_TEMPERATURE,
            Self::Focused => FOCUSED_TEMPERATURE,
        }
    }
}

/// Extracts structured entities from one page via the completion service.
pub struct ContentExtractor {
    completion: Arc<dyn ChatCompletion>,
    model: String,
}

impl ContentExtractor {
    pub fn new(completion: Arc<dyn ChatCompletion>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    /// Extract entities from a page. `max_retries` bounds the number of
    /// focused re-attempts after the initial broad pass. Never returns an
    /// error to the caller: every failure path degrades to the last
    /// parsed result or [`ExtractionResult::empty`].
    #[instrument(skip_all, fields(url = %page.url, page_type = %page.page_type))]
    pub async fn extract(
        &self,
        page: &PageInfo,
        context: &BrandContext,
        max_retries: usize,
    ) -> ExtractionResult {
        let mut strategy = PromptStrategy::Broad;
        let mut budget = max_retries;
        let mut last_parsed: Option<ExtractionResult> = None;

        loop {
            match self.attempt(page, context, strategy).await {
                Ok(result) => {
                    if result.confidence >= LOW_CONFIDENCE_THRESHOLD {
                        debug!(confidence = result.confidence, ?strategy, "extraction accepted");
                        return result;
                    }
                    if budget == 0 {
                        debug!(
                            confidence = result.confidence,
                            "retry budget spent, returning low-confidence result"
                        );
                        return result;
                    }
                    warn!(
                        confidence = result.confidence,
                        remaining = budget,
                        "low-confidence extraction, retrying focused"
                    );
                    last_parsed = Some(result);
                }
                Err(e) => {
                    if budget == 0 {
                        warn!(error = %e, "extraction failed with no budget left");
                        return last_parsed
                            .unwrap_or_else(|| ExtractionResult::empty(&page.url));
                    }
                    warn!(error = %e, remaining = budget, "extraction attempt failed, retrying focused");
                }
            }

            budget -= 1;
            strategy = PromptStrategy::Focused;
        }
    }

    async fn attempt(
        &self,
        page: &PageInfo,
        context: &BrandContext,
        strategy: PromptStrategy,
    ) -> Result<ExtractionResult> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompt::system_prompt(strategy)),
                ChatMessage::user(prompt::user_prompt(page, context, strategy)),
            ],
            response_format: ResponseFormat::JsonObject,
            temperature: strategy.temperature(),
        };

        let raw = self.completion.complete(&request).await?;
        schema::parse_extraction(&raw, &page.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brandscan_shared::{BrandScanError, PageType};
    use chrono::Utc;
    use std::sync::Mutex;

    /// Completion that replays a scripted sequence of responses and
    /// records each request it saw.
    struct ScriptedCompletion {
        responses: Mutex<Vec<Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn temperatures(&self) -> Vec<f64> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.temperature)
                .collect()
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(BrandScanError::Completion("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn page() -> PageInfo {
        PageInfo {
            url: "https://acme.com/pricing".into(),
            title: Some("Pricing".into()),
            markdown: "# Pricing\nStarter $9, Pro $29.".into(),
            html: None,
            page_type: PageType::Pricing,
            scraped_at: Utc::now(),
        }
    }

    fn ok_response(confidence: f64) -> Result<String> {
        Ok(format!(
            r#"{{"products": [{{"name": "Pro", "confidence": {confidence}}}], "confidence": {confidence}}}"#
        ))
    }

    #[tokio::test]
    async fn confident_first_pass_needs_no_retry() {
        let completion = Arc::new(ScriptedCompletion::new(vec![ok_response(0.9)]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 2)
            .await;
        assert_eq!(result.confidence, 0.9);
        assert_eq!(completion.temperatures(), vec![BROAD_TEMPERATURE]);
    }

    #[tokio::test]
    async fn low_confidence_triggers_focused_retry() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ok_response(0.2),
            ok_response(0.8),
        ]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 2)
            .await;
        assert_eq!(result.confidence, 0.8);
        assert_eq!(
            completion.temperatures(),
            vec![BROAD_TEMPERATURE, FOCUSED_TEMPERATURE]
        );
    }

    #[tokio::test]
    async fn call_error_also_takes_the_focused_path() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Err(BrandScanError::Completion("upstream 500".into())),
            ok_response(0.7),
        ]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 1)
            .await;
        assert_eq!(result.confidence, 0.7);
        assert_eq!(
            completion.temperatures(),
            vec![BROAD_TEMPERATURE, FOCUSED_TEMPERATURE]
        );
    }

    #[tokio::test]
    async fn every_attempt_failing_yields_empty_result() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Err(BrandScanError::Completion("boom".into())),
            Err(BrandScanError::Completion("boom".into())),
            Err(BrandScanError::Completion("boom".into())),
        ]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 2)
            .await;
        assert!(result.products.is_empty());
        assert!(result.pricing.is_none());
        assert!(result.features.is_empty());
        assert!(result.assets.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source_url, "https://acme.com/pricing");
        // Budget of 2 means exactly three calls total.
        assert_eq!(completion.temperatures().len(), 3);
    }

    #[tokio::test]
    async fn spent_budget_returns_last_low_confidence_result() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ok_response(0.2),
            ok_response(0.3),
        ]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 1)
            .await;
        // Low confidence but parsed: returned as-is, not emptied.
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.products.len(), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Err(
            BrandScanError::Completion("boom".into()),
        )]));
        let extractor = ContentExtractor::new(completion.clone(), "test-model");
        let result = extractor
            .extract(&page(), &BrandContext::unknown("acme.com"), 0)
            .await;
        assert_eq!(result.confidence, 0.0);
        assert_eq!(completion.temperatures().len(), 1);
    }
}
