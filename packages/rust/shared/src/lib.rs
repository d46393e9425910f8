//! Shared types, error model, and configuration for brandscan.
//!
//! This crate is the foundation depended on by all other brandscan crates.
//! It provides:
//! - [`BrandScanError`] — the unified error type
//! - Domain types ([`BrandContext`], [`SiteMap`], [`ExtractionResult`],
//!   [`BrandScanResult`], [`ScanId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;
pub mod util;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DefaultsConfig, GatewayConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{BrandScanError, Result};
pub use types::{
    AssetExtraction, BrandContext, BrandScanResult, BusinessType, CompanyInfo, DiscoveredUrl,
    ExtractionResult, FeatureExtraction, MAX_COMPETITORS, MAX_KNOWN_PRODUCTS, MAX_RECENT_NEWS,
    PageInfo, PageType, PhaseDurations, PricingExtraction, PricingModel, PricingTier,
    ProductExtraction, ScanDepth, ScanId, ScanOptions, SiteMap, ValidatedAsset,
    ValidatedExtraction, ValidatedFeature, ValidatedPricing, ValidatedProduct,
};
pub use util::{is_junk_image_url, normalize_domain, truncate_content};
