//! Combining per-page extraction results into one result per scan.

use std::collections::HashSet;

use tracing::debug;

use brandscan_shared::ExtractionResult;

/// Merge per-page extractions, keeping first-seen entries.
///
/// Products and features deduplicate by case-insensitive trimmed name,
/// assets by exact URL. When several pages produced a pricing structure,
/// the one with the highest reported confidence wins. The overall
/// confidence is the mean of all non-zero per-result confidences.
pub fn merge(results: Vec<ExtractionResult>) -> ExtractionResult {
    let source_url = results
        .first()
        .map(|r| r.source_url.clone())
        .unwrap_or_default();

    let mut merged = ExtractionResult::empty(&source_url);

    let mut product_names = HashSet::new();
    let mut feature_names = HashSet::new();
    let mut asset_urls = HashSet::new();
    let mut confidences = Vec::new();

    for result in results {
        if result.confidence > 0.0 {
            confidences.push(result.confidence);
        }

        for product in result.products {
            if product_names.insert(name_key(&product.name)) {
                merged.products.push(product);
            }
        }
        for feature in result.features {
            if feature_names.insert(name_key(&feature.name)) {
                merged.features.push(feature);
            }
        }
        for asset in result.assets {
            if asset_urls.insert(asset.url.clone()) {
                merged.assets.push(asset);
            }
        }
        if let Some(pricing) = result.pricing {
            let better = merged
                .pricing
                .as_ref()
                .is_none_or(|kept| pricing.confidence > kept.confidence);
            if better {
                merged.pricing = Some(pricing);
            }
        }
    }

    merged.confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    debug!(
        products = merged.products.len(),
        features = merged.features.len(),
        assets = merged.assets.len(),
        confidence = merged.confidence,
        "extractions merged"
    );

    merged
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
