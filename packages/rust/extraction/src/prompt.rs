//! Prompt construction for content extraction.
//!
//! The broad prompt asks for everything at once; the focused prompt
//! narrows to the page's dominant entity kind when the first pass comes
//! back low-confidence or errors out.

use brandscan_shared::{BrandContext, PageInfo, PageType, truncate_content};

use crate::PromptStrategy;

/// Page content is capped before embedding in the prompt.
pub const MAX_CONTENT_CHARS: usize = 25_000;

pub fn system_prompt(strategy: PromptStrategy) -> String {
    let scope = match strategy {
        PromptStrategy::Broad => {
            "Extract products, pricing, features, and marketing assets from the page."
        }
        PromptStrategy::Focused => {
            "Extract ONLY the single entity kind you are asked for. Ignore everything else on the page."
        }
    };
    format!(
        "You are a brand intelligence analyst. {scope} \
         Only report entities that are actually present in the content. Never invent \
         products, prices, or features that are not stated. Give each item a confidence \
         between 0 and 1. Respond with a single JSON object and nothing else."
    )
}

pub fn user_prompt(page: &PageInfo, context: &BrandContext, strategy: PromptStrategy) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Brand: {} ({})\nBusiness type: {}\nPricing model: {}\n",
        context.name, context.domain, context.business_type, context.pricing_model,
    ));
    if !context.known_products.is_empty() {
        prompt.push_str(&format!(
            "Known products: {}\n",
            context.known_products.join(", ")
        ));
    }
    if !context.competitors.is_empty() {
        prompt.push_str(&format!("Competitors: {}\n", context.competitors.join(", ")));
    }

    prompt.push('\n');
    prompt.push_str(&instructions(page.page_type, strategy));
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Page URL: {}\nPage type: {}\nContent:\n{}",
        page.url,
        page.page_type,
        truncate_content(&page.markdown, MAX_CONTENT_CHARS),
    ));

    prompt
}

/// Page-type-specific extraction instructions, including the expected
/// response shape.
fn instructions(page_type: PageType, strategy: PromptStrategy) -> String {
    match strategy {
        PromptStrategy::Focused => focused_instructions(page_type),
        PromptStrategy::Broad => {
            let emphasis = match page_type {
                PageType::Pricing => {
                    "This is a pricing page: pay closest attention to tiers, amounts, and billing periods."
                }
                PageType::Products | PageType::Product => {
                    "This is a product page: pay closest attention to product names, prices, and images."
                }
                PageType::Features => {
                    "This is a features page: pay closest attention to capability names and descriptions."
                }
                PageType::About => {
                    "This is an about page: products and features may only be mentioned in passing."
                }
                _ => "Extract whatever brand entities the page actually contains.",
            };
            format!(
                "{emphasis}\n\
                 Return JSON with this shape:\n\
                 {{\"products\": [{{\"name\", \"description\", \"product_type\", \"price\", \"currency\", \"images\", \"url\", \"confidence\"}}],\n \
                 \"pricing\": {{\"model\", \"tiers\": [{{\"name\", \"price\", \"period\", \"features\"}}], \"currency\", \"confidence\"}} or null,\n \
                 \"features\": [{{\"name\", \"description\", \"category\", \"confidence\"}}],\n \
                 \"assets\": [{{\"url\", \"asset_type\", \"alt_text\", \"confidence\"}}],\n \
                 \"confidence\": <overall 0-1>}}"
            )
        }
    }
}

/// Narrow re-extraction scoped to the page's dominant entity kind.
fn focused_instructions(page_type: PageType) -> String {
    match page_type {
        PageType::Pricing => "Extract ONLY the pricing structure. Return JSON: \
             {\"pricing\": {\"model\", \"tiers\": [{\"name\", \"price\", \"period\", \"features\"}], \"currency\", \"confidence\"}, \
              \"confidence\": <overall 0-1>}"
            .to_string(),
        PageType::Products | PageType::Product => "Extract ONLY the products. Return JSON: \
             {\"products\": [{\"name\", \"description\", \"product_type\", \"price\", \"currency\", \"images\", \"url\", \"confidence\"}], \
              \"confidence\": <overall 0-1>}"
            .to_string(),
        _ => "Extract ONLY the features. Return JSON: \
             {\"features\": [{\"name\", \"description\", \"category\", \"confidence\"}], \
              \"confidence\": <overall 0-1>}"
            .to_string(),
    }
}
