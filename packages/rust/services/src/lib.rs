//! External service contracts consumed by the scan pipeline, and the
//! gateway HTTP client that implements them.
//!
//! The pipeline never talks to third-party services directly; everything
//! goes through a backend gateway exposing search, company lookup, page
//! scraping, chat completion, and entity persistence. Each concern is a
//! narrow trait so phases can be tested against in-memory fakes.

pub mod contracts;
pub mod gateway;

pub use contracts::{
    ChatCompletion, ChatMessage, CompanyLookup, CompletionRequest, EntityStore, PageScraper,
    ResponseFormat, ScrapeOptions, ScrapedPage, SearchResult, SearchService, SearchType,
};
pub use gateway::GatewayClient;
