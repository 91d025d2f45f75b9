//! HTTP site fetcher and markup extraction.

pub mod extract;
pub mod fetcher;

pub use extract::HtmlExtractor;
pub use fetcher::HttpSiteFetcher;
