mod request;

pub use request::RequestFetcher;

use crate::error::FetchError;
use crate::model::RawPage;
use async_trait::async_trait;

/// Anything that can turn a URL into a raw page.
///
/// Retries, backoff and TLS fallback are the fetcher's business; callers
/// only see the final page or a classified failure.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError>;
}
