use super::PageFetcher;
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::model::RawPage;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, DNT,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, Response};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::sleep;

/// Fetches pages over HTTP with browser-like headers.
///
/// Retryable statuses are retried with exponential backoff. A certificate
/// failure is retried once without verification when the config allows it.
pub struct RequestFetcher {
    client: Client,
    insecure_client: Option<Client>,
    config: FetchConfig,
    next_agent: AtomicUsize,
}

impl RequestFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = build_client(&config, false)?;
        let insecure_client = if config.insecure_tls_fallback {
            Some(build_client(&config, true)?)
        } else {
            None
        };

        Ok(Self {
            client,
            insecure_client,
            config,
            next_agent: AtomicUsize::new(0),
        })
    }

    /// User agents are handed out round-robin.
    fn next_user_agent(&self) -> Option<&str> {
        if self.config.user_agents.is_empty() {
            return None;
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.config.user_agents.len();
        Some(&self.config.user_agents[index])
    }

    async fn send_with_retry(&self, client: &Client, url: &str) -> Result<Response, FetchError> {
        let mut retry = 0;

        loop {
            let mut request = client.get(url);
            if let Some(agent) = self.next_user_agent() {
                request = request.header(USER_AGENT, agent);
            }

            let response = request.send().await.map_err(classify_error)?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retryable = self.config.retry_statuses.contains(&status.as_u16());
            if !retryable || retry >= self.config.max_retries {
                debug!("Giving up on {} with status {}", url, status);
                return Err(FetchError::Status(status.as_u16()));
            }

            retry += 1;
            let delay = self.config.backoff(retry);
            warn!(
                "{} returned {} (retry {}/{}), waiting {:?}",
                url, status, retry, self.config.max_retries, delay
            );
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl PageFetcher for RequestFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        debug!("Fetching {}", url);

        let response = match self.send_with_retry(&self.client, url).await {
            Err(FetchError::Tls(detail)) => match &self.insecure_client {
                Some(insecure) => {
                    warn!(
                        "TLS verification failed for {}: {}. Retrying without verification",
                        url, detail
                    );
                    self.send_with_retry(insecure, url).await?
                }
                None => return Err(FetchError::Tls(detail)),
            },
            other => other?,
        };

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await.map_err(classify_error)?;

        info!("Fetched {} ({} bytes, {})", final_url, body.len(), content_type);

        let mut page = RawPage::new(final_url, content_type, body.to_vec());
        page.status = status;
        Ok(page)
    }
}

fn build_client(config: &FetchConfig, accept_invalid_certs: bool) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let client = Client::builder()
        .timeout(config.timeout())
        .default_headers(headers)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    Ok(client)
}

fn classify_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    if is_tls_error(&err) {
        return FetchError::Tls(err.to_string());
    }
    if err.is_connect() {
        return FetchError::Unreachable(err.to_string());
    }
    FetchError::Client(err)
}

/// Looks through the error's causes for a certificate or handshake failure.
fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if mentions_tls(&cause.to_string()) {
            return true;
        }
        source = cause.source();
    }
    false
}

fn mentions_tls(message: &str) -> bool {
    let message = message.to_lowercase();
    ["certificate", "ssl", "tls"]
        .iter()
        .any(|needle| message.contains(needle))
}
