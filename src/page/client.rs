//! HTTP page provider.

use std::time::{Duration, Instant};

use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use super::element::{Page, PageElement};
use super::PageProvider;
use crate::config::Config;
use crate::error::FetchError;
use crate::metrics;

/// Fetches pages over HTTP and parses them into [`Page`] trees.
#[derive(Debug, Clone)]
pub struct HttpPageProvider {
    /// HTTP client for page requests.
    http: reqwest::Client,
    /// Pause before each request.
    request_delay: Duration,
}

impl HttpPageProvider {
    /// Create a provider from config.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(config.user_agent.clone())
            // Keep connections alive for reuse across sibling pages
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    async fn get_body(&self, url: &str) -> Result<String, FetchError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl PageProvider for HttpPageProvider {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, label: &str) -> Result<Page, FetchError> {
        let start = Instant::now();
        let result = self.get_body(url).await;
        metrics::record_page_fetch_latency(start);

        match result {
            Ok(body) => {
                metrics::inc_pages_fetched();
                debug!(bytes = body.len(), "Page fetched");
                Ok(parse_html(url, label, &body))
            }
            Err(e) => {
                metrics::inc_fetch_failures();
                Err(e)
            }
        }
    }
}

/// Parse an HTML document into a [`Page`].
pub fn parse_html(url: &str, label: &str, body: &str) -> Page {
    let document = Html::parse_document(body);
    Page::new(url, label, convert(document.root_element()))
}

fn convert(element: ElementRef<'_>) -> PageElement {
    let value = element.value();
    PageElement {
        tag: value.name().to_string(),
        classes: value.classes().map(str::to_string).collect(),
        attributes: value
            .attrs()
            .map(|(name, v)| (name.to_string(), v.to_string()))
            .collect(),
        text: element.text().collect(),
        children: element.children().filter_map(ElementRef::wrap).map(convert).collect(),
    }
}
