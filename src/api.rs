use std::time::Duration;

use reqwest::StatusCode;

use crate::error::FetchError;
use crate::models::RawPage;
use crate::ratelimit::QuotaSignal;

pub const MUSE_API_URL: &str = "https://www.themuse.com/api/public/jobs";

/// Result of asking the API for one page.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Page { page: RawPage, quota: QuotaSignal },
    /// Any status other than 200. Treated as end of stream, never retried.
    Rejected { status: StatusCode, quota: QuotaSignal },
}

// --- Provider trait ---

pub trait PageSource {
    fn fetch_page(&self, page: u32) -> Result<PageOutcome, FetchError>;
}

// --- The Muse public jobs API ---

#[derive(Debug)]
pub struct MuseClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl MuseClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn query(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![("page", page.to_string())];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }
        query
    }
}

impl PageSource for MuseClient {
    fn fetch_page(&self, page: u32) -> Result<PageOutcome, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(page))
            .send()
            .map_err(|source| FetchError::Transport { page, source })?;

        let quota = QuotaSignal::from_headers(response.headers());
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(PageOutcome::Rejected { status, quota });
        }

        let body = response
            .text()
            .map_err(|source| FetchError::Transport { page, source })?;
        let page_body: RawPage =
            serde_json::from_str(&body).map_err(|source| FetchError::Decode { page, source })?;

        Ok(PageOutcome::Page {
            page: page_body,
            quota,
        })
    }
}
