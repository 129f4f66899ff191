//! HTTP search client implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building blocking HTTP clients that present as a desktop browser
//! - Form-encoded POSTs to the search endpoint
//! - Court-list discovery per court type
//! - Error classification into transient and fatal failures

use crate::config::{Config, SiteConfig};
use crate::crawler::parser::parse_court_options;
use crate::model::{CalendarDate, CourtDescriptor, CourtType};
use crate::{Result, SweepError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Label of the search form's submit button, sent with every search
pub const SUBMIT_LABEL: &str = "खोज्नु होस्";

/// Why a single search request failed
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl SearchError {
    /// Returns true if the same request might succeed later
    ///
    /// | Failure | Transient |
    /// |---------|-----------|
    /// | Timeout | yes |
    /// | Connection error | yes |
    /// | HTTP 5xx, 408, 429 | yes |
    /// | Body read error | yes |
    /// | Other HTTP status | no |
    /// | Client build error | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Body(_) => true,
            Self::Status(code) => {
                *code >= 500
                    || *code == StatusCode::REQUEST_TIMEOUT.as_u16()
                    || *code == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            Self::Request(_) | Self::Build(_) => false,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// One search against the site
pub trait SearchClient {
    /// Runs the search for `court` on `date` and returns the response body
    fn search(
        &mut self,
        court: &CourtDescriptor,
        date: CalendarDate,
    ) -> std::result::Result<String, SearchError>;
}

/// Hands out one search client per worker
///
/// Sessions are never shared between workers.
pub trait SessionFactory: Sync {
    type Client: SearchClient + Send;

    fn open_session(&self) -> std::result::Result<Self::Client, SearchError>;
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// Builds a blocking HTTP client with proper configuration
///
/// # Arguments
///
/// * `site` - The site configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use court_sweep::config::parse_config;
/// use court_sweep::crawler::build_http_client;
///
/// let config = parse_config("[site]\nbase-url = \"https://example.com/\"").unwrap();
/// let client = build_http_client(&config.site).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(site.user_agent.clone())
        .default_headers(browser_headers())
        .timeout(site.request_timeout())
        .connect_timeout(site.connect_timeout())
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reads a response body as UTF-8 whatever charset the server declares
fn read_body(response: reqwest::blocking::Response) -> std::result::Result<String, SearchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Status(status.as_u16()));
    }
    let bytes = response.bytes().map_err(SearchError::from_reqwest)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Search client backed by one HTTP session
pub struct HttpSearchClient {
    client: Client,
    base_url: Url,
}

impl HttpSearchClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

impl SearchClient for HttpSearchClient {
    fn search(
        &mut self,
        court: &CourtDescriptor,
        date: CalendarDate,
    ) -> std::result::Result<String, SearchError> {
        let date = date.to_string();
        let form = [
            ("court_type", court.type_code()),
            ("court_id", court.id.as_str()),
            ("regno", ""),
            ("darta_date", date.as_str()),
            ("faisala_date", ""),
            ("submit", SUBMIT_LABEL),
        ];

        let response = self
            .client
            .post(self.base_url.clone())
            .form(&form)
            .send()
            .map_err(SearchError::from_reqwest)?;
        read_body(response)
    }
}

/// Opens HTTP sessions against the configured site
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    site: SiteConfig,
    base_url: Url,
}

impl HttpSessionFactory {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            base_url: Url::parse(&site.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl SessionFactory for HttpSessionFactory {
    type Client = HttpSearchClient;

    fn open_session(&self) -> std::result::Result<HttpSearchClient, SearchError> {
        let client =
            build_http_client(&self.site).map_err(|e| SearchError::Build(e.to_string()))?;
        Ok(HttpSearchClient::new(client, self.base_url.clone()))
    }
}

/// Fetches the courts of one type from the court-list endpoint
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `site` - Site configuration naming the endpoint
/// * `court_type` - Court type to list
///
/// # Returns
///
/// * `Ok(Vec<CourtDescriptor>)` - Courts in listing order
/// * `Err(SweepError)` - Request failed or the endpoint URL is invalid
pub fn fetch_court_list(
    client: &Client,
    site: &SiteConfig,
    court_type: CourtType,
) -> Result<Vec<CourtDescriptor>> {
    let url = Url::parse(&site.base_url)?.join(&site.court_list_path)?;
    let response = client
        .post(url.clone())
        .form(&[("court_type", court_type.code()), ("selected", "0")])
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|source| SweepError::Http {
            url: url.to_string(),
            source,
        })?;
    let bytes = response.bytes().map_err(|source| SweepError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(parse_court_options(
        &String::from_utf8_lossy(&bytes),
        court_type,
    ))
}

/// Lists the courts of every configured court type
///
/// A type whose listing fails is logged and contributes no courts. Finding
/// no courts at all is an error, since there would be nothing to crawl.
pub fn discover_courts(config: &Config) -> Result<Vec<CourtDescriptor>> {
    let client = build_http_client(&config.site)?;
    let mut courts = Vec::new();

    for &court_type in &config.crawl.court_types {
        match fetch_court_list(&client, &config.site, court_type) {
            Ok(found) => {
                tracing::info!(
                    "Found {} courts for type {} ({})",
                    found.len(),
                    court_type.code(),
                    court_type.name()
                );
                courts.extend(found);
            }
            Err(e) => {
                tracing::error!(
                    "Error getting court list for type {}: {}",
                    court_type.code(),
                    e
                );
            }
        }
    }

    if courts.is_empty() {
        return Err(SweepError::NoCourts(
            config
                .crawl
                .court_types
                .iter()
                .map(|t| t.code().to_string())
                .collect(),
        ));
    }
    Ok(courts)
}
