//! Retrieval of target documents.
//!
//! A [`Renderer`] turns a URL into a [`RenderedPage`]. Two transports are
//! provided:
//!
//! | Transport | Module | Expand action |
//! |-----------|--------|---------------|
//! | Static HTTP GET | [`http`] | Not supported, page is used as served |
//! | Browserless `/function` | [`browserless`] | Clicks the expand control in a headless browser |
//!
//! The transport must report the site's access-denied answer (HTTP 403) as
//! [`FetchError::Forbidden`], distinct from every other failure, because it
//! is the only signal that prunes a location from the catalog.
//!
//! [`TargetFetcher`] wraps a renderer for the orchestrator and logs the
//! outcome of the best-effort expand action without ever escalating it.

pub mod browserless;
pub mod http;
pub mod target;

use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use browserless::BrowserlessRenderer;
pub use http::HttpRenderer;
pub use target::{HistoryPlan, SnapshotPlan, TargetPlan};

/// Failures of the transport/render layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The site answered 403: the endpoint is blocked for this location.
    #[error("access denied (HTTP 403) for {url}")]
    Forbidden { url: String },

    #[error("HTTP error {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    /// The rendering service itself failed (not the target site).
    #[error("Render service error (status {status}): {message}")]
    Render { status: u16, message: String },

    #[error("Invalid target address: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether this failure is the permanent access-denied signal.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, FetchError::Forbidden { .. })
    }

    /// Map a non-success target status to the matching error.
    pub fn from_status(status: u16, url: &str) -> Self {
        if status == 403 {
            FetchError::Forbidden { url: url.to_string() }
        } else {
            FetchError::Status {
                status,
                url: url.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

/// Result of the best-effort expand action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandStatus {
    NotRequested,
    Expanded,
    /// The transport cannot interact with pages.
    Unsupported,
    Failed(String),
}

/// A retrieved document, after any expand action.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub expand: ExpandStatus,
}

/// Rendering/transport capability.
///
/// Implementors fetch `url` and, when `expand_selector` is given, try to
/// activate that control before capturing the document. A failed expand is
/// reported through [`RenderedPage::expand`], never as an `Err`.
pub trait Renderer {
    async fn render(
        &self,
        url: &str,
        expand_selector: Option<&str>,
    ) -> Result<RenderedPage, FetchError>;
}

/// The transport chosen at startup.
#[derive(Debug)]
pub enum Transport {
    Http(HttpRenderer),
    Browserless(BrowserlessRenderer),
}

impl Renderer for Transport {
    async fn render(
        &self,
        url: &str,
        expand_selector: Option<&str>,
    ) -> Result<RenderedPage, FetchError> {
        match self {
            Transport::Http(r) => r.render(url, expand_selector).await,
            Transport::Browserless(r) => r.render(url, expand_selector).await,
        }
    }
}

/// Resolves targets to documents through a [`Renderer`].
///
/// Owns the renderer for the duration of a run; dropping the fetcher
/// releases the transport.
#[derive(Debug)]
pub struct TargetFetcher<R> {
    renderer: R,
}

impl<R: Renderer> TargetFetcher<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Fetch one target. Expand problems are logged here and swallowed.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch(
        &self,
        url: &str,
        expand_selector: Option<&str>,
    ) -> Result<RenderedPage, FetchError> {
        let t0 = Instant::now();
        let page = self.renderer.render(url, expand_selector).await?;
        let elapsed_ms = t0.elapsed().as_millis();

        match &page.expand {
            ExpandStatus::Expanded => debug!(elapsed_ms, "Expand control clicked; loaded more rows"),
            ExpandStatus::Failed(reason) => {
                warn!(elapsed_ms, reason = %reason, "Expand action failed; using page as rendered")
            }
            ExpandStatus::Unsupported => {
                debug!(elapsed_ms, "Transport cannot expand pages; using page as served")
            }
            ExpandStatus::NotRequested => debug!(elapsed_ms, bytes = page.html.len(), "Fetched page"),
        }

        Ok(page)
    }
}
