//! Static HTTP transport.
//!
//! Plain `GET` with a browser user agent. Good enough for pages whose data
//! is in the served HTML; it cannot click anything, so expand requests are
//! answered with [`ExpandStatus::Unsupported`].

use super::{ExpandStatus, FetchError, RenderedPage, Renderer};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Renderer for HttpRenderer {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn render(
        &self,
        url: &str,
        expand_selector: Option<&str>,
    ) -> Result<RenderedPage, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        debug!(status = status.as_u16(), "HTTP response");
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), url));
        }

        let html = resp.text().await?;
        let expand = match expand_selector {
            Some(_) => ExpandStatus::Unsupported,
            None => ExpandStatus::NotRequested,
        };

        Ok(RenderedPage {
            html,
            expand,
        })
    }
}
