//! Headless-browser transport backed by a Browserless `/function` endpoint.
//!
//! One call per target: the function navigates to the page, records the
//! navigation status, tries to click the expand control if one was
//! requested, waits for the extra rows to settle, and returns the final
//! HTML. The site's own status is reported inside the JSON payload so a
//! 403 from the site stays distinguishable from a failure of the rendering
//! service.

use super::{ExpandStatus, FetchError, RenderedPage, Renderer};
use crate::utils::truncate_for_log;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

const RENDER_FUNCTION: &str = r#"
export default async function ({ page, context }) {
  const response = await page.goto(context.url, { waitUntil: "domcontentloaded" });
  const status = response ? response.status() : 0;
  let expanded = false;
  let expandError = null;
  if (status < 400 && context.selector) {
    try {
      await page.click(context.selector);
      await new Promise((resolve) => setTimeout(resolve, context.settleMs));
      expanded = true;
    } catch (e) {
      expandError = String(e);
    }
  }
  const html = await page.content();
  return { data: { status, html, expanded, expandError }, type: "application/json" };
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResult {
    status: u16,
    html: String,
    #[serde(default)]
    expanded: bool,
    #[serde(default)]
    expand_error: Option<String>,
}

pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    settle: Duration,
}

impl BrowserlessRenderer {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        settle: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            settle,
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/function", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={}", urlencoding::encode(token)));
        }
        endpoint
    }
}

impl fmt::Debug for BrowserlessRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserlessRenderer")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("settle", &self.settle)
            .finish()
    }
}

impl Renderer for BrowserlessRenderer {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn render(
        &self,
        url: &str,
        expand_selector: Option<&str>,
    ) -> Result<RenderedPage, FetchError> {
        let body = serde_json::json!({
            "code": RENDER_FUNCTION,
            "context": {
                "url": url,
                "selector": expand_selector,
                "settleMs": self.settle.as_millis() as u64,
            },
        });

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::Render {
                status: status.as_u16(),
                message: truncate_for_log(&message, 300),
            });
        }

        let result: FunctionResult = resp.json().await?;
        debug!(site_status = result.status, expanded = result.expanded, "Browserless result");
        to_page(url, expand_selector, result)
    }
}

fn to_page(
    url: &str,
    expand_selector: Option<&str>,
    result: FunctionResult,
) -> Result<RenderedPage, FetchError> {
    if result.status == 0 {
        return Err(FetchError::Network(format!("navigation to {url} produced no response")));
    }
    if result.status >= 400 {
        return Err(FetchError::from_status(result.status, url));
    }

    let expand = match (expand_selector, result.expanded, result.expand_error) {
        (None, _, _) => ExpandStatus::NotRequested,
        (Some(_), true, _) => ExpandStatus::Expanded,
        (Some(_), false, Some(reason)) => ExpandStatus::Failed(reason),
        (Some(sel), false, None) => ExpandStatus::Failed(format!("{sel} was not clicked")),
    };

    Ok(RenderedPage {
        html: result.html,
        expand,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(json: &str) -> FunctionResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_site_forbidden_maps_to_access_denied() {
        let r = result(r#"{"status": 403, "html": "<html></html>"}"#);
        let err = to_page("https://lishi.tianqi.com/beijing/202005.html", None, r).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_expand_error_is_reported_not_raised() {
        let r = result(
            r#"{"status": 200, "html": "<ul class=\"thrui\"></ul>", "expanded": false, "expandError": "No element found for selector"}"#,
        );
        let page = to_page("https://example.com", Some(".lishidesc2"), r).unwrap();
        assert_eq!(
            page.expand,
            ExpandStatus::Failed("No element found for selector".to_string())
        );
    }

    #[test]
    fn test_expanded_page() {
        let r = result(r#"{"status": 200, "html": "<html></html>", "expanded": true}"#);
        let page = to_page("https://example.com", Some(".lishidesc2"), r).unwrap();
        assert_eq!(page.expand, ExpandStatus::Expanded);
    }

    #[test]
    fn test_missing_navigation_response_is_transient() {
        let r = result(r#"{"status": 0, "html": ""}"#);
        let err = to_page("https://example.com", None, r).unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn test_endpoint_includes_encoded_token() {
        let r = BrowserlessRenderer::new(
            "http://localhost:3000/",
            Some("a b"),
            Duration::from_secs(30),
            Duration::from_millis(750),
        )
        .unwrap();
        assert_eq!(r.endpoint(), "http://localhost:3000/function?token=a%20b");
    }
}
