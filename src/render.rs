//! Rendering of the lazily-loaded listing page.
//!
//! The listing only reveals older entries while it is scrolled, so it has to
//! be rendered by a browser that scrolls a number of times and waits after
//! each scroll. [`Renderer`] abstracts that capability:
//!
//! - [`BrowserlessRenderer`]: drives a remote headless Chrome through the
//!   Browserless `/function` API
//! - [`FetchRenderer`]: plain fetch without scrolling, used when no browser
//!   endpoint is configured

use crate::error::{CrawlError, Result};
use crate::fetch::Fetcher;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Trait for obtaining fully scrolled markup of a page.
pub trait Renderer {
    async fn render(
        &self,
        url: &str,
        scroll_steps: u32,
        wait_per_step: Duration,
    ) -> Result<String>;
}

/// Puppeteer function run by Browserless: open the page, scroll to the bottom
/// `steps` times waiting `waitMs` after each scroll, return the final DOM.
const SCROLL_FUNCTION: &str = r#"
export default async function ({ page, context }) {
  await page.goto(context.url, { waitUntil: "networkidle2" });
  for (let i = 0; i < context.steps; i++) {
    await page.evaluate(() => window.scrollTo(0, document.body.scrollHeight));
    await new Promise((resolve) => setTimeout(resolve, context.waitMs));
  }
  return { data: await page.content(), type: "text/html" };
}
"#;

#[derive(Debug, Serialize)]
struct FunctionRequest<'a> {
    code: &'static str,
    context: ScrollContext<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrollContext<'a> {
    url: &'a str,
    steps: u32,
    wait_ms: u64,
}

/// [`Renderer`] backed by a Browserless instance.
#[derive(Debug, Clone)]
pub struct BrowserlessRenderer {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRenderer {
    /// `timeout` bounds the whole render; it must leave room for every
    /// scroll wait.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::Config(format!("cannot build renderer client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        match &self.token {
            Some(token) => format!("{}/function?token={token}", self.base_url),
            None => format!("{}/function", self.base_url),
        }
    }
}

impl Renderer for BrowserlessRenderer {
    #[instrument(level = "info", skip(self, wait_per_step), fields(wait_ms = wait_per_step.as_millis() as u64))]
    async fn render(
        &self,
        url: &str,
        scroll_steps: u32,
        wait_per_step: Duration,
    ) -> Result<String> {
        let t0 = Instant::now();
        let render_err = |message: String| CrawlError::Render {
            url: url.to_string(),
            message,
        };

        let request = FunctionRequest {
            code: SCROLL_FUNCTION,
            context: ScrollContext {
                url,
                steps: scroll_steps,
                wait_ms: wait_per_step.as_millis() as u64,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| render_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(render_err(format!(
                "status {}: {}",
                status.as_u16(),
                truncate_for_log(&message, 300)
            )));
        }

        let markup = response.text().await.map_err(|e| render_err(e.to_string()))?;
        if markup.trim().is_empty() {
            return Err(render_err("empty document".to_string()));
        }

        info!(
            bytes = markup.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Rendered listing page"
        );
        Ok(markup)
    }
}

/// [`Renderer`] that fetches the page once without any scrolling.
///
/// Only the entries present in the initial HTML are visible this way.
#[derive(Debug, Clone)]
pub struct FetchRenderer<F> {
    fetcher: F,
}

impl<F: Fetcher> FetchRenderer<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: Fetcher> Renderer for FetchRenderer<F> {
    async fn render(&self, url: &str, scroll_steps: u32, _wait: Duration) -> Result<String> {
        if scroll_steps > 0 {
            warn!(%url, scroll_steps, "No browser configured; listing is fetched without scrolling");
        }
        self.fetcher.fetch(url).await.map_err(|e| CrawlError::Render {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
