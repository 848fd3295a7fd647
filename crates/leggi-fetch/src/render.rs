//! Print detail pages to PDF through a headless Chrome.
//!
//! headless_chrome is blocking, so each render runs on the blocking pool
//! with its own tab. The browser itself is shared.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, info};

use crate::FetchError;

/// A4 in inches, as Chrome's print API expects.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub navigation_timeout: Duration,
    /// Smaller outputs are blank pages, not laws.
    pub min_bytes: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            min_bytes: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// DOM after scripts ran, for metadata extraction.
    pub html: String,
    pub pdf: Vec<u8>,
}

pub struct BrowserRenderer {
    browser: Arc<Browser>,
    opts: RenderOptions,
}

impl BrowserRenderer {
    /// Launch a headless browser with default settings.
    pub fn launch(opts: RenderOptions) -> Result<Self, FetchError> {
        let launch = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(opts.navigation_timeout * 10)
            .build()
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let browser = Browser::new(launch).map_err(|e| FetchError::Browser(e.to_string()))?;
        info!("launched headless browser");
        Ok(Self {
            browser: Arc::new(browser),
            opts,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.opts
    }

    /// Navigate to `url` and return its rendered HTML.
    pub async fn page_html(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.visit(url, false).await?.html)
    }

    /// Navigate to `url` and print it to an A4 PDF with backgrounds.
    pub async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let page = self.visit(url, true).await?;
        check_size(page.pdf.len(), self.opts.min_bytes)?;
        debug!(url, bytes = page.pdf.len(), "rendered PDF");
        Ok(page)
    }

    async fn visit(&self, url: &str, print: bool) -> Result<RenderedPage, FetchError> {
        let browser = Arc::clone(&self.browser);
        let timeout = self.opts.navigation_timeout;
        let url = url.to_string();
        tokio::task::spawn_blocking(move || -> Result<RenderedPage, FetchError> {
            let tab = browser.new_tab().map_err(browser_err)?;
            tab.set_default_timeout(timeout);
            let result = (|| -> Result<RenderedPage, FetchError> {
                tab.navigate_to(&url)
                    .map_err(browser_err)?
                    .wait_until_navigated()
                    .map_err(browser_err)?;
                let html = tab.get_content().map_err(browser_err)?;
                let pdf = if print {
                    tab.print_to_pdf(Some(a4_options())).map_err(browser_err)?
                } else {
                    Vec::new()
                };
                Ok(RenderedPage { html, pdf })
            })();
            let _ = tab.close(true);
            result
        })
        .await
        .map_err(|e| FetchError::Browser(format!("render task failed: {e}")))?
    }
}

fn a4_options() -> PrintToPdfOptions {
    PrintToPdfOptions {
        print_background: Some(true),
        paper_width: Some(A4_WIDTH_IN),
        paper_height: Some(A4_HEIGHT_IN),
        ..Default::default()
    }
}

fn browser_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

fn check_size(bytes: usize, min: usize) -> Result<(), FetchError> {
    if bytes < min {
        return Err(FetchError::TooSmall { bytes, min });
    }
    Ok(())
}
