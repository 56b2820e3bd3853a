use crate::browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Viewport};
use async_trait::async_trait;
use chromiumoxide::{
    Browser, BrowserConfig, Page,
    cdp::{browser_protocol::page::CaptureScreenshotFormat, js_protocol::runtime::EvaluateParams},
    handler::viewport::Viewport as ChromeViewport,
    page::ScreenshotParams,
};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const WAIT_FOR_IMAGES_JS: &str = "Promise.all(Array.from(document.images, (img) => img.complete \
    ? null \
    : new Promise((resolve) => { \
        img.addEventListener('load', resolve, { once: true }); \
        img.addEventListener('error', resolve, { once: true }); \
    }))).then(() => true)";

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    args: Vec<String>,
}

impl ChromiumLauncher {
    /// Without an executable, the browser is looked up on the host.
    #[must_use]
    pub fn new(executable: Option<PathBuf>, args: Vec<String>) -> Self {
        Self { executable, args }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .viewport(ChromeViewport {
                width: viewport.width,
                height: viewport.height,
                ..ChromeViewport::default()
            })
            .args(self.args.iter().cloned());
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(BrowserError::Config)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Browser event loop stopped");
                    break;
                }
            }
        });

        debug!(?viewport, "Browser launched");
        Ok(Box::new(ChromiumSession { browser, handler }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage(page)))
    }

    async fn close(mut self: Box<Self>) -> Result<(), BrowserError> {
        self.browser.close().await?;
        if let Some(status) = self.browser.wait().await?
            && !status.success()
        {
            warn!(%status, "Browser exited abnormally");
        }
        debug!("Browser closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

struct ChromiumPage(Page);

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        self.0.set_content(html).await?;
        Ok(())
    }

    async fn scroll_to_origin(&self) -> Result<(), BrowserError> {
        self.0.evaluate("window.scrollTo(0, 0)").await?;
        Ok(())
    }

    async fn wait_for_images(&self) -> Result<(), BrowserError> {
        let params = EvaluateParams::builder()
            .expression(WAIT_FOR_IMAGES_JS)
            .await_promise(true)
            .build()
            .map_err(BrowserError::Failed)?;
        self.0.evaluate_expression(params).await?;
        Ok(())
    }

    async fn screenshot_png(&self, omit_background: bool) -> Result<Vec<u8>, BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .omit_background(omit_background)
            .build();
        Ok(self.0.screenshot(params).await?)
    }
}
