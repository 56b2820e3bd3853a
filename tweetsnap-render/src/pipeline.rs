use crate::{
    browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Viewport},
    document::compose_document,
    embed::EmbedMarkup,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};
use tweetsnap_common::model::post::EnrichedPost;

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(8);
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch the browser: {0}")]
    Launch(BrowserError),
    #[error("Failed to load the post into the page: {0}")]
    Page(BrowserError),
    #[error("Failed to capture the screenshot: {0}")]
    Screenshot(BrowserError),
    #[error("Failed to close the browser: {0}")]
    Close(BrowserError),
    #[error("Rendering did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct RenderOptions {
    pub viewport: Viewport,
    /// Upper bound on waiting for images before the capture.
    pub settle: Duration,
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::EMBED,
            settle: DEFAULT_SETTLE,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub viewport: Viewport,
}

impl RenderedImage {
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}

pub struct RenderPipeline {
    launcher: Arc<dyn BrowserLauncher>,
    markup: Arc<dyn EmbedMarkup>,
    options: RenderOptions,
}

impl RenderPipeline {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        markup: Arc<dyn EmbedMarkup>,
        options: RenderOptions,
    ) -> Self {
        Self {
            launcher,
            markup,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Renders `post` in a fresh browser which is closed on every path.
    pub async fn render(&self, post: &EnrichedPost) -> Result<RenderedImage, RenderError> {
        let RenderOptions {
            viewport,
            timeout: render_timeout,
            ..
        } = self.options;
        let document = compose_document(self.markup.stylesheet(), &self.markup.render(post));
        let deadline = Instant::now() + render_timeout;

        let mut session = timeout_at(deadline, self.launcher.launch(viewport))
            .await
            .map_err(|_| RenderError::TimedOut(render_timeout))?
            .map_err(RenderError::Launch)?;

        let captured = timeout_at(deadline, self.capture(session.as_mut(), &document))
            .await
            .unwrap_or(Err(RenderError::TimedOut(render_timeout)));
        // Dropping an unfinished close kills the browser process.
        let closed = match timeout_at(deadline + CLOSE_GRACE, session.close()).await {
            Ok(closed) => closed.map_err(RenderError::Close),
            Err(_) => Err(RenderError::TimedOut(render_timeout)),
        };

        match (captured, closed) {
            (Ok(png), Ok(())) => {
                debug!(id = post.raw().id_str(), bytes = png.len(), "Rendered post");
                Ok(RenderedImage { png, viewport })
            }
            (Ok(_), Err(err)) | (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "Browser could not be closed after a failed render");
                Err(err)
            }
        }
    }

    async fn capture(
        &self,
        session: &mut dyn BrowserSession,
        document: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let page = session.new_page().await.map_err(RenderError::Page)?;
        page.set_content(document).await.map_err(RenderError::Page)?;
        page.scroll_to_origin().await.map_err(RenderError::Page)?;
        self.settle(page.as_ref()).await?;

        page.screenshot_png(true)
            .await
            .map_err(RenderError::Screenshot)
    }

    async fn settle(&self, page: &dyn BrowserPage) -> Result<(), RenderError> {
        match timeout(self.options.settle, page.wait_for_images()).await {
            Ok(loaded) => loaded.map_err(RenderError::Page),
            Err(_) => {
                debug!(settle = ?self.options.settle, "Images still loading, capturing anyway");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Viewport},
        embed::EmbedMarkup,
        pipeline::{CLOSE_GRACE, RenderError, RenderOptions, RenderPipeline},
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };
    use tweetsnap_common::model::post::{EnrichedPost, RawPost, enrich};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Step {
        Launch,
        NewPage,
        SetContent,
        Scroll,
        WaitForImages,
        Screenshot,
        Close,
    }

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Fault {
        Fail(Step),
        Hang(Step),
    }

    #[derive(Default)]
    struct Journal {
        calls: Vec<Step>,
        document: Option<String>,
        omit_background: Option<bool>,
        viewport: Option<Viewport>,
    }

    #[derive(Clone)]
    struct FakeBrowser {
        fault: Option<Fault>,
        journal: Arc<Mutex<Journal>>,
    }

    impl FakeBrowser {
        fn new(fault: Option<Fault>) -> Self {
            Self {
                fault,
                journal: Arc::default(),
            }
        }

        async fn step(&self, step: Step) -> Result<(), BrowserError> {
            self.journal.lock().unwrap().calls.push(step);
            match self.fault {
                Some(Fault::Fail(at)) if at == step => {
                    Err(BrowserError::Failed(format!("injected failure at {step:?}")))
                }
                Some(Fault::Hang(at)) if at == step => std::future::pending().await,
                _ => Ok(()),
            }
        }

        fn calls(&self) -> Vec<Step> {
            self.journal.lock().unwrap().calls.clone()
        }

        fn count(&self, step: Step) -> usize {
            self.calls().into_iter().filter(|call| *call == step).count()
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeBrowser {
        async fn launch(
            &self,
            viewport: Viewport,
        ) -> Result<Box<dyn BrowserSession>, BrowserError> {
            self.journal.lock().unwrap().viewport = Some(viewport);
            self.step(Step::Launch).await?;
            Ok(Box::new(self.clone()))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeBrowser {
        async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
            self.step(Step::NewPage).await?;
            Ok(Box::new(self.clone()))
        }

        async fn close(self: Box<Self>) -> Result<(), BrowserError> {
            self.step(Step::Close).await
        }
    }

    #[async_trait]
    impl BrowserPage for FakeBrowser {
        async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
            self.journal.lock().unwrap().document = Some(html.to_owned());
            self.step(Step::SetContent).await
        }

        async fn scroll_to_origin(&self) -> Result<(), BrowserError> {
            self.step(Step::Scroll).await
        }

        async fn wait_for_images(&self) -> Result<(), BrowserError> {
            self.step(Step::WaitForImages).await
        }

        async fn screenshot_png(&self, omit_background: bool) -> Result<Vec<u8>, BrowserError> {
            self.journal.lock().unwrap().omit_background = Some(omit_background);
            self.step(Step::Screenshot).await?;
            Ok(PNG.to_vec())
        }
    }

    struct PlainMarkup;

    impl EmbedMarkup for PlainMarkup {
        fn stylesheet(&self) -> &str {
            ".tweet { color: black; }"
        }

        fn render(&self, post: &EnrichedPost) -> String {
            format!("<div class=\"tweet\">{}</div>", post.links.url)
        }
    }

    fn post() -> EnrichedPost {
        enrich(
            RawPost::try_from(json!({ "id_str": "1", "user": { "screen_name": "alice" } }))
                .unwrap(),
        )
    }

    fn pipeline(browser: &FakeBrowser) -> RenderPipeline {
        RenderPipeline::new(
            Arc::new(browser.clone()),
            Arc::new(PlainMarkup),
            RenderOptions::default(),
        )
    }

    #[tokio::test]
    async fn renders_in_order_and_closes() {
        let browser = FakeBrowser::new(None);

        let image = pipeline(&browser).render(&post()).await.unwrap();

        assert_eq!(image.png, PNG);
        assert_eq!(image.viewport, Viewport { width: 550, height: 400 });
        assert_eq!(
            browser.calls(),
            [
                Step::Launch,
                Step::NewPage,
                Step::SetContent,
                Step::Scroll,
                Step::WaitForImages,
                Step::Screenshot,
                Step::Close,
            ]
        );

        let journal = browser.journal.lock().unwrap();
        assert_eq!(journal.omit_background, Some(true));
        assert_eq!(journal.viewport, Some(Viewport::EMBED));
        let document = journal.document.as_deref().unwrap();
        assert!(document.contains("<style>.tweet { color: black; }</style>"));
        assert!(document.contains("<div class=\"tweet\">https://x.com/alice/status/1</div>"));
    }

    #[tokio::test]
    async fn browser_is_closed_exactly_once_whatever_fails() {
        let faults = [
            (Step::NewPage, "Failed to load"),
            (Step::SetContent, "Failed to load"),
            (Step::Scroll, "Failed to load"),
            (Step::WaitForImages, "Failed to load"),
            (Step::Screenshot, "Failed to capture"),
        ];

        for (step, message) in faults {
            let browser = FakeBrowser::new(Some(Fault::Fail(step)));

            let err = pipeline(&browser).render(&post()).await.unwrap_err();

            assert!(err.to_string().starts_with(message), "{step:?}: {err}");
            assert_eq!(browser.count(Step::Close), 1, "{step:?}");
            assert_eq!(browser.calls().last(), Some(&Step::Close), "{step:?}");
        }
    }

    #[tokio::test]
    async fn launch_failure_has_nothing_to_close() {
        let browser = FakeBrowser::new(Some(Fault::Fail(Step::Launch)));

        let err = pipeline(&browser).render(&post()).await.unwrap_err();

        assert!(matches!(err, RenderError::Launch(_)));
        assert_eq!(browser.calls(), [Step::Launch]);
    }

    #[tokio::test]
    async fn close_failure_after_capture_is_reported() {
        let browser = FakeBrowser::new(Some(Fault::Fail(Step::Close)));

        let err = pipeline(&browser).render(&post()).await.unwrap_err();

        assert!(matches!(err, RenderError::Close(_)));
        assert_eq!(browser.count(Step::Close), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_images_are_bounded_by_the_settle_budget() {
        let browser = FakeBrowser::new(Some(Fault::Hang(Step::WaitForImages)));

        let image = pipeline(&browser).render(&post()).await.unwrap();

        assert_eq!(image.png, PNG);
        assert_eq!(browser.count(Step::Screenshot), 1);
        assert_eq!(browser.count(Step::Close), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_page_times_out_and_still_closes() {
        for step in [Step::SetContent, Step::Screenshot, Step::Close] {
            let browser = FakeBrowser::new(Some(Fault::Hang(step)));
            let options = RenderOptions {
                timeout: Duration::from_secs(3),
                ..RenderOptions::default()
            };
            let pipeline = RenderPipeline::new(Arc::new(browser.clone()), Arc::new(PlainMarkup), options);

            let started = tokio::time::Instant::now();
            let err = pipeline.render(&post()).await.unwrap_err();

            assert!(started.elapsed() <= Duration::from_secs(3) + CLOSE_GRACE, "{step:?}");
            assert!(matches!(err, RenderError::TimedOut(timeout) if timeout == Duration::from_secs(3)));
            assert_eq!(browser.count(Step::Close), 1, "{step:?}");
        }
    }
}
