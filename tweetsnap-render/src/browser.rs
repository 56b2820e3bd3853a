use async_trait::async_trait;
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const EMBED: Self = Self {
        width: 550,
        height: 400,
    };
}

impl Default for Viewport {
    fn default() -> Self {
        Self::EMBED
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser configuration is invalid: {0}")]
    Config(String),
    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("Browser process error: {0}")]
    Process(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A running browser instance. Must be released with [`BrowserSession::close`].
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn set_content(&self, html: &str) -> Result<(), BrowserError>;

    async fn scroll_to_origin(&self) -> Result<(), BrowserError>;

    /// Resolves once every image in the document has loaded or failed.
    async fn wait_for_images(&self) -> Result<(), BrowserError>;

    async fn screenshot_png(&self, omit_background: bool) -> Result<Vec<u8>, BrowserError>;
}
