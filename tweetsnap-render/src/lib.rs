pub mod browser;
pub mod chromium;
pub mod document;
pub mod embed;
pub mod pipeline;

pub use browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Viewport};
pub use chromium::ChromiumLauncher;
pub use embed::{EmbedMarkup, EmbeddedTweet};
pub use pipeline::{RenderError, RenderOptions, RenderPipeline, RenderedImage};
