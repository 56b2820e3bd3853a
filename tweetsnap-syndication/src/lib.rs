pub mod client;
pub mod outcome;

pub use client::{SyndicationClient, SyndicationError};
pub use outcome::{FetchOutcome, UpstreamError};
