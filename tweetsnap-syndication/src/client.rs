use crate::outcome::{FetchOutcome, classify};
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use tweetsnap_common::{
    contract::{LANGUAGE, SYNDICATION_URL, TWEET_RESULT_PATH, feature_flags},
    model::{InvalidPostIdError, PostId},
    token::derive_token,
};
use url::Url;

pub type Result<T, E = SyndicationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error(transparent)]
    InvalidPostId(#[from] InvalidPostIdError),
    #[error("Invalid syndication URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("The HTTP client could not be built: {0}")]
    ClientBuild(reqwest::Error),
    #[error("Request to the syndication service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The syndication service sent invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct SyndicationClient {
    endpoint: Url,
    client: Client,
}

impl SyndicationClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let endpoint = base_url.join(TWEET_RESULT_PATH)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SyndicationError::ClientBuild)?;

        Ok(Self { endpoint, client })
    }

    pub fn default_endpoint(timeout: Duration) -> Result<Self> {
        Self::new(&Url::parse(SYNDICATION_URL)?, timeout)
    }

    #[must_use]
    pub fn request_url(&self, id: &PostId) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", id.as_str())
            .append_pair("lang", LANGUAGE)
            .append_pair("features", &feature_flags())
            .append_pair("token", &derive_token(id));
        url
    }

    /// Validates `id` before any request is made.
    pub async fn fetch(&self, id: &str) -> Result<FetchOutcome> {
        let id: PostId = id.parse()?;
        self.fetch_post(&id).await
    }

    pub async fn fetch_post(&self, id: &PostId) -> Result<FetchOutcome> {
        let url = self.request_url(id);
        debug!(%id, "Fetching post from syndication service");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.contains("application/json"));

        let body = if is_json {
            let bytes = response.bytes().await?;
            Some(serde_json::from_slice::<Value>(&bytes)?)
        } else {
            None
        };

        let outcome = classify(status, body, &url);
        match &outcome {
            FetchOutcome::Found(_) => debug!(%id, %status, "Post found"),
            FetchOutcome::Tombstoned => debug!(%id, %status, "Post is tombstoned"),
            FetchOutcome::NotFound => debug!(%id, %status, "Post not found"),
            FetchOutcome::UpstreamError(err) => {
                warn!(%id, %status, error = %err, "Syndication service returned an error");
            }
        }

        Ok(outcome)
    }
}
