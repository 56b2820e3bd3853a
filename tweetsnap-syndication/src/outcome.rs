use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tweetsnap_common::{contract::TOMBSTONE_TYPENAME, model::post::RawPost};
use url::Url;

#[derive(Clone, PartialEq, Debug)]
pub enum FetchOutcome {
    Found(RawPost),
    /// The post existed but was removed or restricted.
    Tombstoned,
    NotFound,
    UpstreamError(UpstreamError),
}

#[derive(Clone, PartialEq, Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: StatusCode,
    pub message: String,
    pub body: Option<Value>,
}

pub(crate) fn classify(status: StatusCode, body: Option<Value>, url: &Url) -> FetchOutcome {
    let is_tombstone = body
        .as_ref()
        .and_then(|body| body.get("__typename"))
        .and_then(Value::as_str)
        == Some(TOMBSTONE_TYPENAME);

    if is_tombstone {
        return FetchOutcome::Tombstoned;
    }

    if status.is_success() {
        return match body {
            None | Some(Value::Null) => FetchOutcome::NotFound,
            Some(body) => match RawPost::try_from(body.clone()) {
                Ok(post) => FetchOutcome::Found(post),
                Err(err) => FetchOutcome::UpstreamError(UpstreamError {
                    status,
                    message: format!("Malformed tweet payload: {err}"),
                    body: Some(body),
                }),
            },
        };
    }

    if status == StatusCode::NOT_FOUND {
        return FetchOutcome::NotFound;
    }

    let message = body
        .as_ref()
        .and_then(|body| body.get("error"))
        .and_then(Value::as_str)
        .map_or_else(
            || {
                format!(
                    "Failed to fetch tweet at \"{url}\" with \"{}\".",
                    status.as_u16()
                )
            },
            ToOwned::to_owned,
        );

    FetchOutcome::UpstreamError(UpstreamError {
        status,
        message,
        body,
    })
}
