use axum::{
    Router,
    extract::{FromRef, Request, rejection::QueryRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use tweetsnap_render::{RenderError, RenderPipeline};
use tweetsnap_syndication::{SyndicationClient, SyndicationError, UpstreamError};

mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

/// Shape of JSON responses for found posts.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonMode {
    /// The record as the syndication service sent it, keys in upstream order.
    Raw,
    #[default]
    Enriched,
}

impl JsonMode {
    #[must_use]
    pub fn missing_id_message(self) -> &'static str {
        match self {
            JsonMode::Raw => "Missing tweet ID",
            JsonMode::Enriched => "Missing tweet id",
        }
    }
}

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub syndication: Arc<SyndicationClient>,
    pub renderer: Arc<RenderPipeline>,
    pub json_mode: JsonMode,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("{}", .0.missing_id_message())]
    MissingPostId(JsonMode),
    #[error(transparent)]
    Syndication(#[from] SyndicationError),
    #[error(transparent)]
    Upstream(UpstreamError),
    #[error("Tweet not found")]
    PostNotFound,
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PostNotFound => StatusCode::NOT_FOUND,
            ServerError::QueryRejection(_)
            | ServerError::MissingPostId(_)
            | ServerError::Syndication(SyndicationError::InvalidPostId(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::JsonResponse(_)
            | ServerError::Syndication(_)
            | ServerError::Upstream(_)
            | ServerError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{JsonMode, ServerError};
    use axum::{http::StatusCode, response::IntoResponse};
    use tweetsnap_common::model::PostId;
    use tweetsnap_syndication::SyndicationError;

    #[test]
    fn error_status_codes() {
        let invalid_id = SyndicationError::InvalidPostId("x".parse::<PostId>().unwrap_err());

        let cases = [
            (ServerError::MissingPostId(JsonMode::Raw), StatusCode::BAD_REQUEST),
            (ServerError::Syndication(invalid_id), StatusCode::BAD_REQUEST),
            (ServerError::PostNotFound, StatusCode::NOT_FOUND),
            (
                ServerError::UnknownRoute("/nope".parse().unwrap()),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn missing_id_message_follows_json_mode() {
        assert_eq!(
            ServerError::MissingPostId(JsonMode::Raw).to_string(),
            "Missing tweet ID"
        );
        assert_eq!(
            ServerError::MissingPostId(JsonMode::Enriched).to_string(),
            "Missing tweet id"
        );
    }

    #[test]
    fn json_mode_from_config_value() {
        let mode: JsonMode = serde_json::from_str("\"raw\"").unwrap();
        assert_eq!(mode, JsonMode::Raw);
        assert_eq!(JsonMode::default(), JsonMode::Enriched);
    }
}
