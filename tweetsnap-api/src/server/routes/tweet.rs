use crate::server::{
    JsonMode, Result, ServerError, ServerRouter, json::Json, query::Query,
};
use axum::{
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    routing::{RouterExt, TypedPath},
};
use headers::ContentType;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use tweetsnap_common::model::post::enrich;
use tweetsnap_render::RenderPipeline;
use tweetsnap_syndication::{FetchOutcome, SyndicationClient};

const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_tweet)
}

#[derive(TypedPath)]
#[typed_path("/api/tweet")]
struct TweetPath;

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
struct TweetQuery {
    id: Option<String>,
    format: Option<String>,
}

impl TweetQuery {
    fn wants_image(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.eq_ignore_ascii_case("image"))
    }
}

async fn get_tweet(
    TweetPath: TweetPath,
    State(syndication): State<Arc<SyndicationClient>>,
    State(renderer): State<Arc<RenderPipeline>>,
    State(json_mode): State<JsonMode>,
    Query(query): Query<TweetQuery>,
) -> Result<Response> {
    let wants_image = query.wants_image();
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or(ServerError::MissingPostId(json_mode))?;

    let post = match syndication.fetch(&id).await? {
        FetchOutcome::Found(post) => post,
        FetchOutcome::NotFound | FetchOutcome::Tombstoned => {
            return Err(ServerError::PostNotFound);
        }
        FetchOutcome::UpstreamError(err) => return Err(ServerError::Upstream(err)),
    };

    if wants_image {
        let image = renderer.render(&enrich(post)).await?;
        debug!(%id, bytes = image.png.len(), "Replying with image");

        let cache_control = [(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        )];
        return Ok((
            TypedHeader(ContentType::png()),
            cache_control,
            image.into_bytes(),
        )
            .into_response());
    }

    let response = match json_mode {
        JsonMode::Raw => Json(post).into_response(),
        JsonMode::Enriched => Json(enrich(post)).into_response(),
    };
    Ok(response)
}
