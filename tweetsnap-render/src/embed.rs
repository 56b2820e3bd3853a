use maud::{Markup, html};
use serde_json::Value;
use tweetsnap_common::model::post::EnrichedPost;

pub const THEME_CSS: &str = include_str!("../assets/theme.css");

pub trait EmbedMarkup: Send + Sync {
    fn stylesheet(&self) -> &str;

    fn render(&self, post: &EnrichedPost) -> String;
}

/// Light-theme card modelled on the official embed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct EmbeddedTweet;

impl EmbedMarkup for EmbeddedTweet {
    fn stylesheet(&self) -> &str {
        THEME_CSS
    }

    fn render(&self, post: &EnrichedPost) -> String {
        embedded_tweet(post).into_string()
    }
}

fn is_safe_url(url: &str) -> bool {
    url.starts_with("https://")
}

fn user_str<'a>(post: &'a EnrichedPost, key: &str) -> Option<&'a str> {
    post.raw()
        .user()
        .and_then(|user| user.get(key))
        .and_then(Value::as_str)
}

fn photo_urls(post: &EnrichedPost) -> Vec<&str> {
    post.raw()
        .get("photos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|photo| photo.get("url").and_then(Value::as_str))
        .filter(|url| is_safe_url(url))
        .collect()
}

fn count(post: &EnrichedPost, key: &str) -> Option<u64> {
    post.raw().get(key).and_then(Value::as_u64)
}

fn format_count(n: u64) -> String {
    // Rounded to tenths of the unit before the unit is picked.
    let in_tenths = |unit: u64| n.saturating_add(unit / 20) / (unit / 10);
    let compact = |tenths: u64, suffix: &str| match tenths % 10 {
        0 => format!("{}{suffix}", tenths / 10),
        fraction => format!("{}.{fraction}{suffix}", tenths / 10),
    };

    if n < 1_000 {
        return n.to_string();
    }
    match in_tenths(1_000) {
        thousands @ ..10_000 => compact(thousands, "K"),
        _ => compact(in_tenths(1_000_000), "M"),
    }
}

fn embedded_tweet(post: &EnrichedPost) -> Markup {
    let raw = post.raw();
    let links = &post.links;
    let name = user_str(post, "name").unwrap_or_else(|| raw.screen_name());
    let avatar = user_str(post, "profile_image_url_https").filter(|url| is_safe_url(url));
    let verified = raw
        .user()
        .and_then(|user| user.get("is_blue_verified"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let text = raw.str_field("text").unwrap_or_default();
    let photos = photo_urls(post);
    let likes = count(post, "favorite_count");
    let replies = count(post, "conversation_count");

    html! {
        article class="tweet" {
            header class="tweet-header" {
                a class="tweet-avatar" href=(links.user_url) {
                    @if let Some(avatar) = avatar {
                        img src=(avatar) alt=(name) width="48" height="48";
                    }
                }
                div class="tweet-author" {
                    a class="tweet-author-name" href=(links.user_url) {
                        (name)
                        @if verified {
                            span class="tweet-verified" title="Verified account" { "✓" }
                        }
                    }
                    div class="tweet-author-meta" {
                        a class="tweet-author-handle" href=(links.user_url) { "@" (raw.screen_name()) }
                        " · "
                        a class="tweet-follow" href=(links.user_follow_url) { "Follow" }
                    }
                }
            }
            @if let Some(in_reply_to_url) = &links.in_reply_to_url {
                a class="tweet-in-reply-to" href=(in_reply_to_url) {
                    "Replying to @" (raw.in_reply_to_screen_name().unwrap_or_default())
                }
            }
            p class="tweet-body" { (text) }
            @if !photos.is_empty() {
                div class={ "tweet-media tweet-media-" (photos.len().min(4)) } {
                    @for photo in photos.iter().take(4) {
                        img class="tweet-photo" src=(photo) alt="";
                    }
                }
            }
            @if let Some(created_at) = raw.str_field("created_at") {
                a class="tweet-date" href=(links.url) { time datetime=(created_at) { (created_at) } }
            }
            footer class="tweet-actions" {
                a class="tweet-action tweet-like" href=(links.like_url) {
                    "♥"
                    @if let Some(likes) = likes { span { (format_count(likes)) } }
                }
                a class="tweet-action tweet-reply" href=(links.reply_url) {
                    "Reply"
                    @if let Some(replies) = replies { span { (format_count(replies)) } }
                }
                a class="tweet-action tweet-permalink" href=(links.url) { "Read more on X" }
            }
        }
    }
}
