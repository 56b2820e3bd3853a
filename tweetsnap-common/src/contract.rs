pub const SYNDICATION_URL: &str = "https://cdn.syndication.twimg.com";

pub const TWEET_RESULT_PATH: &str = "/tweet-result";

pub const LANGUAGE: &str = "en";

/// Feature flags that select the current response shape.
pub const FEATURE_FLAGS: [&str; 14] = [
    "tfw_timeline_list:",
    "tfw_follower_count_sunset:true",
    "tfw_tweet_edit_backend:on",
    "tfw_refsrc_session:on",
    "tfw_fosnr_soft_interventions_enabled:on",
    "tfw_show_birdwatch_pivots_enabled:on",
    "tfw_show_business_verified_badge:on",
    "tfw_duplicate_scribes_to_settings:on",
    "tfw_use_profile_image_shape_enabled:on",
    "tfw_show_blue_verified_badge:on",
    "tfw_legacy_timeline_sunset:true",
    "tfw_show_gov_verified_badge:on",
    "tfw_show_business_affiliate_badge:on",
    "tfw_tweet_edit_frontend:on",
];

pub const FEATURE_FLAG_SEPARATOR: &str = ";";

pub const TOKEN_SCALE: f64 = 1e15;

pub const TOKEN_RADIX: u32 = 36;

pub const TOKEN_STRIPPED_CHARS: [char; 2] = ['0', '.'];

/// `__typename` of a removed or restricted post.
pub const TOMBSTONE_TYPENAME: &str = "TweetTombstone";

pub const LINK_HOST: &str = "https://x.com";

#[must_use]
pub fn feature_flags() -> String {
    FEATURE_FLAGS.join(FEATURE_FLAG_SEPARATOR)
}
