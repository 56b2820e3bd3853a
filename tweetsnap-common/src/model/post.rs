use crate::contract::LINK_HOST;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::Error as _,
    ser::SerializeMap,
};
use serde_json::{Map, Value};
use thiserror::Error;
use urlencoding::encode;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum MalformedPostError {
    #[error("The post is not a JSON object")]
    NotAnObject,
    #[error("The post is missing a string `id_str`")]
    MissingId,
    #[error("The post is missing a `user` object with a string `screen_name`")]
    MissingScreenName,
}

/// A post record as returned by the syndication service.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(transparent)]
pub struct RawPost(Map<String, Value>);

impl RawPost {
    #[must_use]
    pub fn id_str(&self) -> &str {
        self.0.get("id_str").and_then(Value::as_str).unwrap_or_default()
    }

    #[must_use]
    pub fn screen_name(&self) -> &str {
        self.user()
            .and_then(|user| user.get("screen_name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn user(&self) -> Option<&Map<String, Value>> {
        self.0.get("user").and_then(Value::as_object)
    }

    /// Id of the post this one replies to; empty strings count as absent.
    #[must_use]
    pub fn in_reply_to_status_id_str(&self) -> Option<&str> {
        self.str_field("in_reply_to_status_id_str")
            .filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn in_reply_to_screen_name(&self) -> Option<&str> {
        self.str_field("in_reply_to_screen_name")
    }

    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for RawPost {
    type Error = MalformedPostError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(MalformedPostError::NotAnObject);
        };

        if !fields.get("id_str").is_some_and(Value::is_string) {
            return Err(MalformedPostError::MissingId);
        }

        let has_screen_name = fields
            .get("user")
            .and_then(Value::as_object)
            .and_then(|user| user.get("screen_name"))
            .is_some_and(Value::is_string);
        if !has_screen_name {
            return Err(MalformedPostError::MissingScreenName);
        }

        Ok(Self(fields))
    }
}

impl<'de> Deserialize<'de> for RawPost {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RawPost::try_from(value).map_err(D::Error::custom)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostLinks {
    pub url: String,
    pub user_url: String,
    pub user_follow_url: String,
    pub like_url: String,
    pub reply_url: String,
    pub in_reply_to_url: Option<String>,
}

impl PostLinks {
    pub const TOP_LEVEL_FIELDS: [&'static str; 4] =
        ["url", "like_url", "reply_url", "in_reply_to_url"];

    #[must_use]
    pub fn derive(post: &RawPost) -> Self {
        let screen_name = encode(post.screen_name());
        let id = encode(post.id_str());

        let in_reply_to_url = post.in_reply_to_status_id_str().map(|reply_id| {
            status_url(post.in_reply_to_screen_name().unwrap_or_default(), reply_id)
        });

        Self {
            url: format!("{LINK_HOST}/{screen_name}/status/{id}"),
            user_url: format!("{LINK_HOST}/{screen_name}"),
            user_follow_url: format!("{LINK_HOST}/intent/follow?screen_name={screen_name}"),
            like_url: format!("{LINK_HOST}/intent/like?tweet_id={id}"),
            reply_url: format!("{LINK_HOST}/intent/tweet?in_reply_to={id}"),
            in_reply_to_url,
        }
    }
}

fn status_url(screen_name: &str, id: &str) -> String {
    format!(
        "{LINK_HOST}/{}/status/{}",
        encode(screen_name),
        encode(id)
    )
}

/// A post together with its derived links.
///
/// Serializes as a single object holding every original field followed by
/// the link fields. The author links go into the `user` object as `url` and
/// `follow_url`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnrichedPost {
    pub post: RawPost,
    pub links: PostLinks,
}

impl EnrichedPost {
    #[must_use]
    pub fn raw(&self) -> &RawPost {
        &self.post
    }
}

impl Serialize for EnrichedPost {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let links = &self.links;
        let mut user = self.post.user().cloned().unwrap_or_default();
        user.insert("url".to_owned(), Value::from(links.user_url.as_str()));
        user.insert("follow_url".to_owned(), Value::from(links.user_follow_url.as_str()));

        let mut map = serializer.serialize_map(None)?;

        // Derived names only exist in the record if it was enriched before;
        // the derived values are identical then.
        for (key, value) in self.post.as_map() {
            if key == "user" {
                map.serialize_entry(key, &user)?;
            } else if !PostLinks::TOP_LEVEL_FIELDS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }

        map.serialize_entry("url", &links.url)?;
        map.serialize_entry("like_url", &links.like_url)?;
        map.serialize_entry("reply_url", &links.reply_url)?;
        if let Some(in_reply_to_url) = &links.in_reply_to_url {
            map.serialize_entry("in_reply_to_url", in_reply_to_url)?;
        }

        map.end()
    }
}

#[must_use]
pub fn enrich(post: RawPost) -> EnrichedPost {
    let links = PostLinks::derive(&post);
    EnrichedPost { post, links }
}
