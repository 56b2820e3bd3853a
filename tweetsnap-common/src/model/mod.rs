pub mod post;

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

pub const POST_ID_MAX_LEN: usize = 40;

// Kept as text; ids of up to 40 digits overflow u128.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Invalid tweet id: {0}")]
pub struct InvalidPostIdError(String);

impl InvalidPostIdError {
    #[must_use]
    pub fn rejected(&self) -> &str {
        &self.0
    }
}

impl PostId {
    pub fn new(id: String) -> Result<Self, InvalidPostIdError> {
        let is_valid = !id.is_empty()
            && id.len() <= POST_ID_MAX_LEN
            && id.bytes().all(|byte| byte.is_ascii_digit());

        if is_valid {
            Ok(PostId(id))
        } else {
            Err(InvalidPostIdError(id))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for PostId {
    type Err = InvalidPostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostId::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PostId"))
    }
}
