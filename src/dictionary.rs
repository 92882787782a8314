use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([0-9A-Za-z_]+)\}").expect("failed to compile placeholder regex"));

/// Named values substituted into `{name}` placeholders.
pub type Params<'a> = [(&'a str, &'a dyn fmt::Display)];

/// Localized messages of a single language, keyed by message id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Dictionary(HashMap<String, String>);

impl Dictionary {
    /// Parses a flat JSON object of strings.
    pub fn from_json(code: &str, text: &str) -> Result<Self, LoadError> {
        serde_json::from_str(text).map_err(|source| LoadError::Malformed {
            code: code.to_string(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-empty message for `key`.
    fn message(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|message| !message.is_empty())
    }

    /// Looks up `key`, answering with the key itself when it is missing or
    /// empty.
    pub fn translate(&self, key: &str) -> String {
        self.message(key).unwrap_or(key).to_string()
    }

    pub fn translate_with(&self, key: &str, params: &Params<'_>) -> String {
        match self.message(key) {
            Some(message) => interpolate(message, params),
            None => key.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Replaces every `{name}` token with the matching parameter. Unknown names
/// become empty, and substituted values are not scanned again.
pub fn interpolate(message: &str, params: &Params<'_>) -> String {
    PLACEHOLDER
        .replace_all(message, |caps: &Captures<'_>| {
            params
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}
