use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A language the page can be displayed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    En,
    Fr,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code `{0}`")]
pub struct UnsupportedLanguage(pub String);

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Fr];

    pub const DEFAULT: Language = Language::En;

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }

    /// Parses a code, returning `None` for empty or unsupported values.
    pub fn from_code(code: &str) -> Option<Self> {
        code.parse().ok()
    }

    /// Picks the initial language: the query parameter wins over the cookie,
    /// and either one only counts when it names a supported language.
    pub fn resolve(param: Option<&str>, cookie: Option<&str>) -> Self {
        Self::resolve_or(param, cookie, Self::DEFAULT)
    }

    pub fn resolve_or(param: Option<&str>, cookie: Option<&str>, fallback: Self) -> Self {
        param
            .and_then(Self::from_code)
            .or_else(|| cookie.and_then(Self::from_code))
            .unwrap_or(fallback)
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.eq_ignore_ascii_case("en") {
            Ok(Self::En)
        } else if code.eq_ignore_ascii_case("fr") {
            Ok(Self::Fr)
        } else {
            Err(UnsupportedLanguage(s.to_string()))
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
