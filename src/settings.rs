use serde::Deserialize;
use time::{format_description::BorrowedFormatItem, macros::format_description, Duration, OffsetDateTime};

use crate::language::Language;

const COOKIE_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

fn default_param() -> String {
    "lang".to_string()
}

fn default_cookie_name() -> String {
    "lang".to_string()
}

fn default_cookie_days() -> i64 {
    365
}

fn default_title_key() -> String {
    "app_title".to_string()
}

fn default_switcher_id() -> String {
    "langSwitch".to_string()
}

fn default_active_classes() -> Vec<String> {
    vec!["bg-slate-900".to_string(), "text-white".to_string()]
}

fn default_inactive_classes() -> Vec<String> {
    vec!["bg-white".to_string()]
}

/// Names and constants shared between the page contract and the server.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_param")]
    pub param: String,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_cookie_days")]
    pub cookie_days: i64,

    #[serde(default)]
    pub default_language: Language,

    /// Dictionary entry that supplies the document title.
    #[serde(default = "default_title_key")]
    pub title_key: String,

    #[serde(default = "default_switcher_id")]
    pub switcher_id: String,

    #[serde(default = "default_active_classes")]
    pub active_classes: Vec<String>,

    #[serde(default = "default_inactive_classes")]
    pub inactive_classes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            param: default_param(),
            cookie_name: default_cookie_name(),
            cookie_days: default_cookie_days(),
            default_language: Language::DEFAULT,
            title_key: default_title_key(),
            switcher_id: default_switcher_id(),
            active_classes: default_active_classes(),
            inactive_classes: default_inactive_classes(),
        }
    }
}

impl Settings {
    pub const TEXT_MARKER: &'static str = "data-i18n";
    pub const PLACEHOLDER_MARKER: &'static str = "data-i18n-attr-placeholder";
    pub const TITLE_MARKER: &'static str = "data-i18n-attr-title";
    pub const LANG_MARKER: &'static str = "data-lang";

    /// `None` when `cookie_days` does not fit a [`Duration`].
    pub fn cookie_lifetime(&self) -> Option<Duration> {
        self.cookie_days.checked_mul(86_400).map(Duration::seconds)
    }

    /// `Set-Cookie` style assignment that remembers `language` site-wide.
    pub fn language_cookie(&self, language: Language) -> String {
        let value = urlencoding::encode(language.code());
        let expires = self
            .cookie_lifetime()
            .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime));
        let Some(expires) = expires else {
            tracing::warn!(days = self.cookie_days, "cookie expiry out of range");
            return format!("{}={value}; path=/", self.cookie_name);
        };
        match expires.format(COOKIE_DATE) {
            Ok(expires) => format!("{}={value}; expires={expires}; path=/", self.cookie_name),
            Err(error) => {
                tracing::warn!(?error, "failed to format cookie expiry");
                format!("{}={value}; path=/", self.cookie_name)
            }
        }
    }
}
