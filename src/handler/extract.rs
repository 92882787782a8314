use std::{borrow::Cow, collections::HashMap, convert::Infallible};

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{headers, TypedHeader};
use pagelang::Language;

use super::AppState;

/// Where the language of a request was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Query,
    Cookie,
    Default,
}

/// Language of a request: the `lang` query parameter, then the `lang` cookie,
/// then the configured default.
pub struct RequestLanguage {
    pub language: Language,
    pub origin: Origin,
}

impl FromRequestParts<AppState> for RequestLanguage {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let settings = &state.settings;

        if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
            if let Some(language) = query.get(&settings.param).and_then(|v| Language::from_code(v)) {
                return Ok(Self {
                    language,
                    origin: Origin::Query,
                });
            }
        }

        if let Ok(TypedHeader(cookies)) = parts.extract::<TypedHeader<headers::Cookie>>().await {
            let language = cookies.get(&settings.cookie_name).and_then(|raw| {
                let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
                Language::from_code(&decoded)
            });
            if let Some(language) = language {
                return Ok(Self {
                    language,
                    origin: Origin::Cookie,
                });
            }
        }

        Ok(Self {
            language: settings.default_language,
            origin: Origin::Default,
        })
    }
}
