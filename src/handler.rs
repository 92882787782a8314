mod extract;
mod templates;

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    response::{AppendHeaders, Html, IntoResponse},
    routing, Json, Router,
};
use http::{header, HeaderName, StatusCode};
use pagelang::{
    source::{fetch_or_default, DictionarySource, DirSource},
    Dictionary, Language, Settings,
};

use self::{
    extract::{Origin, RequestLanguage},
    templates::{IndexTemplate, SwitchButton},
};

const BUTTON_BASE_CLASS: &str = "px-2 py-1 rounded";

#[derive(Clone)]
pub struct AppState {
    pub source: DirSource,
    pub settings: Arc<Settings>,
    pub origin: Arc<str>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", routing::get(get_healthz))
        .route("/locales/{file}", routing::get(get_locale))
        .route("/", routing::get(get_index))
        .with_state(state)
}

async fn get_healthz() -> &'static str {
    "ok"
}

async fn get_locale(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let language = file
        .strip_suffix(".json")
        .and_then(|code| Language::from_code(code).filter(|l| l.code() == code))
        .ok_or(StatusCode::NOT_FOUND)?;

    match state.source.fetch(language).await {
        Ok(dictionary) => Ok(([(header::CACHE_CONTROL, "no-cache")], Json(dictionary))),
        Err(error) if error.is_not_found() => Err(StatusCode::NOT_FOUND),
        Err(error) => {
            tracing::error!(?error, %language, "failed to load dictionary");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_index(
    State(state): State<AppState>,
    RequestLanguage { language, origin }: RequestLanguage,
) -> Result<(AppendHeaders<Vec<(HeaderName, String)>>, Html<String>), StatusCode> {
    let settings = &state.settings;
    let (language, dictionary) =
        match fetch_or_default(&state.source, language.code(), settings.default_language).await {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::error!(?error, "no dictionary available, rendering keys");
                (language, Dictionary::default())
            }
        };

    let mut headers = Vec::new();
    if origin == Origin::Query {
        headers.push((header::SET_COOKIE, settings.language_cookie(language)));
    }

    let buttons = Language::ALL
        .into_iter()
        .map(|candidate| {
            let classes = if candidate == language {
                &settings.active_classes
            } else {
                &settings.inactive_classes
            };
            let mut class = BUTTON_BASE_CLASS.to_string();
            for c in classes {
                class.push(' ');
                class.push_str(c);
            }
            SwitchButton {
                code: candidate.code(),
                class,
            }
        })
        .collect();

    let count = Language::ALL.len();
    let title = dictionary
        .get(&settings.title_key)
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    let template = IndexTemplate {
        language,
        title,
        param: settings.param.clone(),
        intro: dictionary.translate_with("intro", &[("origin", &state.origin)]),
        footer: dictionary.translate_with("footer", &[("count", &count)]),
        switcher_id: settings.switcher_id.clone(),
        buttons,
        dictionary,
    };
    let html = template.render().map_err(|error| {
        tracing::error!(?error, "failed to render index page");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((AppendHeaders(headers), Html(html)))
}
