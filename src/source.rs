use std::{collections::HashMap, path::PathBuf, time::Duration};

use once_cell::sync::Lazy;
use reqwest::header::{self, HeaderMap};
use url::Url;

use crate::{dictionary::Dictionary, error::LoadError, language::Language};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        concat!("pagelang/", env!("CARGO_PKG_VERSION"))
            .parse()
            .expect("failed to parse header value"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build HTTP client")
});

/// Somewhere dictionaries can be fetched from, keyed by language.
#[allow(async_fn_in_trait)]
pub trait DictionarySource {
    async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError>;
}

impl<S: DictionarySource> DictionarySource for &S {
    async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError> {
        (**self).fetch(language).await
    }
}

/// Fetches the dictionary for `code`, or the one for `fallback` when that
/// fails. The fallback is tried at most once and never for itself.
pub async fn fetch_or_default<S: DictionarySource>(
    source: &S,
    code: &str,
    fallback: Language,
) -> Result<(Language, Dictionary), LoadError> {
    let error = match code.parse::<Language>() {
        Ok(language) => match source.fetch(language).await {
            Ok(dictionary) => return Ok((language, dictionary)),
            Err(error) if language == fallback => {
                tracing::error!(?error, %language, "failed to load default dictionary");
                return Err(error);
            }
            Err(error) => error,
        },
        Err(error) => error.into(),
    };

    tracing::warn!(?error, code, %fallback, "failed to load dictionary, falling back");
    match source.fetch(fallback).await {
        Ok(dictionary) => Ok((fallback, dictionary)),
        Err(error) => {
            tracing::error!(?error, language = %fallback, "failed to load default dictionary");
            Err(error)
        }
    }
}

/// Fetches `locales/{code}.json` relative to a base URL, bypassing caches.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            client: HTTP_CLIENT.clone(),
        }
    }

    pub fn with_client(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    pub fn url_for(&self, language: Language) -> Result<Url, LoadError> {
        self.base
            .join(&format!("locales/{}.json", language.code()))
            .map_err(|source| LoadError::InvalidUrl {
                base: self.base.to_string(),
                source,
            })
    }
}

impl DictionarySource for HttpSource {
    async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError> {
        let url = self.url_for(language)?;
        tracing::debug!(%url, "fetching dictionary");
        let resp = self
            .client
            .get(url.clone())
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status,
            });
        }
        let text = resp.text().await.map_err(|source| LoadError::Request {
            url: url.to_string(),
            source,
        })?;
        Dictionary::from_json(language.code(), &text)
    }
}

/// Reads `{dir}/{code}.json` from the filesystem.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, language: Language) -> PathBuf {
        self.dir.join(format!("{}.json", language.code()))
    }
}

impl DictionarySource for DirSource {
    async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError> {
        let path = self.path_for(language);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io { path, source })?;
        Dictionary::from_json(language.code(), &text)
    }
}

/// Raw JSON payloads kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    payloads: HashMap<Language, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, language: Language, json: impl Into<String>) -> Self {
        self.insert(language, json);
        self
    }

    pub fn insert(&mut self, language: Language, json: impl Into<String>) {
        self.payloads.insert(language, json.into());
    }

    pub fn remove(&mut self, language: Language) -> Option<String> {
        self.payloads.remove(&language)
    }
}

impl DictionarySource for MemorySource {
    async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError> {
        let text = self
            .payloads
            .get(&language)
            .ok_or_else(|| LoadError::NotFound {
                code: language.code().to_string(),
            })?;
        Dictionary::from_json(language.code(), text)
    }
}
