use std::path::PathBuf;

use eyre::Context;
use pagelang::Language;
use serde::Deserialize;

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_locales_dir() -> PathBuf {
    PathBuf::from("locales")
}

fn default_origin() -> String {
    "Paris".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_locales_dir")]
    pub locales_dir: PathBuf,

    #[serde(default)]
    pub default_language: Language,

    /// Substituted into the `{origin}` placeholder of the demo page.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Config {
    pub fn try_from_env() -> eyre::Result<Self> {
        envy::from_env().context("failed to read config from environment variables")
    }
}
