//! Page localization: pick a language from the URL or a cookie, load its
//! dictionary and fill marked elements with translated text.

pub mod controller;
pub mod dictionary;
pub mod error;
pub mod language;
pub mod page;
pub mod settings;
pub mod source;

pub use controller::Localizer;
pub use dictionary::{Dictionary, Params};
pub use error::LoadError;
pub use language::Language;
pub use settings::Settings;
