use askama::Template;
use pagelang::{Dictionary, Language};

mod filters;

pub struct SwitchButton {
    pub code: &'static str,
    pub class: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub language: Language,
    /// Left out of the page when the dictionary has no title.
    pub title: Option<String>,
    pub dictionary: Dictionary,
    pub param: String,
    pub switcher_id: String,
    pub buttons: Vec<SwitchButton>,
    pub intro: String,
    pub footer: String,
}
