use std::borrow::Cow;

use tokio::sync::broadcast;

use crate::{
    dictionary::{Dictionary, Params},
    error::LoadError,
    language::Language,
    page::{Element, Page},
    settings::Settings,
    source::{fetch_or_default, DictionarySource},
};

const CHANGE_CAPACITY: usize = 16;

/// Owns the active language and dictionary of one page session and keeps the
/// page in sync with them.
///
/// Every mutating operation takes `&mut self`, so switches on one controller
/// never interleave. A host that shares the controller between event handlers
/// decides the order itself; overlapping switches are neither de-duplicated
/// nor cancelled.
pub struct Localizer<S, P> {
    source: S,
    page: P,
    settings: Settings,
    language: Language,
    dictionary: Dictionary,
    changes: broadcast::Sender<Language>,
}

impl<S, P> Localizer<S, P>
where
    S: DictionarySource,
    P: Page,
{
    pub fn new(source: S, page: P) -> Self {
        Self::with_settings(source, page, Settings::default())
    }

    pub fn with_settings(source: S, page: P, settings: Settings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            source,
            page,
            language: settings.default_language,
            dictionary: Dictionary::default(),
            settings,
            changes,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Receives the new language after every successful switch.
    pub fn subscribe(&self) -> broadcast::Receiver<Language> {
        self.changes.subscribe()
    }

    /// Language named by the URL, else by the cookie, else the default.
    pub fn resolve_initial_language(&self) -> Language {
        let param = self.page.query_param(&self.settings.param);
        let cookie = self.page.cookie(&self.settings.cookie_name).map(|raw| {
            urlencoding::decode(&raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.clone())
        });
        Language::resolve_or(
            param.as_deref(),
            cookie.as_deref(),
            self.settings.default_language,
        )
    }

    /// Loads the dictionary for `code`, falling back to the default language
    /// once. On a failure of the default itself the previous state is kept and
    /// that error is returned.
    pub async fn load(&mut self, code: &str) -> Result<Language, LoadError> {
        let (language, dictionary) =
            fetch_or_default(&self.source, code, self.settings.default_language).await?;
        tracing::debug!(%language, entries = dictionary.len(), "dictionary loaded");

        self.page.set_document_language(language.code());
        if let Some(title) = dictionary
            .get(&self.settings.title_key)
            .filter(|title| !title.is_empty())
        {
            self.page.set_title(title);
        }
        self.language = language;
        self.dictionary = dictionary;
        Ok(language)
    }

    /// Message for `key`, or `key` itself when the dictionary lacks it.
    pub fn translate(&self, key: &str) -> String {
        self.dictionary.translate(key)
    }

    pub fn translate_with(&self, key: &str, params: &Params<'_>) -> String {
        self.dictionary.translate_with(key, params)
    }

    /// Rewrites every marked element from the current dictionary and marks
    /// the active switcher button. Safe to repeat.
    pub fn apply_translations(&self) {
        for element in self.page.query_all(Settings::TEXT_MARKER) {
            if let Some(key) = element.attribute(Settings::TEXT_MARKER) {
                element.set_text_content(&self.translate(&key));
            }
        }
        for (marker, attribute) in [
            (Settings::PLACEHOLDER_MARKER, "placeholder"),
            (Settings::TITLE_MARKER, "title"),
        ] {
            for element in self.page.query_all(marker) {
                if let Some(key) = element.attribute(marker) {
                    element.set_attribute(attribute, &self.translate(&key));
                }
            }
        }

        let Some(switcher) = self.page.element_by_id(&self.settings.switcher_id) else {
            return;
        };
        for button in switcher
            .query_all(Settings::LANG_MARKER)
            .into_iter()
            .filter(|element| element.tag_name().eq_ignore_ascii_case("button"))
        {
            let active =
                button.attribute(Settings::LANG_MARKER).as_deref() == Some(self.language.code());
            for class in &self.settings.active_classes {
                button.toggle_class(class, active);
            }
            for class in &self.settings.inactive_classes {
                button.toggle_class(class, !active);
            }
        }
    }

    /// Switches to `code` and reports the language that ended up active.
    ///
    /// The requested language is what gets written to the URL and cookie and
    /// announced to subscribers, even when its dictionary was unavailable and
    /// the default one was loaded instead. A code outside the supported set
    /// has no language to remember, so the active one is used for it.
    pub async fn set_language(&mut self, code: &str) -> Language {
        let Ok(active) = self.load(code).await else {
            self.apply_translations();
            return self.language;
        };
        let requested = Language::from_code(code).unwrap_or(active);
        self.persist(requested);
        self.apply_translations();
        tracing::info!(%requested, %active, "language changed");
        // no subscribers is not an error
        let _ = self.changes.send(requested);
        active
    }

    fn persist(&self, language: Language) {
        self.page
            .replace_query_param(&self.settings.param, language.code());
        self.page
            .set_cookie(&self.settings.language_cookie(language));
    }

    /// Brings the page up: waits for the document, loads the initial language
    /// and fills in the marked elements. Load failures only leave keys shown.
    pub async fn init(&mut self) -> Language {
        self.page.ready().await;
        let language = self.resolve_initial_language();
        tracing::debug!(%language, "initial language resolved");
        // failures are logged by load and leave the keys visible
        let _ = self.load(language.code()).await;
        self.apply_translations();
        self.language
    }

    /// Delegated click handling for the switcher: a click anywhere inside a
    /// `button[data-lang]` switches to that button's language unless it is
    /// already active.
    pub async fn handle_click(&mut self, target: &P::Element) -> Option<Language> {
        let switcher = self.page.element_by_id(&self.settings.switcher_id)?;
        let button = target.closest("button", Settings::LANG_MARKER)?;
        if !switcher.contains(&button) {
            return None;
        }
        let code = button.attribute(Settings::LANG_MARKER)?;
        if code.is_empty() || Language::from_code(&code) == Some(self.language) {
            return None;
        }
        Some(self.set_language(&code).await)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::{
        page::{MemoryElement, MemoryPage},
        source::MemorySource,
    };

    const EN: &str = r#"{
        "app_title": "Route planner",
        "greeting": "Hi {name}",
        "search": "Search",
        "search_hint": "Type a city",
        "close": "Close"
    }"#;

    const FR: &str = r#"{
        "app_title": "Planificateur",
        "greeting": "Salut {name}",
        "search": "Rechercher",
        "search_hint": "Tapez une ville",
        "close": "Fermer"
    }"#;

    fn source() -> MemorySource {
        MemorySource::new()
            .with(Language::En, EN)
            .with(Language::Fr, FR)
    }

    fn button(code: &str) -> MemoryElement {
        MemoryElement::new("button")
            .with_attribute("data-lang", code)
            .with_attribute("class", "px-2 bg-white")
            .with_text(&code.to_uppercase())
    }

    fn demo_page(url: &str) -> MemoryPage {
        let body = MemoryElement::new("body")
            .with_child(
                MemoryElement::new("div")
                    .with_attribute("id", "langSwitch")
                    .with_child(button("en"))
                    .with_child(button("fr")),
            )
            .with_child(MemoryElement::new("h1").with_attribute("data-i18n", "search"))
            .with_child(MemoryElement::new("h2").with_attribute("data-i18n", "missing.key"))
            .with_child(
                MemoryElement::new("input")
                    .with_attribute("data-i18n-attr-placeholder", "search_hint"),
            )
            .with_child(MemoryElement::new("a").with_attribute("data-i18n-attr-title", "close"));
        MemoryPage::parse(url)
            .unwrap()
            .with_title("untitled")
            .with_body(body)
    }

    fn find(page: &MemoryPage, marker: &str, key: &str) -> MemoryElement {
        page.query_all(marker)
            .into_iter()
            .find(|element| element.attribute(marker).as_deref() == Some(key))
            .unwrap()
    }

    fn switch_button(page: &MemoryPage, code: &str) -> MemoryElement {
        find(page, "data-lang", code)
    }

    #[tokio::test]
    async fn loaded_dictionary_backs_translate() {
        for (language, json) in [(Language::En, EN), (Language::Fr, FR)] {
            let mut localizer = Localizer::new(source(), demo_page("https://example.com/"));
            assert_eq!(localizer.load(language.code()).await.unwrap(), language);
            let expected = Dictionary::from_json(language.code(), json).unwrap();
            for (key, value) in expected.iter() {
                assert_eq!(localizer.translate(key), value);
            }
        }
    }

    #[tokio::test]
    async fn unknown_key_is_echoed_in_every_state() {
        let mut localizer = Localizer::new(source(), demo_page("https://example.com/"));
        assert_eq!(localizer.translate("nav.unknown"), "nav.unknown");
        localizer.load("fr").await.unwrap();
        assert_eq!(localizer.translate("nav.unknown"), "nav.unknown");
    }

    #[tokio::test]
    async fn interpolates_params() {
        let mut localizer = Localizer::new(source(), demo_page("https://example.com/"));
        localizer.load("en").await.unwrap();
        assert_eq!(localizer.translate_with("greeting", &[("name", &"Ada")]), "Hi Ada");
        assert_eq!(localizer.translate_with("greeting", &[]), "Hi ");
    }

    #[test]
    fn initial_language_priority() {
        let cases = [
            (demo_page("https://example.com/?lang=fr").with_cookie("lang", "en"), Language::Fr),
            (demo_page("https://example.com/").with_cookie("lang", "fr"), Language::Fr),
            (demo_page("https://example.com/?lang=FR"), Language::Fr),
            (demo_page("https://example.com/?lang=de").with_cookie("lang", "fr"), Language::Fr),
            (demo_page("https://example.com/"), Language::En),
        ];
        for (page, expected) in cases {
            let localizer = Localizer::new(source(), page);
            assert_eq!(localizer.resolve_initial_language(), expected);
        }
    }

    #[tokio::test]
    async fn unsupported_language_falls_back_to_default() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.load("fr").await.unwrap();

        assert_eq!(localizer.load("de").await.unwrap(), Language::En);
        assert_eq!(localizer.language(), Language::En);
        assert_eq!(localizer.translate("search"), "Search");
        assert_eq!(page.root().attribute("lang").as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn missing_resource_falls_back_to_default() {
        let source = MemorySource::new().with(Language::En, EN);
        let mut localizer = Localizer::new(source, demo_page("https://example.com/"));
        assert_eq!(localizer.load("fr").await.unwrap(), Language::En);
        assert_eq!(localizer.translate("close"), "Close");
    }

    #[tokio::test]
    async fn total_failure_keeps_previous_state() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.load("fr").await.unwrap();

        localizer.source = MemorySource::new().with(Language::En, "{ not json");

        assert!(localizer.load("fr").await.is_err());
        assert!(localizer.load("en").await.is_err());
        assert_eq!(localizer.language(), Language::Fr);
        assert_eq!(localizer.translate("close"), "Fermer");
        assert_eq!(page.title(), "Planificateur");
    }

    #[tokio::test]
    async fn empty_title_entry_leaves_title_alone() {
        let source = MemorySource::new().with(Language::En, r#"{"app_title": ""}"#);
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source, page.clone());
        localizer.load("en").await.unwrap();
        assert_eq!(page.title(), "untitled");
    }

    #[tokio::test]
    async fn apply_translations_fills_markers_and_switcher() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.load("fr").await.unwrap();
        localizer.apply_translations();

        assert_eq!(find(&page, "data-i18n", "search").text_content(), "Rechercher");
        assert_eq!(find(&page, "data-i18n", "missing.key").text_content(), "missing.key");
        assert_eq!(
            find(&page, "data-i18n-attr-placeholder", "search_hint")
                .attribute("placeholder")
                .as_deref(),
            Some("Tapez une ville")
        );
        assert_eq!(
            find(&page, "data-i18n-attr-title", "close")
                .attribute("title")
                .as_deref(),
            Some("Fermer")
        );

        let fr = switch_button(&page, "fr");
        let en = switch_button(&page, "en");
        assert!(fr.has_class("bg-slate-900") && fr.has_class("text-white"));
        assert!(!fr.has_class("bg-white"));
        assert!(en.has_class("bg-white") && !en.has_class("text-white"));
    }

    #[tokio::test]
    async fn apply_translations_is_idempotent() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.load("fr").await.unwrap();

        localizer.apply_translations();
        let first = page.root().outer_html();
        localizer.apply_translations();
        assert_eq!(page.root().outer_html(), first);
    }

    #[test]
    fn apply_translations_without_switcher() {
        let page = MemoryPage::parse("https://example.com/").unwrap().with_body(
            MemoryElement::new("body").with_child(MemoryElement::new("p").with_attribute("data-i18n", "k")),
        );
        let localizer = Localizer::new(source(), page.clone());
        localizer.apply_translations();
        assert_eq!(find(&page, "data-i18n", "k").text_content(), "k");
    }

    #[tokio::test]
    async fn set_language_persists_and_notifies_once() {
        let page = demo_page("https://example.com/app?view=map");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.init().await;
        let mut changes = localizer.subscribe();

        assert_eq!(localizer.set_language("fr").await, Language::Fr);

        assert_eq!(page.query_param("lang").as_deref(), Some("fr"));
        assert_eq!(page.query_param("view").as_deref(), Some("map"));
        assert_eq!(page.history_len(), 1);
        assert_eq!(page.cookie("lang").as_deref(), Some("fr"));
        assert_eq!(page.root().attribute("lang").as_deref(), Some("fr"));
        assert_eq!(page.title(), "Planificateur");
        assert_eq!(find(&page, "data-i18n", "search").text_content(), "Rechercher");

        assert_eq!(changes.try_recv().ok(), Some(Language::Fr));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn cookie_is_written_once_per_switch() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.set_language("fr").await;
        localizer.set_language("en").await;

        let writes = page.cookie_writes();
        assert_eq!(writes.len(), 2);
        assert!(writes[0].starts_with("lang=fr;"));
        assert!(writes[1].starts_with("lang=en;") && writes[1].ends_with("path=/"));
    }

    #[tokio::test]
    async fn fallback_switch_remembers_requested_language() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(MemorySource::new().with(Language::En, EN), page.clone());
        let mut changes = localizer.subscribe();

        assert_eq!(localizer.set_language("fr").await, Language::En);
        assert_eq!(localizer.language(), Language::En);
        assert_eq!(localizer.translate("search"), "Search");
        assert_eq!(page.query_param("lang").as_deref(), Some("fr"));
        assert_eq!(page.cookie("lang").as_deref(), Some("fr"));
        assert_eq!(page.root().attribute("lang").as_deref(), Some("en"));
        assert_eq!(changes.try_recv().ok(), Some(Language::Fr));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn unsupported_switch_remembers_default() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        let mut changes = localizer.subscribe();

        assert_eq!(localizer.set_language("de").await, Language::En);
        assert_eq!(page.query_param("lang").as_deref(), Some("en"));
        assert_eq!(changes.try_recv().ok(), Some(Language::En));
    }

    #[tokio::test]
    async fn click_on_active_language_with_other_case_is_ignored() {
        let page = demo_page("https://example.com/");
        let upper = MemoryElement::new("button").with_attribute("data-lang", "FR");
        page.element_by_id("langSwitch").unwrap().append_child(upper.clone());
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.load("fr").await.unwrap();
        let mut changes = localizer.subscribe();

        assert_eq!(localizer.handle_click(&upper).await, None);
        assert!(page.cookie_writes().is_empty());
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
    }

    struct DeferredPage {
        inner: MemoryPage,
    }

    impl Page for DeferredPage {
        type Element = MemoryElement;

        async fn ready(&self) {
            tokio::task::yield_now().await;
            // the URL only carries the language once the document is parsed
            self.inner.replace_query_param("lang", "fr");
        }

        fn query_all(&self, attribute: &str) -> Vec<MemoryElement> {
            self.inner.query_all(attribute)
        }

        fn element_by_id(&self, id: &str) -> Option<MemoryElement> {
            self.inner.element_by_id(id)
        }

        fn set_document_language(&self, code: &str) {
            self.inner.set_document_language(code)
        }

        fn title(&self) -> String {
            self.inner.title()
        }

        fn set_title(&self, title: &str) {
            self.inner.set_title(title)
        }

        fn query_param(&self, name: &str) -> Option<String> {
            self.inner.query_param(name)
        }

        fn replace_query_param(&self, name: &str, value: &str) {
            self.inner.replace_query_param(name, value)
        }

        fn cookie(&self, name: &str) -> Option<String> {
            self.inner.cookie(name)
        }

        fn set_cookie(&self, cookie: &str) {
            self.inner.set_cookie(cookie)
        }
    }

    #[tokio::test]
    async fn init_waits_for_document_ready() {
        let inner = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), DeferredPage { inner: inner.clone() });

        assert_eq!(localizer.resolve_initial_language(), Language::En);
        assert_eq!(localizer.init().await, Language::Fr);
        assert_eq!(find(&inner, "data-i18n", "search").text_content(), "Rechercher");
    }

    #[tokio::test]
    async fn failed_switch_does_not_notify_or_persist() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(MemorySource::new(), page.clone());
        let mut changes = localizer.subscribe();

        assert_eq!(localizer.set_language("fr").await, Language::En);
        assert_eq!(page.query_param("lang"), None);
        assert!(page.cookie_writes().is_empty());
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(find(&page, "data-i18n", "search").text_content(), "search");
    }

    #[tokio::test]
    async fn init_uses_cookie_and_survives_missing_dictionaries() {
        let page = demo_page("https://example.com/").with_cookie("lang", "fr");
        let mut localizer = Localizer::new(source(), page.clone());
        assert_eq!(localizer.init().await, Language::Fr);
        assert_eq!(find(&page, "data-i18n", "search").text_content(), "Rechercher");

        let page = demo_page("https://example.com/?lang=fr");
        let mut localizer = Localizer::new(MemorySource::new(), page.clone());
        assert_eq!(localizer.init().await, Language::En);
        assert_eq!(find(&page, "data-i18n", "search").text_content(), "search");
    }

    #[tokio::test]
    async fn click_inside_button_switches_once() {
        let page = demo_page("https://example.com/");
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.init().await;
        let mut changes = localizer.subscribe();

        let label = MemoryElement::new("span");
        switch_button(&page, "fr").append_child(label.clone());

        assert_eq!(localizer.handle_click(&label).await, Some(Language::Fr));
        assert_eq!(localizer.handle_click(&switch_button(&page, "fr")).await, None);
        assert_eq!(changes.try_recv().ok(), Some(Language::Fr));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn clicks_outside_switcher_are_ignored() {
        let page = demo_page("https://example.com/");
        let stray = MemoryElement::new("button").with_attribute("data-lang", "fr");
        page.root().append_child(stray.clone());
        let mut localizer = Localizer::new(source(), page.clone());
        localizer.init().await;

        assert_eq!(localizer.handle_click(&stray).await, None);
        let heading = find(&page, "data-i18n", "search");
        assert_eq!(localizer.handle_click(&heading).await, None);
        assert_eq!(localizer.language(), Language::En);
    }

    struct CountingSource {
        inner: MemorySource,
        fetches: Cell<usize>,
    }

    impl DictionarySource for CountingSource {
        async fn fetch(&self, language: Language) -> Result<Dictionary, LoadError> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch(language).await
        }
    }

    #[tokio::test]
    async fn fallback_is_attempted_only_once() {
        let source = CountingSource {
            inner: MemorySource::new(),
            fetches: Cell::new(0),
        };
        let mut localizer = Localizer::new(&source, demo_page("https://example.com/"));
        assert!(localizer.load("fr").await.is_err());
        assert_eq!(source.fetches.get(), 2);

        source.fetches.set(0);
        assert!(localizer.load("en").await.is_err());
        assert_eq!(source.fetches.get(), 1);
    }
}
