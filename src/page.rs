//! The surface of a web page the localizer reads from and writes to.
//!
//! Handles follow DOM semantics: they are cheap to clone and mutate the
//! underlying document through a shared reference.

mod memory;

pub use memory::{MemoryElement, MemoryPage};

pub trait Element: Clone + PartialEq {
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str);

    /// Replaces all children with a single text node.
    fn set_text_content(&self, text: &str);

    fn toggle_class(&self, class: &str, on: bool);

    fn parent(&self) -> Option<Self>;

    /// Descendants carrying `attribute`, in document order.
    fn query_all(&self, attribute: &str) -> Vec<Self>;

    /// Nearest inclusive ancestor with the given tag that carries `attribute`.
    fn closest(&self, tag: &str, attribute: &str) -> Option<Self> {
        let mut current = Some(self.clone());
        while let Some(element) = current {
            if element.tag_name().eq_ignore_ascii_case(tag) && element.attribute(attribute).is_some()
            {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }

    /// Whether `other` is this element or one of its descendants.
    fn contains(&self, other: &Self) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if &element == self {
                return true;
            }
            current = element.parent();
        }
        false
    }
}

#[allow(async_fn_in_trait)]
pub trait Page {
    type Element: Element;

    /// Resolves once the document has been parsed.
    async fn ready(&self) {}

    /// Elements anywhere in the document carrying `attribute`.
    fn query_all(&self, attribute: &str) -> Vec<Self::Element>;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// Sets the `lang` attribute of the root element.
    fn set_document_language(&self, code: &str);

    fn title(&self) -> String;

    fn set_title(&self, title: &str);

    fn query_param(&self, name: &str) -> Option<String>;

    /// Rewrites one query parameter of the current URL in place, without
    /// adding a history entry.
    fn replace_query_param(&self, name: &str, value: &str);

    /// Raw (still encoded) value of a cookie.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Equivalent of assigning `document.cookie`.
    fn set_cookie(&self, cookie: &str);
}
