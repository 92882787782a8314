use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
};

use url::Url;

use super::{Element, Page};

#[derive(Default)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<MemoryElement>,
    parent: Weak<RefCell<Node>>,
}

/// A detached, single-threaded element tree.
#[derive(Clone)]
pub struct MemoryElement(Rc<RefCell<Node>>);

impl PartialEq for MemoryElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.borrow();
        f.debug_struct("MemoryElement")
            .field("tag", &node.tag)
            .field("attributes", &node.attributes)
            .field("text", &node.text)
            .field("children", &node.children.len())
            .finish()
    }
}

impl MemoryElement {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(Node {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        })))
    }

    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.0.borrow_mut().text = text.to_string();
        self
    }

    pub fn with_child(self, child: MemoryElement) -> Self {
        self.append_child(child);
        self
    }

    pub fn append_child(&self, child: MemoryElement) {
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child);
    }

    pub fn children(&self) -> Vec<MemoryElement> {
        self.0.borrow().children.clone()
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let node = self.0.borrow();
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&child.text_content());
        }
        text
    }

    pub fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|class| class.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    fn walk(&self, out: &mut Vec<MemoryElement>, pred: &dyn Fn(&MemoryElement) -> bool) {
        for child in self.children() {
            if pred(&child) {
                out.push(child.clone());
            }
            child.walk(out, pred);
        }
    }

    /// Renders the subtree as HTML-like markup; handy when comparing states.
    pub fn outer_html(&self) -> String {
        let node = self.0.borrow();
        let mut html = format!("<{}", node.tag);
        for (name, value) in &node.attributes {
            html.push_str(&format!(" {name}=\"{value}\""));
        }
        html.push('>');
        html.push_str(&node.text);
        for child in &node.children {
            html.push_str(&child.outer_html());
        }
        html.push_str(&format!("</{}>", node.tag));
        html
    }
}

impl Element for MemoryElement {
    fn tag_name(&self) -> String {
        self.0.borrow().tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn set_text_content(&self, text: &str) {
        let mut node = self.0.borrow_mut();
        node.children.clear();
        node.text = text.to_string();
    }

    fn toggle_class(&self, class: &str, on: bool) {
        let mut classes = self.classes();
        let present = classes.iter().any(|c| c == class);
        if on && !present {
            classes.push(class.to_string());
        } else if !on && present {
            classes.retain(|c| c != class);
        } else {
            return;
        }
        self.set_attribute("class", &classes.join(" "));
    }

    fn parent(&self) -> Option<Self> {
        self.0.borrow().parent.upgrade().map(MemoryElement)
    }

    fn query_all(&self, attribute: &str) -> Vec<Self> {
        let mut out = Vec::new();
        self.walk(&mut out, &|element| element.attribute(attribute).is_some());
        out
    }
}

struct Document {
    root: MemoryElement,
    title: String,
    url: Url,
    cookies: BTreeMap<String, String>,
    cookie_writes: Vec<String>,
    history_len: usize,
}

/// An in-memory page: an element tree plus location, title and cookie jar.
#[derive(Clone)]
pub struct MemoryPage(Rc<RefCell<Document>>);

impl MemoryPage {
    pub fn new(url: Url) -> Self {
        Self(Rc::new(RefCell::new(Document {
            root: MemoryElement::new("html"),
            title: String::new(),
            url,
            cookies: BTreeMap::new(),
            cookie_writes: Vec::new(),
            history_len: 1,
        })))
    }

    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn with_title(self, title: &str) -> Self {
        self.set_title(title);
        self
    }

    /// Seeds the cookie jar as if the browser sent `name=value`.
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.0
            .borrow_mut()
            .cookies
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(self, body: MemoryElement) -> Self {
        self.root().append_child(body);
        self
    }

    /// The `<html>` element.
    pub fn root(&self) -> MemoryElement {
        self.0.borrow().root.clone()
    }

    pub fn url(&self) -> Url {
        self.0.borrow().url.clone()
    }

    pub fn history_len(&self) -> usize {
        self.0.borrow().history_len
    }

    /// Every raw string assigned through [`Page::set_cookie`], oldest first.
    pub fn cookie_writes(&self) -> Vec<String> {
        self.0.borrow().cookie_writes.clone()
    }
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = self.0.borrow();
        f.debug_struct("MemoryPage")
            .field("url", &document.url.as_str())
            .field("title", &document.title)
            .field("cookies", &document.cookies)
            .finish()
    }
}

impl Page for MemoryPage {
    type Element = MemoryElement;

    fn query_all(&self, attribute: &str) -> Vec<MemoryElement> {
        let root = self.root();
        let mut out = Vec::new();
        if root.attribute(attribute).is_some() {
            out.push(root.clone());
        }
        out.extend(root.query_all(attribute));
        out
    }

    fn element_by_id(&self, id: &str) -> Option<MemoryElement> {
        self.query_all("id")
            .into_iter()
            .find(|element| element.attribute("id").as_deref() == Some(id))
    }

    fn set_document_language(&self, code: &str) {
        self.root().set_attribute("lang", code);
    }

    fn title(&self) -> String {
        self.0.borrow().title.clone()
    }

    fn set_title(&self, title: &str) {
        self.0.borrow_mut().title = title.to_string();
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.0
            .borrow()
            .url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn replace_query_param(&self, name: &str, value: &str) {
        let mut document = self.0.borrow_mut();
        let mut replaced = false;
        let pairs = document
            .url
            .query_pairs()
            .into_owned()
            .filter_map(|(key, old)| {
                if key != name {
                    Some((key, old))
                } else if !replaced {
                    replaced = true;
                    Some((key, value.to_string()))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        let mut url = document.url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .extend_pairs((!replaced).then_some((name, value)));
        document.url = url;
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.0.borrow().cookies.get(name).cloned()
    }

    fn set_cookie(&self, cookie: &str) {
        let mut document = self.0.borrow_mut();
        document.cookie_writes.push(cookie.to_string());
        let pair = cookie.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            document
                .cookies
                .insert(name.trim().to_string(), value.trim().to_string());
        }
    }
}
