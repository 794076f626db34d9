//! HTML element tree and page output.
//!
//! Pages return an [`Element`] (rendered to HTML by the dispatcher), a raw
//! [`Response`], or a [`PageOutput`] holding either.

use std::fmt;

use axum::response::{Html, IntoResponse, Response};

use crate::signature::TypeTag;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node in an element tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Text content (escaped on render).
    Text(String),
    /// Pre-rendered markup (inserted verbatim).
    Raw(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// An HTML element with attributes and children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing an existing value with the same name.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append several child nodes.
    #[must_use]
    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Append a text node.
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    /// Tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by name.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => fmt::Display::fmt(element, f),
            Self::Text(text) => f.write_str(&html_escape::encode_text(text)),
            Self::Raw(markup) => f.write_str(markup),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(
                f,
                " {name}=\"{}\"",
                html_escape::encode_double_quoted_attribute(value)
            )?;
        }
        f.write_str(">")?;

        if self.is_void() {
            return Ok(());
        }

        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

/// Result of a page, layout, RPC or error handler.
#[derive(Debug)]
pub enum PageOutput {
    /// Element to be rendered as an HTML document.
    Element(Element),
    /// Response passed through unchanged.
    Response(Response),
}

impl PageOutput {
    /// Convert to the wire response.
    ///
    /// Elements become `text/html; charset=utf-8` responses; raw responses
    /// pass through untouched.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Element(element) => Html(element.to_string()).into_response(),
            Self::Response(response) => response,
        }
    }
}

impl From<Element> for PageOutput {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Response> for PageOutput {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Types a page entry point may declare as its return type.
pub trait PageReturn: Into<PageOutput> + Send + 'static {}

impl PageReturn for Element {}
impl PageReturn for Response {}
impl PageReturn for PageOutput {}

/// Return types accepted by the contract validator.
pub(crate) fn accepted_return_types() -> [TypeTag; 3] {
    [
        TypeTag::of::<Element>(),
        TypeTag::of::<Response>(),
        TypeTag::of::<PageOutput>(),
    ]
}
