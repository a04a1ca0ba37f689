//! Owned element tree for fetched pages.

use std::collections::HashMap;

/// A fetched page: its URL, a display label and the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Absolute URL the page was loaded from.
    pub url: String,
    /// Human label used in logs and opportunity names.
    pub name: String,
    /// Document root (the `<html>` element for real pages).
    pub root: PageElement,
}

impl Page {
    /// Create a page from a root element.
    pub fn new(url: impl Into<String>, name: impl Into<String>, root: PageElement) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            root,
        }
    }

    /// All elements (root included) carrying every class in `classes`,
    /// in document order.
    pub fn find_by_class(&self, classes: &str) -> Vec<&PageElement> {
        self.root
            .descendants_and_self()
            .filter(|e| e.has_classes(classes))
            .collect()
    }

    /// First element carrying every class in `classes`.
    pub fn first_by_class(&self, classes: &str) -> Option<&PageElement> {
        self.root
            .descendants_and_self()
            .find(|e| e.has_classes(classes))
    }
}

/// Single element in a page tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageElement {
    /// Tag name, lowercase.
    pub tag: String,
    /// Class tokens in attribute order.
    pub classes: Vec<String>,
    /// Attribute values by name.
    pub attributes: HashMap<String, String>,
    /// Text content of the element and its descendants.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<PageElement>,
}

impl PageElement {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Add whitespace separated class tokens.
    pub fn with_class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: PageElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements.
    pub fn with_children(mut self, children: impl IntoIterator<Item = PageElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether the attribute is present (possibly empty).
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[PageElement] {
        &self.children
    }

    /// Text content with whitespace runs collapsed.
    pub fn display_name(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Class tokens joined by a single space.
    pub fn class_names(&self) -> String {
        self.classes.join(" ")
    }

    /// Whether the element carries this class token.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether the element carries every whitespace separated token.
    pub fn has_classes(&self, classes: &str) -> bool {
        let mut tokens = classes.split_whitespace().peekable();
        tokens.peek().is_some() && tokens.all(|t| self.has_class(t))
    }

    /// Descendants (self excluded) carrying every class in `classes`.
    pub fn find_by_class(&self, classes: &str) -> Vec<&PageElement> {
        self.descendants().filter(|e| e.has_classes(classes)).collect()
    }

    /// Depth-first, document-order iterator over descendants (self excluded).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Depth-first, document-order iterator starting at self.
    pub fn descendants_and_self(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Iterator returned by [`PageElement::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a PageElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a PageElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PageElement {
        PageElement::new("html").with_child(
            PageElement::new("body")
                .with_child(PageElement::new("a").with_class("x y").with_text("first"))
                .with_child(
                    PageElement::new("div")
                        .with_class("x")
                        .with_child(PageElement::new("a").with_class("y x z").with_text("second")),
                ),
        )
    }

    #[test]
    fn find_by_class_requires_every_token() {
        let page = Page::new("https://example.com/", "home", sample());
        let found = page.find_by_class("x y");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].display_name(), "first");
        assert_eq!(found[1].display_name(), "second");
        assert_eq!(page.find_by_class("x").len(), 3);
        assert!(page.find_by_class("").is_empty());
    }

    #[test]
    fn element_search_excludes_self() {
        let div = PageElement::new("div")
            .with_class("x")
            .with_child(PageElement::new("span").with_class("x"));
        assert_eq!(div.find_by_class("x").len(), 1);
    }

    #[test]
    fn display_name_collapses_whitespace() {
        let el = PageElement::new("a").with_text("  Premier \n  League ");
        assert_eq!(el.display_name(), "Premier League");
    }

    #[test]
    fn attributes_and_classes() {
        let el = PageElement::new("td")
            .with_class("o np")
            .with_attr("data-o", "");
        assert!(el.has_attr("data-o"));
        assert_eq!(el.attr("data-o"), Some(""));
        assert!(el.attr("data-odig").is_none());
        assert_eq!(el.class_names(), "o np");
        assert!(el.has_class("np"));
        assert!(!el.has_class("n"));
    }
}
