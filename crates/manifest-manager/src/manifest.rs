//! Android Manifest Document
//!
//! Generic element tree for AndroidManifest.xml. Every element keeps its
//! attributes in document order and its children as an ordered list, so
//! nodes the editors do not understand survive a load/save cycle untouched.

use indexmap::IndexMap;

/// `android:name` attribute, used to identify permissions, features and components
pub const ANDROID_NAME: &str = "android:name";

/// Root element name
pub const MANIFEST_TAG: &str = "manifest";
pub const APPLICATION_TAG: &str = "application";

/// XML declaration (`<?xml version="1.0" encoding="utf-8"?>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("utf-8".to_string()),
            standalone: None,
        }
    }
}

/// A node inside an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    CData(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// Attribute names are kept verbatim, including the `android:` prefix
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Value of `android:name`
    pub fn android_name(&self) -> Option<&str> {
        self.attr(ANDROID_NAME)
    }

    /// Child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// All child elements with the given tag. One, many or none are handled alike.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> + 'a {
        self.elements_mut().filter(move |el| el.name == name)
    }

    /// First child element with the given tag
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.name == name)
    }

    /// Whether a child `<tag android:name="value">` exists
    pub fn has_named_child(&self, tag: &str, android_name: &str) -> bool {
        self.children_named(tag)
            .any(|el| el.android_name() == Some(android_name))
    }

    /// Insert `element` after the last child with one of the `after` tags.
    ///
    /// With no such sibling it goes before the first `before` child, or at the
    /// end when that is absent too.
    pub fn insert_grouped(&mut self, element: XmlElement, after: &[&str], before: Option<&str>) {
        let last_sibling = self.children.iter().rposition(|node| {
            matches!(node, XmlNode::Element(el) if after.contains(&el.name.as_str()))
        });

        let index = match last_sibling {
            Some(i) => i + 1,
            None => before
                .and_then(|tag| {
                    self.children
                        .iter()
                        .position(|node| matches!(node, XmlNode::Element(el) if el.name == tag))
                })
                .unwrap_or(self.children.len()),
        };

        self.children.insert(index, XmlNode::Element(element));
    }
}

/// A parsed AndroidManifest.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<XmlDeclaration>,
    /// Comments appearing before the root element
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            prolog: Vec::new(),
            root,
        }
    }

    /// The `application` node
    pub fn application(&self) -> Option<&XmlElement> {
        self.root.find_child(APPLICATION_TAG)
    }

    pub fn application_mut(&mut self) -> Option<&mut XmlElement> {
        self.root.find_child_mut(APPLICATION_TAG)
    }
}
