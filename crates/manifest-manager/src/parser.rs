//! AndroidManifest.xml Parser
//!
//! Parses manifest files into the generic element tree.

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::manifest::{XmlDeclaration, XmlDocument, XmlElement, XmlNode, MANIFEST_TAG};

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Invalid manifest structure: {0}")]
    InvalidStructure(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file from path
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<XmlDocument, ParseError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_manifest(&content)
    }

    /// Parse a document and require a `manifest` root
    pub fn parse_manifest(xml: &str) -> Result<XmlDocument, ParseError> {
        let document = Self::parse_string(xml)?;
        if document.root.name != MANIFEST_TAG {
            return Err(ParseError::InvalidStructure(format!(
                "expected <{}> root, found <{}>",
                MANIFEST_TAG, document.root.name
            )));
        }
        Ok(document)
    }

    /// Parse any XML document into a tree
    pub fn parse_string(xml: &str) -> Result<XmlDocument, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Decl(ref e)) => {
                    declaration = Some(Self::parse_declaration(e)?);
                }
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::parse_element(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = Self::parse_element(e)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        ParseError::InvalidStructure("closing tag without an open element".into())
                    })?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape()?.into_owned();
                    if let Some(parent) = stack.last_mut() {
                        if !text.is_empty() {
                            parent.children.push(XmlNode::Text(text));
                        }
                    }
                }
                Ok(Event::CData(ref e)) => {
                    let text = std::str::from_utf8(&e[..])?.to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::CData(text));
                    }
                }
                Ok(Event::Comment(ref e)) => {
                    let text = std::str::from_utf8(&e[..])?.to_string();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Comment(text)),
                        None if root.is_none() => prolog.push(XmlNode::Comment(text)),
                        None => debug!("Dropping comment after the root element"),
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::XmlError(e)),
                // Processing instructions and doctypes do not occur in manifests
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::InvalidStructure(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| ParseError::InvalidStructure("missing root element".into()))?;

        Ok(XmlDocument {
            declaration,
            prolog,
            root,
        })
    }

    /// Hand a completed element to its parent, or make it the root
    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<(), ParseError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(XmlNode::Element(element)),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(ParseError::InvalidStructure(format!(
                    "second root element <{}>",
                    element.name
                )))
            }
        }
        Ok(())
    }

    fn parse_element(e: &BytesStart) -> Result<XmlElement, ParseError> {
        let name = std::str::from_utf8(e.name().as_ref())?.to_string();
        let mut attributes = IndexMap::new();

        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, value);
        }

        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn parse_declaration(e: &BytesDecl) -> Result<XmlDeclaration, ParseError> {
        let version = String::from_utf8_lossy(&e.version()?).into_owned();
        let encoding = e
            .encoding()
            .transpose()?
            .map(|v| String::from_utf8_lossy(&v).into_owned());
        let standalone = e
            .standalone()
            .transpose()?
            .map(|v| String::from_utf8_lossy(&v).into_owned());

        Ok(XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- generated by capacitor -->
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.app">

    <application
        android:label="@string/app_name"
        android:icon="@mipmap/ic_launcher"
        android:theme="@style/AppTheme">

        <activity
            android:name=".MainActivity"
            android:exported="true"
            android:label="Tom &amp; Jerry">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <category android:name="android.intent.category.LAUNCHER"/>
            </intent-filter>
        </activity>

        <provider android:name="androidx.core.content.FileProvider">
            <meta-data android:name="android.support.FILE_PROVIDER_PATHS" android:resource="@xml/file_paths"/>
        </provider>
    </application>

    <!-- Permissions -->
    <uses-permission android:name="android.permission.INTERNET" />
</manifest>"#;

    #[test]
    fn test_parse_manifest() {
        let doc = ManifestParser::parse_manifest(SAMPLE_MANIFEST).unwrap();

        let decl = doc.declaration.as_ref().unwrap();
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.encoding.as_deref(), Some("utf-8"));
        assert_eq!(doc.prolog, vec![XmlNode::Comment(" generated by capacitor ".to_string())]);

        assert_eq!(doc.root.attr("package"), Some("com.example.app"));
        assert_eq!(doc.root.children_named("uses-permission").count(), 1);

        let app = doc.application().unwrap();
        let activity = app.find_child("activity").unwrap();
        assert_eq!(activity.android_name(), Some(".MainActivity"));
        assert_eq!(activity.attr("android:label"), Some("Tom & Jerry"));
        assert_eq!(activity.children_named("intent-filter").count(), 1);

        let comments = doc
            .root
            .children
            .iter()
            .filter(|node| matches!(node, XmlNode::Comment(_)))
            .count();
        assert_eq!(comments, 1);
    }

    #[test]
    fn test_rejects_wrong_root() {
        let err = ManifestParser::parse_manifest("<resources/>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidStructure(_)));
    }

    #[test]
    fn test_rejects_malformed_xml() {
        assert!(ManifestParser::parse_string("<manifest><application></manifest>").is_err());
        assert!(ManifestParser::parse_string("<manifest>").is_err());
    }
}
