//! Manifest Writer
//!
//! Serializes the element tree back to AndroidManifest.xml.

use std::io::Cursor;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::manifest::{XmlDeclaration, XmlDocument, XmlElement, XmlNode};

/// Writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("XML write error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Manifest writer
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    indent: usize,
}

impl Default for ManifestWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestWriter {
    /// Create a new writer with default settings
    pub fn new() -> Self {
        Self { indent: 4 }
    }

    /// Set indentation
    pub fn with_indent(mut self, spaces: usize) -> Self {
        self.indent = spaces;
        self
    }

    /// Write a document to string
    pub fn write_to_string(&self, document: &XmlDocument) -> Result<String, WriteError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.indent);

        if let Some(ref decl) = document.declaration {
            Self::write_declaration(&mut writer, decl)?;
        }
        for node in &document.prolog {
            Self::write_node(&mut writer, node)?;
        }
        Self::write_element(&mut writer, &document.root)?;

        let mut xml = String::from_utf8(writer.into_inner().into_inner())?;
        xml.push('\n');
        Ok(xml)
    }

    fn write_declaration<W: std::io::Write>(
        writer: &mut Writer<W>,
        decl: &XmlDeclaration,
    ) -> Result<(), WriteError> {
        writer.write_event(Event::Decl(BytesDecl::new(
            &decl.version,
            decl.encoding.as_deref(),
            decl.standalone.as_deref(),
        )))?;
        Ok(())
    }

    fn write_element<W: std::io::Write>(
        writer: &mut Writer<W>,
        element: &XmlElement,
    ) -> Result<(), WriteError> {
        let mut start = BytesStart::new(element.name.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            Self::write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        Ok(())
    }

    fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<(), WriteError> {
        match node {
            XmlNode::Element(el) => Self::write_element(writer, el)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::Comment(text) => writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?,
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ManifestParser;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.example.app">
    <!-- keep me -->
    <uses-permission android:name="android.permission.INTERNET"/>
    <application android:label="@string/app_name" tools:replace="android:label">
        <activity android:name=".MainActivity" android:label="A &lt;b&gt; &quot;c&quot;">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <category android:name="android.intent.category.LAUNCHER"/>
            </intent-filter>
        </activity>
        <meta-data android:name="k"><![CDATA[raw <data>]]></meta-data>
    </application>
</manifest>"#;

    #[test]
    fn test_round_trip_without_changes() {
        let doc = ManifestParser::parse_manifest(MANIFEST).unwrap();
        let xml = ManifestWriter::new().write_to_string(&doc).unwrap();
        let reparsed = ManifestParser::parse_manifest(&xml).unwrap();

        assert_eq!(doc, reparsed);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<!-- keep me -->"));
        assert!(xml.contains("tools:replace=\"android:label\""));
    }

    #[test]
    fn test_childless_elements_are_self_closing() {
        let doc = ManifestParser::parse_manifest(MANIFEST).unwrap();
        let xml = ManifestWriter::new().with_indent(2).write_to_string(&doc).unwrap();

        assert!(xml.contains("<uses-permission android:name=\"android.permission.INTERNET\"/>"));
        assert!(xml.contains("\n  <uses-permission"));
    }
}
