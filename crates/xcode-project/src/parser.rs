//! pbxproj parser
//!
//! Recursive descent over the OpenStep property list Xcode writes. Section
//! markers and the UTF8 header are dropped; annotations that directly follow
//! a string token are kept on that string.

use indexmap::IndexMap;

use crate::project::PbxProject;
use crate::types::{PbxDict, PbxNode, PbxString, PbxValue};
use crate::XcodeError;

type Result<T> = std::result::Result<T, XcodeError>;

/// Parse the contents of a `project.pbxproj`
pub fn parse(text: &str) -> Result<PbxProject> {
    let mut parser = Parser::new(text);
    parser.skip_trivia()?;

    let mut preamble = PbxDict::new();
    let mut trailer = PbxDict::new();
    let mut objects = None;

    parser.parse_entries(|p, key| {
        if key.text == "objects" {
            objects = Some(p.parse_object_table()?);
        } else {
            let value = p.parse_value()?;
            if objects.is_none() {
                preamble.insert(key.text, value);
            } else {
                trailer.insert(key.text, value);
            }
        }
        Ok(())
    })?;

    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after the root dictionary"));
    }

    let objects = objects.ok_or_else(|| parser.error("missing objects table"))?;
    Ok(PbxProject {
        preamble,
        objects,
        trailer,
    })
}

/// Parse a standalone value, e.g. a build setting written by hand
pub fn parse_value(text: &str) -> Result<PbxValue> {
    let mut parser = Parser::new(text);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected content after value"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, message: impl Into<String>) -> XcodeError {
        XcodeError::Parse {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of file", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.bump();
        }
    }

    /// Skip whitespace and every kind of comment
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("//") {
                let end = self.rest().find('\n').unwrap_or(self.rest().len());
                self.pos += end;
            } else if self.rest().starts_with("/*") {
                self.read_block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Read a `/* ... */` comment and return its trimmed text
    fn read_block_comment(&mut self) -> Result<String> {
        let body = &self.rest()[2..];
        let end = body
            .find("*/")
            .ok_or_else(|| self.error("unterminated comment"))?;
        let text = body[..end].trim().to_string();
        self.pos += 2 + end + 2;
        Ok(text)
    }

    /// An annotation directly following a string token
    fn trailing_comment(&mut self) -> Result<Option<String>> {
        self.skip_whitespace();
        if self.rest().starts_with("/*") {
            Ok(Some(self.read_block_comment()?))
        } else {
            Ok(None)
        }
    }

    fn parse_value(&mut self) -> Result<PbxValue> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => {
                let mut dict = PbxDict::new();
                self.parse_entries(|p, key| {
                    let value = p.parse_value()?;
                    dict.insert(key.text, value);
                    Ok(())
                })?;
                Ok(PbxValue::Dict(dict))
            }
            Some('(') => Ok(PbxValue::Array(self.parse_array()?)),
            Some(_) => Ok(PbxValue::String(self.parse_string()?)),
            None => Err(self.error("expected a value, found end of file")),
        }
    }

    /// Parse `{ key = value; ... }`, handing each key to `on_entry` to read the value
    fn parse_entries<F>(&mut self, mut on_entry: F) -> Result<()>
    where
        F: FnMut(&mut Self, PbxString) -> Result<()>,
    {
        self.skip_trivia()?;
        self.expect('{')?;
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(());
            }

            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect('=')?;
            on_entry(self, key)?;
            self.skip_trivia()?;
            self.expect(';')?;
        }
    }

    fn parse_array(&mut self) -> Result<Vec<PbxValue>> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }

            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                _ => return Err(self.error("expected ',' or ')' in array")),
            }
        }
    }

    fn parse_object_table(&mut self) -> Result<IndexMap<String, PbxNode>> {
        let mut objects = IndexMap::new();
        self.parse_entries(|p, key| {
            match p.parse_value()? {
                PbxValue::Dict(fields) => {
                    objects.insert(
                        key.text.clone(),
                        PbxNode {
                            id: key.text,
                            comment: key.comment,
                            fields,
                        },
                    );
                    Ok(())
                }
                _ => Err(p.error(format!("object {} is not a dictionary", key.text))),
            }
        })?;
        Ok(objects)
    }

    fn parse_string(&mut self) -> Result<PbxString> {
        let text = if self.peek() == Some('"') {
            self.parse_quoted()?
        } else {
            self.parse_bare()?
        };
        let comment = self.trailing_comment()?;
        Ok(PbxString { text, comment })
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_bare(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().map_or(false, is_bare_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected character '{}'", c)),
                None => self.error("unexpected end of file"),
            });
        }
        Ok(self.src[start..self.pos].to_string())
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-' | '+')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotated_values() {
        let value = parse_value(
            r#"{
                isa = PBXNativeTarget;
                buildConfigurationList = 504EC3161FED79650016851F /* Build configuration list for PBXNativeTarget "App" */;
                files = (
                    504EC30D1FED79650016851F /* AppDelegate.swift in Sources */,
                    "quoted \"value\"",
                );
                name = App;
            }"#,
        )
        .unwrap();

        let dict = value.as_dict().unwrap();
        assert_eq!(dict["isa"].as_str(), Some("PBXNativeTarget"));

        match &dict["buildConfigurationList"] {
            PbxValue::String(s) => {
                assert_eq!(s.text, "504EC3161FED79650016851F");
                assert_eq!(s.comment.as_deref(), Some("Build configuration list for PBXNativeTarget \"App\""));
            }
            other => panic!("unexpected {:?}", other),
        }

        let files = dict["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].as_str(), Some("quoted \"value\""));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse("// !$*UTF8*$!\n{\n\tobjects = {\n\t\tA = B\n\t};\n}\n").unwrap_err();
        match err {
            XcodeError::Parse { line, .. } => assert_eq!(line, 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spaced_object_table() {
        let project = parse(
            "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tobjects = {\n\t\tA1 /* Foo.swift in Sources */ = {isa = PBXBuildFile; settings = {ATTRIBUTES = (Weak, ); }; };\n\t\tB2 = {isa = PBXShellScriptBuildPhase; shellScript = \"echo \\\"hi\\\"\\n\"; };\n\t};\n\trootObject = B2;\n}\n",
        )
        .unwrap();

        assert_eq!(project.node("A1").and_then(|n| n.isa()), Some("PBXBuildFile"));
        assert_eq!(project.node("B2").and_then(|n| n.get_str("shellScript")), Some("echo \"hi\"\n"));
        assert_eq!(project.root_object_id().unwrap(), "B2");
    }

    #[test]
    fn test_missing_objects_table() {
        assert!(parse("{ archiveVersion = 1; }").is_err());
    }
}
