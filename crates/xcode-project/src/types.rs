//! pbxproj value types
//!
//! An OpenStep property list holds strings, arrays and dictionaries. Strings
//! carry the `/* ... */` annotation that followed them in the file so the
//! writer can put it back.

use indexmap::IndexMap;

/// Ordered dictionary
pub type PbxDict = IndexMap<String, PbxValue>;

/// A string scalar with its trailing annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxString {
    /// Unquoted, unescaped text
    pub text: String,
    pub comment: Option<String>,
}

impl PbxString {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            comment: None,
        }
    }

    pub fn with_comment(text: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            comment: Some(comment.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbxValue {
    String(PbxString),
    Array(Vec<PbxValue>),
    Dict(PbxDict),
}

impl PbxValue {
    /// Plain string value without annotation
    pub fn string(text: impl Into<String>) -> Self {
        PbxValue::String(PbxString::new(text))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PbxValue::String(s) => Some(&s.text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PbxValue]> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PbxDict> {
        match self {
            PbxValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PbxDict> {
        match self {
            PbxValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<&str> for PbxValue {
    fn from(text: &str) -> Self {
        PbxValue::string(text)
    }
}

/// An entry of the `objects` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxNode {
    /// Opaque 24-hex-digit identifier
    pub id: String,
    pub comment: Option<String>,
    pub fields: PbxDict,
}

impl PbxNode {
    pub fn isa(&self) -> Option<&str> {
        self.get_str("isa")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(PbxValue::as_str)
    }
}
