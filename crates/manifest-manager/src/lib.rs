//! Android Manifest Manager
//!
//! Structural, idempotent editing of AndroidManifest.xml. The file is parsed
//! into a generic element tree, so attributes and nodes the editor does not
//! touch are written back as they were.

pub mod components;
pub mod editor;
pub mod intent_filters;
pub mod manifest;
pub mod parser;
pub mod permissions;
pub mod writer;

pub use components::ComponentType;
pub use editor::{ManifestEditor, ManifestError};
pub use intent_filters::{FilterCriteria, ACTION_MAIN, CATEGORY_LAUNCHER, DEFAULT_ACTIVITY};
pub use manifest::{XmlDeclaration, XmlDocument, XmlElement, XmlNode};
pub use parser::{ManifestParser, ParseError};
pub use writer::{ManifestWriter, WriteError};

/// Activity attribute holding the screen orientation
pub const SCREEN_ORIENTATION_ATTR: &str = "android:screenOrientation";
