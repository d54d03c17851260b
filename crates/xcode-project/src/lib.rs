//! Xcode Project Editing
//!
//! Structured editing of the files Capacitor generates under `ios/`:
//! - `project.pbxproj`, parsed into an object graph and written back in
//!   Xcode's layout
//! - manual code-signing configuration of a native target
//! - Info.plist key upserts
//! - provisioning profile inspection and exportOptions.plist generation

pub mod export_options;
pub mod info_plist;
pub mod inject;
pub mod parser;
pub mod project;
pub mod provisioning;
pub mod signing;
pub mod types;
pub mod writer;

pub use export_options::ExportOptions;
pub use info_plist::{InfoPlistEditor, PlistError};
pub use inject::inject_build_setting;
pub use project::PbxProject;
pub use provisioning::ProvisioningProfile;
pub use signing::{apply_signing_configuration, sign_project, SigningReport};
pub use types::{PbxDict, PbxNode, PbxString, PbxValue};

use capbuild_core::CoreError;
use thiserror::Error;

/// Xcode project errors
#[derive(Error, Debug)]
pub enum XcodeError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("pbxproj parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Project node missing: {0}")]
    MissingNode(String),

    #[error("Unexpected project node: {0}")]
    InvalidNode(String),

    #[error("Provisioning profile error: {0}")]
    Profile(String),

    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
