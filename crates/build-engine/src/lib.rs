//! Capacitor Build Engine
//!
//! Drives a Capacitor project from web app to signed binaries: merges the
//! Capacitor configuration, reconciles plugins, applies native project
//! edits, and runs the Android and iOS toolchains.

pub mod android;
pub mod artifacts;
pub mod assets;
pub mod capacitor;
pub mod gradle_vars;
pub mod ios;
pub mod keychain;
pub mod plugins;
pub mod process;
pub mod runner;

pub use android::AndroidStage;
pub use assets::AssetGeneration;
pub use gradle_vars::GradleVariables;
pub use ios::{IosStage, XcodeContainer};
pub use keychain::TempKeychain;
pub use plugins::PluginReport;
pub use process::{Tool, ToolOutput};
pub use runner::{BuildOutput, BuildRunner, PlatformSelection};

use std::fmt;

use capbuild_core::{CoreError, EditOutcome};
use capbuild_manifest_manager::ManifestError;
use capbuild_xcode_project::{PlistError, XcodeError};
use tracing::warn;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Build failed: {0}")]
    BuildFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Toolchain not found: {0}")]
    ToolchainNotFound(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Platform directory missing: {0} (run `npx cap add` first)")]
    PlatformMissing(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Unsupported host: {0}")]
    UnsupportedHost(String),
    #[error("Gradle variables: {0}")]
    GradleVariables(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid start URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Xcode(#[from] XcodeError),
    #[error(transparent)]
    Plist(#[from] PlistError),
}

/// Native platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// Name used by the Capacitor CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => write!(f, "Android"),
            Platform::Ios => write!(f, "iOS"),
        }
    }
}

/// One applied native edit and what it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEdit {
    pub description: String,
    pub outcome: EditOutcome,
}

impl NativeEdit {
    /// Record an edit; skipped edits are logged since they are advisory
    pub fn new(description: impl Into<String>, outcome: EditOutcome) -> Self {
        let edit = Self {
            description: description.into(),
            outcome,
        };
        if let EditOutcome::Skipped(ref reason) = edit.outcome {
            warn!("{}: skipped ({})", edit.description, reason);
        }
        edit
    }
}
