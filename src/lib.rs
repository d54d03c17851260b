//! capbuild - Capacitor build orchestration
//!
//! Packages a Capacitor-wrapped web app into signed Android and iOS
//! binaries. The work is split across the workspace crates:
//!
//! - `capbuild-core`: build configuration, project layout, edit outcomes
//! - `capbuild-manifest-manager`: AndroidManifest.xml editing
//! - `capbuild-xcode-project`: project.pbxproj, Info.plist and signing
//! - `capbuild-build-engine`: Gradle variables and the pipeline stages

pub mod commands;

// Re-export workspace crates for library usage
pub use capbuild_build_engine as build;
pub use capbuild_core as core;
pub use capbuild_manifest_manager as manifest;
pub use capbuild_xcode_project as xcode;

/// Prelude module for convenient imports
pub mod prelude {
    pub use capbuild_build_engine::{BuildRunner, PlatformSelection};
    pub use capbuild_core::{BuildConfig, EditOutcome, ProjectLayout};
    pub use capbuild_manifest_manager::ManifestEditor;
    pub use capbuild_xcode_project::{InfoPlistEditor, PbxProject};
}
