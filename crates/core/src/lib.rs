//! capbuild core
//!
//! Configuration, on-disk project layout and the small set of types shared by
//! the native-project editors and the build pipeline.

pub mod config;
pub mod error;
pub mod fs;
pub mod outcome;
pub mod project;

pub use config::{
    AndroidSettings, AndroidSigning, AppInfo, BuildConfig, BuildType, FeatureRequirement,
    IntentCategoryRule, IntentDataRule, IosSettings, OutputSettings, P12Type, ReleaseType,
    ScreenOrientation,
};
pub use error::{CoreError, Result};
pub use outcome::EditOutcome;
pub use project::ProjectLayout;

/// capbuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, relative to the project root
pub const CONFIG_FILE_NAME: &str = "build.config.toml";
