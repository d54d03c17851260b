//! Build Configuration
//!
//! The user-supplied `build.config.toml`:
//! - app identity and versioning
//! - Android signing material and native edits
//! - iOS signing material and Info.plist entries
//! - plugin list and artifact naming

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Environment variable overriding `android.keystore_password`
pub const ENV_ANDROID_KEYSTORE_PASSWORD: &str = "ANDROID_KEYSTORE_PASSWORD";
/// Environment variable overriding `android.key_password`
pub const ENV_ANDROID_KEY_PASSWORD: &str = "ANDROID_KEY_PASSWORD";
/// Environment variable overriding `ios.p12_password`
pub const ENV_IOS_P12_PASSWORD: &str = "IOS_P12_PASSWORD";

/// Default screen orientation of the wrapped app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl ScreenOrientation {
    /// Value of `android:screenOrientation`
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenOrientation::Portrait => "portrait",
            ScreenOrientation::Landscape => "landscape",
        }
    }
}

/// General application information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Bundle / application identifier (e.g. "com.company.app")
    pub app_id: String,
    /// Name shown on the device
    pub display_name: String,
    /// User-visible version (e.g. "2.0.4")
    pub version_name: String,
    /// Monotonic build number (versionCode / CFBundleVersion)
    pub build_number: u64,
    /// URL of the hosted web app the shell loads
    pub start_url: String,
    pub background_color: Option<String>,
    pub default_screen_orientation: ScreenOrientation,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            app_id: "com.company.app".to_string(),
            display_name: "App".to_string(),
            version_name: "1.0.0".to_string(),
            build_number: 1,
            start_url: String::new(),
            background_color: None,
            default_screen_orientation: ScreenOrientation::default(),
        }
    }
}

/// Android build variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

/// Android package format produced by `cap build`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReleaseType {
    #[default]
    Apk,
    Aab,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Apk => "APK",
            ReleaseType::Aab => "AAB",
        }
    }
}

/// `uses-feature` requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequirement {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Category to add to an activity's intent-filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCategoryRule {
    /// Category name to add
    pub name: String,
    /// Activity to edit (defaults to `.MainActivity`)
    pub activity: Option<String>,
    /// Action the target filter must declare
    pub action: Option<String>,
    /// Category the target filter must already declare
    pub category: Option<String>,
}

/// Data node to add to an activity's intent-filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDataRule {
    /// Full attribute map of the data node, e.g. `"android:scheme" = "myapp"`
    pub attributes: IndexMap<String, String>,
    pub activity: Option<String>,
    pub action: Option<String>,
    pub category: Option<String>,
}

/// Android specific settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidSettings {
    pub build_type: BuildType,
    pub release_type: ReleaseType,
    /// Keystore path, relative to the project root
    pub keystore_path: Option<PathBuf>,
    pub keystore_password: Option<String>,
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
    /// Android SDK, exported as ANDROID_HOME and ANDROID_SDK_ROOT to `cap build android`
    pub sdk_path: Option<PathBuf>,
    /// Extra `uses-permission` entries
    pub permissions: Vec<String>,
    /// Extra `uses-feature` entries
    pub features: Vec<FeatureRequirement>,
    /// Entries for the `ext { }` block of variables.gradle
    pub gradle_variables: IndexMap<String, String>,
    pub intent_categories: Vec<IntentCategoryRule>,
    pub intent_data: Vec<IntentDataRule>,
}

/// Complete Android signing material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidSigning {
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    pub key_alias: String,
    pub key_password: String,
}

impl AndroidSettings {
    /// Signing material, only when every field is present
    pub fn signing(&self) -> Option<AndroidSigning> {
        Some(AndroidSigning {
            keystore_path: self.keystore_path.clone()?,
            keystore_password: self.keystore_password.clone()?,
            key_alias: self.key_alias.clone()?,
            key_password: self.key_password.clone()?,
        })
    }
}

/// Type of the iOS signing certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum P12Type {
    #[default]
    Distribution,
    Development,
    AdHoc,
}

impl P12Type {
    /// `method` of exportOptions.plist
    pub fn export_method(&self) -> &'static str {
        match self {
            P12Type::Development => "development",
            P12Type::Distribution | P12Type::AdHoc => "release-testing",
        }
    }
}

/// iOS specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IosSettings {
    /// Values for UISupportedInterfaceOrientations
    pub supported_orientations: Vec<String>,
    pub p12_type: P12Type,
    /// Certificate path, relative to the project root
    pub p12_path: Option<PathBuf>,
    pub p12_password: Option<String>,
    /// Provisioning profile file name, relative to the certificate directory
    pub provisioning_profile: Option<String>,
    /// Xcode target and scheme name
    pub scheme: String,
    /// Extra string entries for Info.plist (usage descriptions, ...)
    pub info_plist: IndexMap<String, String>,
}

impl Default for IosSettings {
    fn default() -> Self {
        Self {
            supported_orientations: vec!["UIInterfaceOrientationPortrait".to_string()],
            p12_type: P12Type::default(),
            p12_path: None,
            p12_password: None,
            provisioning_profile: None,
            scheme: crate::project::DEFAULT_IOS_TARGET.to_string(),
            info_plist: IndexMap::new(),
        }
    }
}

impl IosSettings {
    /// Whether certificate, password and profile are all configured
    pub fn has_signing(&self) -> bool {
        self.p12_path.is_some() && self.p12_password.is_some() && self.provisioning_profile.is_some()
    }
}

/// Artifact output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory the final binaries are copied to, relative to the project root
    pub artifacts_dir: PathBuf,
    /// Placeholders: {versionName} {buildNumber} {date} {time}
    pub android_apk_name_format: String,
    /// Placeholders: {appName} {versionName} {buildNumber} {date} {time}
    pub ios_ipa_name_format: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("./build"),
            android_apk_name_format: "app-{versionName}-{date}.apk".to_string(),
            ios_ipa_name_format: "{appName}-{versionName}-{date}.ipa".to_string(),
        }
    }
}

/// Complete build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub app: AppInfo,
    pub android: AndroidSettings,
    pub ios: IosSettings,
    /// npm packages of Capacitor plugins to install
    pub plugins: Vec<String>,
    pub output: OutputSettings,
}

impl BuildConfig {
    /// Load configuration from a TOML file and apply environment overrides
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::NotFound(format!("Build configuration not found: {:?}", path)));
        }

        debug!("Loading build configuration from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());

        info!(
            "Loaded configuration for {} ({}) v{}",
            config.app.display_name, config.app.app_id, config.app.version_name
        );
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Fill secrets from the environment; set variables win over the file
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ANDROID_KEYSTORE_PASSWORD) {
            self.android.keystore_password = Some(value);
        }
        if let Some(value) = lookup(ENV_ANDROID_KEY_PASSWORD) {
            self.android.key_password = Some(value);
        }
        if let Some(value) = lookup(ENV_IOS_P12_PASSWORD) {
            self.ios.p12_password = Some(value);
        }
    }

    /// Whether the Capacitor logging behavior should be production
    pub fn is_release(&self) -> bool {
        self.android.build_type == BuildType::Release
    }

    /// Check the settings every pipeline run needs
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        self.collect_missing_app_fields(&mut missing);
        Self::missing_to_result(missing)
    }

    /// Check everything the iOS archive/export stage needs
    pub fn validate_for_ios(&self) -> Result<()> {
        let mut missing = Vec::new();
        self.collect_missing_app_fields(&mut missing);

        if self.ios.p12_path.is_none() {
            missing.push("ios.p12_path");
        }
        if self.ios.p12_password.is_none() {
            missing.push("ios.p12_password");
        }
        if self.ios.provisioning_profile.is_none() {
            missing.push("ios.provisioning_profile");
        }
        if self.output.ios_ipa_name_format.is_empty() {
            missing.push("output.ios_ipa_name_format");
        }

        Self::missing_to_result(missing)
    }

    fn collect_missing_app_fields(&self, missing: &mut Vec<&'static str>) {
        if self.app.app_id.is_empty() {
            missing.push("app.app_id");
        }
        if self.app.display_name.is_empty() {
            missing.push("app.display_name");
        }
        if self.app.version_name.is_empty() {
            missing.push("app.version_name");
        }
        if self.app.build_number == 0 {
            missing.push("app.build_number");
        }
        if self.app.start_url.is_empty() {
            missing.push("app.start_url");
        }
    }

    fn missing_to_result(missing: Vec<&'static str>) -> Result<()> {
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Config(format!("missing required settings: {}", missing.join(", "))))
        }
    }
}

fn default_true() -> bool {
    true
}
