//! iOS platform stages
//!
//! Pre-processing runs CocoaPods, generates assets and applies Info.plist
//! entries. The build stage signs with a temporary keychain, archives and
//! exports an IPA with `xcodebuild`, and always removes the keychain.

use std::path::{Path, PathBuf};

use capbuild_core::{BuildConfig, ProjectLayout};
use capbuild_xcode_project::{apply_signing_configuration, ExportOptions, InfoPlistEditor, ProvisioningProfile};
use plist::Value;
use tracing::{info, warn};

use crate::artifacts::{collect_artifact, find_with_extension};
use crate::assets::generate_assets;
use crate::keychain::{install_provisioning_profile, TempKeychain};
use crate::process::Tool;
use crate::{BuildError, NativeEdit, Platform};

const ORIENTATIONS_KEY: &str = "UISupportedInterfaceOrientations";
const RELEASE_CONFIGURATION: &str = "Release";
const GENERIC_DESTINATION: &str = "generic/platform=iOS";

/// Workspace or bare project handed to `xcodebuild`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XcodeContainer {
    Workspace(PathBuf),
    Project(PathBuf),
}

impl XcodeContainer {
    /// `App.xcworkspace` when CocoaPods created one, else `App.xcodeproj`
    pub fn detect(layout: &ProjectLayout) -> Result<Self, BuildError> {
        let workspace = layout.xcworkspace();
        if workspace.exists() {
            return Ok(Self::Workspace(workspace));
        }
        let project = layout.xcodeproj();
        if project.exists() {
            return Ok(Self::Project(project));
        }
        Err(BuildError::FileNotFound(format!(
            "{} or {}",
            workspace.display(),
            project.display()
        )))
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "-workspace",
            Self::Project(_) => "-project",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Workspace(path) | Self::Project(path) => path,
        }
    }
}

/// Signing identity read from the provisioning profile
#[derive(Debug, Clone)]
struct Signing {
    p12: PathBuf,
    p12_password: String,
    profile_path: PathBuf,
    profile: ProvisioningProfile,
}

/// iOS pre-processing and build
pub struct IosStage<'a> {
    layout: &'a ProjectLayout,
    config: &'a BuildConfig,
}

impl<'a> IosStage<'a> {
    pub fn new(layout: &'a ProjectLayout, config: &'a BuildConfig) -> Self {
        Self { layout, config }
    }

    /// Verify the platform, install pods, generate assets, update Info.plist
    pub async fn pre_process(&self) -> Result<Vec<NativeEdit>, BuildError> {
        info!("Pre-processing iOS project");

        if !self.layout.ios_dir.is_dir() {
            return Err(BuildError::PlatformMissing(self.layout.ios_dir.display().to_string()));
        }
        let info_plist = self.layout.info_plist();
        if !info_plist.is_file() {
            return Err(BuildError::FileNotFound(info_plist.display().to_string()));
        }

        Tool::new("pod")
            .arg("install")
            .current_dir(self.layout.ios_app_dir())
            .inherit_output()
            .run()
            .await?;

        generate_assets(self.layout, Platform::Ios).await;

        let edits = self.apply_info_plist().await?;
        info!("iOS pre-processing complete ({} edit(s) applied)", edits.len());
        Ok(edits)
    }

    /// Configured Info.plist entries and supported orientations
    pub async fn apply_info_plist(&self) -> Result<Vec<NativeEdit>, BuildError> {
        let editor = InfoPlistEditor::for_project(self.layout);
        let mut edits = Vec::new();

        for (key, value) in &self.config.ios.info_plist {
            let outcome = editor.upsert(key, value.as_str()).await?;
            edits.push(NativeEdit::new(format!("Info.plist {}", key), outcome));
        }

        if !self.config.ios.supported_orientations.is_empty() {
            let orientations = Value::Array(
                self.config
                    .ios
                    .supported_orientations
                    .iter()
                    .map(|o| Value::String(o.clone()))
                    .collect(),
            );
            let outcome = editor.upsert(ORIENTATIONS_KEY, orientations).await?;
            edits.push(NativeEdit::new(format!("Info.plist {}", ORIENTATIONS_KEY), outcome));
        }

        Ok(edits)
    }

    /// Sign, archive and export; returns the collected IPA
    pub async fn build(&self) -> Result<PathBuf, BuildError> {
        if !cfg!(target_os = "macos") {
            return Err(BuildError::UnsupportedHost(format!(
                "iOS builds require macOS (running on {})",
                std::env::consts::OS
            )));
        }
        self.config.validate_for_ios()?;

        let signing = self.resolve_signing().await?;
        let keychain = TempKeychain::new(signing.p12_password.clone())?;
        keychain.create_and_import(&signing.p12, &signing.p12_password).await?;

        let result = self.sign_archive_export(&signing).await;
        keychain.delete().await;
        result
    }

    async fn resolve_signing(&self) -> Result<Signing, BuildError> {
        let ios = &self.config.ios;
        let (Some(p12_path), Some(p12_password), Some(profile_name)) =
            (&ios.p12_path, &ios.p12_password, &ios.provisioning_profile)
        else {
            return Err(BuildError::ConfigError("iOS signing is not configured".to_string()));
        };

        let p12 = self.layout.resolve(p12_path);
        if !p12.is_file() {
            return Err(BuildError::FileNotFound(p12.display().to_string()));
        }
        let profile_path = p12
            .parent()
            .map(|dir| dir.join(profile_name))
            .unwrap_or_else(|| self.layout.resolve(profile_name));
        if !profile_path.is_file() {
            return Err(BuildError::FileNotFound(profile_path.display().to_string()));
        }

        let profile = ProvisioningProfile::read(&profile_path).await?;
        info!("Provisioning profile {:?} for team {}", profile.name, profile.team_id);

        Ok(Signing {
            p12,
            p12_password: p12_password.clone(),
            profile_path,
            profile,
        })
    }

    async fn sign_archive_export(&self, signing: &Signing) -> Result<PathBuf, BuildError> {
        let profile = &signing.profile;
        let app_id = &self.config.app.app_id;
        let scheme = &self.config.ios.scheme;

        install_provisioning_profile(&signing.profile_path).await?;

        let container = XcodeContainer::detect(self.layout)?;
        info!("Using {} {:?}", container.flag(), container.path());

        apply_signing_configuration(self.layout.pbxproj(), scheme, &profile.team_id, &profile.name).await?;

        if let Some(bundle_id) = profile.bundle_id() {
            if bundle_id != app_id && !bundle_id.ends_with('*') {
                warn!("Profile is for {} but the app id is {}", bundle_id, app_id);
            }
        }

        let build_dir = self.layout.ios_build_dir();
        let archive_path = build_dir.join(format!("{}.xcarchive", scheme));
        let export_path = build_dir.join("IPA");
        let export_options_path = build_dir.join("exportOptions.plist");

        ExportOptions::manual(
            self.config.ios.p12_type.export_method(),
            &profile.team_id,
            app_id,
            &profile.name,
        )
        .write(&export_options_path)
        .await?;

        Tool::new("xcodebuild")
            .args(archive_args(&container, scheme, &archive_path, &profile.team_id, &profile.name))
            .current_dir(&self.layout.ios_dir)
            .env("XCODE_DEVELOPMENT_TEAM", profile.team_id.as_str())
            .env("BUILD_NUMBER", self.config.app.build_number.to_string())
            .inherit_output()
            .run()
            .await?;
        info!("Archive written to {:?}", archive_path);

        Tool::new("xcodebuild")
            .args(export_args(&archive_path, &export_path, &export_options_path))
            .current_dir(&self.layout.ios_dir)
            .inherit_output()
            .run()
            .await?;

        let ipa = find_with_extension(&export_path, "ipa", 1)
            .into_iter()
            .next()
            .ok_or_else(|| BuildError::BuildFailed(format!("no .ipa exported to {}", export_path.display())))?;
        info!("Exported {:?}", ipa);

        collect_artifact(&ipa, self.layout, self.config, &self.config.output.ios_ipa_name_format).await
    }
}

/// `xcodebuild archive` arguments for manual signing
pub fn archive_args(
    container: &XcodeContainer,
    scheme: &str,
    archive_path: &Path,
    team_id: &str,
    profile_name: &str,
) -> Vec<String> {
    vec![
        "archive".to_string(),
        container.flag().to_string(),
        container.path().display().to_string(),
        "-scheme".to_string(),
        scheme.to_string(),
        "-configuration".to_string(),
        RELEASE_CONFIGURATION.to_string(),
        "-destination".to_string(),
        GENERIC_DESTINATION.to_string(),
        "-archivePath".to_string(),
        archive_path.display().to_string(),
        "CODE_SIGN_STYLE=Manual".to_string(),
        format!("DEVELOPMENT_TEAM={}", team_id),
        format!("PROVISIONING_PROFILE_SPECIFIER={}", profile_name),
    ]
}

/// `xcodebuild -exportArchive` arguments
pub fn export_args(archive_path: &Path, export_path: &Path, export_options: &Path) -> Vec<String> {
    vec![
        "-exportArchive".to_string(),
        "-archivePath".to_string(),
        archive_path.display().to_string(),
        "-exportPath".to_string(),
        export_path.display().to_string(),
        "-exportOptionsPlist".to_string(),
        export_options.display().to_string(),
    ]
}
