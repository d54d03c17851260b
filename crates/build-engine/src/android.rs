//! Android platform stages
//!
//! Pre-processing applies the configured manifest and Gradle edits and
//! generates icons; the build stage runs `npx cap build android` and
//! collects the release package.

use std::path::{Path, PathBuf};

use capbuild_core::{BuildConfig, ProjectLayout, ReleaseType};
use capbuild_manifest_manager::{FilterCriteria, ManifestEditor, DEFAULT_ACTIVITY, SCREEN_ORIENTATION_ATTR};
use tracing::{info, warn};

use crate::artifacts::{collect_artifact, find_with_extension};
use crate::assets::{generate_assets, AssetGeneration};
use crate::gradle_vars::GradleVariables;
use crate::process::Tool;
use crate::{BuildError, NativeEdit, Platform};

/// Android pre-processing and build
pub struct AndroidStage<'a> {
    layout: &'a ProjectLayout,
    config: &'a BuildConfig,
    prod: bool,
}

impl<'a> AndroidStage<'a> {
    pub fn new(layout: &'a ProjectLayout, config: &'a BuildConfig) -> Self {
        Self {
            layout,
            config,
            prod: false,
        }
    }

    /// Forward `--prod` to `cap build`
    pub fn with_prod(mut self, prod: bool) -> Self {
        self.prod = prod;
        self
    }

    /// Verify the platform, apply native edits, generate icons
    pub async fn pre_process(&self) -> Result<Vec<NativeEdit>, BuildError> {
        info!("Pre-processing Android project");

        if !self.layout.android_dir.is_dir() {
            return Err(BuildError::PlatformMissing(self.layout.android_dir.display().to_string()));
        }
        tokio::fs::create_dir_all(self.layout.android_assets_dir()).await?;

        let edits = self.apply_native_edits().await?;

        if let AssetGeneration::Generated = generate_assets(self.layout, Platform::Android).await {
            info!("Android icons updated");
        }

        info!("Android pre-processing complete ({} edit(s) applied)", edits.len());
        Ok(edits)
    }

    /// Manifest and Gradle edits from the configuration
    pub async fn apply_native_edits(&self) -> Result<Vec<NativeEdit>, BuildError> {
        let android = &self.config.android;
        let manifest = ManifestEditor::for_project(self.layout);
        let mut edits = Vec::new();

        for permission in &android.permissions {
            let outcome = manifest.add_permission(permission).await?;
            edits.push(NativeEdit::new(format!("permission {}", permission), outcome));
        }

        for feature in &android.features {
            let outcome = manifest.add_uses_feature(&feature.name, feature.required).await?;
            edits.push(NativeEdit::new(format!("feature {}", feature.name), outcome));
        }

        let orientation = self.config.app.default_screen_orientation.as_str();
        let outcome = manifest
            .update_activity_attribute(SCREEN_ORIENTATION_ATTR, orientation, DEFAULT_ACTIVITY)
            .await?;
        edits.push(NativeEdit::new(format!("screen orientation {}", orientation), outcome));

        for rule in &android.intent_categories {
            let criteria = criteria(&rule.action, &rule.category);
            let outcome = manifest
                .add_category_to_intent_filter(&rule.name, criteria.as_ref(), rule.activity.as_deref())
                .await?;
            edits.push(NativeEdit::new(format!("intent category {}", rule.name), outcome));
        }

        for rule in &android.intent_data {
            let criteria = criteria(&rule.action, &rule.category);
            let outcome = manifest
                .add_data_to_intent_filter(&rule.attributes, criteria.as_ref(), rule.activity.as_deref())
                .await?;
            edits.push(NativeEdit::new(format!("intent data {:?}", rule.attributes), outcome));
        }

        if !android.gradle_variables.is_empty() {
            let variables = GradleVariables::for_project(self.layout);
            for (key, value) in &android.gradle_variables {
                let outcome = variables.upsert(key, value).await?;
                edits.push(NativeEdit::new(format!("gradle variable {}", key), outcome));
            }
        }

        Ok(edits)
    }

    /// `npx cap build android`, then copy the package to the artifacts directory
    pub async fn build(&self) -> Result<PathBuf, BuildError> {
        info!("Building Android release");

        self.build_tool().run().await?;

        let (dir, extension) = match self.config.android.release_type {
            ReleaseType::Apk => (self.layout.android_release_apk_dir(), "apk"),
            ReleaseType::Aab => (self.release_bundle_dir(), "aab"),
        };
        let package = locate_release_package(&dir, extension)?;

        let mut name_format = self.config.output.android_apk_name_format.clone();
        if extension == "aab" {
            name_format = Path::new(&name_format).with_extension("aab").display().to_string();
        }
        collect_artifact(&package, self.layout, self.config, &name_format).await
    }

    /// `npx cap build android`, with the configured SDK exported
    pub fn build_tool(&self) -> Tool {
        let mut build = Tool::npx(["cap", "build", "android"])
            .current_dir(&self.layout.root)
            .inherit_output();
        if self.prod {
            build = build.arg("--prod");
        }
        if let Some(ref sdk) = self.config.android.sdk_path {
            let sdk = self.layout.resolve(sdk).display().to_string();
            info!("Using Android SDK at {}", sdk);
            build = build.env("ANDROID_HOME", sdk.clone()).env("ANDROID_SDK_ROOT", sdk);
        }
        build
    }

    fn release_bundle_dir(&self) -> PathBuf {
        self.layout
            .android_dir
            .join("app")
            .join("build")
            .join("outputs")
            .join("bundle")
            .join("release")
    }
}

fn criteria(action: &Option<String>, category: &Option<String>) -> Option<FilterCriteria> {
    if action.is_none() && category.is_none() {
        None
    } else {
        Some(FilterCriteria::new(action.clone(), category.clone()))
    }
}

/// `app-release.<ext>`, else `app-release-signed.<ext>`
pub fn locate_release_package(dir: &Path, extension: &str) -> Result<PathBuf, BuildError> {
    let candidates = [
        dir.join(format!("app-release.{}", extension)),
        dir.join(format!("app-release-signed.{}", extension)),
    ];
    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        info!("Found release package {:?}", found);
        return Ok(found.clone());
    }

    let present: Vec<String> = find_with_extension(dir, extension, 1)
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    warn!("Files in {:?}: [{}]", dir, present.join(", "));

    Err(BuildError::BuildFailed(format!(
        "release package not found: {} or {}",
        candidates[0].display(),
        candidates[1].display()
    )))
}
