//! Manifest Editor
//!
//! File-bound entry point. Each operation reloads AndroidManifest.xml,
//! applies one idempotent edit and writes the file back only when the
//! document changed.

use std::path::{Path, PathBuf};

use capbuild_core::{fs, CoreError, EditOutcome, ProjectLayout};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::components;
use crate::intent_filters::{self, FilterCriteria};
use crate::manifest::XmlDocument;
use crate::parser::{ManifestParser, ParseError};
use crate::permissions;
use crate::writer::{ManifestWriter, WriteError};

/// Manifest editing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Manifest write error: {0}")]
    Write(#[from] WriteError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Edits one AndroidManifest.xml
#[derive(Debug, Clone)]
pub struct ManifestEditor {
    path: PathBuf,
    writer: ManifestWriter,
}

impl ManifestEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: ManifestWriter::new(),
        }
    }

    /// Editor for the project's `android/app/src/main/AndroidManifest.xml`
    pub fn for_project(layout: &ProjectLayout) -> Self {
        Self::new(layout.android_manifest())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current document
    pub async fn load(&self) -> Result<XmlDocument, ManifestError> {
        Ok(ManifestParser::parse_file(&self.path).await?)
    }

    pub async fn add_permission(&self, name: &str) -> Result<EditOutcome, ManifestError> {
        self.modify("add permission", |doc| permissions::add_permission(doc, name))
            .await
    }

    pub async fn add_uses_feature(&self, name: &str, required: bool) -> Result<EditOutcome, ManifestError> {
        self.modify("add feature", |doc| permissions::add_uses_feature(doc, name, required))
            .await
    }

    pub async fn update_activity_attribute(
        &self,
        attribute: &str,
        value: &str,
        activity: &str,
    ) -> Result<EditOutcome, ManifestError> {
        self.modify("update activity attribute", |doc| {
            components::update_activity_attribute(doc, activity, attribute, value)
        })
        .await
    }

    /// Add a category to an activity's intent-filter.
    ///
    /// `criteria` defaults to the launcher filter, `activity` to `.MainActivity`.
    pub async fn add_category_to_intent_filter(
        &self,
        category: &str,
        criteria: Option<&FilterCriteria>,
        activity: Option<&str>,
    ) -> Result<EditOutcome, ManifestError> {
        self.modify("add intent-filter category", |doc| {
            intent_filters::add_category_to_intent_filter(doc, category, criteria, activity)
        })
        .await
    }

    /// Add a data node to an activity's intent-filter
    pub async fn add_data_to_intent_filter(
        &self,
        attributes: &IndexMap<String, String>,
        criteria: Option<&FilterCriteria>,
        activity: Option<&str>,
    ) -> Result<EditOutcome, ManifestError> {
        self.modify("add intent-filter data", |doc| {
            intent_filters::add_data_to_intent_filter(doc, attributes, criteria, activity)
        })
        .await
    }

    /// Parse, apply `edit`, write back on change
    async fn modify<F>(&self, operation: &str, edit: F) -> Result<EditOutcome, ManifestError>
    where
        F: FnOnce(&mut XmlDocument) -> EditOutcome,
    {
        let mut document = self.load().await?;
        let outcome = edit(&mut document);

        match &outcome {
            EditOutcome::Skipped(reason) => {
                warn!("{} skipped for {:?}: {}", operation, self.path, reason);
            }
            EditOutcome::Unchanged => {
                debug!("{}: {:?} already up to date", operation, self.path);
            }
            EditOutcome::Inserted | EditOutcome::Updated => {
                let xml = self.writer.write_to_string(&document)?;
                fs::replace_file(&self.path, xml).await?;
                info!("{}: wrote {:?}", operation, self.path);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android">

    <application
        android:allowBackup="true"
        android:label="@string/app_name">

        <activity
            android:name=".MainActivity"
            android:exported="true"
            android:launchMode="singleTask">

            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>

        </activity>
    </application>

    <!-- Permissions -->

    <uses-permission android:name="android.permission.INTERNET" />
</manifest>
"#;

    async fn project() -> (tempfile::TempDir, ManifestEditor) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let path = layout.android_manifest();
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, MANIFEST).await.unwrap();
        (dir, ManifestEditor::for_project(&layout))
    }

    #[tokio::test]
    async fn test_camera_and_record_audio_permissions() {
        let (_dir, editor) = project().await;

        for name in ["android.permission.CAMERA", "android.permission.RECORD_AUDIO"] {
            assert_eq!(editor.add_permission(name).await.unwrap(), EditOutcome::Inserted);
        }
        let written = tokio::fs::read_to_string(editor.path()).await.unwrap();

        for name in ["android.permission.CAMERA", "android.permission.RECORD_AUDIO"] {
            assert_eq!(editor.add_permission(name).await.unwrap(), EditOutcome::Unchanged);
        }
        assert_eq!(tokio::fs::read_to_string(editor.path()).await.unwrap(), written);

        let doc = editor.load().await.unwrap();
        assert_eq!(
            permissions::declared_permissions(&doc),
            vec![
                "android.permission.INTERNET",
                "android.permission.CAMERA",
                "android.permission.RECORD_AUDIO"
            ]
        );
        assert!(written.contains("<!-- Permissions -->"));
        assert!(written.contains("android:launchMode=\"singleTask\""));
    }

    #[tokio::test]
    async fn test_unchanged_edit_does_not_rewrite() {
        let (_dir, editor) = project().await;

        let outcome = editor
            .update_activity_attribute("android:exported", "true", ".MainActivity")
            .await
            .unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert_eq!(tokio::fs::read_to_string(editor.path()).await.unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_missing_activity_leaves_file_untouched() {
        let (_dir, editor) = project().await;

        let outcome = editor
            .update_activity_attribute("android:screenOrientation", "landscape", ".Missing")
            .await
            .unwrap();
        assert!(!outcome.is_success());

        let outcome = editor
            .add_category_to_intent_filter("android.intent.category.HOME", None, Some(".Missing"))
            .await
            .unwrap();
        assert!(!outcome.is_success());

        assert_eq!(tokio::fs::read_to_string(editor.path()).await.unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_intent_filter_edits() {
        let (_dir, editor) = project().await;

        let outcome = editor
            .add_category_to_intent_filter("android.intent.category.DEFAULT", None, None)
            .await
            .unwrap();
        assert_eq!(outcome, EditOutcome::Inserted);

        let mut data = IndexMap::new();
        data.insert("android:scheme".to_string(), "myapp".to_string());
        assert_eq!(
            editor.add_data_to_intent_filter(&data, None, None).await.unwrap(),
            EditOutcome::Inserted
        );
        assert_eq!(
            editor.add_data_to_intent_filter(&data, None, None).await.unwrap(),
            EditOutcome::Unchanged
        );

        let xml = tokio::fs::read_to_string(editor.path()).await.unwrap();
        assert!(xml.contains("<category android:name=\"android.intent.category.DEFAULT\"/>"));
        assert!(xml.contains("<data android:scheme=\"myapp\"/>"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let editor = ManifestEditor::new(dir.path().join("AndroidManifest.xml"));

        let err = editor.add_permission("android.permission.CAMERA").await.unwrap_err();
        assert!(matches!(err, ManifestError::Parse(ParseError::FileNotFound(_))));
    }
}
