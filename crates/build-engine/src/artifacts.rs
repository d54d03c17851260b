//! Artifact naming and collection
//!
//! Built binaries are copied to `<artifacts_dir>/<display_name>/<name>`,
//! where the name comes from a format string with `{appName}`,
//! `{versionName}`, `{buildNumber}`, `{date}` (YYYYMMDD) and `{time}`
//! (HHmmss) placeholders.

use std::path::{Path, PathBuf};

use capbuild_core::{AppInfo, BuildConfig, ProjectLayout};
use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::BuildError;

/// Expand the placeholders of `format`
pub fn format_artifact_name(format: &str, app: &AppInfo, at: NaiveDateTime) -> String {
    format
        .replace("{appName}", &app.display_name)
        .replace("{versionName}", &app.version_name)
        .replace("{buildNumber}", &app.build_number.to_string())
        .replace("{date}", &at.format("%Y%m%d").to_string())
        .replace("{time}", &at.format("%H%M%S").to_string())
}

/// `<artifacts_dir>/<display_name>` resolved against the project root
pub fn artifacts_dir(layout: &ProjectLayout, config: &BuildConfig) -> PathBuf {
    layout
        .resolve(&config.output.artifacts_dir)
        .join(&config.app.display_name)
}

/// Copy `source` into the artifacts directory under the formatted name
pub async fn collect_artifact(
    source: &Path,
    layout: &ProjectLayout,
    config: &BuildConfig,
    name_format: &str,
) -> Result<PathBuf, BuildError> {
    let dir = artifacts_dir(layout, config);
    tokio::fs::create_dir_all(&dir).await?;

    let name = format_artifact_name(name_format, &config.app, Local::now().naive_local());
    let dest = dir.join(name);
    tokio::fs::copy(source, &dest).await?;

    info!("Copied {:?} to {:?}", source, dest);
    Ok(dest)
}

/// Files under `dir` (at most `max_depth` levels deep) with the given extension
pub fn find_with_extension(dir: &Path, extension: &str, max_depth: usize) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut found: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == extension).unwrap_or(false))
        .map(|e| e.path().to_path_buf())
        .collect();
    found.sort();
    found
}
