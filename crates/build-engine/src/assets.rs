//! Icon and splash generation via `@capacitor/assets`

use std::path::Path;

use capbuild_core::ProjectLayout;
use tracing::{info, warn};

use crate::process::Tool;
use crate::Platform;

/// Source images expected in `assets/`
pub const REQUIRED_IMAGES: &[&str] = &[
    "splash.png",
    "splash-dark.png",
    "icon-only.png",
    "icon-foreground.png",
    "icon-background.png",
];

/// Result of an asset generation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetGeneration {
    Generated,
    /// Source directory or images missing
    Skipped(String),
    /// The generator ran and failed
    Failed(String),
}

/// Required images not present in `dir`
pub fn missing_source_images(dir: &Path) -> Vec<&'static str> {
    REQUIRED_IMAGES
        .iter()
        .copied()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

/// Generate icons and splash screens for `platform`.
///
/// Never fails the pipeline; problems are logged and reported.
pub async fn generate_assets(layout: &ProjectLayout, platform: Platform) -> AssetGeneration {
    let source = layout.assets_source_dir();
    if !source.is_dir() {
        warn!("Asset source directory {:?} does not exist; skipping icon generation", source);
        return AssetGeneration::Skipped(format!("{} not found", source.display()));
    }

    let missing = missing_source_images(&source);
    if !missing.is_empty() {
        warn!("Missing source images in {:?}: {}", source, missing.join(", "));
        return AssetGeneration::Skipped(format!("missing {}", missing.join(", ")));
    }

    info!("Generating {} icons and splash screens", platform);
    let generate = Tool::npx(["capacitor-assets", "generate"])
        .arg(format!("--{}", platform.as_str()))
        .arg("--verbose")
        .current_dir(&layout.root);

    match generate.run().await {
        Ok(_) => {
            info!("{} assets generated", platform);
            AssetGeneration::Generated
        }
        Err(e) => {
            warn!("Asset generation for {} failed: {}", platform, e);
            AssetGeneration::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_images_skip_generation() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());

        let outcome = generate_assets(&layout, Platform::Android).await;
        assert!(matches!(outcome, AssetGeneration::Skipped(_)));

        let source = layout.assets_source_dir();
        tokio::fs::create_dir_all(&source).await.unwrap();
        tokio::fs::write(source.join("splash.png"), b"png").await.unwrap();
        tokio::fs::write(source.join("icon-only.png"), b"png").await.unwrap();

        assert_eq!(
            missing_source_images(&source),
            vec!["splash-dark.png", "icon-foreground.png", "icon-background.png"]
        );
        match generate_assets(&layout, Platform::Ios).await {
            AssetGeneration::Skipped(reason) => assert!(reason.contains("splash-dark.png")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
