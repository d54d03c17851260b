//! Project Layout
//!
//! Paths of the Capacitor project and its generated native platforms. A
//! layout is built once at startup and handed to every editor and stage.

use std::path::{Path, PathBuf};

/// Default Xcode app target / scheme created by Capacitor
pub const DEFAULT_IOS_TARGET: &str = "App";

/// Resolved locations inside a Capacitor project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Project root (where capacitor.config.json lives)
    pub root: PathBuf,
    /// Android platform directory
    pub android_dir: PathBuf,
    /// iOS platform directory
    pub ios_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout with the standard `android/` and `ios/` platform directories
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            android_dir: root.join("android"),
            ios_dir: root.join("ios"),
            root,
        }
    }

    /// Resolve a path relative to the project root; absolute paths pass through
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn capacitor_config(&self) -> PathBuf {
        self.root.join("capacitor.config.json")
    }

    /// Source images for icon and splash generation
    pub fn assets_source_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn android_manifest(&self) -> PathBuf {
        self.android_dir
            .join("app")
            .join("src")
            .join("main")
            .join("AndroidManifest.xml")
    }

    pub fn android_assets_dir(&self) -> PathBuf {
        self.android_dir.join("app").join("src").join("main").join("assets")
    }

    pub fn variables_gradle(&self) -> PathBuf {
        self.android_dir.join("variables.gradle")
    }

    pub fn android_release_apk_dir(&self) -> PathBuf {
        self.android_dir
            .join("app")
            .join("build")
            .join("outputs")
            .join("apk")
            .join("release")
    }

    /// Directory holding the Xcode project, workspace and Podfile
    pub fn ios_app_dir(&self) -> PathBuf {
        self.ios_dir.join("App")
    }

    pub fn info_plist(&self) -> PathBuf {
        self.ios_app_dir().join("App").join("Info.plist")
    }

    pub fn xcworkspace(&self) -> PathBuf {
        self.ios_app_dir().join("App.xcworkspace")
    }

    pub fn xcodeproj(&self) -> PathBuf {
        self.ios_app_dir().join("App.xcodeproj")
    }

    pub fn pbxproj(&self) -> PathBuf {
        self.xcodeproj().join("project.pbxproj")
    }

    /// Scratch directory for archives, export options and exported IPAs
    pub fn ios_build_dir(&self) -> PathBuf {
        self.ios_dir.join("build")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let layout = ProjectLayout::new("/work/app");

        assert_eq!(
            layout.android_manifest(),
            PathBuf::from("/work/app/android/app/src/main/AndroidManifest.xml")
        );
        assert_eq!(layout.variables_gradle(), PathBuf::from("/work/app/android/variables.gradle"));
        assert_eq!(layout.info_plist(), PathBuf::from("/work/app/ios/App/App/Info.plist"));
        assert_eq!(
            layout.pbxproj(),
            PathBuf::from("/work/app/ios/App/App.xcodeproj/project.pbxproj")
        );
    }

    #[test]
    fn test_resolve() {
        let layout = ProjectLayout::new("/work/app");
        assert_eq!(layout.resolve("./certs/dist.p12"), PathBuf::from("/work/app/./certs/dist.p12"));
        assert_eq!(layout.resolve("/abs/dist.p12"), PathBuf::from("/abs/dist.p12"));
    }
}
