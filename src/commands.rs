//! CLI commands for capbuild
//!
//! Loads the project's build configuration and runs the pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use capbuild_build_engine::{BuildOutput, BuildRunner, PlatformSelection};
use capbuild_core::{BuildConfig, ProjectLayout, CONFIG_FILE_NAME};

/// Build command options
#[derive(Debug, Clone)]
pub struct BuildCommand {
    pub platform: PlatformSelection,
    pub project_root: PathBuf,
    /// Defaults to `build.config.toml` in the project root
    pub config_path: Option<PathBuf>,
    pub build: bool,
    pub prod: bool,
}

impl BuildCommand {
    /// Configuration file location
    pub fn config_path(&self, layout: &ProjectLayout) -> PathBuf {
        match self.config_path {
            Some(ref path) => layout.resolve(path),
            None => layout.root.join(CONFIG_FILE_NAME),
        }
    }

    /// Execute the pipeline
    pub async fn execute(&self) -> Result<BuildOutput> {
        let root = if self.project_root.is_absolute() {
            self.project_root.clone()
        } else {
            std::env::current_dir()
                .context("cannot determine the current directory")?
                .join(&self.project_root)
        };
        let layout = ProjectLayout::new(root);

        let config_path = self.config_path(&layout);
        let config = BuildConfig::load(&config_path)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("loading {:?}", config_path))?;

        info!("Building {} for {}", config.app.display_name, self.platform);

        let runner = BuildRunner::new(layout, config)
            .with_build(self.build)
            .with_prod(self.prod);
        let output = runner.run(self.platform).await?;

        for (platform, path) in &output.artifacts {
            info!("{} artifact: {:?}", platform, path);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let layout = ProjectLayout::new("/work/app");
        let mut command = BuildCommand {
            platform: PlatformSelection::Android,
            project_root: PathBuf::from("/work/app"),
            config_path: None,
            build: false,
            prod: false,
        };
        assert_eq!(command.config_path(&layout), PathBuf::from("/work/app/build.config.toml"));

        command.config_path = Some(PathBuf::from("ci/release.toml"));
        assert_eq!(command.config_path(&layout), PathBuf::from("/work/app/ci/release.toml"));
    }

    #[tokio::test]
    async fn test_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let command = BuildCommand {
            platform: PlatformSelection::Ios,
            project_root: dir.path().to_path_buf(),
            config_path: None,
            build: false,
            prod: false,
        };

        let err = command.execute().await.unwrap_err();
        assert!(format!("{:#}", err).contains("build.config.toml"));
    }
}
