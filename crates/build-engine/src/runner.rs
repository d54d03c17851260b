//! Build Runner
//!
//! Coordinates the pipeline: base pre-processing, then the pre-processing
//! and (optionally) build stage of each selected platform.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use capbuild_core::{BuildConfig, ProjectLayout};
use tracing::{error, info};

use crate::android::AndroidStage;
use crate::capacitor::update_capacitor_config;
use crate::ios::IosStage;
use crate::plugins::{reconcile_plugins, PluginReport};
use crate::process::Tool;
use crate::{BuildError, NativeEdit, Platform};

/// Platforms requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSelection {
    Android,
    Ios,
    All,
}

impl PlatformSelection {
    /// Platforms in pipeline order; `All` runs iOS first
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            PlatformSelection::Android => vec![Platform::Android],
            PlatformSelection::Ios => vec![Platform::Ios],
            PlatformSelection::All => vec![Platform::Ios, Platform::Android],
        }
    }
}

impl FromStr for PlatformSelection {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(PlatformSelection::Android),
            "ios" => Ok(PlatformSelection::Ios),
            "all" => Ok(PlatformSelection::All),
            other => Err(BuildError::ConfigError(format!("unknown platform: {}", other))),
        }
    }
}

impl fmt::Display for PlatformSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSelection::Android => write!(f, "android"),
            PlatformSelection::Ios => write!(f, "ios"),
            PlatformSelection::All => write!(f, "all"),
        }
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub plugins: PluginReport,
    /// Native edits per platform
    pub edits: Vec<(Platform, Vec<NativeEdit>)>,
    /// Collected binaries per platform
    pub artifacts: Vec<(Platform, PathBuf)>,
    pub duration_secs: f64,
}

/// Runs the pipeline for one project
pub struct BuildRunner {
    layout: ProjectLayout,
    config: BuildConfig,
    build: bool,
    prod: bool,
}

impl BuildRunner {
    pub fn new(layout: ProjectLayout, config: BuildConfig) -> Self {
        Self {
            layout,
            config,
            build: false,
            prod: false,
        }
    }

    /// Run the build stages after pre-processing
    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    /// Forward `--prod` to `cap build`
    pub fn with_prod(mut self, prod: bool) -> Self {
        self.prod = prod;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the whole pipeline; the first failing stage aborts it
    pub async fn run(&self, selection: PlatformSelection) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        info!("Starting {} pipeline for {:?}", selection, self.layout.root);

        self.config.validate()?;
        let mut output = BuildOutput {
            plugins: self.base_pre_process(selection).await?,
            ..BuildOutput::default()
        };

        for platform in selection.platforms() {
            let result = self.run_platform(platform, &mut output).await;
            if let Err(ref e) = result {
                error!("{} pipeline failed: {}", platform, e);
            }
            result?;
        }

        output.duration_secs = start.elapsed().as_secs_f64();
        info!("Pipeline completed in {:.2}s", output.duration_secs);
        Ok(output)
    }

    /// Capacitor config, missing platforms, plugins, `cap sync`
    pub async fn base_pre_process(&self, selection: PlatformSelection) -> Result<PluginReport, BuildError> {
        info!("Base pre-processing");

        update_capacitor_config(&self.layout, &self.config).await?;

        for platform in selection.platforms() {
            let dir = match platform {
                Platform::Android => &self.layout.android_dir,
                Platform::Ios => &self.layout.ios_dir,
            };
            if dir.exists() {
                info!("{} platform present at {:?}", platform, dir);
                continue;
            }
            info!("{} platform missing; running `npx cap add {}`", platform, platform.as_str());
            Tool::npx(["cap", "add", platform.as_str()])
                .current_dir(&self.layout.root)
                .inherit_output()
                .run()
                .await?;
        }

        let plugins = reconcile_plugins(&self.layout, &self.config.plugins).await?;

        Tool::npx(["cap", "sync"])
            .current_dir(&self.layout.root)
            .inherit_output()
            .run()
            .await?;

        info!("Base pre-processing complete");
        Ok(plugins)
    }

    async fn run_platform(&self, platform: Platform, output: &mut BuildOutput) -> Result<(), BuildError> {
        match platform {
            Platform::Android => {
                let stage = AndroidStage::new(&self.layout, &self.config).with_prod(self.prod);
                output.edits.push((platform, stage.pre_process().await?));
                if self.build {
                    output.artifacts.push((platform, stage.build().await?));
                } else {
                    info!("Skipping Android build (no --build)");
                }
            }
            Platform::Ios => {
                let stage = IosStage::new(&self.layout, &self.config);
                output.edits.push((platform, stage.pre_process().await?));
                if self.build {
                    output.artifacts.push((platform, stage.build().await?));
                } else {
                    info!("Skipping iOS build (no --build)");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_runs_ios_first() {
        assert_eq!(PlatformSelection::All.platforms(), vec![Platform::Ios, Platform::Android]);
        assert_eq!(PlatformSelection::Android.platforms(), vec![Platform::Android]);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!("Android".parse::<PlatformSelection>().unwrap(), PlatformSelection::Android);
        assert_eq!("all".parse::<PlatformSelection>().unwrap(), PlatformSelection::All);
        assert!("web".parse::<PlatformSelection>().is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_any_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.app.app_id.clear();

        let runner = BuildRunner::new(ProjectLayout::new(dir.path()), config);
        let err = runner.run(PlatformSelection::Android).await.unwrap_err();

        assert!(matches!(err, BuildError::Core(_)));
        assert!(!runner.layout().capacitor_config().exists());
    }
}
