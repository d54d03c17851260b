//! External tool invocation
//!
//! Thin wrapper over `tokio::process::Command` for the package manager,
//! Capacitor CLI, CocoaPods, `security` and `xcodebuild`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::BuildError;

/// Captured result of a finished tool
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// One external tool invocation
#[derive(Debug, Clone)]
pub struct Tool {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    inherit_output: bool,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            inherit_output: false,
        }
    }

    /// `npx <args>`
    pub fn npx<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self::new("npx").args(args)
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Stream the tool's output to the terminal instead of capturing it
    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// Value set for `key` with [`Tool::env`]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Command line for logs
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Run to completion; a non-zero exit status is an error
    pub async fn run(&self) -> Result<ToolOutput, BuildError> {
        debug!("Running: {}", self.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        if self.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::ToolchainNotFound(self.program.clone())
            } else {
                BuildError::Io(e)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(BuildError::BuildFailed(format!(
                "`{}` exited with {}\n{}\n{}",
                self.display(),
                output.status,
                stdout.trim_end(),
                stderr.trim_end()
            )));
        }

        info!("Finished: {}", self.display());
        Ok(ToolOutput { stdout, stderr })
    }

    /// Run and report only whether the tool succeeded
    pub async fn succeeds(&self) -> bool {
        match self.run().await {
            Ok(_) => true,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }
}
