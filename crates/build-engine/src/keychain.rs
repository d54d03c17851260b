//! Temporary signing keychain
//!
//! The p12 is imported into a throwaway keychain put at the front of the
//! search list, so `xcodebuild` can sign without touching the login
//! keychain. The keychain must be deleted once the build is over.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::process::Tool;
use crate::BuildError;

const SECURITY: &str = "security";
const PARTITION_LIST: &str = "apple-tool:,apple:";

/// A keychain created for one build
#[derive(Debug, Clone)]
pub struct TempKeychain {
    path: PathBuf,
    password: String,
}

impl TempKeychain {
    /// Keychain under `~/Library/Keychains` named after the current time
    pub fn new(password: impl Into<String>) -> Result<Self, BuildError> {
        let home = dirs::home_dir()
            .ok_or_else(|| BuildError::ConfigError("cannot determine the home directory".to_string()))?;
        let name = format!("temp_capacitor_keychain_{}.keychain", Utc::now().timestamp_millis());
        Ok(Self::at(home.join("Library").join("Keychains").join(name), password))
    }

    pub fn at(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: password.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commands that create the keychain and import `p12`
    pub fn setup_commands(&self, p12: &Path, p12_password: &str) -> Vec<Tool> {
        let keychain = self.path.as_os_str();
        vec![
            Tool::new(SECURITY)
                .args(["create-keychain", "-p", self.password.as_str()])
                .arg(keychain),
            Tool::new(SECURITY)
                .args(["unlock-keychain", "-p", self.password.as_str()])
                .arg(keychain),
            Tool::new(SECURITY)
                .args(["list-keychains", "-s"])
                .arg(keychain)
                .arg("login.keychain"),
            Tool::new(SECURITY)
                .arg("import")
                .arg(p12.as_os_str())
                .args(["-P", p12_password, "-k"])
                .arg(keychain)
                .args(["-A", "-T", "/usr/bin/codesign", "-T", "/usr/bin/security"]),
            Tool::new(SECURITY)
                .args(["set-key-partition-list", "-S", PARTITION_LIST, "-s", "-k", self.password.as_str()])
                .arg(keychain),
        ]
    }

    /// Create, unlock and activate the keychain, then import the certificate.
    ///
    /// On failure the half-built keychain is removed before returning.
    pub async fn create_and_import(&self, p12: &Path, p12_password: &str) -> Result<(), BuildError> {
        info!("Creating temporary keychain {:?}", self.path);
        for command in self.setup_commands(p12, p12_password) {
            if let Err(e) = command.run().await {
                self.delete().await;
                return Err(BuildError::SigningError(format!(
                    "keychain setup failed: {}",
                    e
                )));
            }
        }
        info!("Imported signing certificate {:?}", p12);
        Ok(())
    }

    /// Best-effort removal
    pub async fn delete(&self) {
        let delete = Tool::new(SECURITY).arg("delete-keychain").arg(self.path.as_os_str());
        match delete.run().await {
            Ok(_) => info!("Deleted temporary keychain {:?}", self.path),
            Err(e) => warn!("Failed to delete temporary keychain {:?}: {}", self.path, e),
        }
    }
}

/// Copy a provisioning profile where Xcode looks for installed profiles
pub async fn install_provisioning_profile(profile: &Path) -> Result<PathBuf, BuildError> {
    let home = dirs::home_dir()
        .ok_or_else(|| BuildError::ConfigError("cannot determine the home directory".to_string()))?;
    let dir = home.join("Library").join("MobileDevice").join("Provisioning Profiles");
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = profile
        .file_name()
        .ok_or_else(|| BuildError::ConfigError(format!("invalid profile path {:?}", profile)))?;
    let dest = dir.join(file_name);
    tokio::fs::copy(profile, &dest).await?;

    info!("Installed provisioning profile to {:?}", dest);
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_commands() {
        let keychain = TempKeychain::at("/Users/ci/Library/Keychains/temp.keychain", "secret");
        let commands: Vec<String> = keychain
            .setup_commands(Path::new("/work/certs/dist.p12"), "p12pw")
            .iter()
            .map(Tool::display)
            .collect();

        assert_eq!(
            commands,
            vec![
                "security create-keychain -p secret /Users/ci/Library/Keychains/temp.keychain",
                "security unlock-keychain -p secret /Users/ci/Library/Keychains/temp.keychain",
                "security list-keychains -s /Users/ci/Library/Keychains/temp.keychain login.keychain",
                "security import /work/certs/dist.p12 -P p12pw -k /Users/ci/Library/Keychains/temp.keychain -A -T /usr/bin/codesign -T /usr/bin/security",
                "security set-key-partition-list -S apple-tool:,apple: -s -k secret /Users/ci/Library/Keychains/temp.keychain",
            ]
        );
    }

    #[test]
    fn test_default_location() {
        if let Ok(keychain) = TempKeychain::new("pw") {
            let name = keychain.path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("temp_capacitor_keychain_"));
            assert!(name.ends_with(".keychain"));
            assert!(keychain.path().parent().unwrap().ends_with("Library/Keychains"));
        }
    }
}
