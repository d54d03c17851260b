//! exportOptions.plist for `xcodebuild -exportArchive`

use std::collections::BTreeMap;
use std::path::Path;

use capbuild_core::fs;
use serde::Serialize;
use tracing::info;

use crate::XcodeError;

/// Certificate name passed to the exporter
pub const SIGNING_CERTIFICATE: &str = "Apple Distribution";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// `development` or `release-testing`
    pub method: String,
    pub signing_certificate: String,
    #[serde(rename = "teamID")]
    pub team_id: String,
    pub signing_style: String,
    pub strip_swift_symbols: bool,
    pub upload_bitcode: bool,
    pub upload_symbols: bool,
    /// Bundle identifier -> profile name
    pub provisioning_profiles: BTreeMap<String, String>,
}

impl ExportOptions {
    /// Manual-signing export for a single bundle
    pub fn manual(method: &str, team_id: &str, bundle_id: &str, profile_name: &str) -> Self {
        let mut provisioning_profiles = BTreeMap::new();
        provisioning_profiles.insert(bundle_id.to_string(), profile_name.to_string());

        Self {
            method: method.to_string(),
            signing_certificate: SIGNING_CERTIFICATE.to_string(),
            team_id: team_id.to_string(),
            signing_style: "manual".to_string(),
            strip_swift_symbols: true,
            upload_bitcode: false,
            upload_symbols: true,
            provisioning_profiles,
        }
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, XcodeError> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self)?;
        Ok(buf)
    }

    /// Write the plist, creating parent directories
    pub async fn write(&self, path: impl AsRef<Path>) -> Result<(), XcodeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        fs::replace_file(path, self.to_xml()?).await?;
        info!("Wrote export options to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_export_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build").join("exportOptions.plist");
        let options = ExportOptions::manual("release-testing", "ABCDE12345", "com.company.app", "App Distribution");

        options.write(&path).await.unwrap();

        let value = plist::Value::from_file(&path).unwrap();
        let dict = value.as_dictionary().unwrap();
        assert_eq!(dict.get("teamID").and_then(plist::Value::as_string), Some("ABCDE12345"));
        assert_eq!(dict.get("signingStyle").and_then(plist::Value::as_string), Some("manual"));
        assert_eq!(dict.get("uploadBitcode").and_then(plist::Value::as_boolean), Some(false));

        let profiles = dict.get("provisioningProfiles").and_then(plist::Value::as_dictionary).unwrap();
        assert_eq!(
            profiles.get("com.company.app").and_then(plist::Value::as_string),
            Some("App Distribution")
        );
    }
}
