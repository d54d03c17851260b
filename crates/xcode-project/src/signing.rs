//! Manual code signing
//!
//! Rewrites the signing attributes of one native target so `xcodebuild`
//! archives with a given team and provisioning profile instead of automatic
//! signing.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::project::PbxProject;
use crate::types::{PbxDict, PbxValue};
use crate::XcodeError;

/// Identity used for device builds of both configurations
pub const DISTRIBUTION_IDENTITY: &str = "iPhone Distribution";
/// Unqualified identity fallback for Debug
pub const DEVELOPER_IDENTITY: &str = "iPhone Developer";
/// Value written to LastSwiftUpdateCheck / LastUpgradeCheck
pub const UPGRADE_CHECK_SENTINEL: &str = "0920";
/// Qualifier restricting a build setting to device SDKs
pub const IPHONEOS_SDK: &str = "[sdk=iphoneos*]";

/// What a signing pass touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningReport {
    pub target_id: String,
    /// Configuration names that were rewritten
    pub configured: Vec<String>,
    /// Configuration names left alone
    pub skipped: Vec<String>,
}

fn qualified(key: &str) -> String {
    format!("{}{}", key, IPHONEOS_SDK)
}

/// Load, sign and replace `project_file` in one step.
///
/// Nothing is written unless every lookup succeeds.
pub async fn apply_signing_configuration(
    project_file: impl AsRef<Path>,
    target_name: &str,
    team_id: &str,
    profile: &str,
) -> Result<SigningReport, XcodeError> {
    let project_file = project_file.as_ref();
    info!("Configuring manual signing for target {} in {:?}", target_name, project_file);

    let mut project = PbxProject::open(project_file).await?;
    let report = sign_project(&mut project, target_name, team_id, profile)?;
    project.save(project_file).await?;

    info!(
        "Signing configured for {}: {} configuration(s) updated, {} skipped",
        target_name,
        report.configured.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Apply manual signing to the in-memory graph
pub fn sign_project(
    project: &mut PbxProject,
    target_name: &str,
    team_id: &str,
    profile: &str,
) -> Result<SigningReport, XcodeError> {
    let target_id = project.resolve_target_by_name(target_name)?.id.clone();
    let configuration_ids = project.resolve_configurations_for_target(&target_id)?;
    debug!("Target {} ({}) has {} configurations", target_name, target_id, configuration_ids.len());

    set_project_attributes(project, &target_id)?;

    let mut report = SigningReport {
        target_id,
        ..Default::default()
    };

    for id in configuration_ids {
        let node = project
            .node_mut(&id)
            .ok_or_else(|| XcodeError::MissingNode(format!("build configuration {}", id)))?;
        let name = node.name().unwrap_or_default().to_string();

        let fallback_identity = match name.as_str() {
            "Debug" => DEVELOPER_IDENTITY,
            "Release" => DISTRIBUTION_IDENTITY,
            other => {
                warn!("Skipping unknown build configuration {:?} ({})", other, id);
                report.skipped.push(other.to_string());
                continue;
            }
        };

        let settings = node
            .fields
            .entry("buildSettings".to_string())
            .or_insert_with(|| PbxValue::Dict(PbxDict::new()))
            .as_dict_mut()
            .ok_or_else(|| XcodeError::InvalidNode(format!("buildSettings of {} is not a dictionary", id)))?;

        apply_build_settings(settings, team_id, profile, fallback_identity);
        info!("Configured {} signing: team {}, profile {}", name, team_id, profile);
        report.configured.push(name);
    }

    Ok(report)
}

fn set_project_attributes(project: &mut PbxProject, target_id: &str) -> Result<(), XcodeError> {
    let root = project.root_project_mut()?;
    let root_id = root.id.clone();

    let attributes = root
        .fields
        .get_mut("attributes")
        .and_then(PbxValue::as_dict_mut)
        .ok_or_else(|| XcodeError::MissingNode(format!("attributes of project {}", root_id)))?;

    attributes.insert("LastSwiftUpdateCheck".to_string(), PbxValue::string(UPGRADE_CHECK_SENTINEL));
    attributes.insert("LastUpgradeCheck".to_string(), PbxValue::string(UPGRADE_CHECK_SENTINEL));

    let target_attributes = attributes
        .entry("TargetAttributes".to_string())
        .or_insert_with(|| PbxValue::Dict(PbxDict::new()))
        .as_dict_mut()
        .ok_or_else(|| XcodeError::InvalidNode("TargetAttributes is not a dictionary".to_string()))?
        .entry(target_id.to_string())
        .or_insert_with(|| PbxValue::Dict(PbxDict::new()))
        .as_dict_mut()
        .ok_or_else(|| XcodeError::InvalidNode(format!("TargetAttributes of {} is not a dictionary", target_id)))?;

    target_attributes.insert("ProvisioningStyle".to_string(), PbxValue::string("Manual"));
    Ok(())
}

fn apply_build_settings(settings: &mut PbxDict, team_id: &str, profile: &str, fallback_identity: &str) {
    settings.insert(qualified("CODE_SIGN_IDENTITY"), PbxValue::string(DISTRIBUTION_IDENTITY));
    settings.insert("CODE_SIGN_STYLE".to_string(), PbxValue::string("Manual"));
    settings.insert("DEVELOPMENT_TEAM".to_string(), PbxValue::string(""));
    settings.insert(qualified("DEVELOPMENT_TEAM"), PbxValue::string(team_id));
    settings.insert("PROVISIONING_PROFILE_SPECIFIER".to_string(), PbxValue::string(""));
    settings.insert(qualified("PROVISIONING_PROFILE_SPECIFIER"), PbxValue::string(profile));

    if !settings.contains_key("CODE_SIGN_IDENTITY") {
        settings.insert("CODE_SIGN_IDENTITY".to_string(), PbxValue::string(fallback_identity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::fixtures::CAPACITOR_PBXPROJ;

    fn settings<'a>(project: &'a PbxProject, id: &str) -> &'a PbxDict {
        project
            .node(id)
            .and_then(|node| node.fields.get("buildSettings"))
            .and_then(PbxValue::as_dict)
            .unwrap()
    }

    fn setting<'a>(settings: &'a PbxDict, key: &str) -> Option<&'a str> {
        settings.get(key).and_then(PbxValue::as_str)
    }

    #[test]
    fn test_sign_debug_and_release() {
        let mut project = PbxProject::parse(CAPACITOR_PBXPROJ).unwrap();
        let report = sign_project(&mut project, "App", "ABCDE12345", "App Distribution").unwrap();

        assert_eq!(report.configured, vec!["Debug", "Release"]);
        assert_eq!(report.skipped, vec!["Staging"]);

        let debug = settings(&project, "504EC3171FED79650016851F");
        assert_eq!(setting(debug, "CODE_SIGN_IDENTITY[sdk=iphoneos*]"), Some(DISTRIBUTION_IDENTITY));
        assert_eq!(setting(debug, "CODE_SIGN_IDENTITY"), Some(DEVELOPER_IDENTITY));
        assert_eq!(setting(debug, "CODE_SIGN_STYLE"), Some("Manual"));
        assert_eq!(setting(debug, "DEVELOPMENT_TEAM"), Some(""));
        assert_eq!(setting(debug, "DEVELOPMENT_TEAM[sdk=iphoneos*]"), Some("ABCDE12345"));
        assert_eq!(setting(debug, "PROVISIONING_PROFILE_SPECIFIER"), Some(""));
        assert_eq!(setting(debug, "PROVISIONING_PROFILE_SPECIFIER[sdk=iphoneos*]"), Some("App Distribution"));
        assert_eq!(setting(debug, "INFOPLIST_FILE"), Some("App/Info.plist"));

        // an existing unqualified identity is kept
        let release = settings(&project, "504EC3181FED79650016851F");
        assert_eq!(setting(release, "CODE_SIGN_IDENTITY"), Some("Apple Development"));

        let staging = settings(&project, "504EC3191FED79650016851F");
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_project_attributes() {
        let mut project = PbxProject::parse(CAPACITOR_PBXPROJ).unwrap();
        sign_project(&mut project, "App", "ABCDE12345", "App Distribution").unwrap();

        let root = project.node("504EC2FC1FED79650016851F").unwrap();
        let attributes = root.fields["attributes"].as_dict().unwrap();
        assert_eq!(attributes["LastSwiftUpdateCheck"].as_str(), Some(UPGRADE_CHECK_SENTINEL));
        assert_eq!(attributes["LastUpgradeCheck"].as_str(), Some(UPGRADE_CHECK_SENTINEL));
        assert_eq!(attributes["ORGANIZATIONNAME"].as_str(), Some("Max Lynch"));

        let target = attributes["TargetAttributes"].as_dict().unwrap()["504EC3031FED79650016851F"]
            .as_dict()
            .unwrap();
        assert_eq!(target["ProvisioningStyle"].as_str(), Some("Manual"));
        assert_eq!(target["CreatedOnToolsVersion"].as_str(), Some("9.2"));
    }

    #[test]
    fn test_creates_missing_target_attributes() {
        let text = CAPACITOR_PBXPROJ.replace(
            "\t\t\t\tTargetAttributes = {\n\t\t\t\t\t504EC3031FED79650016851F = {\n\t\t\t\t\t\tCreatedOnToolsVersion = 9.2;\n\t\t\t\t\t\tLastSwiftMigration = 1100;\n\t\t\t\t\t};\n\t\t\t\t};\n",
            "",
        );
        let mut project = PbxProject::parse(&text).unwrap();
        sign_project(&mut project, "App", "T", "P").unwrap();

        let root = project.node("504EC2FC1FED79650016851F").unwrap();
        let target = root.fields["attributes"].as_dict().unwrap()["TargetAttributes"]
            .as_dict()
            .unwrap()["504EC3031FED79650016851F"]
            .as_dict()
            .unwrap();
        assert_eq!(target["ProvisioningStyle"].as_str(), Some("Manual"));
    }

    #[test]
    fn test_signed_output_layout() {
        let mut project = PbxProject::parse(CAPACITOR_PBXPROJ).unwrap();
        sign_project(&mut project, "App", "ABCDE12345", "App Distribution").unwrap();
        let text = project.to_pbxproj();

        assert!(text.contains("\t\t\t\t\"CODE_SIGN_IDENTITY[sdk=iphoneos*]\" = \"iPhone Distribution\";\n"));
        assert!(text.contains("\t\t\t\tDEVELOPMENT_TEAM = \"\";\n"));
        assert!(text.contains("\t\t\t\tLastUpgradeCheck = 0920;\n"));
    }

    #[tokio::test]
    async fn test_apply_signing_configuration_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        tokio::fs::write(&path, CAPACITOR_PBXPROJ).await.unwrap();

        let report = apply_signing_configuration(&path, "App", "ABCDE12345", "App Distribution")
            .await
            .unwrap();
        assert_eq!(report.target_id, "504EC3031FED79650016851F");

        let written = PbxProject::open(&path).await.unwrap();
        let release = settings(&written, "504EC3181FED79650016851F");
        assert_eq!(setting(release, "PROVISIONING_PROFILE_SPECIFIER[sdk=iphoneos*]"), Some("App Distribution"));
    }

    #[tokio::test]
    async fn test_unknown_target_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        tokio::fs::write(&path, CAPACITOR_PBXPROJ).await.unwrap();

        let err = apply_signing_configuration(&path, "Widget", "ABCDE12345", "App Distribution")
            .await
            .unwrap_err();
        assert!(matches!(err, XcodeError::TargetNotFound(_)));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), CAPACITOR_PBXPROJ);
    }

    #[tokio::test]
    async fn test_missing_project_attributes_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        let text = CAPACITOR_PBXPROJ.replace("\t\t\tattributes = {", "\t\t\tsettings = {");
        tokio::fs::write(&path, &text).await.unwrap();

        let err = apply_signing_configuration(&path, "App", "T", "P").await.unwrap_err();
        assert!(matches!(err, XcodeError::MissingNode(_)));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), text);
    }
}
