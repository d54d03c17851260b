//! Provisioning profile reader
//!
//! A `.mobileprovision` is a CMS envelope around an XML property list. The
//! plist bytes are cut out of the envelope and parsed; the signature itself
//! is not verified.

use std::io::Cursor;
use std::path::Path;

use plist::Value;
use tracing::debug;

use crate::XcodeError;

const PLIST_OPEN: &[u8] = b"<?xml";
const PLIST_OPEN_BARE: &[u8] = b"<plist";
const PLIST_CLOSE: &[u8] = b"</plist>";

/// The fields of a profile the build needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningProfile {
    /// Profile name, used as PROVISIONING_PROFILE_SPECIFIER
    pub name: String,
    /// First entry of TeamIdentifier
    pub team_id: String,
    /// `application-identifier` entitlement (`TEAMID.bundle.id`)
    pub application_identifier: Option<String>,
    pub uuid: Option<String>,
}

impl ProvisioningProfile {
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, XcodeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(XcodeError::FileNotFound(path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let profile = Self::from_bytes(&bytes)?;
        debug!("Read provisioning profile {:?} (team {}) from {:?}", profile.name, profile.team_id, path);
        Ok(profile)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XcodeError> {
        let start = find(bytes, PLIST_OPEN)
            .or_else(|| find(bytes, PLIST_OPEN_BARE))
            .ok_or_else(|| XcodeError::Profile("no embedded property list".to_string()))?;
        let end = rfind(bytes, PLIST_CLOSE)
            .filter(|&end| end > start)
            .ok_or_else(|| XcodeError::Profile("unterminated embedded property list".to_string()))?
            + PLIST_CLOSE.len();

        let dict = Value::from_reader(Cursor::new(&bytes[start..end]))?
            .into_dictionary()
            .ok_or_else(|| XcodeError::Profile("embedded property list is not a dictionary".to_string()))?;

        let team_id = dict
            .get("TeamIdentifier")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_string)
            .ok_or_else(|| XcodeError::Profile("missing TeamIdentifier".to_string()))?
            .to_string();
        let name = dict
            .get("Name")
            .and_then(Value::as_string)
            .ok_or_else(|| XcodeError::Profile("missing Name".to_string()))?
            .to_string();

        let application_identifier = dict
            .get("application-identifier")
            .or_else(|| {
                dict.get("Entitlements")
                    .and_then(Value::as_dictionary)
                    .and_then(|entitlements| entitlements.get("application-identifier"))
            })
            .and_then(Value::as_string)
            .map(str::to_string);
        let uuid = dict.get("UUID").and_then(Value::as_string).map(str::to_string);

        Ok(Self {
            name,
            team_id,
            application_identifier,
            uuid,
        })
    }

    /// Bundle identifier with the team prefix removed
    pub fn bundle_id(&self) -> Option<&str> {
        let identifier = self.application_identifier.as_deref()?;
        Some(
            identifier
                .strip_prefix(&self.team_id)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(identifier),
        )
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(plist: &str) -> Vec<u8> {
        let mut bytes = vec![0x30, 0x82, 0x1f, 0x4a, 0x06, 0x09];
        bytes.extend_from_slice(plist.as_bytes());
        bytes.extend_from_slice(&[0xa0, 0x82, 0x0d, 0x00, 0xff]);
        bytes
    }

    const PROFILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Name</key>
	<string>App Distribution</string>
	<key>TeamIdentifier</key>
	<array>
		<string>ABCDE12345</string>
	</array>
	<key>UUID</key>
	<string>0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0</string>
	<key>Entitlements</key>
	<dict>
		<key>application-identifier</key>
		<string>ABCDE12345.com.company.app</string>
	</dict>
</dict>
</plist>"#;

    #[test]
    fn test_reads_embedded_plist() {
        let profile = ProvisioningProfile::from_bytes(&envelope(PROFILE)).unwrap();

        assert_eq!(profile.name, "App Distribution");
        assert_eq!(profile.team_id, "ABCDE12345");
        assert_eq!(profile.application_identifier.as_deref(), Some("ABCDE12345.com.company.app"));
        assert_eq!(profile.bundle_id(), Some("com.company.app"));
        assert_eq!(profile.uuid.as_deref(), Some("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0"));
    }

    #[test]
    fn test_missing_team() {
        let plist = PROFILE.replace("TeamIdentifier", "Teams");
        let err = ProvisioningProfile::from_bytes(&envelope(&plist)).unwrap_err();
        assert!(matches!(err, XcodeError::Profile(message) if message.contains("TeamIdentifier")));
    }

    #[test]
    fn test_not_a_profile() {
        assert!(ProvisioningProfile::from_bytes(b"\x30\x82garbage").is_err());
    }
}
