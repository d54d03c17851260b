//! capacitor.config.json merge
//!
//! Writes app identity, server settings and signing build options into the
//! Capacitor configuration. Keys the build does not own are preserved.

use capbuild_core::{fs, BuildConfig, ProjectLayout};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::BuildError;

pub const WEB_DIR: &str = "www";
pub const ERROR_PATH: &str = "error.html";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#575b5f30";

/// Merge the build configuration into `existing`
pub fn merge_config(existing: Value, config: &BuildConfig, layout: &ProjectLayout) -> Result<Value, BuildError> {
    let mut root = match existing {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(BuildError::ConfigError(
                "capacitor.config.json is not a JSON object".to_string(),
            ))
        }
    };
    let app = &config.app;

    root.insert("appId".into(), json!(app.app_id));
    root.insert("appName".into(), json!(app.display_name));
    root.insert("webDir".into(), json!(WEB_DIR));
    root.insert("server".into(), server_block(&app.start_url)?);
    root.insert(
        "backgroundColor".into(),
        json!(app.background_color.as_deref().unwrap_or(DEFAULT_BACKGROUND_COLOR)),
    );
    root.insert(
        "loggingBehavior".into(),
        json!(if config.is_release() { "production" } else { "debug" }),
    );

    match config.android.signing() {
        Some(signing) => {
            if let Some(android) = object_entry(&mut root, "android") {
                android.insert(
                    "buildOptions".into(),
                    json!({
                        "keystorePath": layout.resolve(&signing.keystore_path).display().to_string(),
                        "keystorePassword": signing.keystore_password,
                        "keystoreAlias": signing.key_alias,
                        "keystoreAliasPassword": signing.key_password,
                        "releaseType": config.android.release_type.as_str(),
                        "signingType": "apksigner",
                    }),
                );
            }
            debug!("Android signing options written to Capacitor config");
        }
        None => warn!("Android signing is not fully configured; skipping Capacitor buildOptions"),
    }

    if config.ios.has_signing() {
        if let Some(ios) = object_entry(&mut root, "ios") {
            ios.insert("preferredContentMode".into(), json!("mobile"));
            ios.insert(
                "buildOptions".into(),
                json!({
                    "signingCertificate": config.ios.p12_path.as_ref().map(|p| p.display().to_string()),
                    "provisioningProfile": config.ios.provisioning_profile,
                }),
            );
        }
        debug!("iOS build options written to Capacitor config");
    } else {
        warn!("iOS signing is not fully configured; skipping Capacitor buildOptions");
    }

    Ok(Value::Object(root))
}

/// `server` block derived from the start URL
fn server_block(start_url: &str) -> Result<Value, BuildError> {
    let url = Url::parse(start_url)?;
    let hostname = url
        .host_str()
        .ok_or_else(|| BuildError::ConfigError(format!("start_url has no host: {}", start_url)))?;
    let scheme = url.scheme();

    Ok(json!({
        "url": start_url,
        "hostname": hostname,
        "androidScheme": scheme,
        "iosScheme": scheme,
        "allowNavigation": [hostname],
        "allowMixedContent": true,
        "cleartext": true,
        "errorPath": ERROR_PATH,
    }))
}

/// Nested object under `key`, replacing a non-object value
fn object_entry<'a>(root: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let entry = root.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

/// Read, merge and rewrite `capacitor.config.json`
pub async fn update_capacitor_config(layout: &ProjectLayout, config: &BuildConfig) -> Result<(), BuildError> {
    let path = layout.capacitor_config();
    let existing = if path.exists() {
        let text = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&text)?
    } else {
        Value::Null
    };

    let merged = merge_config(existing.clone(), config, layout)?;
    if merged == existing {
        debug!("{:?} already up to date", path);
        return Ok(());
    }

    fs::replace_file(&path, serde_json::to_string_pretty(&merged)?).await?;
    info!("Updated {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> BuildConfig {
        let mut config = BuildConfig::default();
        config.app.app_id = "com.example.shop".to_string();
        config.app.display_name = "Shop".to_string();
        config.app.start_url = "https://shop.example.com/home".to_string();
        config
    }

    #[test]
    fn test_merge_preserves_unrelated_keys() {
        let layout = ProjectLayout::new("/work/app");
        let existing = json!({
            "appId": "old.id",
            "plugins": { "SplashScreen": { "launchShowDuration": 0 } },
            "android": { "allowMixedContent": false }
        });

        let merged = merge_config(existing, &config(), &layout).unwrap();

        assert_eq!(merged["appId"], "com.example.shop");
        assert_eq!(merged["appName"], "Shop");
        assert_eq!(merged["webDir"], "www");
        assert_eq!(merged["plugins"]["SplashScreen"]["launchShowDuration"], 0);
        assert_eq!(merged["android"]["allowMixedContent"], false);
        assert!(merged["android"].get("buildOptions").is_none());
        assert!(merged.get("ios").is_none());
        assert_eq!(merged["backgroundColor"], DEFAULT_BACKGROUND_COLOR);
        assert_eq!(merged["loggingBehavior"], "production");
    }

    #[test]
    fn test_server_block() {
        let merged = merge_config(Value::Null, &config(), &ProjectLayout::new("/p")).unwrap();
        let server = &merged["server"];

        assert_eq!(server["url"], "https://shop.example.com/home");
        assert_eq!(server["hostname"], "shop.example.com");
        assert_eq!(server["androidScheme"], "https");
        assert_eq!(server["iosScheme"], "https");
        assert_eq!(server["allowNavigation"], json!(["shop.example.com"]));
        assert_eq!(server["errorPath"], "error.html");
    }

    #[test]
    fn test_signing_options() {
        let mut config = config();
        config.android.keystore_path = Some(PathBuf::from("certs/release.jks"));
        config.android.keystore_password = Some("store".into());
        config.android.key_alias = Some("release".into());
        config.android.key_password = Some("key".into());
        config.ios.p12_path = Some(PathBuf::from("certs/dist.p12"));
        config.ios.p12_password = Some("p12".into());
        config.ios.provisioning_profile = Some("dist.mobileprovision".into());

        let merged = merge_config(Value::Null, &config, &ProjectLayout::new("/work/app")).unwrap();

        let android = &merged["android"]["buildOptions"];
        assert_eq!(
            android["keystorePath"],
            PathBuf::from("/work/app/certs/release.jks").display().to_string()
        );
        assert_eq!(android["keystoreAlias"], "release");
        assert_eq!(android["releaseType"], "APK");
        assert_eq!(android["signingType"], "apksigner");

        assert_eq!(merged["ios"]["preferredContentMode"], "mobile");
        assert_eq!(merged["ios"]["buildOptions"]["provisioningProfile"], "dist.mobileprovision");
    }

    #[test]
    fn test_rejects_bad_input() {
        let layout = ProjectLayout::new("/p");
        assert!(matches!(
            merge_config(json!([1, 2]), &config(), &layout),
            Err(BuildError::ConfigError(_))
        ));

        let mut config = config();
        config.app.start_url = "not a url".to_string();
        assert!(matches!(merge_config(Value::Null, &config, &layout), Err(BuildError::Url(_))));
    }

    #[tokio::test]
    async fn test_update_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        tokio::fs::write(layout.capacitor_config(), r#"{"bundledWebRuntime": false}"#)
            .await
            .unwrap();

        update_capacitor_config(&layout, &config()).await.unwrap();

        let text = tokio::fs::read_to_string(layout.capacitor_config()).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["bundledWebRuntime"], false);
        assert_eq!(value["appId"], "com.example.shop");
        assert!(text.starts_with("{\n  \"bundledWebRuntime\""));
    }
}
