//! Capacitor plugin reconciliation
//!
//! Installs every desired plugin that `npx cap ls` does not already report,
//! after checking that the package exists in the npm registry.

use capbuild_core::ProjectLayout;
use indexmap::IndexSet;
use tracing::{info, warn};

use crate::process::Tool;
use crate::BuildError;

/// Plugins every app gets
pub const BASE_PLUGINS: &[&str] = &[
    "@capacitor/app",
    "@ionic/pwa-elements",
    "@capacitor/app-launcher",
    "@capacitor/browser",
    "@capacitor/camera",
    "@capacitor/clipboard",
    "@capacitor/filesystem",
    "@capacitor/haptics",
    "@capacitor/keyboard",
    "@capacitor/network",
    "@capacitor/share",
    "@capacitor/splash-screen",
    "@capacitor/status-bar",
    "@capacitor/device",
    "@capacitor/file-transfer",
];

const BLOCK_MARKER: &str = "Capacitor plugin";
const BLOCK_SUFFIXES: &[&str] = &["for android:", "for ios:"];

/// What a reconciliation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginReport {
    pub already_present: Vec<String>,
    pub not_in_registry: Vec<String>,
    pub installed: Vec<String>,
    pub failed: Vec<String>,
}

/// Base plugins followed by the configured ones, without duplicates
pub fn desired_plugins(configured: &[String]) -> IndexSet<String> {
    BASE_PLUGINS
        .iter()
        .map(|p| p.to_string())
        .chain(configured.iter().map(|p| p.trim().to_string()))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Plugin names listed under the android and ios blocks of `npx cap ls`
pub fn parse_cap_ls(output: &str) -> IndexSet<String> {
    let mut plugins = IndexSet::new();
    let mut in_block = false;

    for line in output.lines() {
        let line = line.trim();
        if line.contains(BLOCK_MARKER) && BLOCK_SUFFIXES.iter().any(|suffix| line.ends_with(suffix)) {
            in_block = true;
            continue;
        }
        if line.starts_with('[') {
            in_block = false;
            continue;
        }
        if in_block {
            if let Some(name) = plugin_name(line) {
                plugins.insert(name.to_string());
            }
        }
    }
    plugins
}

/// `@scope/name@1.2.3` -> `@scope/name`
fn plugin_name(line: &str) -> Option<&str> {
    let (name, version) = line.rsplit_once('@')?;
    if name.is_empty() || version.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name)
}

async fn installed_plugins(layout: &ProjectLayout) -> IndexSet<String> {
    match Tool::npx(["cap", "ls"]).current_dir(&layout.root).run().await {
        Ok(output) => parse_cap_ls(&output.stdout),
        Err(e) => {
            warn!("Could not list installed Capacitor plugins: {}", e);
            IndexSet::new()
        }
    }
}

/// Install missing plugins, then `npx cap sync` when any install was attempted
pub async fn reconcile_plugins(layout: &ProjectLayout, configured: &[String]) -> Result<PluginReport, BuildError> {
    let desired = desired_plugins(configured);
    info!("Desired plugins: {}", join(desired.iter()));

    let installed = installed_plugins(layout).await;
    info!("Installed plugins: {}", join(installed.iter()));

    let mut report = PluginReport::default();
    let mut to_install = Vec::new();

    for plugin in desired {
        if installed.contains(&plugin) {
            report.already_present.push(plugin);
            continue;
        }
        if Tool::new("npm").args(["view", plugin.as_str(), "version"]).succeeds().await {
            to_install.push(plugin);
        } else {
            warn!("Plugin {} not found in the npm registry; skipping", plugin);
            report.not_in_registry.push(plugin);
        }
    }

    if to_install.is_empty() {
        info!("All desired plugins are installed");
        return Ok(report);
    }

    info!("Installing {} plugin(s): {}", to_install.len(), join(to_install.iter()));
    for plugin in to_install {
        let install = Tool::new("npm")
            .args(["install", plugin.as_str()])
            .current_dir(&layout.root)
            .inherit_output();
        match install.run().await {
            Ok(_) => {
                info!("Installed plugin {}", plugin);
                report.installed.push(plugin);
            }
            Err(e) => {
                warn!("Failed to install plugin {}: {}", plugin, e);
                report.failed.push(plugin);
            }
        }
    }

    Tool::npx(["cap", "sync"])
        .current_dir(&layout.root)
        .inherit_output()
        .run()
        .await?;
    Ok(report)
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP_LS: &str = "\
[info] Found 3 Capacitor plugins for android:
       @capacitor/app@7.0.1
       @capacitor/camera@7.0.0
       @capacitor/share@7.0.1
[info] Found 2 Capacitor plugins for ios:
       @capacitor/app@7.0.1
       @capacitor/haptics@7.0.1
[info] Listing plugins for web is not possible.
";

    #[test]
    fn test_parse_cap_ls() {
        let plugins = parse_cap_ls(CAP_LS);
        let names: Vec<&str> = plugins.iter().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["@capacitor/app", "@capacitor/camera", "@capacitor/share", "@capacitor/haptics"]
        );
    }

    #[test]
    fn test_parse_ignores_lines_outside_blocks() {
        let output = "[warn] using npm@10.2.0\n  left-pad@1.3.0\n[info] Found 0 Capacitor plugins for web:\n";
        assert!(parse_cap_ls(output).is_empty());

        let output = "[info] Found 1 Capacitor plugin for android:\n  cordova-plugin-foo@1.0.0\n";
        assert!(parse_cap_ls(output).contains("cordova-plugin-foo"));
    }

    #[test]
    fn test_desired_plugins_dedup_and_order() {
        let configured = vec![
            "@capacitor/camera".to_string(),
            "@capacitor/local-notifications".to_string(),
            "  ".to_string(),
        ];
        let desired = desired_plugins(&configured);

        assert_eq!(desired.len(), BASE_PLUGINS.len() + 1);
        assert_eq!(desired.first().map(String::as_str), Some("@capacitor/app"));
        assert_eq!(desired.last().map(String::as_str), Some("@capacitor/local-notifications"));
    }

    #[test]
    fn test_plugin_name() {
        assert_eq!(plugin_name("@capacitor/app@7.0.1"), Some("@capacitor/app"));
        assert_eq!(plugin_name("@capacitor/app"), None);
        assert_eq!(plugin_name("found 2 @ home"), None);
    }
}
