//! Permission Management
//!
//! `uses-permission` and `uses-feature` entries of the manifest root.

use capbuild_core::EditOutcome;
use tracing::{debug, info};

use crate::manifest::{XmlDocument, XmlElement, ANDROID_NAME, APPLICATION_TAG};

pub const USES_PERMISSION_TAG: &str = "uses-permission";
pub const USES_FEATURE_TAG: &str = "uses-feature";

const ANDROID_REQUIRED: &str = "android:required";

/// Interpret `android:required`; an absent attribute means the feature is required
pub fn feature_required(feature: &XmlElement) -> bool {
    match feature.attr(ANDROID_REQUIRED) {
        Some(value) => !value.trim().eq_ignore_ascii_case("false"),
        None => true,
    }
}

/// Append a `uses-permission` unless one with the same name exists
pub fn add_permission(document: &mut XmlDocument, name: &str) -> EditOutcome {
    if document.root.has_named_child(USES_PERMISSION_TAG, name) {
        debug!("Permission {} already declared", name);
        return EditOutcome::Unchanged;
    }

    let permission = XmlElement::new(USES_PERMISSION_TAG).with_attribute(ANDROID_NAME, name);
    document.root.insert_grouped(
        permission,
        &[USES_PERMISSION_TAG, USES_FEATURE_TAG],
        Some(APPLICATION_TAG),
    );
    info!("Added permission {}", name);
    EditOutcome::Inserted
}

/// Append a `uses-feature` unless one matches both name and required flag
pub fn add_uses_feature(document: &mut XmlDocument, name: &str, required: bool) -> EditOutcome {
    let exists = document
        .root
        .children_named(USES_FEATURE_TAG)
        .any(|feature| feature.android_name() == Some(name) && feature_required(feature) == required);

    if exists {
        debug!("Feature {} (required={}) already declared", name, required);
        return EditOutcome::Unchanged;
    }

    let feature = XmlElement::new(USES_FEATURE_TAG)
        .with_attribute(ANDROID_NAME, name)
        .with_attribute(ANDROID_REQUIRED, required.to_string());
    document.root.insert_grouped(
        feature,
        &[USES_FEATURE_TAG, USES_PERMISSION_TAG],
        Some(APPLICATION_TAG),
    );
    info!("Added feature {} (required={})", name, required);
    EditOutcome::Inserted
}

/// Names of all declared permissions, in document order
pub fn declared_permissions(document: &XmlDocument) -> Vec<&str> {
    document
        .root
        .children_named(USES_PERMISSION_TAG)
        .filter_map(XmlElement::android_name)
        .collect()
}
