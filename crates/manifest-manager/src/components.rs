//! Android Component Lookup
//!
//! Locates activities and services inside the `application` node and edits
//! their attributes.

use capbuild_core::EditOutcome;
use tracing::{info, warn};

use crate::manifest::XmlDocument;
use crate::manifest::XmlElement;

/// Component type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Activity,
    Service,
}

impl ComponentType {
    /// Manifest tag of the component
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Activity => "activity",
            ComponentType::Service => "service",
        }
    }
}

/// Why a component could not be located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    NoApplication,
    NoComponent(ComponentType, String),
}

impl LookupFailure {
    pub fn reason(&self) -> String {
        match self {
            LookupFailure::NoApplication => "application node not found".to_string(),
            LookupFailure::NoComponent(kind, name) => format!("{} {} not found", kind.as_str(), name),
        }
    }

    /// Convert into a soft outcome
    pub fn into_outcome(self) -> EditOutcome {
        EditOutcome::Skipped(self.reason())
    }
}

/// Find a component by `android:name` inside the application node
pub fn find_component_mut<'a>(
    document: &'a mut XmlDocument,
    kind: ComponentType,
    name: &str,
) -> Result<&'a mut XmlElement, LookupFailure> {
    let application = document.application_mut().ok_or(LookupFailure::NoApplication)?;
    application
        .elements_mut()
        .find(|el| el.name == kind.as_str() && el.android_name() == Some(name))
        .ok_or_else(|| LookupFailure::NoComponent(kind, name.to_string()))
}

/// Overwrite a component attribute when the value differs
pub fn update_component_attribute(
    document: &mut XmlDocument,
    kind: ComponentType,
    name: &str,
    attribute: &str,
    value: &str,
) -> EditOutcome {
    let component = match find_component_mut(document, kind, name) {
        Ok(component) => component,
        Err(failure) => {
            warn!("Cannot set {} on {} {}: {}", attribute, kind.as_str(), name, failure.reason());
            return failure.into_outcome();
        }
    };

    match component.set_attr(attribute, value) {
        Some(old) if old == value => EditOutcome::Unchanged,
        Some(old) => {
            info!("Updated {} of {} from {:?} to {:?}", attribute, name, old, value);
            EditOutcome::Updated
        }
        None => {
            info!("Set {} of {} to {:?} (was unset)", attribute, name, value);
            EditOutcome::Inserted
        }
    }
}

/// Shorthand for activities
pub fn update_activity_attribute(
    document: &mut XmlDocument,
    activity: &str,
    attribute: &str,
    value: &str,
) -> EditOutcome {
    update_component_attribute(document, ComponentType::Activity, activity, attribute, value)
}
