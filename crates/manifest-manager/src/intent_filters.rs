//! Intent Filter Editing
//!
//! Resolves an activity's `intent-filter` by action/category criteria and
//! merges `category` and `data` children into it.

use capbuild_core::EditOutcome;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::components::{find_component_mut, ComponentType};
use crate::manifest::{XmlDocument, XmlElement, ANDROID_NAME};

pub const INTENT_FILTER_TAG: &str = "intent-filter";
pub const ACTION_TAG: &str = "action";
pub const CATEGORY_TAG: &str = "category";
pub const DATA_TAG: &str = "data";

/// Activity edited when none is given
pub const DEFAULT_ACTIVITY: &str = ".MainActivity";

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

/// Selects one intent-filter of an activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Action the filter must declare
    pub action: Option<String>,
    /// Category the filter must declare
    pub category: Option<String>,
}

impl FilterCriteria {
    pub fn new(action: Option<String>, category: Option<String>) -> Self {
        Self { action, category }
    }

    /// The MAIN + LAUNCHER filter
    pub fn launcher() -> Self {
        Self {
            action: Some(ACTION_MAIN.to_string()),
            category: Some(CATEGORY_LAUNCHER.to_string()),
        }
    }

    /// Whether the filter declares every given criterion
    pub fn matches(&self, filter: &XmlElement) -> bool {
        let declares = |tag: &str, wanted: &Option<String>| match wanted {
            Some(name) => filter.has_named_child(tag, name),
            None => true,
        };
        declares(ACTION_TAG, &self.action) && declares(CATEGORY_TAG, &self.category)
    }
}

/// Locate the intent-filter of `activity` matching `criteria` (launcher filter when `None`)
fn resolve_filter<'a>(
    document: &'a mut XmlDocument,
    criteria: Option<&FilterCriteria>,
    activity: Option<&str>,
) -> Result<&'a mut XmlElement, EditOutcome> {
    let activity = activity.unwrap_or(DEFAULT_ACTIVITY);
    let criteria = criteria.cloned().unwrap_or_else(FilterCriteria::launcher);

    let component = find_component_mut(document, ComponentType::Activity, activity).map_err(|failure| {
        warn!("Cannot edit intent-filter: {}", failure.reason());
        failure.into_outcome()
    })?;

    component
        .elements_mut()
        .find(|el| el.name == INTENT_FILTER_TAG && criteria.matches(el))
        .ok_or_else(|| {
            let reason = format!(
                "no intent-filter with action {:?} and category {:?} in activity {}",
                criteria.action, criteria.category, activity
            );
            warn!("Cannot edit intent-filter: {}", reason);
            EditOutcome::Skipped(reason)
        })
}

/// Append a category to the resolved intent-filter if absent
pub fn add_category_to_intent_filter(
    document: &mut XmlDocument,
    category: &str,
    criteria: Option<&FilterCriteria>,
    activity: Option<&str>,
) -> EditOutcome {
    let filter = match resolve_filter(document, criteria, activity) {
        Ok(filter) => filter,
        Err(outcome) => return outcome,
    };

    if filter.has_named_child(CATEGORY_TAG, category) {
        debug!("Intent-filter already declares category {}", category);
        return EditOutcome::Unchanged;
    }

    let node = XmlElement::new(CATEGORY_TAG).with_attribute(ANDROID_NAME, category);
    filter.insert_grouped(node, &[CATEGORY_TAG, ACTION_TAG], Some(DATA_TAG));
    info!("Added category {} to intent-filter", category);
    EditOutcome::Inserted
}

/// Append a data node unless one with exactly the same attributes exists
pub fn add_data_to_intent_filter(
    document: &mut XmlDocument,
    attributes: &IndexMap<String, String>,
    criteria: Option<&FilterCriteria>,
    activity: Option<&str>,
) -> EditOutcome {
    let filter = match resolve_filter(document, criteria, activity) {
        Ok(filter) => filter,
        Err(outcome) => return outcome,
    };

    // IndexMap equality ignores insertion order
    if filter.children_named(DATA_TAG).any(|data| data.attributes == *attributes) {
        debug!("Intent-filter already declares data {:?}", attributes);
        return EditOutcome::Unchanged;
    }

    let mut node = XmlElement::new(DATA_TAG);
    node.attributes = attributes.clone();
    filter.insert_grouped(node, &[DATA_TAG, CATEGORY_TAG, ACTION_TAG], None);
    info!("Added data {:?} to intent-filter", attributes);
    EditOutcome::Inserted
}
