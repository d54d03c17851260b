//! Xcode project graph
//!
//! The `objects` table is an arena: nodes are owned by the table and refer to
//! each other by ID string. Accessors look a node up by name, then follow
//! references one step at a time.

use std::path::Path;

use capbuild_core::fs;
use indexmap::IndexMap;
use tracing::debug;

use crate::types::{PbxDict, PbxNode, PbxValue};
use crate::{parser, writer, XcodeError};

pub const ISA_PROJECT: &str = "PBXProject";
pub const ISA_NATIVE_TARGET: &str = "PBXNativeTarget";
pub const ISA_CONFIGURATION_LIST: &str = "XCConfigurationList";
pub const ISA_BUILD_CONFIGURATION: &str = "XCBuildConfiguration";

/// A parsed `project.pbxproj`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxProject {
    /// Entries before `objects` (archiveVersion, classes, objectVersion)
    pub preamble: PbxDict,
    pub objects: IndexMap<String, PbxNode>,
    /// Entries after `objects` (rootObject)
    pub trailer: PbxDict,
}

impl PbxProject {
    pub fn parse(text: &str) -> Result<Self, XcodeError> {
        parser::parse(text)
    }

    pub fn to_pbxproj(&self) -> String {
        writer::write(self)
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, XcodeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(XcodeError::FileNotFound(path.display().to_string()));
        }
        let text = tokio::fs::read_to_string(path).await?;
        let project = Self::parse(&text)?;
        debug!("Loaded {} objects from {:?}", project.objects.len(), path);
        Ok(project)
    }

    /// Replace the file at `path` with the serialized graph
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), XcodeError> {
        fs::replace_file(path.as_ref(), self.to_pbxproj()).await?;
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&PbxNode> {
        self.objects.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut PbxNode> {
        self.objects.get_mut(id)
    }

    pub fn nodes_of_isa<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = &'a PbxNode> + 'a {
        self.objects.values().filter(move |node| node.isa() == Some(isa))
    }

    /// Nodes grouped by isa in order of first appearance
    pub fn sections(&self) -> Vec<(Option<&str>, Vec<&PbxNode>)> {
        let mut sections: IndexMap<Option<&str>, Vec<&PbxNode>> = IndexMap::new();
        for node in self.objects.values() {
            sections.entry(node.isa()).or_default().push(node);
        }
        sections.into_iter().collect()
    }

    /// ID of the `PBXProject` named by `rootObject`
    pub fn root_object_id(&self) -> Result<&str, XcodeError> {
        self.trailer
            .get("rootObject")
            .or_else(|| self.preamble.get("rootObject"))
            .and_then(PbxValue::as_str)
            .ok_or_else(|| XcodeError::MissingNode("rootObject".to_string()))
    }

    /// The root `PBXProject` node
    pub fn root_project_mut(&mut self) -> Result<&mut PbxNode, XcodeError> {
        let id = self.root_object_id()?.to_string();
        let node = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| XcodeError::MissingNode(format!("root project {}", id)))?;

        if node.isa() != Some(ISA_PROJECT) {
            return Err(XcodeError::InvalidNode(format!("root object {} is not a {}", id, ISA_PROJECT)));
        }
        Ok(node)
    }

    /// Find a `PBXNativeTarget` by exact name
    pub fn resolve_target_by_name(&self, name: &str) -> Result<&PbxNode, XcodeError> {
        self.nodes_of_isa(ISA_NATIVE_TARGET)
            .find(|node| node.name() == Some(name))
            .ok_or_else(|| XcodeError::TargetNotFound(name.to_string()))
    }

    /// IDs of every build configuration in the target's configuration list
    pub fn resolve_configurations_for_target(&self, target_id: &str) -> Result<Vec<String>, XcodeError> {
        let target = self
            .node(target_id)
            .ok_or_else(|| XcodeError::MissingNode(format!("target {}", target_id)))?;

        let list_id = target
            .get_str("buildConfigurationList")
            .ok_or_else(|| XcodeError::MissingNode(format!("buildConfigurationList of target {}", target_id)))?;
        let list = self
            .node(list_id)
            .ok_or_else(|| XcodeError::MissingNode(format!("configuration list {}", list_id)))?;

        let references = list
            .fields
            .get("buildConfigurations")
            .and_then(PbxValue::as_array)
            .ok_or_else(|| XcodeError::MissingNode(format!("buildConfigurations of list {}", list_id)))?;

        references
            .iter()
            .map(|reference| {
                let id = reference
                    .as_str()
                    .ok_or_else(|| XcodeError::InvalidNode(format!("non-string reference in list {}", list_id)))?;
                if self.node(id).is_none() {
                    return Err(XcodeError::MissingNode(format!("build configuration {}", id)));
                }
                Ok(id.to_string())
            })
            .collect()
    }
}
