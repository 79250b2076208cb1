//! Workflow file export and import
//!
//! The file is the JSON form of `Workflow`: `{ "nodes": [...], "edges": [...] }`.
//! Keys the diagram layer adds to nodes or edges (`selected`, `width`, ...)
//! are ignored on load.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{FlowError, Result};
use crate::types::Workflow;
use crate::validation::validate_workflow;

impl Workflow {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON, the layout written to disk
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a workflow, failing when `nodes` or `edges` is missing or invalid
    pub fn from_json(text: &str) -> Result<Self> {
        let workflow: Workflow = serde_json::from_str(text)
            .map_err(|e| FlowError::malformed(e.to_string()))?;
        for problem in validate_workflow(&workflow, None) {
            log::warn!("Loaded workflow is inconsistent: {}", problem);
        }
        Ok(workflow)
    }

    /// Parse a workflow, degrading a missing or invalid collection to empty
    ///
    /// The text itself must still be a JSON object.
    pub fn from_json_lenient(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| FlowError::malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| FlowError::malformed("expected a JSON object"))?;

        Ok(Workflow {
            nodes: lenient_field(object, "nodes"),
            edges: lenient_field(object, "edges"),
        })
    }

    /// Write the workflow to `path` as indented JSON
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        log::info!(
            "Saved workflow ({} nodes, {} edges) to {:?}",
            self.nodes.len(),
            self.edges.len(),
            path
        );
        Ok(())
    }

    /// Read a workflow from `path` (strict)
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let workflow = Self::from_json(&content)?;
        log::info!(
            "Loaded workflow ({} nodes, {} edges) from {:?}",
            workflow.nodes.len(),
            workflow.edges.len(),
            path
        );
        Ok(workflow)
    }
}

fn lenient_field<T: DeserializeOwned>(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Vec<T> {
    match object.get(key) {
        None => {
            log::warn!("Workflow file has no '{}'; using an empty list", key);
            Vec::new()
        }
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Workflow file has invalid '{}' ({}); using an empty list", key, e);
                Vec::new()
            }
        },
    }
}
