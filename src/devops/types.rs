use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub type WorkItemId = u64;

pub const TEST_CASE_TYPE: &str = "Test Case";
pub const TESTED_BY_FORWARD: &str = "Microsoft.VSTS.Common.TestedBy-Forward";

/// Field reference names.
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
    pub const STEPS: &str = "Microsoft.VSTS.TCM.Steps";
    pub const HISTORY: &str = "System.History";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: WorkItemId,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl WorkItem {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub rel: String,
    pub url: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Relation {
    pub fn new(rel: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            url: url.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.attributes
            .insert("comment".into(), Value::String(comment.into()));
        self
    }

    /// Trailing path segment of the target url, which is the id of the
    /// related work item.
    pub fn target_id(&self) -> Option<WorkItemId> {
        let parsed = url::Url::parse(&self.url).ok()?;
        parsed
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()?
            .parse()
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub(crate) fn to_patch(&self) -> Value {
        json!({
            "op": "add",
            "path": format!("/fields/{}", self.name),
            "value": self.value,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationOp {
    Add(Relation),
    /// Addresses the relation by its index at the time the patch is applied.
    Remove(usize),
}

impl RelationOp {
    pub(crate) fn to_patch(&self) -> Value {
        match self {
            RelationOp::Add(rel) => json!({
                "op": "add",
                "path": "/relations/-",
                "value": rel,
            }),
            RelationOp::Remove(index) => json!({
                "op": "remove",
                "path": format!("/relations/{index}"),
            }),
        }
    }
}
