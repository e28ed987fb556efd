//! Work item storage: the trait the pipeline talks to, and the Azure DevOps
//! REST implementation behind it.

mod client;
mod types;

pub use client::{AzureDevOpsClient, ProjectTarget, DEFAULT_BASE_URL};
pub use types::{
    fields, FieldValue, Relation, RelationOp, WorkItem, WorkItemId, TESTED_BY_FORWARD,
    TEST_CASE_TYPE,
};

use crate::error::Result;

pub trait WorkItemStore {
    /// Canonical URL of a work item, as used in relation targets.
    fn work_item_url(&self, id: WorkItemId) -> String;

    fn fetch(&self, id: WorkItemId) -> Result<WorkItem>;

    fn fetch_with_relations(&self, id: WorkItemId) -> Result<WorkItem>;

    fn create(
        &self,
        work_item_type: &str,
        fields: &[FieldValue],
        relations: &[Relation],
    ) -> Result<WorkItem>;

    fn patch_fields(&self, id: WorkItemId, fields: &[FieldValue]) -> Result<WorkItem>;

    /// Applied as one patch document, in the given order.
    fn patch_relations(&self, id: WorkItemId, ops: &[RelationOp]) -> Result<WorkItem>;

    fn delete(&self, id: WorkItemId) -> Result<()>;
}

/// Opens a store bound to one organization/project.
pub trait StoreProvider {
    fn open(&self, target: ProjectTarget) -> Result<Box<dyn WorkItemStore>>;
}
