//! Removing test case links from a story.

use tracing::{debug, info};

use crate::devops::{RelationOp, WorkItem, WorkItemId, WorkItemStore, TESTED_BY_FORWARD};
use crate::error::{Error, Result};

/// Relation kinds that count as a test link when unlinking. Any casing and
/// direction qualifier is accepted.
const TESTED_BY_MARKER: &str = "testedby";

/// Removal ops for every tested-by relation, highest index first.
///
/// Relations live in one ordered list on the server and a removal shifts
/// everything after it, so ops must run from the tail towards the head for
/// the remaining indices to stay valid.
pub fn tested_by_removals(story: &WorkItem) -> Vec<RelationOp> {
    story
        .relations
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, rel)| rel.rel.to_lowercase().contains(TESTED_BY_MARKER))
        .map(|(idx, _)| RelationOp::Remove(idx))
        .collect()
}

/// Drop every tested-by link from the story in one patch and return how many
/// were removed. The linked test cases themselves are left alone.
///
/// A story with nothing to unlink returns `0` without a write.
pub fn unlink_all_tested_by(store: &dyn WorkItemStore, story_id: WorkItemId) -> Result<usize> {
    let story = store.fetch_with_relations(story_id)?;
    let ops = tested_by_removals(&story);

    if ops.is_empty() {
        info!(story_id, "no test cases linked");
        return Ok(0);
    }

    store.patch_relations(story_id, &ops)?;
    info!(story_id, count = ops.len(), "unlinked test cases from user story");
    Ok(ops.len())
}

/// Delete the test case work items linked with an exact forward tested-by
/// relation, in relation order. Returns the deleted ids.
///
/// All relation urls are checked before anything is deleted.
pub fn purge_linked_test_cases(
    store: &dyn WorkItemStore,
    story_id: WorkItemId,
) -> Result<Vec<WorkItemId>> {
    let story = store.fetch_with_relations(story_id)?;

    let ids = story
        .relations
        .iter()
        .filter(|rel| rel.rel == TESTED_BY_FORWARD)
        .map(|rel| {
            rel.target_id()
                .ok_or_else(|| Error::MalformedRelation(rel.url.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    for id in &ids {
        store.delete(*id)?;
        debug!(id, "deleted old test case");
    }

    Ok(ids)
}
