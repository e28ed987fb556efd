#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use devops_testgen::devops::{
    FieldValue, ProjectTarget, Relation, RelationOp, StoreProvider, WorkItem, WorkItemId,
    WorkItemStore,
};
use devops_testgen::llm::CompletionService;
use devops_testgen::{Error, Result};

pub const BASE: &str = "https://dev.azure.com/contoso/Web/_apis/wit/workItems";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(WorkItemId),
    FetchWithRelations(WorkItemId),
    Create {
        work_item_type: String,
        fields: Vec<FieldValue>,
        relations: Vec<Relation>,
    },
    PatchFields(WorkItemId, Vec<FieldValue>),
    PatchRelations(WorkItemId, Vec<RelationOp>),
    Delete(WorkItemId),
}

#[derive(Default)]
struct Inner {
    items: BTreeMap<WorkItemId, WorkItem>,
    next_id: WorkItemId,
    calls: Vec<Call>,
    creates_before_failure: Option<usize>,
    fail_fetch: bool,
    fail_comment: bool,
}

/// In-memory work item tracker. Creating an item with a `*-Forward` relation
/// to a known item adds the matching `*-Reverse` relation on that item, as the
/// real service does. Clones share state.
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Rc<RefCell<Inner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.inner.borrow_mut().next_id = 1000;
        store
    }

    pub fn insert(&self, item: WorkItem) {
        self.inner.borrow_mut().items.insert(item.id, item);
    }

    pub fn story(&self, id: WorkItemId, description: &str, acceptance: &str) {
        let mut item = WorkItem {
            id,
            fields: Default::default(),
            relations: Vec::new(),
        };
        item.fields
            .insert("System.Description".into(), description.into());
        item.fields.insert(
            "Microsoft.VSTS.Common.AcceptanceCriteria".into(),
            acceptance.into(),
        );
        self.insert(item);
    }

    pub fn item(&self, id: WorkItemId) -> Option<WorkItem> {
        self.inner.borrow().items.get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn fail_create_after(&self, successes: usize) {
        self.inner.borrow_mut().creates_before_failure = Some(successes);
    }

    pub fn fail_fetch(&self) {
        self.inner.borrow_mut().fail_fetch = true;
    }

    pub fn fail_comment(&self) {
        self.inner.borrow_mut().fail_comment = true;
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }

    fn get(&self, id: WorkItemId) -> Result<WorkItem> {
        let inner = self.inner.borrow();
        if inner.fail_fetch {
            return Err(Error::transport(Some(401), "unauthorized"));
        }
        inner
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::transport(Some(404), format!("work item {id} does not exist")))
    }
}

impl WorkItemStore for FakeStore {
    fn work_item_url(&self, id: WorkItemId) -> String {
        format!("{BASE}/{id}")
    }

    fn fetch(&self, id: WorkItemId) -> Result<WorkItem> {
        self.record(Call::Fetch(id));
        let mut item = self.get(id)?;
        item.relations.clear();
        Ok(item)
    }

    fn fetch_with_relations(&self, id: WorkItemId) -> Result<WorkItem> {
        self.record(Call::FetchWithRelations(id));
        self.get(id)
    }

    fn create(
        &self,
        work_item_type: &str,
        fields: &[FieldValue],
        relations: &[Relation],
    ) -> Result<WorkItem> {
        self.record(Call::Create {
            work_item_type: work_item_type.to_string(),
            fields: fields.to_vec(),
            relations: relations.to_vec(),
        });

        let mut inner = self.inner.borrow_mut();
        if let Some(left) = inner.creates_before_failure {
            if left == 0 {
                return Err(Error::transport(Some(400), "TF401320: rule error for field Title"));
            }
            inner.creates_before_failure = Some(left - 1);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let item = WorkItem {
            id,
            fields: fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect(),
            relations: relations.to_vec(),
        };

        for rel in relations {
            let reverse = rel.rel.replace("-Forward", "-Reverse");
            if let Some(target) = rel.target_id().and_then(|t| inner.items.get_mut(&t)) {
                target
                    .relations
                    .push(Relation::new(reverse, format!("{BASE}/{id}")));
            }
        }

        inner.items.insert(id, item.clone());
        Ok(item)
    }

    fn patch_fields(&self, id: WorkItemId, fields: &[FieldValue]) -> Result<WorkItem> {
        self.record(Call::PatchFields(id, fields.to_vec()));
        let mut inner = self.inner.borrow_mut();
        if inner.fail_comment {
            return Err(Error::transport(Some(503), "service unavailable"));
        }
        let item = inner
            .items
            .get_mut(&id)
            .ok_or_else(|| Error::transport(Some(404), "missing"))?;
        for f in fields {
            item.fields.insert(f.name.clone(), f.value.clone());
        }
        Ok(item.clone())
    }

    fn patch_relations(&self, id: WorkItemId, ops: &[RelationOp]) -> Result<WorkItem> {
        self.record(Call::PatchRelations(id, ops.to_vec()));
        let mut inner = self.inner.borrow_mut();
        let item = inner
            .items
            .get_mut(&id)
            .ok_or_else(|| Error::transport(Some(404), "missing"))?;

        let mut relations = item.relations.clone();
        for op in ops {
            match op {
                RelationOp::Add(rel) => relations.push(rel.clone()),
                RelationOp::Remove(idx) if *idx < relations.len() => {
                    relations.remove(*idx);
                }
                RelationOp::Remove(idx) => {
                    return Err(Error::transport(
                        Some(400),
                        format!("relation index {idx} out of range"),
                    ));
                }
            }
        }
        item.relations = relations;
        Ok(item.clone())
    }

    fn delete(&self, id: WorkItemId) -> Result<()> {
        self.record(Call::Delete(id));
        self.inner
            .borrow_mut()
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::transport(Some(404), "missing"))
    }
}

/// Hands out the same store for every target and remembers what was asked for.
pub struct FakeProvider {
    pub store: FakeStore,
    pub opened: RefCell<Vec<ProjectTarget>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            store: FakeStore::new(),
            opened: RefCell::new(Vec::new()),
        }
    }
}

impl StoreProvider for FakeProvider {
    fn open(&self, target: ProjectTarget) -> Result<Box<dyn WorkItemStore>> {
        self.opened.borrow_mut().push(target);
        Ok(Box::new(self.store.clone()))
    }
}

pub struct ScriptedCompletion {
    reply: std::result::Result<String, String>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.reply.clone().map_err(Error::Completion)
    }
}

pub fn creates(calls: &[Call]) -> Vec<&Call> {
    calls
        .iter()
        .filter(|c| matches!(c, Call::Create { .. }))
        .collect()
}
