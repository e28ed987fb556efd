//! Story → prompt → completion → titles → linked test cases → summary comment.
//!
//! Every step is a blocking remote call made in order. Test cases are created
//! one at a time so the summary lists them in extraction order. Nothing is
//! rolled back: a failure after the first creation leaves earlier test cases
//! in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::devops::{
    fields, FieldValue, Relation, WorkItemId, WorkItemStore, TESTED_BY_FORWARD, TEST_CASE_TYPE,
};
use crate::error::{Error, Result};
use crate::llm::prompt::build_prompt;
use crate::llm::CompletionService;
use crate::testgen::extract::extract_with_format;
use crate::testgen::reconcile::purge_linked_test_cases;
use crate::testgen::title::clamp_title;
use crate::text::normalize;

/// Stand-in completion when the model cannot be reached. Contains no list
/// markers, so it extracts to zero titles.
pub const COMPLETION_FALLBACK: &str = "[ERROR: could not generate test cases]";

pub const LINK_COMMENT: &str = "Linked to user story";
pub const SUMMARY_HEADER: &str = "Created Test Cases:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCaseRecord {
    pub id: WorkItemId,
    pub name: String,
}

/// Outcome of one generation run. The story text and prompt are returned
/// for the caller's inspection only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationReport {
    pub created_cases: Vec<TestCaseRecord>,
    pub output: String,
    #[serde(rename = "user_story_description")]
    pub description: String,
    #[serde(rename = "user_story_acceptance_criteria")]
    pub acceptance_criteria: String,
    pub prompt: String,
}

pub struct TestCaseGenerator<'a> {
    store: &'a dyn WorkItemStore,
    llm: &'a dyn CompletionService,
    max_title_length: usize,
    replace_existing: bool,
}

impl<'a> TestCaseGenerator<'a> {
    pub fn new(
        store: &'a dyn WorkItemStore,
        llm: &'a dyn CompletionService,
        max_title_length: usize,
    ) -> Self {
        Self {
            store,
            llm,
            max_title_length,
            replace_existing: false,
        }
    }

    /// Delete the story's currently linked test cases before creating new ones.
    pub fn replace_existing(mut self, yes: bool) -> Self {
        self.replace_existing = yes;
        self
    }

    pub fn run(&self, story_id: WorkItemId) -> Result<GenerationReport> {
        /* ================= STORY ================= */

        let story = self.store.fetch(story_id)?;
        let description = normalize(story.field_str(fields::DESCRIPTION));
        let acceptance_criteria = normalize(story.field_str(fields::ACCEPTANCE_CRITERIA));

        info!(story_id, "fetched user story");

        /* ================= PROMPT ================= */

        let prompt = build_prompt(&description, &acceptance_criteria);
        debug!(%prompt, "prompt prepared");

        /* ================= LLM ================= */

        let completion = match self.llm.complete(&prompt) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "test case generation failed, continuing with none");
                COMPLETION_FALLBACK.to_string()
            }
        };
        debug!(%completion, "completion received");

        let (format, titles) = extract_with_format(&completion);
        info!(count = titles.len(), ?format, "extracted test case titles");

        /* ================= CREATE & LINK ================= */

        if self.replace_existing {
            let removed = purge_linked_test_cases(self.store, story_id)?;
            info!(story_id, count = removed.len(), "deleted previously linked test cases");
        }

        let mut created = Vec::with_capacity(titles.len());
        let mut log = Vec::with_capacity(titles.len());

        for line in &titles {
            let record = self.create_and_link(story_id, line)?;
            let entry = format!("Created and linked test case: {} | Name: {}", record.id, record.name);
            info!("{entry}");
            log.push(entry);
            created.push(record);
        }

        /* ================= SUMMARY ================= */

        let comment = summary_comment(&created);
        self.store
            .patch_fields(story_id, &[FieldValue::new(fields::HISTORY, comment)])?;

        info!(story_id, count = created.len(), "test cases generated, linked, and attached");

        Ok(GenerationReport {
            created_cases: created,
            output: log.join("\n"),
            description,
            acceptance_criteria,
            prompt,
        })
    }

    fn create_and_link(&self, story_id: WorkItemId, line: &str) -> Result<TestCaseRecord> {
        let title = clamp_title(line, self.max_title_length);
        if title != line {
            debug!(%title, "truncated long title");
        }

        let link = Relation::new(TESTED_BY_FORWARD, self.store.work_item_url(story_id))
            .with_comment(LINK_COMMENT);
        let fields = [
            FieldValue::new(fields::TITLE, title.as_str()),
            FieldValue::new(fields::STEPS, line),
        ];

        let item = self
            .store
            .create(TEST_CASE_TYPE, &fields, &[link])
            .map_err(|e| Error::CreateTestCase {
                length: title.chars().count(),
                title: title.clone(),
                source: Box::new(e),
            })?;

        Ok(TestCaseRecord {
            id: item.id,
            name: title,
        })
    }
}

/// Comment body posted on the story after a run.
pub fn summary_comment(created: &[TestCaseRecord]) -> String {
    std::iter::once(SUMMARY_HEADER.to_string())
        .chain(
            created
                .iter()
                .map(|tc| format!("ID: {} | Name: {}", tc.id, tc.name)),
        )
        .collect::<Vec<_>>()
        .join("\n")
}
