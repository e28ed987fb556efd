//! Test case generation and the reverse: unlinking or deleting them.

pub mod extract;
pub mod orchestrator;
pub mod reconcile;
pub mod title;

pub use extract::{extract_titles, ListFormat};
pub use orchestrator::{GenerationReport, TestCaseGenerator, TestCaseRecord};
pub use reconcile::{purge_linked_test_cases, unlink_all_tested_by};
pub use title::clamp_title;
