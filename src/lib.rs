//! Drafts test cases for Azure DevOps user stories with a language model,
//! creates them as `Test Case` work items linked back to the story, and can
//! remove those links again.

pub mod config;
pub mod devops;
pub mod error;
pub mod llm;
pub mod request;
pub mod testgen;
pub mod text;

pub use error::{Error, Result};
