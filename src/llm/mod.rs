pub mod client;
pub mod prompt;

use crate::error::Result;

pub use client::{LlmClient, Provider, ProviderConfig};

/// Prompt in, completion text out.
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> Result<String>;
}
