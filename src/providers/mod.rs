/*!
 * Completion sources: where raw translation text comes from.
 *
 * The translation service itself is an external collaborator. The core only
 * needs "give me the completion for this batch's prompt", so that is the whole
 * interface:
 * - `replay`: completions stored as text files, one per batch
 * - `mock`: scripted behaviours for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::project::BatchKey;
use crate::subtitle_processor::SubtitleLine;
use crate::translation::prompts::TranslationPrompt;

/// A request for the completion of one batch
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Batch the prompt was built for
    pub key: BatchKey,

    /// Rendered prompt
    pub prompt: TranslationPrompt,

    /// Lines in the batch, as submitted
    pub lines: Vec<SubtitleLine>,

    /// 0 for the first attempt, incremented on each retry
    pub attempt: usize,
}

/// Common trait for anything that can produce a completion
///
/// Implementations must be shareable across tasks, since batches are
/// translated concurrently.
#[async_trait]
pub trait CompletionSource: Send + Sync + Debug {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Produce the raw completion text for a request
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

pub mod mock;
pub mod replay;

pub use mock::{MockBehavior, MockSource};
pub use replay::ReplaySource;
