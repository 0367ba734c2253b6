/*!
 * Mock completion source for testing.
 *
 * Each behaviour produces a response shape the parser and matcher must cope with:
 * - `MockSource::working()` - one well-formed block per line
 * - `MockSource::merged()` - a single block spanning the whole batch (fuzzy matches)
 * - `MockSource::numbered()` - a numbered list with no timings (fallback patterns)
 * - `MockSource::failing()` - always fails with an error
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionSource};
use crate::subtitle_processor::SubtitleLine;

static PROMPT_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<original number='(\d+)'[^>]*>\n(.*?)\n</original>").expect("Invalid prompt line regex")
});

/// Behavior mode for the mock source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// One tagged block per line
    Working,
    /// One tagged block covering every line of the batch
    Merged,
    /// `N: text` lines, keyed by line number only
    Numbered,
    /// Well-formed blocks whose text breaks the length limit
    TooLong { length: usize },
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty completion
    Empty,
    /// Well-formed blocks after a delay
    Slow { delay_ms: u64 },
}

/// Mock source for testing translation behavior
#[derive(Debug)]
pub struct MockSource {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockSource {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn merged() -> Self {
        Self::new(MockBehavior::Merged)
    }

    pub fn numbered() -> Self {
        Self::new(MockBehavior::Numbered)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator, used in place of the working response
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Requests received so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// One well-formed block per line, each text prefixed with `[TRANSLATED]`
    pub fn generate_tagged_response(lines: &[SubtitleLine]) -> String {
        lines
            .iter()
            .map(|line| {
                format!(
                    "<translation start='{}' end='{}'>\n[TRANSLATED] {}\n</translation>\n",
                    line.start, line.end, line.text
                )
            })
            .collect()
    }

    /// A single block spanning from the first start to the last end
    pub fn generate_merged_response(lines: &[SubtitleLine]) -> String {
        match (lines.first(), lines.last()) {
            (Some(first), Some(last)) => {
                let text: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();
                format!(
                    "<translation start='{}' end='{}'>[TRANSLATED] {}</translation>",
                    first.start,
                    last.end,
                    text.join(" ")
                )
            }
            _ => String::new(),
        }
    }

    /// A numbered list with no timing information, numbered as the prompt numbers its lines
    pub fn generate_numbered_response(prompt: &str) -> String {
        PROMPT_LINE_PATTERN
            .captures_iter(prompt)
            .map(|caps| format!("{}: [TRANSLATED] {}\n", &caps[1], caps[2].replace('\n', " ")))
            .collect()
    }
}

impl Clone for MockSource {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl CompletionSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(match self.custom_response {
                Some(generator) => generator(request),
                None => Self::generate_tagged_response(&request.lines),
            }),

            MockBehavior::Merged => Ok(Self::generate_merged_response(&request.lines)),

            MockBehavior::Numbered => Ok(Self::generate_numbered_response(&request.prompt.user)),

            MockBehavior::TooLong { length } => {
                let long_lines: Vec<SubtitleLine> = request
                    .lines
                    .iter()
                    .map(|line| {
                        let mut line = line.clone();
                        line.text = "x".repeat(length);
                        line
                    })
                    .collect();
                Ok(Self::generate_tagged_response(&long_lines))
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::RequestFailed(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(Self::generate_tagged_response(&request.lines))
                }
            }

            MockBehavior::Failing => Err(ProviderError::RequestFailed("Simulated provider failure".to_string())),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::generate_tagged_response(&request.lines))
            }
        }
    }
}
