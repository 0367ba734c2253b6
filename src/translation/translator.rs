/*!
 * Batch translation driver.
 *
 * For every batch: build the prompt, ask the completion source, extract and
 * match the candidates, validate them, and install what survives through the
 * aggregate's lock. Batches run concurrently up to `concurrent_requests`;
 * recoverable failures are retried with the previous problems added to the
 * prompt.
 */

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{SubtitleError, TranslationError};
use crate::project::{BatchKey, SubtitleFile};
use crate::providers::{CompletionRequest, CompletionSource};
use crate::subtitle_processor::SubtitleLine;
use crate::translation::matcher::{MatchResult, match_translations};
use crate::translation::parser::ResponseParser;
use crate::translation::prompts::TranslationPromptBuilder;
use crate::validation::{ValidationLimits, validate_translations};

/// Options for the translation driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorOptions {
    /// Maximum number of batches in flight
    pub concurrent_requests: usize,

    /// Extra attempts for a batch after a recoverable failure
    pub max_retries: usize,

    /// Abort on the first failed batch, and reject lines that break the length limits
    pub stop_on_error: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            concurrent_requests: 4,
            max_retries: 2,
            stop_on_error: false,
        }
    }
}

/// What happened to one batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub key: BatchKey,
    pub installed: usize,
    pub unmatched: usize,
    pub fuzzy_warnings: Vec<String>,
    /// Set when lines breaking the length limits were accepted
    pub limit_warning: Option<String>,
    pub attempts: usize,
}

/// Totals over a translation run
#[derive(Debug, Clone, Default)]
pub struct TranslationSummary {
    pub batches: usize,
    pub translated_batches: usize,
    pub translated_lines: usize,
    pub unmatched_lines: usize,
    pub retries: usize,
    pub failed: Vec<(BatchKey, String)>,
    pub fuzzy_warnings: Vec<String>,
    pub limit_warnings: Vec<String>,
}

impl TranslationSummary {
    fn record(&mut self, report: BatchReport) {
        self.translated_batches += 1;
        self.translated_lines += report.installed;
        self.unmatched_lines += report.unmatched;
        self.retries += report.attempts.saturating_sub(1);
        self.fuzzy_warnings.extend(report.fuzzy_warnings);
        self.limit_warnings.extend(report.limit_warning);
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.unmatched_lines == 0
    }
}

/// Turn a raw completion into matched lines for `originals`.
///
/// Fails when the text is empty or nothing in it can be recognised.
pub fn reconcile_completion(
    parser: &ResponseParser,
    text: &str,
    originals: &[SubtitleLine],
) -> Result<MatchResult, TranslationError> {
    let candidates = parser.extract(text)?;
    if candidates.is_empty() {
        return Err(TranslationError::NoTranslation);
    }
    Ok(match_translations(originals, &candidates))
}

/// Translates the batches of a subtitle file through a completion source
pub struct SubtitleTranslator {
    source: Arc<dyn CompletionSource>,
    parser: ResponseParser,
    options: TranslatorOptions,
}

impl SubtitleTranslator {
    pub fn new(source: Arc<dyn CompletionSource>, options: TranslatorOptions) -> Self {
        Self {
            source,
            parser: ResponseParser::new(),
            options,
        }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translate every batch of `file`.
    ///
    /// `progress_callback` receives (completed, total) after each batch. Failed
    /// batches are collected in the summary unless `stop_on_error` is set, in
    /// which case the first failure is returned and no further batches start.
    pub async fn translate_all(
        &self,
        file: &SubtitleFile,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<TranslationSummary, TranslationError> {
        let keys = file.batch_keys();
        if keys.is_empty() {
            return Err(SubtitleError::NotBatched.into());
        }

        let total = keys.len();
        let concurrency = self.options.concurrent_requests.max(1);
        info!(
            "Translating {} batches with {} (up to {} at once)",
            total,
            self.source.name(),
            concurrency
        );

        let mut outcomes = stream::iter(keys)
            .map(|key| async move { (key, self.translate_batch(file, key).await) })
            .buffer_unordered(concurrency);

        let mut summary = TranslationSummary {
            batches: total,
            ..Default::default()
        };
        let mut completed = 0;

        while let Some((key, outcome)) = outcomes.next().await {
            completed += 1;
            progress_callback(completed, total);

            match outcome {
                Ok(report) => summary.record(report),
                Err(e) if self.options.stop_on_error => {
                    error!("Stopping after {} failed: {}", key, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed to translate {}: {}", key, e);
                    summary.failed.push((key, e.to_string()));
                }
            }
        }

        info!(
            "Translated {} lines in {}/{} batches ({} fuzzy matches, {} failed)",
            summary.translated_lines,
            summary.translated_batches,
            summary.batches,
            summary.fuzzy_warnings.len(),
            summary.failed.len()
        );

        Ok(summary)
    }

    /// Translate one batch and install the result, retrying recoverable failures
    pub async fn translate_batch(&self, file: &SubtitleFile, key: BatchKey) -> Result<BatchReport, TranslationError> {
        let batch = file.batch(key)?;
        let context = file.context();
        let limits = context.validation_limits();

        let mut retry_errors: Vec<String> = Vec::new();
        let mut attempt = 0;

        loop {
            let prompt = TranslationPromptBuilder::new(&context)
                .with_lines(&batch.originals)
                .with_retry_errors(&retry_errors)
                .build();
            let request = CompletionRequest {
                key,
                prompt,
                lines: batch.originals.clone(),
                attempt,
            };

            match self.attempt(&request, &limits).await {
                Ok((result, limit_warning)) => {
                    let installed = file.absorb_translation(key, &result)?;
                    if !result.unmatched.is_empty() {
                        warn!("{}: {} lines were not translated", key, result.unmatched.len());
                    }
                    debug!("{}: installed {} lines after {} attempts", key, installed, attempt + 1);

                    return Ok(BatchReport {
                        key,
                        installed,
                        unmatched: result.unmatched.len(),
                        fuzzy_warnings: result.warnings,
                        limit_warning,
                        attempts: attempt + 1,
                    });
                }
                Err(e) if e.is_recoverable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    warn!("{} failed ({}), retrying ({}/{})", key, e, attempt, self.options.max_retries);
                    retry_errors = match &e {
                        TranslationError::Validation(errors) => errors.0.iter().map(|e| e.to_string()).collect(),
                        other => vec![other.to_string()],
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request: complete, reconcile, validate
    async fn attempt(
        &self,
        request: &CompletionRequest,
        limits: &ValidationLimits,
    ) -> Result<(MatchResult, Option<String>), TranslationError> {
        let text = self.source.complete(request).await?;
        let result = reconcile_completion(&self.parser, &text, &request.lines)?;

        match validate_translations(&result.translated, limits) {
            Ok(()) => Ok((result, None)),
            Err(errors) if errors.only_limit_violations() && !self.options.stop_on_error => {
                let message = format!("{}: {}", request.key, errors);
                warn!("Accepting translation despite limits. {}", message);
                Ok((result, Some(message)))
            }
            Err(errors) => Err(errors.into()),
        }
    }
}
