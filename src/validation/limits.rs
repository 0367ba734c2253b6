/*!
 * Plausibility checks for translated lines.
 *
 * Every check runs on every call so the caller sees all violated categories at
 * once and can decide whether to retry, trim or accept the batch.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{TranslationError, ValidationErrors};
use crate::subtitle_processor::SubtitleLine;

/// Default maximum characters per translated line
const DEFAULT_MAX_CHARACTERS: usize = 120;

/// Default maximum line breaks per translated line
const DEFAULT_MAX_NEWLINES: usize = 3;

/// Limits a translated line must respect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    pub max_characters: usize,
    pub max_newlines: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_characters: DEFAULT_MAX_CHARACTERS,
            max_newlines: DEFAULT_MAX_NEWLINES,
        }
    }
}

/// Check a batch of translated lines against `limits`.
///
/// Fails with every violated category: `NoTranslation` for an empty batch,
/// `UnmatchedLines` for lines without a number, `LineTooLong` and
/// `TooManyNewlines` carrying the offending lines.
pub fn validate_translations(translated: &[SubtitleLine], limits: &ValidationLimits) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if translated.is_empty() {
        errors.push(TranslationError::NoTranslation);
    }

    let unmatched: Vec<SubtitleLine> = translated.iter().filter(|line| !line.is_bound()).cloned().collect();
    if !unmatched.is_empty() {
        errors.push(TranslationError::UnmatchedLines(unmatched));
    }

    let too_long: Vec<SubtitleLine> = translated
        .iter()
        .filter(|line| line.char_count() > limits.max_characters)
        .cloned()
        .collect();
    if !too_long.is_empty() {
        errors.push(TranslationError::LineTooLong {
            max_characters: limits.max_characters,
            lines: too_long,
        });
    }

    let too_many_newlines: Vec<SubtitleLine> = translated
        .iter()
        .filter(|line| line.newline_count() > limits.max_newlines)
        .cloned()
        .collect();
    if !too_many_newlines.is_empty() {
        errors.push(TranslationError::TooManyNewlines {
            max_newlines: limits.max_newlines,
            lines: too_many_newlines,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        debug!("Validation found {} problem categories", errors.len());
        Err(ValidationErrors(errors))
    }
}
