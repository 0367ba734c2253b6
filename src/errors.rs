/*!
 * Error types for the subtrans library.
 *
 * This module contains custom error types for different parts of the library,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::subtitle_processor::SubtitleLine;

/// Errors returned by a completion source (the external translation service)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be completed
    #[error("Completion request failed: {0}")]
    RequestFailed(String),

    /// No completion is available for the requested batch
    #[error("No completion available for scene {scene} batch {batch}")]
    MissingCompletion {
        /// Scene number of the batch
        scene: usize,
        /// Batch number within the scene
        batch: usize,
    },

    /// Error reading a stored completion
    #[error("Failed to read completion: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by structural operations on subtitles, scenes and batches
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// Input violates a precondition (unsorted, empty, zero threshold)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A merge selection is not a contiguous run of numbers
    #[error("Selection is not sequential: {0:?}")]
    NonSequentialSelection(Vec<usize>),

    /// The requested scene does not exist
    #[error("Scene {0} not found")]
    SceneNotFound(usize),

    /// The requested batch does not exist in the scene
    #[error("Batch {batch} not found in scene {scene}")]
    BatchNotFound {
        /// Scene that was searched
        scene: usize,
        /// Missing batch number
        batch: usize,
    },

    /// Scene/batch operation attempted before the subtitles were batched
    #[error("Subtitles have not been batched")]
    NotBatched,
}

/// Errors that can occur while extracting, matching or validating translations
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The completion contained no text at all
    #[error("No translated text provided")]
    EmptyResponse,

    /// Nothing could be extracted or matched
    #[error("Failed to extract any translations")]
    NoTranslation,

    /// Some translations could not be bound to a source line
    #[error("{} translations could not be matched with a source line", .0.len())]
    UnmatchedLines(Vec<SubtitleLine>),

    /// One or more lines exceed the character limit
    #[error("One or more lines exceeded {max_characters} characters ({} lines)", lines.len())]
    LineTooLong {
        /// Configured limit
        max_characters: usize,
        /// Offending lines
        lines: Vec<SubtitleLine>,
    },

    /// One or more lines contain too many line breaks
    #[error("One or more lines contain more than {max_newlines} newlines ({} lines)", lines.len())]
    TooManyNewlines {
        /// Configured limit
        max_newlines: usize,
        /// Offending lines
        lines: Vec<SubtitleLine>,
    },

    /// Validation reported one or more categories
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Error from the completion source
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a structural subtitle operation
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),
}

impl TranslationError {
    /// Whether retrying the external request could fix this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Subtitle(_) => false,
            Self::Validation(errors) => errors.0.iter().all(|e| e.is_recoverable()),
            _ => true,
        }
    }
}

/// Every validation category violated by a translated batch
#[derive(Error, Debug)]
#[error("Translation failed validation: {}", join_errors(.0))]
pub struct ValidationErrors(pub Vec<TranslationError>);

impl ValidationErrors {
    /// Check whether a particular category was reported
    pub fn contains(&self, predicate: impl Fn(&TranslationError) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    /// Whether only length/newline limits were violated, so the lines are usable
    pub fn only_limit_violations(&self) -> bool {
        self.0.iter().all(|e| {
            matches!(e, TranslationError::LineTooLong { .. } | TranslationError::TooManyNewlines { .. })
        })
    }
}

fn join_errors(errors: &[TranslationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
