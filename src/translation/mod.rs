/*!
 * Translation of subtitle batches.
 *
 * - `batcher`: groups timed lines into scenes and batches
 * - `prompts`: renders the prompt for a batch
 * - `parser`: extracts candidate translations from a raw completion
 * - `matcher`: binds candidates to original lines, exactly or by containment
 * - `translator`: drives the whole round trip for every batch of a file
 */

// Re-export main types for easier usage
pub use self::batcher::{BatchThresholds, SubtitleBatcher, unbatch_scenes};
pub use self::matcher::{FUZZY_MARKER, MatchResult, match_translations, merge_translations};
pub use self::parser::{Candidate, CandidateKey, CandidateMap, ExtractionStrategy, ResponseParser};
pub use self::prompts::{PromptTemplate, TranslationPrompt, TranslationPromptBuilder};
pub use self::translator::{SubtitleTranslator, TranslationSummary, TranslatorOptions, reconcile_completion};

// Submodules
pub mod batcher;
pub mod matcher;
pub mod parser;
pub mod prompts;
pub mod translator;
