/*!
 * Extraction of translated lines from a raw completion.
 *
 * The translation service is asked to answer with tagged blocks:
 *
 * ```text
 * <translation start='00:00:01,000' end='00:00:02,500'>
 * Bonjour
 * </translation>
 * ```
 *
 * Models do not always comply, so extraction runs an ordered cascade of
 * strategies, from the strict tagged form down to numbered free text, and keeps
 * the result of the first strategy that finds anything.
 */

use std::borrow::Cow;
use std::collections::BTreeMap;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::errors::TranslationError;
use crate::subtitle_processor::{LineKey, SubtitleLine};
use crate::timecode::Timecode;

/// How a candidate translation identifies the line it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateKey {
    /// Timed forms carry the line's interval
    Interval(LineKey),
    /// Fallback forms only carry the line's number
    Index(usize),
}

/// A translation recovered from the completion, not yet bound to an original
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Number attribute, when the model supplied one
    pub number: Option<usize>,
    pub key: CandidateKey,
    pub body: String,
}

impl Candidate {
    /// The interval this candidate covers, for timed forms
    pub fn interval(&self) -> Option<LineKey> {
        match self.key {
            CandidateKey::Interval(key) => Some(key),
            CandidateKey::Index(_) => None,
        }
    }

    /// Convert to an unbound translated line; index-only candidates have no timing
    pub fn to_line(&self) -> SubtitleLine {
        match self.key {
            CandidateKey::Interval(key) => SubtitleLine::unnumbered(key.start, key.end, self.body.clone()),
            CandidateKey::Index(_) => SubtitleLine::unnumbered(Timecode(0), Timecode(0), self.body.clone()),
        }
    }
}

/// Candidates deduplicated by key
pub type CandidateMap = BTreeMap<CandidateKey, Candidate>;

/// One way of recognising translated lines in a completion
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// All candidates found, in order of appearance
    fn extract(&self, text: &str) -> Vec<Candidate>;
}

/// Tagged blocks with start/end attributes and an optional number attribute
struct TimedTagStrategy {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
}

impl ExtractionStrategy for TimedTagStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, text: &str) -> Vec<Candidate> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| timed_candidate(&caps))
            .collect()
    }
}

/// Forms that identify the line only by its number: group 1 is the number, group 2 the body
struct IndexedStrategy {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    /// Treat a literal `\n` escape in the completion as a line separator
    escaped_newlines: bool,
}

impl ExtractionStrategy for IndexedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, text: &str) -> Vec<Candidate> {
        let text = if self.escaped_newlines && text.contains("\\n") {
            Cow::Owned(text.replace("\\n", "\n"))
        } else {
            Cow::Borrowed(text)
        };

        self.pattern
            .captures_iter(&text)
            .filter_map(|caps| {
                let number: usize = caps.get(1)?.as_str().parse().ok()?;
                let body = clean_body(caps.get(2)?.as_str());
                Some(Candidate {
                    number: Some(number),
                    key: CandidateKey::Index(number),
                    body,
                })
            })
            .collect()
    }
}

fn timed_candidate(caps: &Captures) -> Option<Candidate> {
    let start = Timecode::parse(caps.name("start")?.as_str()).ok()?;
    let end = Timecode::parse(caps.name("end")?.as_str()).ok()?;
    let number = caps.name("number").and_then(|m| m.as_str().trim().parse().ok());
    let body = clean_body(caps.name("body").map_or("", |m| m.as_str()));

    Some(Candidate {
        number,
        key: CandidateKey::Interval(LineKey::new(start, end)),
        body,
    })
}

/// Trim surrounding whitespace and normalise CRLF line breaks
fn clean_body(body: &str) -> String {
    body.trim().replace("\r\n", "\n")
}

// @const: Primary form, body may span lines
static PRIMARY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<translation\s+(?:number=['"]?(?P<number>\d+)['"]?\s+)?start=['"]?(?P<start>[\d:,.]+)['"]?\s+end=['"]?(?P<end>[\d:,.]+)['"]?\s*>[\s\r\n]*(?P<body>.*?)</translation>"#,
    )
    .expect("Invalid primary translation regex")
});

static NUMBERED_TIMED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)<translation\s+number='(?P<number>.+?)'\s+start='(?P<start>[\d:,]+)'\s+end='(?P<end>[\d:,]+)'>\s*(?P<body>.*?)\s*</translation>",
    )
    .expect("Invalid numbered translation regex")
});

static TRANSLATION_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<translation\s*line=(\d+)\s*>(?:")?(.*?)(?:")?\s*(?:" /)?</translation>"#)
        .expect("Invalid translation line regex")
});

static ORIGINAL_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<original\s*line=(\d+)\s*>(?:")?(.*?)(?:")?\s*(?:" /)?</original>"#)
        .expect("Invalid original line regex")
});

static LINE_ATTRIBUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<line\s*number=(\d+).+?translation=(?:")?(.*?)(?:")?\s*(?:" /)?>"#)
        .expect("Invalid line attribute regex")
});

static LINE_ELEMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<line number=(\d+)>(?:")?(.*?)(?:")?</line>"#).expect("Invalid line element regex")
});

static QUOTED_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\d+)[:.]\s*"(.+?)""#).expect("Invalid quoted list regex")
});

static NUMBERED_TEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(\d+)[:.]\s*(.+?)\s*$").expect("Invalid numbered text regex")
});

/// Extracts candidate translations using a primary strategy and ordered fallbacks
pub struct ResponseParser {
    primary: Box<dyn ExtractionStrategy>,
    fallbacks: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    /// Parser with the standard cascade
    pub fn new() -> Self {
        Self {
            primary: Box::new(TimedTagStrategy {
                name: "translation",
                pattern: &PRIMARY_PATTERN,
            }),
            fallbacks: vec![
                Box::new(TimedTagStrategy {
                    name: "numbered translation",
                    pattern: &NUMBERED_TIMED_PATTERN,
                }),
                Box::new(IndexedStrategy {
                    name: "translation line",
                    pattern: &TRANSLATION_LINE_PATTERN,
                    escaped_newlines: false,
                }),
                Box::new(IndexedStrategy {
                    name: "original line",
                    pattern: &ORIGINAL_LINE_PATTERN,
                    escaped_newlines: false,
                }),
                Box::new(IndexedStrategy {
                    name: "line attribute",
                    pattern: &LINE_ATTRIBUTE_PATTERN,
                    escaped_newlines: false,
                }),
                Box::new(IndexedStrategy {
                    name: "line element",
                    pattern: &LINE_ELEMENT_PATTERN,
                    escaped_newlines: false,
                }),
                Box::new(IndexedStrategy {
                    name: "quoted list",
                    pattern: &QUOTED_LIST_PATTERN,
                    escaped_newlines: false,
                }),
                Box::new(IndexedStrategy {
                    name: "numbered text",
                    pattern: &NUMBERED_TEXT_PATTERN,
                    escaped_newlines: true,
                }),
            ],
        }
    }

    /// Parser with a custom cascade
    pub fn with_strategies(primary: Box<dyn ExtractionStrategy>, fallbacks: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { primary, fallbacks }
    }

    /// Names of the strategies in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        std::iter::once(self.primary.name())
            .chain(self.fallbacks.iter().map(|s| s.name()))
            .collect()
    }

    /// Extract candidate translations from a completion.
    ///
    /// Empty text is an error; text where no strategy matches yields an empty map.
    pub fn extract(&self, text: &str) -> Result<CandidateMap, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyResponse);
        }

        for strategy in std::iter::once(&self.primary).chain(self.fallbacks.iter()) {
            let candidates = strategy.extract(text);
            if candidates.is_empty() {
                trace!("No matches for {} pattern", strategy.name());
                continue;
            }

            debug!("Extracted {} candidates with {} pattern", candidates.len(), strategy.name());

            // Later occurrences of a key replace earlier ones
            let map: CandidateMap = candidates.into_iter().map(|c| (c.key, c)).collect();
            return Ok(map);
        }

        debug!("No translation pattern matched the response");
        Ok(CandidateMap::new())
    }
}
