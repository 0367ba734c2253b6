/*!
 * Binding of extracted translations to original lines.
 *
 * Matching runs in two passes. The exact pass looks up each original's own
 * key. The fuzzy pass then gives every still-unmatched original the first
 * remaining timed candidate whose interval fully contains it, marking the body
 * so later stages can tell a heuristic match from an exact one.
 */

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::subtitle_processor::SubtitleLine;
use crate::translation::parser::{CandidateKey, CandidateMap};

/// Prefix added to the text of translations bound by interval containment
pub const FUZZY_MARKER: &str = "#Fuzzy: ";

/// Outcome of matching one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Bound lines ordered by number, followed by candidates no original claimed
    pub translated: Vec<SubtitleLine>,

    /// Originals left without a translation
    pub unmatched: Vec<SubtitleLine>,

    /// One entry per fuzzy binding
    pub warnings: Vec<String>,
}

impl MatchResult {
    /// Lines bound to an original
    pub fn bound(&self) -> impl Iterator<Item = &SubtitleLine> {
        self.translated.iter().filter(|line| line.is_bound())
    }

    pub fn bound_count(&self) -> usize {
        self.bound().count()
    }

    pub fn fuzzy_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Bind candidates to `originals`.
///
/// A candidate may satisfy several originals in the fuzzy pass; each such
/// binding is reported in `warnings`. Candidates that bind nothing are returned
/// as unnumbered lines so validation can report them.
pub fn match_translations(originals: &[SubtitleLine], candidates: &CandidateMap) -> MatchResult {
    let mut consumed: BTreeSet<CandidateKey> = BTreeSet::new();
    let mut bound: Vec<SubtitleLine> = Vec::new();
    let mut pending: Vec<&SubtitleLine> = Vec::new();

    for original in originals {
        let interval = CandidateKey::Interval(original.key());
        let hit = candidates.get(&interval).or_else(|| {
            original
                .number
                .and_then(|number| candidates.get(&CandidateKey::Index(number)))
        });

        match hit {
            Some(candidate) => {
                consumed.insert(candidate.key);
                bound.push(bind(original, candidate.body.clone()));
            }
            None => pending.push(original),
        }
    }

    let mut warnings = Vec::new();
    let mut unmatched = Vec::new();
    let mut used_fuzzy: BTreeSet<CandidateKey> = BTreeSet::new();

    for original in pending {
        let containers: Vec<_> = candidates
            .values()
            .filter(|candidate| !consumed.contains(&candidate.key))
            .filter(|candidate| {
                candidate
                    .interval()
                    .is_some_and(|interval| interval.contains(&original.key()))
            })
            .collect();

        // Later candidates override earlier ones, as the exact map does for repeated keys
        match containers.last() {
            Some(candidate) => {
                let mut message = format!(
                    "Fuzzy matched line {} ({}) to translation at {}",
                    original.number.unwrap_or(0),
                    original.key(),
                    candidate.interval().map(|k| k.to_string()).unwrap_or_default()
                );
                if containers.len() > 1 {
                    message.push_str(&format!(
                        " (ambiguous: {} translations contain it, using the last)",
                        containers.len()
                    ));
                }
                warn!("{}", message);
                warnings.push(message);
                used_fuzzy.insert(candidate.key);
                bound.push(bind(original, format!("{}{}", FUZZY_MARKER, candidate.body)));
            }
            None => unmatched.push(original.clone()),
        }
    }

    bound.sort_by_key(|line| line.number);

    let leftovers: Vec<SubtitleLine> = candidates
        .values()
        .filter(|candidate| !consumed.contains(&candidate.key) && !used_fuzzy.contains(&candidate.key))
        .map(|candidate| candidate.to_line())
        .collect();

    if !leftovers.is_empty() {
        debug!("{} candidate translations did not match any line", leftovers.len());
    }

    let mut translated = bound;
    translated.extend(leftovers);

    MatchResult {
        translated,
        unmatched,
        warnings,
    }
}

/// Combine bound translations keyed by number, later entries overriding earlier ones
pub fn merge_translations(previous: &[SubtitleLine], new: &[SubtitleLine]) -> Vec<SubtitleLine> {
    let mut merged: BTreeMap<usize, SubtitleLine> = BTreeMap::new();

    for line in previous.iter().chain(new.iter()) {
        if let Some(number) = line.number {
            merged.insert(number, line.clone());
        }
    }

    merged.into_values().collect()
}

fn bind(original: &SubtitleLine, text: String) -> SubtitleLine {
    SubtitleLine {
        number: original.number,
        start: original.start,
        end: original.end,
        text,
        translation: None,
    }
}
