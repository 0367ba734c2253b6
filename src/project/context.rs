/*!
 * Project context: the settings that travel with a subtitle project.
 *
 * Every field is optional. A stored context and newly supplied options are
 * reconciled with `ProjectContext::update_from`, where a set ("truthy") option
 * wins over the stored value and a set stored value fills a gap in the options.
 */

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::translation::batcher::BatchThresholds;
use crate::validation::ValidationLimits;

/// Project-level translation context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    /// Character names, parsed from a comma or newline separated list
    #[serde(deserialize_with = "deserialize_characters", skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<String>>,

    /// Text replacements applied before translation, parsed from `before::after` pairs
    #[serde(deserialize_with = "deserialize_substitutions", skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_batch_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,

    /// Gap in seconds that closes a batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_threshold: Option<f64>,

    /// Gap in seconds that closes a scene
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_characters: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_newlines: Option<usize>,
}

/// Values that count as "set" when contexts are merged
trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for usize {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Truthy for BTreeMap<K, V> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

fn reconcile<T: Truthy + Clone>(stored: &mut Option<T>, supplied: &mut Option<T>) {
    if supplied.as_ref().is_some_and(Truthy::is_truthy) {
        *stored = supplied.clone();
    } else if stored.as_ref().is_some_and(Truthy::is_truthy) {
        *supplied = stored.clone();
    }
}

impl ProjectContext {
    /// Merge supplied options into this context and back-fill the options.
    ///
    /// A field set in `options` overrides the stored value; otherwise a set stored
    /// value is copied into `options`. Both sides are equal afterwards for every
    /// field that either side had set.
    pub fn update_from(&mut self, options: &mut ProjectContext) {
        reconcile(&mut self.gpt_model, &mut options.gpt_model);
        reconcile(&mut self.gpt_prompt, &mut options.gpt_prompt);
        reconcile(&mut self.instructions, &mut options.instructions);
        reconcile(&mut self.movie_name, &mut options.movie_name);
        reconcile(&mut self.synopsis, &mut options.synopsis);
        reconcile(&mut self.characters, &mut options.characters);
        reconcile(&mut self.substitutions, &mut options.substitutions);
        reconcile(&mut self.min_batch_size, &mut options.min_batch_size);
        reconcile(&mut self.max_batch_size, &mut options.max_batch_size);
        reconcile(&mut self.batch_threshold, &mut options.batch_threshold);
        reconcile(&mut self.scene_threshold, &mut options.scene_threshold);
        reconcile(&mut self.max_characters, &mut options.max_characters);
        reconcile(&mut self.max_newlines, &mut options.max_newlines);
    }

    /// Batching thresholds, with defaults for anything not set
    pub fn batch_thresholds(&self) -> BatchThresholds {
        let defaults = BatchThresholds::default();
        BatchThresholds {
            scene_gap_ms: self.scene_threshold.map_or(defaults.scene_gap_ms, seconds_to_ms),
            batch_gap_ms: self.batch_threshold.map_or(defaults.batch_gap_ms, seconds_to_ms),
            min_batch_size: self.min_batch_size.unwrap_or(defaults.min_batch_size),
            max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
        }
    }

    /// Validation limits, with defaults for anything not set
    pub fn validation_limits(&self) -> ValidationLimits {
        let defaults = ValidationLimits::default();
        ValidationLimits {
            max_characters: self.max_characters.unwrap_or(defaults.max_characters),
            max_newlines: self.max_newlines.unwrap_or(defaults.max_newlines),
        }
    }

    /// Apply the configured substitutions to a piece of text
    pub fn substitute(&self, text: &str) -> String {
        match &self.substitutions {
            Some(substitutions) => perform_substitutions(text, substitutions),
            None => text.to_string(),
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// Parse a raw character list: names separated by commas or newlines
pub fn parse_characters(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse raw substitutions, one `before::after` pair per line
pub fn parse_substitutions(raw: &str) -> BTreeMap<String, String> {
    parse_substitution_items(raw.lines())
}

fn parse_substitution_items<'a>(items: impl Iterator<Item = &'a str>) -> BTreeMap<String, String> {
    let mut substitutions = BTreeMap::new();
    for item in items.map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once("::") {
            Some((before, after)) if !before.trim().is_empty() => {
                substitutions.insert(before.trim().to_string(), after.trim().to_string());
            }
            _ => warn!("Ignoring malformed substitution: {}", item),
        }
    }
    substitutions
}

/// Replace every occurrence of each key with its value
pub fn perform_substitutions(text: &str, substitutions: &BTreeMap<String, String>) -> String {
    substitutions
        .iter()
        .fold(text.to_string(), |acc, (before, after)| acc.replace(before.as_str(), after))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Text(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSubstitutions {
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

fn deserialize_characters<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawList>::deserialize(deserializer)?;
    Ok(raw.map(|raw| match raw {
        RawList::Text(text) => parse_characters(&text),
        RawList::List(items) => items
            .iter()
            .flat_map(|item| parse_characters(item))
            .collect(),
    }))
}

fn deserialize_substitutions<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawSubstitutions>::deserialize(deserializer)?;
    Ok(raw.map(|raw| match raw {
        RawSubstitutions::Text(text) => parse_substitutions(&text),
        RawSubstitutions::List(items) => parse_substitution_items(items.iter().map(String::as_str)),
        RawSubstitutions::Map(map) => map,
    }))
}
