/*!
 * Scenes and batches: the two levels of the subtitle grouping tree.
 *
 * A scene owns its batches; a batch owns its original and translated lines.
 * Numbers are assigned by the owning `SubtitleFile` when it renumbers.
 */

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::subtitle_processor::{LineKey, SubtitleLine};
use crate::translation::matcher::merge_translations;

/// Address of a batch within the scene tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub scene: usize,
    pub batch: usize,
}

impl BatchKey {
    pub fn new(scene: usize, batch: usize) -> Self {
        Self { scene, batch }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene {} batch {}", self.scene, self.batch)
    }
}

/// A group of lines submitted to the translation service together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleBatch {
    pub number: usize,

    /// Number of the owning scene (a back-reference, kept in sync by renumbering)
    pub scene: usize,

    pub originals: Vec<SubtitleLine>,

    #[serde(default)]
    pub translated: Vec<SubtitleLine>,
}

impl SubtitleBatch {
    pub fn new(scene: usize, number: usize, originals: Vec<SubtitleLine>) -> Self {
        Self {
            number,
            scene,
            originals,
            translated: Vec::new(),
        }
    }

    pub fn key(&self) -> BatchKey {
        BatchKey::new(self.scene, self.number)
    }

    pub fn size(&self) -> usize {
        self.originals.len()
    }

    /// Find an original line by its timing key
    pub fn original(&self, key: &LineKey) -> Option<&SubtitleLine> {
        self.originals.iter().find(|line| line.key() == *key)
    }

    pub fn all_translated(&self) -> bool {
        !self.originals.is_empty() && self.originals.iter().all(|line| line.translation.is_some())
    }

    /// Append the lines of later batches to this one
    pub fn absorb_batches(&mut self, others: Vec<SubtitleBatch>) {
        for other in others {
            self.originals.extend(other.originals);
            self.translated.extend(other.translated);
        }
    }

    /// Install bound translations, rebinding each to the current number of its original.
    ///
    /// Lines are located by key, so numbers that went stale while a translation was in
    /// flight are corrected here. When several originals share an interval the one with
    /// the translation's number is preferred, then the first not yet filled by this call.
    /// Returns how many lines were installed.
    pub fn install_translations(&mut self, translations: &[SubtitleLine]) -> usize {
        let mut installed = Vec::with_capacity(translations.len());
        let mut filled = vec![false; self.originals.len()];

        for translation in translations.iter().filter(|line| line.is_bound()) {
            let key = translation.key();
            let position = self
                .originals
                .iter()
                .enumerate()
                .position(|(i, line)| !filled[i] && line.key() == key && line.number == translation.number)
                .or_else(|| {
                    self.originals
                        .iter()
                        .enumerate()
                        .position(|(i, line)| !filled[i] && line.key() == key)
                });

            match position {
                Some(index) => {
                    filled[index] = true;
                    let original = &mut self.originals[index];
                    original.translation = Some(translation.text.clone());
                    let mut line = translation.clone();
                    line.number = original.number;
                    installed.push(line);
                }
                None => warn!(
                    "Translation for {} does not belong to scene {} batch {}",
                    key, self.scene, self.number
                ),
            }
        }

        let count = installed.len();
        self.translated = merge_translations(&self.translated, &installed);
        count
    }
}

/// A run of batches separated from its neighbours by a long pause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleScene {
    pub number: usize,
    pub batches: Vec<SubtitleBatch>,
}

impl SubtitleScene {
    pub fn new(number: usize, batches: Vec<SubtitleBatch>) -> Self {
        Self { number, batches }
    }

    pub fn line_count(&self) -> usize {
        self.batches.iter().map(SubtitleBatch::size).sum()
    }

    pub fn batch(&self, number: usize) -> Option<&SubtitleBatch> {
        self.batches.iter().find(|batch| batch.number == number)
    }

    pub fn batch_mut(&mut self, number: usize) -> Option<&mut SubtitleBatch> {
        self.batches.iter_mut().find(|batch| batch.number == number)
    }

    pub fn originals(&self) -> impl Iterator<Item = &SubtitleLine> {
        self.batches.iter().flat_map(|batch| batch.originals.iter())
    }

    /// Move every batch of `others` to the end of this scene
    pub fn absorb_scenes(&mut self, others: Vec<SubtitleScene>) {
        for other in others {
            self.batches.extend(other.batches);
        }
    }

    /// Merge a contiguous run of this scene's batches into the first of them.
    ///
    /// Every precondition is checked before the scene is touched.
    pub fn merge_batches(&mut self, numbers: &[usize]) -> Result<(), SubtitleError> {
        let numbers = ensure_sequential(numbers)?;

        let mut indices = Vec::with_capacity(numbers.len());
        for &number in &numbers {
            let index = self
                .batches
                .iter()
                .position(|batch| batch.number == number)
                .ok_or(SubtitleError::BatchNotFound {
                    scene: self.number,
                    batch: number,
                })?;
            indices.push(index);
        }

        let first = indices[0];
        let last = indices[indices.len() - 1];
        if last - first + 1 != indices.len() {
            return Err(SubtitleError::NonSequentialSelection(numbers));
        }

        let merged: Vec<SubtitleBatch> = self.batches.drain(first + 1..=last).collect();
        self.batches[first].absorb_batches(merged);
        Ok(())
    }
}

/// Sort a selection and require it to be a gap-free run of numbers
pub fn ensure_sequential(numbers: &[usize]) -> Result<Vec<usize>, SubtitleError> {
    if numbers.is_empty() {
        return Err(SubtitleError::InvalidInput("No numbers supplied for merge".to_string()));
    }

    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();

    let first = sorted[0];
    let is_run = sorted.iter().enumerate().all(|(i, &n)| n == first + i);
    if !is_run {
        return Err(SubtitleError::NonSequentialSelection(sorted));
    }

    Ok(sorted)
}
