/*!
 * The subtitle aggregate.
 *
 * `SubtitleFile` owns the scene/batch tree together with the flat `originals`
 * and `translated` lists flattened from it, and is the only place where line,
 * batch and scene numbers are rewritten. Every public method takes the lock
 * once; the helpers on `SubtitleData` expect the caller to hold it, so
 * composite operations such as merge-then-renumber never lock twice.
 *
 * After every structural change:
 * - scenes are numbered 1..N and batches 1..M within their scene
 * - originals are numbered 1..L in chronological order
 * - every translated line carries the number of the original with its key
 */

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::project::context::ProjectContext;
use crate::project::scene::{BatchKey, SubtitleBatch, SubtitleScene, ensure_sequential};
use crate::subtitle_processor::{self, LineKey, SubtitleLine};
use crate::translation::batcher::{BatchThresholds, SubtitleBatcher};
use crate::translation::matcher::MatchResult;

// @struct: Aggregate state, guarded by the SubtitleFile lock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtitleData {
    #[serde(default)]
    pub context: ProjectContext,

    // @field: Source subtitle file, used to derive output paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,

    #[serde(default)]
    pub scenes: Vec<SubtitleScene>,

    // @field: Unbatched originals; rebuilt from scenes whenever scenes exist
    #[serde(default)]
    pub originals: Vec<SubtitleLine>,

    #[serde(default)]
    pub translated: Vec<SubtitleLine>,
}

impl SubtitleData {
    fn is_batched(&self) -> bool {
        !self.scenes.is_empty()
    }

    /// Rebuild the flat lists from the tree
    fn flatten(&mut self) {
        if !self.is_batched() {
            return;
        }

        self.originals = self
            .scenes
            .iter()
            .flat_map(|scene| scene.originals().cloned())
            .collect();

        let mut translated: Vec<SubtitleLine> = self
            .scenes
            .iter()
            .flat_map(|scene| scene.batches.iter())
            .flat_map(|batch| batch.translated.iter().cloned())
            .collect();
        translated.sort_by_key(|line| line.number);
        self.translated = translated;
    }

    /// Replace the tree, handing existing translations to the batches that own their originals
    fn set_scenes(&mut self, mut scenes: Vec<SubtitleScene>) {
        // Translated lines are kept in number order, so originals sharing an interval
        // take their translations in the same order
        let mut by_key: HashMap<LineKey, VecDeque<SubtitleLine>> = HashMap::new();
        for line in self.translated.drain(..) {
            by_key.entry(line.key()).or_default().push_back(line);
        }

        for batch in scenes.iter_mut().flat_map(|scene| scene.batches.iter_mut()) {
            batch.translated = batch
                .originals
                .iter()
                .filter_map(|original| by_key.get_mut(&original.key()).and_then(VecDeque::pop_front))
                .collect();
        }

        let discarded: usize = by_key.values().map(VecDeque::len).sum();
        if discarded > 0 {
            warn!("Discarding {} translations with no matching original line", discarded);
        }

        self.scenes = scenes;
        self.renumber();
    }

    /// Restore the numbering invariants. Idempotent.
    fn renumber(&mut self) {
        let mut numbering = Renumbering::default();

        if self.is_batched() {
            let mut line_number = 0;
            for (scene_index, scene) in self.scenes.iter_mut().enumerate() {
                scene.number = scene_index + 1;
                for (batch_index, batch) in scene.batches.iter_mut().enumerate() {
                    batch.number = batch_index + 1;
                    batch.scene = scene.number;
                    for line in batch.originals.iter_mut() {
                        line_number += 1;
                        numbering.record(line, line_number);
                    }
                }
            }

            for batch in self.scenes.iter_mut().flat_map(|scene| scene.batches.iter_mut()) {
                let translated = std::mem::take(&mut batch.translated);
                batch.translated = numbering.rebind(translated);
            }

            self.flatten();
        } else {
            for (index, line) in self.originals.iter_mut().enumerate() {
                numbering.record(line, index + 1);
            }

            let translated = std::mem::take(&mut self.translated);
            self.translated = numbering.rebind(translated);
        }
    }

    fn scene_index(&self, number: usize) -> Result<usize, SubtitleError> {
        if !self.is_batched() {
            return Err(SubtitleError::NotBatched);
        }
        self.scenes
            .iter()
            .position(|scene| scene.number == number)
            .ok_or(SubtitleError::SceneNotFound(number))
    }

    fn batch_mut(&mut self, key: BatchKey) -> Result<&mut SubtitleBatch, SubtitleError> {
        let index = self.scene_index(key.scene)?;
        self.scenes[index].batch_mut(key.batch).ok_or(SubtitleError::BatchNotFound {
            scene: key.scene,
            batch: key.batch,
        })
    }
}

/// Old-to-new line numbers gathered while renumbering the originals
#[derive(Debug, Default)]
struct Renumbering {
    by_key: HashMap<LineKey, usize>,
    by_old_number: HashMap<usize, usize>,
    // Intervals carried by more than one original; their key alone is ambiguous
    shared_keys: HashSet<LineKey>,
}

impl Renumbering {
    fn record(&mut self, line: &mut SubtitleLine, number: usize) {
        if let Some(old) = line.number {
            self.by_old_number.entry(old).or_insert(number);
        }
        let key = line.key();
        if self.by_key.contains_key(&key) {
            self.shared_keys.insert(key);
        } else {
            self.by_key.insert(key, number);
        }
        line.number = Some(number);
    }

    fn resolve(&self, line: &SubtitleLine) -> Option<usize> {
        let key = line.key();
        let by_old = || line.number.and_then(|old| self.by_old_number.get(&old)).copied();
        if self.shared_keys.contains(&key) {
            by_old().or_else(|| self.by_key.get(&key).copied())
        } else {
            self.by_key.get(&key).copied().or_else(by_old)
        }
    }

    /// Give each translated line the new number of its original, dropping lines that resolve to none
    fn rebind(&self, translated: Vec<SubtitleLine>) -> Vec<SubtitleLine> {
        let mut rebound: Vec<SubtitleLine> = translated
            .into_iter()
            .filter_map(|mut line| match self.resolve(&line) {
                Some(number) => {
                    line.number = Some(number);
                    Some(line)
                }
                None => {
                    warn!("Dropping translation at {} with no matching original line", line.key());
                    None
                }
            })
            .collect();
        rebound.sort_by_key(|line| line.number);
        rebound
    }
}

// @struct: Thread-safe subtitle aggregate
#[derive(Debug, Default)]
pub struct SubtitleFile {
    data: RwLock<SubtitleData>,
}

impl SubtitleFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an aggregate from previously saved state
    pub fn from_data(mut data: SubtitleData) -> Self {
        data.flatten();
        data.renumber();
        Self {
            data: RwLock::new(data),
        }
    }

    /// Replace the originals, discarding the tree and any translations
    pub fn load(&self, mut lines: Vec<SubtitleLine>) {
        lines.sort_by_key(|line| line.start);

        let mut data = self.data.write();
        data.originals = lines;
        data.translated.clear();
        data.scenes.clear();
        data.renumber();

        debug!("Loaded {} subtitle lines", data.originals.len());
    }

    /// Load originals from an SRT file
    pub fn load_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let lines = subtitle_processor::load_srt_file(path)?;
        self.load(lines);
        self.data.write().source_path = Some(path.to_path_buf());
        info!("Loaded subtitles from {}", path.display());
        Ok(())
    }

    /// Group the originals into scenes and batches
    pub fn auto_batch(&self, thresholds: &BatchThresholds) -> Result<(), SubtitleError> {
        let mut data = self.data.write();
        let scenes = SubtitleBatcher::new(*thresholds).batch_subtitles(&data.originals)?;
        data.set_scenes(scenes);

        info!(
            "Split {} lines into {} scenes",
            data.originals.len(),
            data.scenes.len()
        );
        Ok(())
    }

    /// Fold a contiguous run of scenes into the first of them
    pub fn merge_scenes(&self, numbers: &[usize]) -> Result<(), SubtitleError> {
        let mut data = self.data.write();

        if !data.is_batched() {
            return Err(SubtitleError::NotBatched);
        }

        let numbers = ensure_sequential(numbers)?;
        let indices = numbers
            .iter()
            .map(|&number| data.scene_index(number))
            .collect::<Result<Vec<usize>, SubtitleError>>()?;

        let first = indices[0];
        let last = indices[indices.len() - 1];
        if last - first + 1 != indices.len() {
            return Err(SubtitleError::NonSequentialSelection(numbers));
        }

        let merged: Vec<SubtitleScene> = data.scenes.drain(first + 1..=last).collect();
        data.scenes[first].absorb_scenes(merged);
        data.renumber();

        debug!("Merged scenes {:?}", numbers);
        Ok(())
    }

    /// Fold a contiguous run of batches of one scene into the first of them
    pub fn merge_batches(&self, scene_number: usize, numbers: &[usize]) -> Result<(), SubtitleError> {
        let mut data = self.data.write();

        let index = data.scene_index(scene_number)?;
        data.scenes[index].merge_batches(numbers)?;
        data.renumber();

        debug!("Merged batches {:?} of scene {}", numbers, scene_number);
        Ok(())
    }

    pub fn renumber(&self) {
        self.data.write().renumber();
    }

    /// Install the bound lines of a match into the batch and the flat lists.
    ///
    /// Lines are bound by key, so a result computed before a renumber still lands
    /// on the right originals. Returns the number of lines installed.
    pub fn absorb_translation(&self, key: BatchKey, result: &MatchResult) -> Result<usize, SubtitleError> {
        let mut data = self.data.write();

        let bound: Vec<SubtitleLine> = result.bound().cloned().collect();
        let installed = data.batch_mut(key)?.install_translations(&bound);
        data.flatten();

        debug!("Absorbed {} translations into {}", installed, key);
        Ok(installed)
    }

    /// Reconcile the stored context with newly supplied options
    pub fn update_context(&self, options: &mut ProjectContext) {
        self.data.write().context.update_from(options);
    }

    pub fn context(&self) -> ProjectContext {
        self.data.read().context.clone()
    }

    pub fn line_count(&self) -> usize {
        self.data.read().originals.len()
    }

    pub fn scene_count(&self) -> usize {
        self.data.read().scenes.len()
    }

    pub fn has_subtitles(&self) -> bool {
        !self.data.read().originals.is_empty()
    }

    pub fn has_translations(&self) -> bool {
        !self.data.read().translated.is_empty()
    }

    pub fn is_batched(&self) -> bool {
        self.data.read().is_batched()
    }

    pub fn scene(&self, number: usize) -> Result<SubtitleScene, SubtitleError> {
        let data = self.data.read();
        let index = data.scene_index(number)?;
        Ok(data.scenes[index].clone())
    }

    pub fn batch(&self, key: BatchKey) -> Result<SubtitleBatch, SubtitleError> {
        let scene = self.scene(key.scene)?;
        scene.batch(key.batch).cloned().ok_or(SubtitleError::BatchNotFound {
            scene: key.scene,
            batch: key.batch,
        })
    }

    /// Keys of every batch in tree order
    pub fn batch_keys(&self) -> Vec<BatchKey> {
        self.data
            .read()
            .scenes
            .iter()
            .flat_map(|scene| scene.batches.iter().map(SubtitleBatch::key))
            .collect()
    }

    /// Append a scene to the tree
    pub fn add_scene(&self, scene: SubtitleScene) {
        let mut data = self.data.write();
        data.scenes.push(scene);
        data.renumber();
    }

    pub fn originals(&self) -> Vec<SubtitleLine> {
        self.data.read().originals.clone()
    }

    pub fn translated(&self) -> Vec<SubtitleLine> {
        self.data.read().translated.clone()
    }

    pub fn source_path(&self) -> Option<PathBuf> {
        self.data.read().source_path.clone()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> SubtitleData {
        self.data.read().clone()
    }

    /// Write the originals as SRT
    pub fn save_originals<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let lines = self.originals();
        subtitle_processor::write_srt_file(path.as_ref(), &lines)?;
        info!("Saved {} original lines to {}", lines.len(), path.as_ref().display());
        Ok(())
    }

    /// Write the translations as SRT. Returns false without writing when there are none.
    pub fn save_translation<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let lines = self.translated();
        if lines.is_empty() {
            error!("No subtitles translated");
            return Ok(false);
        }

        subtitle_processor::write_srt_file(path.as_ref(), &lines)?;
        info!("Saved {} translated lines to {}", lines.len(), path.as_ref().display());
        Ok(true)
    }

    /// Serialize the project state to JSON
    pub fn save_project<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.data.read()).context("Failed to serialize project")?;
        FileManager::write_to_file(path, &json)?;
        debug!("Saved project to {}", path.display());
        Ok(())
    }

    /// Restore a project saved with `save_project`
    pub fn load_project<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = FileManager::read_to_string(path)?;
        let data: SubtitleData = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse project file: {}", path.display()))?;
        Ok(Self::from_data(data))
    }
}
