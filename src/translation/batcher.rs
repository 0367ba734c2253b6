/*!
 * Scene and batch detection for subtitle lines.
 *
 * Lines are grouped by the pauses between them: a long pause starts a new
 * scene, a shorter one (or a full batch) starts a new batch within the scene.
 * Batches are the unit of submission to the translation service.
 */

use log::debug;

use crate::errors::SubtitleError;
use crate::project::{SubtitleBatch, SubtitleScene};
use crate::subtitle_processor::SubtitleLine;

/// Gap and size limits that drive batching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchThresholds {
    /// A gap longer than this (ms) closes the current scene
    pub scene_gap_ms: u64,

    /// A gap longer than this (ms) closes the current batch
    pub batch_gap_ms: u64,

    /// Trailing batches smaller than this are folded into their predecessor
    pub min_batch_size: usize,

    /// A batch is closed once it holds this many lines
    pub max_batch_size: usize,
}

impl Default for BatchThresholds {
    fn default() -> Self {
        Self {
            scene_gap_ms: 30_000,
            batch_gap_ms: 7_000,
            min_batch_size: 7,
            max_batch_size: 20,
        }
    }
}

impl BatchThresholds {
    /// Reject zero thresholds and inverted size limits
    pub fn validate(&self) -> Result<(), SubtitleError> {
        if self.scene_gap_ms == 0 || self.batch_gap_ms == 0 {
            return Err(SubtitleError::InvalidInput("Gap thresholds must be positive".to_string()));
        }
        if self.min_batch_size == 0 || self.max_batch_size == 0 {
            return Err(SubtitleError::InvalidInput("Batch sizes must be positive".to_string()));
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(SubtitleError::InvalidInput(format!(
                "min_batch_size {} exceeds max_batch_size {}",
                self.min_batch_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}

/// Groups chronologically ordered lines into scenes of batches.
pub struct SubtitleBatcher {
    thresholds: BatchThresholds,
}

impl SubtitleBatcher {
    pub fn new(thresholds: BatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn with_defaults() -> Self {
        Self::new(BatchThresholds::default())
    }

    /// Partition `lines` into numbered scenes and batches.
    ///
    /// Lines must be non-empty and sorted by start time.
    pub fn batch_subtitles(&self, lines: &[SubtitleLine]) -> Result<Vec<SubtitleScene>, SubtitleError> {
        self.thresholds.validate()?;

        if lines.is_empty() {
            return Err(SubtitleError::InvalidInput("No subtitle lines to batch".to_string()));
        }

        if let Some(pos) = lines.windows(2).position(|pair| pair[1].start < pair[0].start) {
            return Err(SubtitleError::InvalidInput(format!(
                "Lines are not sorted by start time (line {} starts before line {})",
                pos + 2,
                pos + 1
            )));
        }

        let mut scenes: Vec<Vec<Vec<SubtitleLine>>> = Vec::new();
        let mut batches: Vec<Vec<SubtitleLine>> = Vec::new();
        let mut current: Vec<SubtitleLine> = Vec::new();
        let mut previous: Option<&SubtitleLine> = None;

        for line in lines {
            if let Some(prev) = previous {
                let gap = line.start.gap_since(prev.end);

                if gap > self.thresholds.scene_gap_ms {
                    batches.push(std::mem::take(&mut current));
                    scenes.push(self.close_scene(std::mem::take(&mut batches)));
                } else if gap > self.thresholds.batch_gap_ms
                    || current.len() >= self.thresholds.max_batch_size
                {
                    batches.push(std::mem::take(&mut current));
                }
            }

            current.push(line.clone());
            previous = Some(line);
        }

        batches.push(current);
        scenes.push(self.close_scene(batches));

        let scenes: Vec<SubtitleScene> = scenes
            .into_iter()
            .enumerate()
            .map(|(scene_index, batches)| {
                let scene_number = scene_index + 1;
                let batches = batches
                    .into_iter()
                    .enumerate()
                    .map(|(batch_index, lines)| SubtitleBatch::new(scene_number, batch_index + 1, lines))
                    .collect();
                SubtitleScene::new(scene_number, batches)
            })
            .collect();

        debug!(
            "Batched {} lines into {} scenes and {} batches",
            lines.len(),
            scenes.len(),
            scenes.iter().map(|s| s.batches.len()).sum::<usize>()
        );

        Ok(scenes)
    }

    /// Fold an undersized trailing batch into its predecessor within the scene
    fn close_scene(&self, mut batches: Vec<Vec<SubtitleLine>>) -> Vec<Vec<SubtitleLine>> {
        batches.retain(|batch| !batch.is_empty());

        if batches.len() > 1 {
            let last_len = batches[batches.len() - 1].len();
            if last_len < self.thresholds.min_batch_size {
                if let Some(trailing) = batches.pop() {
                    if let Some(previous) = batches.last_mut() {
                        previous.extend(trailing);
                    }
                }
            }
        }

        batches
    }
}

/// Flatten scenes back into the ordered original lines
pub fn unbatch_scenes(scenes: &[SubtitleScene]) -> Vec<SubtitleLine> {
    scenes.iter().flat_map(|scene| scene.originals().cloned()).collect()
}
