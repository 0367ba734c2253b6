use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::project::{BatchKey, ProjectContext, SubtitleFile};
use crate::providers::ReplaySource;
use crate::translation::parser::ResponseParser;
use crate::translation::prompts::{TranslationPrompt, TranslationPromptBuilder};
use crate::translation::translator::{SubtitleTranslator, TranslationSummary, reconcile_completion};
use crate::validation::validate_translations;

// @module: Application controller for subtitle projects

/// Runs the command-line operations against a subtitle project.
///
/// A project lives next to its subtitle file as `<stem>.subtrans.json`; each
/// operation opens it (or starts one from the SRT), acts, and saves it back.
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Context options supplied on the command line
    overrides: ProjectContext,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            overrides: ProjectContext::default(),
        })
    }

    /// Context options that override the stored project context
    pub fn with_overrides(mut self, overrides: ProjectContext) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the project for a subtitle file, starting a new one from the SRT if none exists
    pub fn open_project(&self, input_file: &Path) -> Result<SubtitleFile> {
        let project_path = FileManager::generate_project_path(input_file);

        let file = if FileManager::file_exists(&project_path) {
            debug!("Opening project {}", project_path.display());
            SubtitleFile::load_project(&project_path)?
        } else {
            if !FileManager::file_exists(input_file) {
                return Err(anyhow!("Input file does not exist: {}", input_file.display()));
            }
            let file = SubtitleFile::new();
            file.load_srt(input_file)?;
            file.update_context(&mut self.config.context.clone());
            file
        };

        let mut overrides = self.overrides.clone();
        file.update_context(&mut overrides);
        Ok(file)
    }

    pub fn save_project(&self, file: &SubtitleFile, input_file: &Path) -> Result<PathBuf> {
        let project_path = FileManager::generate_project_path(input_file);
        file.save_project(&project_path)?;
        Ok(project_path)
    }

    /// Open the project and batch it if that has not been done yet
    fn open_batched(&self, input_file: &Path) -> Result<SubtitleFile> {
        let file = self.open_project(input_file)?;
        if !file.is_batched() {
            file.auto_batch(&file.context().batch_thresholds())?;
        }
        Ok(file)
    }

    /// Split the subtitles into scenes and batches, replacing any existing grouping
    pub fn batch(&self, input_file: &Path) -> Result<SubtitleFile> {
        let file = self.open_project(input_file)?;
        file.auto_batch(&file.context().batch_thresholds())?;
        self.save_project(&file, input_file)?;

        for key in file.batch_keys() {
            let batch = file.batch(key)?;
            debug!("{}: {} lines", key, batch.size());
        }
        info!(
            "{} lines in {} scenes and {} batches",
            file.line_count(),
            file.scene_count(),
            file.batch_keys().len()
        );
        Ok(file)
    }

    /// Render the prompt for one batch
    pub fn prompt(&self, input_file: &Path, key: BatchKey) -> Result<TranslationPrompt> {
        let file = self.open_batched(input_file)?;
        let batch = file.batch(key)?;
        self.save_project(&file, input_file)?;

        Ok(TranslationPromptBuilder::new(&file.context())
            .with_lines(&batch.originals)
            .build())
    }

    /// Install a completion stored in a file into one batch.
    ///
    /// Returns the number of lines installed.
    pub fn absorb(&self, input_file: &Path, key: BatchKey, completion_file: &Path) -> Result<usize> {
        let file = self.open_batched(input_file)?;
        let batch = file.batch(key)?;
        let text = FileManager::read_to_string(completion_file)?;

        let result = reconcile_completion(&ResponseParser::new(), &text, &batch.originals)?;

        if let Err(errors) = validate_translations(&result.translated, &file.context().validation_limits()) {
            if errors.only_limit_violations() && !self.config.translation.stop_on_error {
                warn!("Accepting translation for {} despite limits: {}", key, errors);
            } else {
                return Err(TranslationError::from(errors).into());
            }
        }

        let installed = file.absorb_translation(key, &result)?;
        if !result.unmatched.is_empty() {
            warn!("{} lines of {} were not translated", result.unmatched.len(), key);
        }
        self.save_project(&file, input_file)?;

        info!("Installed {} translated lines into {}", installed, key);
        Ok(installed)
    }

    /// Translate every batch from completions stored in `completions_dir`, then export
    pub async fn translate(&self, input_file: &Path, completions_dir: &Path) -> Result<TranslationSummary> {
        let start_time = std::time::Instant::now();

        let file = self.open_batched(input_file)?;
        let source = Arc::new(ReplaySource::new(completions_dir));
        let translator = SubtitleTranslator::new(source, self.config.translation.clone());

        let progress_bar = ProgressBar::new(file.batch_keys().len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let outcome = translator
            .translate_all(&file, move |completed, _total| pb.set_position(completed as u64))
            .await;
        progress_bar.finish_and_clear();

        // Keep whatever was installed, even when the run stopped early
        self.save_project(&file, input_file)?;
        let summary = outcome?;

        for (key, message) in &summary.failed {
            warn!("{} failed: {}", key, message);
        }

        self.export_file(&file, input_file, None)?;
        info!("Translation finished in {:?}", start_time.elapsed());
        Ok(summary)
    }

    /// Merge a contiguous run of scenes
    pub fn merge_scenes(&self, input_file: &Path, numbers: &[usize]) -> Result<()> {
        let file = self.open_batched(input_file)?;
        file.merge_scenes(numbers)?;
        self.save_project(&file, input_file)?;
        info!("Merged scenes {:?}, {} scenes remain", numbers, file.scene_count());
        Ok(())
    }

    /// Merge a contiguous run of batches within a scene
    pub fn merge_batches(&self, input_file: &Path, scene: usize, numbers: &[usize]) -> Result<()> {
        let file = self.open_batched(input_file)?;
        file.merge_batches(scene, numbers)?;
        self.save_project(&file, input_file)?;
        info!("Merged batches {:?} of scene {}", numbers, scene);
        Ok(())
    }

    /// Write the translated subtitles, next to the input unless `output` is given
    pub fn export(&self, input_file: &Path, output: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let file = self.open_project(input_file)?;
        self.export_file(&file, input_file, output)
    }

    fn export_file(&self, file: &SubtitleFile, input_file: &Path, output: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let output_path = output.unwrap_or_else(|| FileManager::generate_output_path(input_file, "translated"));
        if file.save_translation(&output_path)? {
            info!("Success: {}", output_path.display());
            Ok(Some(output_path))
        } else {
            Ok(None)
        }
    }
}
