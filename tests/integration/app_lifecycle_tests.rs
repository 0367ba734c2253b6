/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use subtrans::app_config::Config;
use subtrans::app_controller::Controller;
use subtrans::file_utils::FileManager;
use subtrans::providers::ReplaySource;
use subtrans::subtitle_processor::load_srt_file;
use subtrans::{BatchKey, ProjectContext, SubtitleFile};

use crate::common;

/// Store a well-formed completion for every batch of `file` in `dir`
fn write_completions(file: &SubtitleFile, dir: &Path, skip: Option<BatchKey>) -> Result<()> {
    for key in file.batch_keys().into_iter().filter(|key| Some(*key) != skip) {
        let batch = file.batch(key)?;
        common::create_test_file(
            dir,
            &ReplaySource::file_name(key),
            &common::tagged_response(&batch.originals, "ES "),
        )?;
    }
    Ok(())
}

#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.translation.concurrent_requests = 0;

    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_batch_withNewSubtitle_shouldCreateProjectFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?.with_overrides(ProjectContext {
        movie_name: Some("Night Drive".to_string()),
        ..Default::default()
    });

    let file = controller.batch(&input)?;

    assert_eq!(file.batch_keys().len(), 3);
    let project_path = temp_dir.path().join("film.subtrans.json");
    assert!(project_path.exists());

    let stored = SubtitleFile::load_project(&project_path)?;
    assert_eq!(stored.context().movie_name.as_deref(), Some("Night Drive"));
    assert_eq!(stored.context().max_batch_size, Some(20));
    assert_eq!(stored.scene_count(), 3);
    Ok(())
}

#[test]
fn test_batch_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;

    assert!(controller.batch(&temp_dir.path().join("missing.srt")).is_err());
    Ok(())
}

#[test]
fn test_prompt_shouldListBatchLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;

    let prompt = controller.prompt(&input, BatchKey::new(2, 1))?;

    assert!(
        prompt
            .user
            .contains("<original number='3' start='00:02:00,000' end='00:02:01,500'>\nThe car is ready.\n</original>")
    );
    assert!(!prompt.user.contains("Good morning."));
    assert!(controller.prompt(&input, BatchKey::new(2, 9)).is_err());
    Ok(())
}

#[test]
fn test_absorb_withCompletionFile_shouldPersistTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;
    let file = controller.batch(&input)?;

    let key = BatchKey::new(3, 1);
    let completion = common::create_test_file(
        temp_dir.path(),
        "reply.txt",
        &common::tagged_response(&file.batch(key)?.originals, "ES "),
    )?;

    let installed = controller.absorb(&input, key, &completion)?;
    assert_eq!(installed, 2);

    let reopened = controller.open_project(&input)?;
    let translated = reopened.translated();
    assert_eq!(translated.len(), 2);
    assert_eq!(translated[0].number, Some(5));
    assert_eq!(translated[1].text, "ES Almost home.");
    Ok(())
}

#[test]
fn test_absorb_withUnrecognisedCompletion_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;
    controller.batch(&input)?;

    let completion = common::create_test_file(temp_dir.path(), "reply.txt", "Sorry, I can't do that.")?;

    assert!(controller.absorb(&input, BatchKey::new(1, 1), &completion).is_err());
    assert!(!controller.open_project(&input)?.has_translations());
    Ok(())
}

#[test]
fn test_translate_withStoredCompletions_shouldExportTranslatedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let completions = temp_dir.path().join("replies");
    FileManager::ensure_dir(&completions)?;

    let controller = Controller::with_config(Config::default())?;
    let file = controller.batch(&input)?;
    write_completions(&file, &completions, None)?;

    let summary = tokio_test::block_on(async { controller.translate(&input, &completions).await })?;

    assert!(summary.is_complete());
    assert_eq!(summary.translated_lines, 6);

    let output = temp_dir.path().join("film-translated.srt");
    let written = load_srt_file(&output)?;
    assert_eq!(written.len(), 6);
    assert_eq!(written[2].text, "ES The car is ready.");
    Ok(())
}

#[test]
fn test_translate_withMissingCompletion_shouldReportFailedBatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let completions = temp_dir.path().join("replies");
    FileManager::ensure_dir(&completions)?;

    let controller = Controller::with_config(Config::default())?;
    let file = controller.batch(&input)?;
    let missing = BatchKey::new(2, 1);
    write_completions(&file, &completions, Some(missing))?;

    let summary = tokio_test::block_on(async { controller.translate(&input, &completions).await })?;

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, missing);
    assert_eq!(summary.translated_lines, 4);

    let written = load_srt_file(temp_dir.path().join("film-translated.srt"))?;
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|line| line.text != "ES Let's go."));
    Ok(())
}

#[test]
fn test_mergeScenes_shouldPersistNewStructure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;
    controller.batch(&input)?;

    controller.merge_scenes(&input, &[2, 3])?;
    assert_eq!(controller.open_project(&input)?.scene_count(), 2);

    assert!(controller.merge_scenes(&input, &[1, 5]).is_err());
    assert_eq!(controller.open_project(&input)?.scene_count(), 2);

    controller.merge_batches(&input, 2, &[1])?;
    assert_eq!(controller.open_project(&input)?.scene(2)?.line_count(), 4);
    Ok(())
}

#[test]
fn test_export_withNothingTranslated_shouldNotWrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;
    controller.batch(&input)?;

    let exported = controller.export(&input, None)?;

    assert!(exported.is_none());
    assert!(!temp_dir.path().join("film-translated.srt").exists());
    Ok(())
}

#[test]
fn test_export_withExplicitOutput_shouldWriteThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let controller = Controller::with_config(Config::default())?;
    let file = controller.batch(&input)?;

    let key = BatchKey::new(1, 1);
    let completion = common::create_test_file(
        temp_dir.path(),
        "reply.txt",
        &common::tagged_response(&file.batch(key)?.originals, "ES "),
    )?;
    controller.absorb(&input, key, &completion)?;

    let output = temp_dir.path().join("out").join("film.es.srt");
    let exported = controller.export(&input, Some(output.clone()))?;

    assert_eq!(exported, Some(output.clone()));
    assert!(fs::read_to_string(&output)?.contains("ES Good morning."));
    Ok(())
}
