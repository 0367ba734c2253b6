/*!
 * Integration tests for the in-memory subtitle workflow
 */

use anyhow::Result;
use subtrans::project::context::parse_substitutions;
use subtrans::subtitle_processor::load_srt_file;
use subtrans::translation::batcher::BatchThresholds;
use subtrans::translation::prompts::TranslationPromptBuilder;
use subtrans::translation::translator::reconcile_completion;
use subtrans::{BatchKey, ProjectContext, ResponseParser, SubtitleFile, TranslationError, validate_translations};

use crate::common;

/// Load the sample file and batch it with the default thresholds
fn load_sample(dir: &std::path::Path) -> Result<SubtitleFile> {
    let path = common::create_test_subtitle(dir, "film.srt")?;
    let file = SubtitleFile::new();
    file.load_srt(&path)?;
    file.auto_batch(&BatchThresholds::default())?;
    Ok(file)
}

#[test]
fn test_workflow_batchPromptAbsorbExport_shouldWriteTranslatedSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let parser = ResponseParser::new();

    for key in file.batch_keys() {
        let batch = file.batch(key)?;
        let prompt = TranslationPromptBuilder::new(&file.context())
            .with_lines(&batch.originals)
            .build();
        assert!(prompt.user.contains(&batch.originals[0].text));

        let completion = common::tagged_response(&batch.originals, "FR ");
        let result = reconcile_completion(&parser, &completion, &batch.originals)?;
        validate_translations(&result.translated, &file.context().validation_limits())?;
        file.absorb_translation(key, &result)?;
    }

    let output = temp_dir.path().join("film-fr.srt");
    assert!(file.save_translation(&output)?);

    let written = load_srt_file(&output)?;
    assert_eq!(written.len(), 6);
    assert_eq!(written[4].text, "FR Where are we?");
    assert_eq!(written[4].start, file.originals()[4].start);
    Ok(())
}

#[test]
fn test_workflow_withPartialCompletion_shouldExportOnlyTranslatedLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let key = BatchKey::new(2, 1);
    let batch = file.batch(key)?;

    let completion = common::tagged_response(&batch.originals[..1], "");
    let result = reconcile_completion(&ResponseParser::new(), &completion, &batch.originals)?;

    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].text, "Let's go.");
    file.absorb_translation(key, &result)?;

    let output = temp_dir.path().join("partial.srt");
    assert!(file.save_translation(&output)?);
    let written = load_srt_file(&output)?;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].text, "The car is ready.");
    Ok(())
}

#[test]
fn test_workflow_withMergedCompletionAcrossLines_shouldMarkFuzzyTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let key = BatchKey::new(1, 1);
    let batch = file.batch(key)?;

    let completion = "<translation start='00:00:00,500' end='00:00:05,000'>\nBonjour. Il y a quelqu'un ?\n</translation>";
    let result = reconcile_completion(&ResponseParser::new(), completion, &batch.originals)?;

    assert_eq!(result.fuzzy_count(), 2);
    assert!(result.is_complete());
    file.absorb_translation(key, &result)?;
    assert!(file.translated()[1].text.starts_with("#Fuzzy: Bonjour."));
    Ok(())
}

#[test]
fn test_workflow_withUnrelatedCompletion_shouldReportNoTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let batch = file.batch(BatchKey::new(3, 1))?;

    let result = reconcile_completion(&ResponseParser::new(), "I cannot help with that.", &batch.originals);

    assert!(matches!(result, Err(TranslationError::NoTranslation)));
    Ok(())
}

#[test]
fn test_workflow_mergeScenesAfterTranslation_shouldKeepExportIntact() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let parser = ResponseParser::new();

    for key in [BatchKey::new(2, 1), BatchKey::new(3, 1)] {
        let batch = file.batch(key)?;
        let completion = common::tagged_response(&batch.originals, "DE ");
        file.absorb_translation(key, &reconcile_completion(&parser, &completion, &batch.originals)?)?;
    }

    file.merge_scenes(&[1, 2, 3])?;
    file.merge_batches(1, &[1])?;

    assert_eq!(file.scene_count(), 1);
    assert_eq!(file.batch_keys(), vec![BatchKey::new(1, 1), BatchKey::new(1, 2), BatchKey::new(1, 3)]);

    let numbers: Vec<Option<usize>> = file.translated().iter().map(|line| line.number).collect();
    assert_eq!(numbers, vec![Some(3), Some(4), Some(5), Some(6)]);
    Ok(())
}

#[test]
fn test_workflow_promptWithContext_shouldSubstituteBeforeTranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = load_sample(temp_dir.path())?;
    let mut options = ProjectContext {
        movie_name: Some("Night Drive".to_string()),
        substitutions: Some(parse_substitutions("Let's::Let us")),
        ..Default::default()
    };
    file.update_context(&mut options);

    let batch = file.batch(BatchKey::new(2, 1))?;
    let prompt = TranslationPromptBuilder::new(&file.context())
        .with_lines(&batch.originals)
        .build();

    assert!(prompt.system.contains("Night Drive"));
    assert!(prompt.user.contains("Let us go."));
    assert!(!prompt.user.contains("Let's go."));
    Ok(())
}
