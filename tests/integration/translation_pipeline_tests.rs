/*!
 * Integration tests for the translation driver against scripted completion sources
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use subtrans::providers::{CompletionRequest, MockBehavior, MockSource};
use subtrans::subtitle_processor::parse_srt_string;
use subtrans::translation::batcher::BatchThresholds;
use subtrans::translation::matcher::FUZZY_MARKER;
use subtrans::translation::translator::TranslatorOptions;
use subtrans::{SubtitleError, SubtitleFile, SubtitleTranslator, TranslationError};

use crate::common;

/// The sample file in three batches of two lines
fn batched_sample() -> SubtitleFile {
    let file = SubtitleFile::new();
    file.load(parse_srt_string(common::SAMPLE_SRT).unwrap());
    file.auto_batch(&BatchThresholds::default()).unwrap();
    file
}

fn translator(source: MockSource, options: TranslatorOptions) -> SubtitleTranslator {
    SubtitleTranslator::new(Arc::new(source), options)
}

fn sequential() -> TranslatorOptions {
    TranslatorOptions {
        concurrent_requests: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_translateAll_withMergedBlocks_shouldFuzzyMatchEveryLine() {
    let file = batched_sample();

    let summary = translator(MockSource::merged(), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.translated_lines, 6);
    assert_eq!(summary.fuzzy_warnings.len(), 6);
    assert!(summary.is_complete());

    let translated = file.translated();
    assert!(translated.iter().all(|line| line.text.starts_with(FUZZY_MARKER)));
    assert_eq!(translated[0].text, translated[1].text);
    assert_eq!(translated[0].text, "#Fuzzy: [TRANSLATED] Good morning. Is anyone there?");
}

#[tokio::test]
async fn test_translateAll_withNumberedList_shouldBindByLineNumber() {
    let file = batched_sample();

    let summary = translator(MockSource::numbered(), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.translated_lines, 6);
    assert!(summary.fuzzy_warnings.is_empty());

    let translated = file.translated();
    assert_eq!(translated[3].number, Some(4));
    assert_eq!(translated[3].text, "[TRANSLATED] Let's go.");
    assert_eq!(translated[3].start, file.originals()[3].start);
}

#[tokio::test]
async fn test_translateAll_withIntermittentFailures_shouldRetry() {
    let file = batched_sample();
    let source = MockSource::intermittent(2);

    let summary = translator(source.clone(), sequential())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.translated_batches, 3);
    assert_eq!(summary.retries, 2);
    assert_eq!(source.request_count(), 5);
    assert!(summary.is_complete());
}

fn stray_then_clean(request: &CompletionRequest) -> String {
    let mut response = MockSource::generate_tagged_response(&request.lines);
    if !request.prompt.user.contains("could not be matched") {
        response.push_str("<translation start='09:00:00,000' end='09:00:01,000'>Stray</translation>\n");
    }
    response
}

#[tokio::test]
async fn test_translateBatch_withUnmatchedCandidate_shouldRetryWithProblemsInPrompt() {
    let file = batched_sample();
    let source = MockSource::working().with_custom_response(stray_then_clean);

    let summary = translator(source.clone(), sequential())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(source.request_count(), 6);
    assert_eq!(summary.retries, 3);
    assert_eq!(summary.translated_lines, 6);
    assert!(file.translated().iter().all(|line| line.text != "Stray"));
}

#[tokio::test]
async fn test_translateAll_withOverlongLines_shouldAcceptWithWarning() {
    let file = batched_sample();

    let summary = translator(MockSource::new(MockBehavior::TooLong { length: 200 }), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.translated_lines, 6);
    assert_eq!(summary.limit_warnings.len(), 3);
    assert_eq!(summary.retries, 0);
}

#[tokio::test]
async fn test_translateAll_withOverlongLinesAndStopOnError_shouldFail() {
    let file = batched_sample();
    let options = TranslatorOptions {
        stop_on_error: true,
        ..sequential()
    };

    let result = translator(MockSource::new(MockBehavior::TooLong { length: 200 }), options)
        .translate_all(&file, |_, _| {})
        .await;

    assert!(matches!(result, Err(TranslationError::Validation(_))));
    assert!(!file.has_translations());
}

#[tokio::test]
async fn test_translateAll_withFailingSource_shouldCollectFailures() {
    let file = batched_sample();
    let source = MockSource::failing();

    let summary = translator(source.clone(), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.failed.len(), 3);
    assert_eq!(summary.translated_lines, 0);
    assert_eq!(source.request_count(), 9);
    assert!(!summary.is_complete());
    assert!(summary.failed[0].1.contains("Simulated provider failure"));
}

#[tokio::test]
async fn test_translateAll_withFailingSourceAndStopOnError_shouldReturnError() {
    let file = batched_sample();
    let options = TranslatorOptions {
        stop_on_error: true,
        ..Default::default()
    };

    let result = translator(MockSource::failing(), options)
        .translate_all(&file, |_, _| {})
        .await;

    assert!(matches!(result, Err(TranslationError::Provider(_))));
}

#[tokio::test]
async fn test_translateAll_withEmptyCompletions_shouldReportEmptyResponse() {
    let file = batched_sample();

    let summary = translator(MockSource::empty(), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.failed.len(), 3);
    assert!(summary.failed.iter().all(|(_, message)| message == "No translated text provided"));
}

#[tokio::test]
async fn test_translateAll_withConcurrentSlowSource_shouldReportProgressAndKeepNumbering() {
    let file = batched_sample();
    let calls = AtomicUsize::new(0);
    let options = TranslatorOptions {
        concurrent_requests: 3,
        ..Default::default()
    };

    let summary = translator(MockSource::new(MockBehavior::Slow { delay_ms: 20 }), options)
        .translate_all(&file, |completed, total| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert!(completed <= total);
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.translated_lines, 6);

    let numbers: Vec<Option<usize>> = file.translated().iter().map(|line| line.number).collect();
    assert_eq!(numbers, (1..=6).map(Some).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_translateAll_beforeBatching_shouldFail() {
    let file = SubtitleFile::new();
    file.load(parse_srt_string(common::SAMPLE_SRT).unwrap());

    let result = translator(MockSource::working(), TranslatorOptions::default())
        .translate_all(&file, |_, _| {})
        .await;

    assert!(matches!(result, Err(TranslationError::Subtitle(SubtitleError::NotBatched))));
}
