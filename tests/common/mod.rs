/*!
 * Common test utilities for the subtrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use subtrans::SubtitleLine;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Six lines in three scenes: two lines each, separated by pauses of over a minute
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:02,000
Good morning.

2
00:00:02,500 --> 00:00:04,000
Is anyone there?

3
00:02:00,000 --> 00:02:01,500
The car is ready.

4
00:02:02,000 --> 00:02:03,000
Let's go.

5
00:04:00,000 --> 00:04:02,000
Where are we?

6
00:04:02,500 --> 00:04:04,000
Almost home.
";

/// Creates the sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// A well-formed completion translating `lines` with a prefix
pub fn tagged_response(lines: &[SubtitleLine], prefix: &str) -> String {
    lines
        .iter()
        .map(|line| {
            format!(
                "<translation start='{}' end='{}'>\n{}{}\n</translation>\n",
                line.start, line.end, prefix, line.text
            )
        })
        .collect()
}

/// Lines of one second each starting at the given offsets (ms)
pub fn lines_at(starts: &[u64]) -> Vec<SubtitleLine> {
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| SubtitleLine::from_millis(i + 1, start, start + 1_000, format!("Line {}", i + 1)))
        .collect()
}
