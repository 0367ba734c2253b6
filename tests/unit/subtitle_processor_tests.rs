/*!
 * Tests for SRT parsing and writing
 */

use anyhow::Result;
use std::fs;
use subtrans::Timecode;
use subtrans::subtitle_processor::{load_srt_file, parse_srt_string, write_srt_file};

use crate::common;

#[test]
fn test_loadSrtFile_withSampleFile_shouldParseEveryLine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "film.srt")?;

    let lines = load_srt_file(&path)?;

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[2].start, Timecode::from_secs(120));
    assert_eq!(lines[2].end, Timecode(121_500));
    assert_eq!(lines[5].text, "Almost home.");
    assert_eq!(lines[5].number, Some(6));
    Ok(())
}

#[test]
fn test_parseSrtString_withBomAndCrlf_shouldParse() -> Result<()> {
    let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nFirst line\r\nsecond line\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nNext\r\n";

    let lines = parse_srt_string(content)?;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].text, "First line\nsecond line");
    assert_eq!(lines[0].newline_count(), 1);
    Ok(())
}

#[test]
fn test_parseSrtString_withMalformedBlocks_shouldSkipThem() -> Result<()> {
    let content = "1
00:00:01,000 --> 00:00:02,000
Kept

2
00:00:05,000 --> 00:00:03,000
End before start

3
00:00:06,000 --> 00:00:07,000
Also kept
";

    let lines = parse_srt_string(content)?;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].text, "Also kept");
    assert_eq!(lines[1].number, Some(2));
    Ok(())
}

#[test]
fn test_loadSrtFile_withWindows1252Bytes_shouldDecode() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("legacy.srt");
    fs::write(&path, b"1\n00:00:01,000 --> 00:00:02,000\nD\xe9j\xe0 vu\n")?;

    let lines = load_srt_file(&path)?;

    assert_eq!(lines[0].text, "Déjà vu");
    Ok(())
}

#[test]
fn test_writeSrtFile_shouldCreateParentsAndReadBack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(temp_dir.path(), "film.srt")?;
    let lines = load_srt_file(&source)?;

    let output = temp_dir.path().join("out").join("copy.srt");
    write_srt_file(&output, &lines)?;

    let written = fs::read_to_string(&output)?;
    assert!(written.starts_with("1\n00:00:01,000 --> 00:00:02,000\nGood morning.\n\n"));
    assert_eq!(load_srt_file(&output)?, lines);
    Ok(())
}

#[test]
fn test_loadSrtFile_withMissingFile_shouldFail() {
    assert!(load_srt_file("does/not/exist.srt").is_err());
}
