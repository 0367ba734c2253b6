use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::WINDOWS_1252;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::timecode::Timecode;

// @module: Subtitle lines and SRT input/output

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2}[,.]\d{1,3})\s*-->\s*(\d{1,2}:\d{2}:\d{2}[,.]\d{1,3})")
        .expect("Invalid SRT timestamp regex")
});

/// Identity of a line across original and translated representations.
///
/// Unlike the line number, the key survives renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub start: Timecode,
    pub end: Timecode,
}

impl LineKey {
    pub fn new(start: Timecode, end: Timecode) -> Self {
        Self { start, end }
    }

    /// Whether this interval fully contains `other`
    pub fn contains(&self, other: &LineKey) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.start, self.end)
    }
}

// @struct: Single subtitle line, original or translated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleLine {
    // @field: Sequence number, None for translations not yet bound to an original
    pub number: Option<usize>,

    pub start: Timecode,

    pub end: Timecode,

    pub text: String,

    // @field: Translation bound to an original line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl SubtitleLine {
    /// Create a numbered line
    pub fn new(number: usize, start: Timecode, end: Timecode, text: impl Into<String>) -> Self {
        Self {
            number: Some(number),
            start,
            end,
            text: text.into(),
            translation: None,
        }
    }

    /// Create a line that is not bound to any number yet
    pub fn unnumbered(start: Timecode, end: Timecode, text: impl Into<String>) -> Self {
        Self {
            number: None,
            start,
            end,
            text: text.into(),
            translation: None,
        }
    }

    /// Create a numbered line from millisecond offsets - used by tests and loaders
    pub fn from_millis(number: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self::new(number, Timecode(start_ms), Timecode(end_ms), text)
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.start, self.end)
    }

    pub fn is_bound(&self) -> bool {
        self.number.is_some()
    }

    pub fn newline_count(&self) -> usize {
        self.text.matches('\n').count()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for SubtitleLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.number.unwrap_or(0))?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Parse SRT format string into subtitle lines.
///
/// Blocks are sorted by start time and renumbered from 1. Malformed blocks are
/// skipped with a warning; content with no usable block is an error.
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleLine>> {
    let mut lines = Vec::new();

    let mut current_number: Option<usize> = None;
    let mut current_times: Option<(Timecode, Timecode)> = None;
    let mut current_text = String::new();

    let mut finish_block = |number: Option<usize>, times: Option<(Timecode, Timecode)>, text: &str| {
        match (number, times) {
            (Some(number), Some((start, end))) if !text.trim().is_empty() => {
                if end < start {
                    warn!("Skipping subtitle {}: end {} precedes start {}", number, end, start);
                } else {
                    lines.push(SubtitleLine::new(number, start, end, text.trim()));
                }
            }
            (Some(number), Some(_)) => warn!("Skipping empty subtitle entry {}", number),
            _ => {}
        }
    };

    for (line_index, raw_line) in content.lines().enumerate() {
        let trimmed = raw_line.trim().trim_start_matches('\u{feff}');

        if trimmed.is_empty() {
            if current_times.is_some() && !current_text.is_empty() {
                finish_block(current_number.take(), current_times.take(), &current_text);
                current_text.clear();
            }
            continue;
        }

        if current_number.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_number = Some(num);
                continue;
            }
        }

        if current_number.is_some() && current_times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                match (Timecode::parse(&caps[1]), Timecode::parse(&caps[2])) {
                    (Ok(start), Ok(end)) => {
                        current_times = Some((start, end));
                        continue;
                    }
                    _ => warn!("Invalid timestamp at line {}: {}", line_index + 1, trimmed),
                }
            }
        }

        if current_number.is_some() && current_times.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_index + 1, trimmed);
        }
    }

    finish_block(current_number, current_times, &current_text);

    if lines.is_empty() {
        return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
    }

    lines.sort_by_key(|line| line.start);

    let overlaps = lines.windows(2).filter(|pair| pair[0].end > pair[1].start).count();
    if overlaps > 0 {
        warn!("Found {} overlapping subtitle entries", overlaps);
    }

    for (i, line) in lines.iter_mut().enumerate() {
        line.number = Some(i + 1);
    }

    debug!("Parsed {} subtitle lines", lines.len());
    Ok(lines)
}

/// Decode file bytes as UTF-8, falling back to Windows-1252 for legacy files
pub fn decode_subtitle_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("Subtitle file is not valid UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Load subtitle lines from an SRT file
pub fn load_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleLine>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    parse_srt_string(&decode_subtitle_bytes(&bytes))
        .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))
}

/// Render lines in SRT format
pub fn format_srt(lines: &[SubtitleLine]) -> String {
    lines.iter().map(|line| line.to_string()).collect()
}

/// Write subtitle lines to an SRT file, creating parent directories as needed
pub fn write_srt_file<P: AsRef<Path>>(path: P, lines: &[SubtitleLine]) -> Result<()> {
    crate::file_utils::FileManager::write_to_file(path, &format_srt(lines))
}
