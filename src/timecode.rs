/*!
 * Millisecond timecodes for subtitle lines.
 *
 * Timecodes are parsed leniently because they arrive both from SRT files and
 * from free-form model output, where "0:00:02" and "00:00:02,000" mean the same thing.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Offset from the start of the media, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timecode(pub u64);

impl Timecode {
    /// Create a timecode from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Create a timecode from whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000))
    }

    /// Milliseconds since the start
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Parse `H:MM:SS`, `H:MM:SS,mmm`, `H:MM:SS.mmm` or `MM:SS,mmm`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("Empty timecode"));
        }

        let (clock, fraction) = match text.find([',', '.']) {
            Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
            None => (text, None),
        };

        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(anyhow!("Invalid timecode format: {}", text));
        }

        let mut seconds_total: u64 = 0;
        for (i, part) in parts.iter().enumerate() {
            let value: u64 = part
                .parse()
                .with_context(|| format!("Invalid timecode component '{}' in {}", part, text))?;
            // Minutes and seconds must stay below 60 unless they lead the timecode
            if i > 0 && value >= 60 {
                return Err(anyhow!("Invalid time components in timecode: {}", text));
            }
            seconds_total = seconds_total
                .checked_mul(60)
                .and_then(|total| total.checked_add(value))
                .ok_or_else(|| anyhow!("Timecode out of range: {}", text))?;
        }

        let millis = match fraction {
            Some(f) if !f.is_empty() => {
                if f.len() > 3 || !f.chars().all(|c| c.is_ascii_digit()) {
                    return Err(anyhow!("Invalid milliseconds in timecode: {}", text));
                }
                // "5" after the separator means 500ms, as in "00:00:01.5"
                let padded = format!("{:0<3}", f);
                padded.parse::<u64>()?
            }
            Some(_) => return Err(anyhow!("Missing milliseconds in timecode: {}", text)),
            None => 0,
        };

        seconds_total
            .checked_mul(1_000)
            .and_then(|total| total.checked_add(millis))
            .map(Self)
            .ok_or_else(|| anyhow!("Timecode out of range: {}", text))
    }

    /// Format as an SRT timestamp (HH:MM:SS,mmm)
    pub fn format_srt(self) -> String {
        let ms = self.0;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Gap from `earlier` to `self`, zero when the two overlap
    pub fn gap_since(self, earlier: Timecode) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_srt())
    }
}

impl FromStr for Timecode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
