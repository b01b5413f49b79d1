use crate::entry::{EntrySet, TimedEntry};
use crate::parser::Parser;

use log::{info, warn};

/// Subtitle offset in seconds.
///
/// Kept as whole seconds plus a fractional remainder so that stepping by one
/// second and back again restores the exact previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    whole: i64,
    fraction: f64,
}

impl Offset {
    pub fn from_secs(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() >= i64::MAX as f64 {
            return None;
        }
        let whole = value.trunc();
        Some(Self {
            whole: whole as i64,
            fraction: value - whole,
        })
    }

    pub fn as_secs(&self) -> f64 {
        self.whole as f64 + self.fraction
    }

    fn step(&mut self, seconds: i64) {
        self.whole = self.whole.saturating_add(seconds);
    }
}

/// Selects the subtitle entry to show for a playback position.
#[derive(Debug, Default)]
pub struct SyncEngine {
    parser: Parser,
    entries: EntrySet,
    offset: Offset,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every loaded entry with the entries parsed from `text`.
    /// Returns the number of entries that were loaded.
    pub fn load_subtitles(&mut self, text: &str) -> usize {
        self.entries = self.parser.parse(text);
        info!("Loaded {} subtitle entries", self.entries.len());
        self.entries.len()
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    pub fn active_entry(&self, current_time: f64) -> Option<&TimedEntry> {
        self.entries.active_at(current_time, self.offset())
    }

    pub fn offset(&self) -> f64 {
        self.offset.as_secs()
    }

    /// Returns false, leaving the offset untouched, for non-finite values.
    pub fn set_offset(&mut self, value: f64) -> bool {
        match Offset::from_secs(value) {
            Some(offset) => {
                self.offset = offset;
                true
            }
            None => {
                warn!("Ignoring invalid subtitle offset {}", value);
                false
            }
        }
    }

    pub fn increase_offset(&mut self) {
        self.offset.step(1);
    }

    pub fn decrease_offset(&mut self) {
        self.offset.step(-1);
    }

    pub fn reset_offset(&mut self) {
        self.offset = Offset::default();
    }

    /// Shift the offset by `delta`, rounding the result to a tenth of a second.
    pub fn adjust_offset(&mut self, delta: f64) -> bool {
        let value = ((self.offset() + delta) * 10.0).round() / 10.0;
        self.set_offset(value)
    }
}
