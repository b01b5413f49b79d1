use crate::entry::{EntrySet, TimedEntry};
use crate::timestamp::parse_timestamp;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const TIMING_SEPARATOR: &str = " --> ";

static LINE_ENDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("valid regex"));
// Lines holding only spaces or tabs count as blank.
static BLOCK_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid regex"));

/// Lenient parser for SRT-style text. It also accepts WebVTT cue blocks and
/// anything else that follows the `start --> end` timing line convention.
/// Parsing never fails: blocks that cannot be understood are dropped.
#[derive(Debug, Default)]
pub struct Parser;
impl Parser {
    pub fn new() -> Self {
        Self {}
    }

    pub fn parse(&self, input: &str) -> EntrySet {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        let normalised = LINE_ENDING.replace_all(input, "\n");

        let mut entries = Vec::new();
        for (n, block) in BLOCK_BREAK.split(&normalised).enumerate() {
            match entry(block) {
                Some(entry) => entries.push(entry),
                None if block.trim().is_empty() => (),
                None => debug!("Dropping malformed block #{}: {:?}", n, block.trim()),
            }
        }
        EntrySet::from(entries)
    }
}

fn entry(block: &str) -> Option<TimedEntry> {
    let lines: Vec<&str> = block.trim().split('\n').collect();
    if lines.len() < 2 {
        return None;
    }

    let timing_at = lines.iter().position(|l| l.contains(TIMING_SEPARATOR))?;
    let (start_time, end_time) = timing(lines[timing_at])?;

    let index = timing_at
        .checked_sub(1)
        .and_then(|i| lines[i].trim().parse().ok())
        .unwrap_or(0);

    let text = lines[timing_at + 1..].join("\n").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(TimedEntry {
        index,
        start_time,
        end_time,
        text,
    })
}

fn timing(line: &str) -> Option<(f64, f64)> {
    let tokens: Vec<&str> = line.split(TIMING_SEPARATOR).collect();
    let [start, end] = tokens.as_slice() else {
        return None;
    };

    let start_time = parse_timestamp(start.trim());
    let end_time = parse_timestamp(end.trim());
    if start_time.is_nan() || end_time.is_nan() {
        return None;
    }
    Some((start_time, end_time))
}
