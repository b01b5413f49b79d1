use std::slice;

#[derive(Debug, Clone, PartialEq)]
pub struct TimedEntry {
    pub index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl TimedEntry {
    /// Whether `time` falls inside this entry's window once shifted by `offset`.
    /// The window is closed at the start and open at the end.
    pub fn contains(&self, time: f64, offset: f64) -> bool {
        time >= self.start_time + offset && time < self.end_time + offset
    }
}

/// Entries in the order they appeared in the source text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrySet(Vec<TimedEntry>);

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, TimedEntry> {
        self.0.iter()
    }

    /// First entry, in source order, whose shifted window contains `time`.
    pub fn active_at(&self, time: f64, offset: f64) -> Option<&TimedEntry> {
        self.0.iter().find(|entry| entry.contains(time, offset))
    }
}

impl From<Vec<TimedEntry>> for EntrySet {
    fn from(entries: Vec<TimedEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a TimedEntry;
    type IntoIter = slice::Iter<'a, TimedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
