/// Core pattern logic - placed notes and the hit test used to toggle them
/// Notes are kept in placement order; playback reads them by position
use serde::{Deserialize, Serialize};

pub mod playback;

/// A note placed on the grid: a pitch row, a start column and a length in
/// columns (always at least 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: i32,
    pub start: u32,
    pub length: u32,
}

impl Note {
    pub fn new(pitch: i32, start: u32, length: u32) -> Self {
        Self {
            pitch,
            start,
            length: length.max(1),
        }
    }

    /// A single-column note, as produced by resolving one pointer position.
    pub fn point(pitch: i32, start: u32) -> Self {
        Self::new(pitch, start, 1)
    }

    /// Last column covered by this note.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length.max(1) - 1)
    }

    pub fn covers(&self, column: u32) -> bool {
        column >= self.start && column - self.start < self.length.max(1)
    }
}

/// Does `probe` land on `stored`? Same pitch row, and the probe's start
/// column falls inside the stored note's span. The probe's length is ignored.
pub fn is_hit(stored: &Note, probe: &Note) -> bool {
    stored.pitch == probe.pitch && stored.covers(probe.start)
}

/// The notes of one pattern, in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    notes: Vec<Note>,
}

impl Pattern {
    pub fn new() -> Self {
        Self { notes: Vec::new() }
    }

    pub fn from_notes(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Appends without checking for overlaps or duplicates.
    pub fn add(&mut self, note: Note) {
        self.notes.push(note);
    }

    /// Index of the most recently placed note hit by `probe`.
    pub fn hit_test(&self, probe: &Note) -> Option<usize> {
        self.notes.iter().rposition(|n| is_hit(n, probe))
    }

    /// Removes the most recently placed note hit by `probe` and returns it.
    /// `None` means nothing matched and the pattern is unchanged.
    pub fn remove_matching(&mut self, probe: &Note) -> Option<Note> {
        let index = self.hit_test(probe)?;
        Some(self.notes.remove(index))
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    /// Notes that begin exactly at `column`.
    pub fn starting_at(&self, column: u32) -> impl Iterator<Item = &Note> + '_ {
        self.notes.iter().filter(move |n| n.start == column)
    }
}

impl<'a> IntoIterator for &'a Pattern {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_inside_span() {
        let stored = Note::new(5, 2, 4);
        for start in 2..=5 {
            assert!(is_hit(&stored, &Note::point(5, start)), "start {}", start);
        }
    }

    #[test]
    fn test_miss_outside_span_or_row() {
        let stored = Note::new(5, 2, 4);
        assert!(!is_hit(&stored, &Note::point(5, 6)));
        assert!(!is_hit(&stored, &Note::point(5, 1)));
        assert!(!is_hit(&stored, &Note::point(6, 3)));
    }

    #[test]
    fn test_probe_length_is_ignored() {
        let stored = Note::new(0, 4, 1);
        assert!(!is_hit(&stored, &Note::new(0, 2, 8)));
        assert!(is_hit(&stored, &Note::new(0, 4, 8)));
    }

    #[test]
    fn test_zero_length_is_normalised() {
        let note = Note::new(1, 3, 0);
        assert_eq!(note.length, 1);
        assert_eq!(note.end(), 3);
    }

    #[test]
    fn test_span_at_end_of_column_range() {
        let note = Note::new(0, u32::MAX, 2);
        assert_eq!(note.end(), u32::MAX);
        assert!(note.covers(u32::MAX));
        assert!(!note.covers(u32::MAX - 1));

        let pattern = Pattern::from_notes(vec![note]);
        assert_eq!(pattern.hit_test(&Note::point(0, u32::MAX)), Some(0));
        assert_eq!(pattern.hit_test(&Note::point(0, 0)), None);
    }

    #[test]
    fn test_remove_matching_takes_last_match() {
        let mut pattern = Pattern::new();
        pattern.add(Note::new(0, 0, 4));
        pattern.add(Note::new(1, 0, 4));
        pattern.add(Note::new(0, 2, 2));

        let removed = pattern.remove_matching(&Note::point(0, 2));
        assert_eq!(removed, Some(Note::new(0, 2, 2)));
        assert_eq!(pattern.all(), &[Note::new(0, 0, 4), Note::new(1, 0, 4)]);
    }

    #[test]
    fn test_remove_matching_not_found_is_noop() {
        let mut pattern = Pattern::from_notes(vec![Note::new(3, 0, 2)]);
        assert_eq!(pattern.remove_matching(&Note::point(3, 2)), None);
        assert_eq!(pattern.len(), 1);
    }

    #[test]
    fn test_add_keeps_duplicates() {
        let mut pattern = Pattern::new();
        pattern.add(Note::point(2, 2));
        pattern.add(Note::point(2, 2));
        assert_eq!(pattern.len(), 2);
    }

    #[test]
    fn test_starting_at() {
        let pattern = Pattern::from_notes(vec![
            Note::new(0, 0, 4),
            Note::new(3, 1, 1),
            Note::new(7, 0, 2),
        ]);
        let pitches: Vec<i32> = pattern.starting_at(0).map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![0, 7]);
    }
}
