/// Pixel <-> grid conversion for the editing surface
use crate::sequencer::Note;

/// Resolves pointer positions into notes and owns the surface size.
/// Implementations clamp to their bounds, so every position resolves.
pub trait NoteGeometry {
    /// A single-column note under the pointer.
    fn create_note(&self, x: f32, y: f32) -> Note;

    /// A note on `pitch` running from `anchor_start` to the column under
    /// `current_x`. Never shorter than one column.
    fn create_note_with_length(&self, pitch: i32, anchor_start: u32, current_x: f32) -> Note;

    fn pattern_length(&self) -> u32;

    /// Future resolution and the surface width follow the new length.
    fn set_pattern_length(&mut self, length: u32);

    /// Width and height of the drawing surface in pixels.
    fn surface_size(&self) -> (f32, f32);
}

/// Uniform grid: fixed column width and row height, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    column_width: f32,
    row_height: f32,
    rows: u32,
    pattern_length: u32,
}

impl GridGeometry {
    pub fn new(column_width: f32, row_height: f32, rows: u32, pattern_length: u32) -> Self {
        Self {
            column_width: column_width.max(1.0),
            row_height: row_height.max(1.0),
            rows: rows.max(1),
            pattern_length: pattern_length.max(1),
        }
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn column_at(&self, x: f32) -> u32 {
        let column = (x / self.column_width).floor();
        if column.is_nan() || column < 0.0 {
            0
        } else {
            (column as u32).min(self.pattern_length)
        }
    }

    pub fn row_at(&self, y: f32) -> i32 {
        let row = (y / self.row_height).floor();
        if row.is_nan() || row < 0.0 {
            0
        } else {
            (row as i32).min(self.rows as i32 - 1)
        }
    }

    /// Pixel rectangle of a note as `(x, y, width, height)`.
    pub fn note_rect(&self, note: &Note) -> (f32, f32, f32, f32) {
        (
            note.start as f32 * self.column_width,
            note.pitch as f32 * self.row_height,
            note.length as f32 * self.column_width,
            self.row_height,
        )
    }
}

impl NoteGeometry for GridGeometry {
    fn create_note(&self, x: f32, y: f32) -> Note {
        let start = self.column_at(x).min(self.pattern_length - 1);
        Note::point(self.row_at(y), start)
    }

    fn create_note_with_length(&self, pitch: i32, anchor_start: u32, current_x: f32) -> Note {
        let end = self.column_at(current_x);
        Note::new(pitch, anchor_start, end.saturating_sub(anchor_start))
    }

    fn pattern_length(&self) -> u32 {
        self.pattern_length
    }

    fn set_pattern_length(&mut self, length: u32) {
        self.pattern_length = length.max(1);
    }

    fn surface_size(&self) -> (f32, f32) {
        (
            self.pattern_length as f32 * self.column_width,
            self.rows as f32 * self.row_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridGeometry {
        GridGeometry::new(32.0, 32.0, 12, 32)
    }

    #[test]
    fn test_create_note() {
        let geometry = grid();
        assert_eq!(geometry.create_note(0.0, 0.0), Note::point(0, 0));
        assert_eq!(geometry.create_note(70.0, 100.0), Note::point(3, 2));
    }

    #[test]
    fn test_create_note_clamps() {
        let geometry = grid();
        assert_eq!(geometry.create_note(-10.0, -5.0), Note::point(0, 0));
        assert_eq!(geometry.create_note(5000.0, 5000.0), Note::point(11, 31));
    }

    #[test]
    fn test_length_follows_pointer() {
        let geometry = grid();
        assert_eq!(geometry.create_note_with_length(0, 0, 96.0), Note::new(0, 0, 3));
        assert_eq!(geometry.create_note_with_length(4, 1, 40.0), Note::new(4, 1, 1));
        // dragging left of the anchor still yields one column
        assert_eq!(geometry.create_note_with_length(4, 5, 0.0), Note::new(4, 5, 1));
    }

    #[test]
    fn test_resize_changes_surface() {
        let mut geometry = grid();
        assert_eq!(geometry.surface_size(), (1024.0, 384.0));
        geometry.set_pattern_length(8);
        assert_eq!(geometry.pattern_length(), 8);
        assert_eq!(geometry.surface_size(), (256.0, 384.0));
        assert_eq!(geometry.create_note(1000.0, 0.0), Note::point(0, 7));
    }

    #[test]
    fn test_note_rect() {
        let geometry = GridGeometry::new(32.0, 16.0, 12, 32);
        assert_eq!(geometry.note_rect(&Note::new(2, 1, 3)), (32.0, 32.0, 96.0, 16.0));
    }
}
