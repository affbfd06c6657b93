/// Pointer-driven note editing and the editor instance that ties the
/// pattern, the transport state and the three collaborators together
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::NotePlayer;
use crate::config::{EditorConfig, DEFAULT_PREVIEW_MS, DEFAULT_TRANSPOSE};
use crate::sequencer::playback::{Clocked, Playback};
use crate::sequencer::{Note, Pattern};

pub mod canvas;
pub mod geometry;

use canvas::{NoteCanvas, NoteStyle};
use geometry::{GridGeometry, NoteGeometry};

/// Where a drag began. The pitch stays pinned for the whole gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragAnchor {
    pub start: u32,
    pub pitch: i32,
}

/// Pointer state. Only the pointer handlers on [`PianoRoll`] change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditState {
    hover: Option<Note>,
    dragging: bool,
    anchor: Option<DragAnchor>,
    last_sounded_pitch: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    Hovering(Note),
    Dragging { anchor: DragAnchor, current: Note },
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hover_note(&self) -> Option<Note> {
        self.hover
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn anchor(&self) -> Option<DragAnchor> {
        self.anchor
    }

    pub fn last_sounded_pitch(&self) -> Option<i32> {
        self.last_sounded_pitch
    }

    pub fn phase(&self) -> EditPhase {
        match (self.dragging, self.anchor, self.hover) {
            (true, Some(anchor), hover) => EditPhase::Dragging {
                anchor,
                current: hover.unwrap_or_else(|| Note::point(anchor.pitch, anchor.start)),
            },
            (_, _, Some(note)) => EditPhase::Hovering(note),
            _ => EditPhase::Idle,
        }
    }

    fn begin_drag(&mut self, anchor: DragAnchor) {
        self.anchor = Some(anchor);
        self.last_sounded_pitch = Some(anchor.pitch);
        self.dragging = true;
    }

    fn end_drag(&mut self) {
        self.dragging = false;
    }
}

/// What a pointer-up did to the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added(Note),
    Removed(Note),
}

/// The editor instance hosts share between the GUI and the clock thread.
pub type SharedPianoRoll = Arc<Mutex<PianoRoll>>;

/// One pattern of notes, its edit state and its playback state. Every
/// mutation ends in a redraw on the canvas.
pub struct PianoRoll {
    pattern: Pattern,
    edit: EditState,
    playback: Playback,
    geometry: Box<dyn NoteGeometry + Send>,
    canvas: Box<dyn NoteCanvas + Send>,
    player: Box<dyn NotePlayer + Send>,
    transpose: i32,
    preview_ms: f64,
}

impl PianoRoll {
    pub fn new(
        geometry: impl NoteGeometry + Send + 'static,
        canvas: impl NoteCanvas + Send + 'static,
        player: impl NotePlayer + Send + 'static,
    ) -> Self {
        let mut roll = Self {
            pattern: Pattern::new(),
            edit: EditState::new(),
            playback: Playback::default(),
            geometry: Box::new(geometry),
            canvas: Box::new(canvas),
            player: Box::new(player),
            transpose: DEFAULT_TRANSPOSE,
            preview_ms: DEFAULT_PREVIEW_MS,
        };
        roll.draw();
        roll
    }

    /// Builds a [`GridGeometry`] editor from `config` and loads its notes.
    pub fn from_config(
        config: &EditorConfig,
        canvas: impl NoteCanvas + Send + 'static,
        player: impl NotePlayer + Send + 'static,
    ) -> Self {
        let geometry = GridGeometry::new(
            config.column_width,
            config.row_height,
            config.rows,
            config.pattern_length,
        );
        let mut roll = Self::new(geometry, canvas, player);
        roll.transpose = config.transpose;
        roll.preview_ms = config.preview_ms;
        roll.playback.set_bpm(config.bpm);
        roll.load_pattern(config.notes.clone());
        roll
    }

    pub fn into_shared(self) -> SharedPianoRoll {
        Arc::new(Mutex::new(self))
    }

    pub fn notes(&self) -> &[Note] {
        self.pattern.all()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn geometry(&self) -> &dyn NoteGeometry {
        self.geometry.as_ref()
    }

    pub fn pattern_length(&self) -> u32 {
        self.geometry.pattern_length()
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    /// Replaces the whole pattern, drops any hover or drag in progress and
    /// redraws.
    pub fn load_pattern(&mut self, notes: Vec<Note>) {
        let notes = notes
            .into_iter()
            .map(|n| Note::new(n.pitch, n.start, n.length))
            .collect();
        self.pattern = Pattern::from_notes(notes);
        self.edit = EditState::new();
        log::debug!("Loaded pattern with {} notes", self.pattern.len());
        self.draw();
    }

    /// Changes the loop length. The geometry resizes its surface, the
    /// playhead returns to column 0 and the view redraws. Notes past the new
    /// end stay in the pattern but never play.
    pub fn resize(&mut self, length: u32) {
        let length = length.max(1);
        self.geometry.set_pattern_length(length);
        self.playback.reset_position();
        log::info!("Pattern length set to {}", length);
        self.draw();
    }

    pub fn play(&mut self) {
        self.playback.play();
        log::info!("Playback started at {} bpm", self.playback.bpm());
    }

    pub fn stop(&mut self) {
        self.playback.stop();
        log::info!("Playback stopped at {:?}", self.playback.position());
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn position(&self) -> Option<u32> {
        self.playback.position()
    }

    pub fn bpm(&self) -> f64 {
        self.playback.bpm()
    }

    /// Takes effect from the next tick.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.playback.set_bpm(bpm);
        log::info!("Tempo set to {} bpm", self.playback.bpm());
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let note = self.geometry.create_note(x, y);
        self.edit.begin_drag(DragAnchor {
            start: note.start,
            pitch: note.pitch,
        });
        self.preview(note.pitch);
        self.draw();
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let mut note = self.geometry.create_note(x, y);
        if let (true, Some(anchor)) = (self.edit.dragging, self.edit.anchor) {
            note = self
                .geometry
                .create_note_with_length(anchor.pitch, anchor.start, x);
            if self.edit.last_sounded_pitch != Some(note.pitch) {
                self.preview(note.pitch);
                self.edit.last_sounded_pitch = Some(note.pitch);
            }
        }
        self.edit.hover = Some(note);
        self.draw();
    }

    /// Finishes the gesture: removes the note the span lands on, or adds the
    /// span as a new note. A pointer-up with no drag in progress counts as a
    /// click at the last anchor, or at the pointer if there never was one.
    pub fn pointer_up(&mut self, x: f32, y: f32) -> Toggle {
        if !self.edit.dragging {
            log::debug!("Pointer up without a drag at ({}, {})", x, y);
        }
        let anchor = self.edit.anchor.unwrap_or_else(|| {
            let note = self.geometry.create_note(x, y);
            DragAnchor {
                start: note.start,
                pitch: note.pitch,
            }
        });
        let note = self
            .geometry
            .create_note_with_length(anchor.pitch, anchor.start, x);

        let toggle = match self.pattern.remove_matching(&note) {
            Some(removed) => {
                log::debug!("Removed {:?}", removed);
                Toggle::Removed(removed)
            }
            None => {
                self.pattern.add(note);
                log::debug!("Added {:?}", note);
                Toggle::Added(note)
            }
        };

        self.edit.end_drag();
        self.draw();
        toggle
    }

    /// One playback step: advance, sound every note starting here, redraw.
    /// Does nothing while stopped.
    pub fn tick(&mut self) {
        let Some(position) = self.playback.advance(self.geometry.pattern_length()) else {
            return;
        };
        for note in self.pattern.starting_at(position) {
            let duration = self.playback.note_duration_ms(note.length);
            self.player
                .play_note(note.pitch.saturating_add(self.transpose), duration);
        }
        self.draw();
    }

    pub fn tick_duration(&self) -> Duration {
        self.playback.tick_duration()
    }

    pub fn draw(&mut self) {
        self.canvas.clear();
        for note in &self.pattern {
            self.canvas.draw_note(note, NoteStyle::Placed);
        }
        if let Some(hover) = &self.edit.hover {
            self.canvas.draw_note(hover, NoteStyle::Preview);
        }
        self.canvas.set_play_position(self.playback.position());
        self.canvas.present();
    }

    fn preview(&mut self, pitch: i32) {
        self.player
            .play_note(pitch.saturating_add(self.transpose), self.preview_ms);
    }
}

impl Clocked for PianoRoll {
    fn tick(&mut self) {
        PianoRoll::tick(self);
    }

    fn tick_interval(&self) -> Duration {
        self.tick_duration()
    }
}
