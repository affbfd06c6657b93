/// Piano Roll - a looping note editor library
///
/// This library provides the core components for building a piano roll:
/// - Pattern storage with click-to-toggle hit testing
/// - Pointer-driven note editing (hover, drag-to-length, toggle)
/// - A looping playback clock that triggers notes in time
/// - Audio and MIDI note output

pub mod audio;
pub mod config;
pub mod editor;
pub mod error;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{AudioOutput, NotePlayer, RecordingPlayer, Synth};
pub use config::EditorConfig;
pub use editor::canvas::{Frame, FrameCanvas, NoteCanvas, NoteStyle, SharedFrame};
pub use editor::geometry::{GridGeometry, NoteGeometry};
pub use editor::{DragAnchor, EditPhase, EditState, PianoRoll, SharedPianoRoll, Toggle};
pub use error::{Error, Result};
pub use midi::{midi_note_name, MidiOutputDevice};
pub use sequencer::playback::{Clocked, Playback, Transport, TransportHandle};
pub use sequencer::{is_hit, Note, Pattern};
