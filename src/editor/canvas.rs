/// Drawing seam between the editor and whatever paints it
use parking_lot::Mutex;
use std::sync::Arc;

use crate::sequencer::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteStyle {
    /// A note stored in the pattern.
    Placed,
    /// The hover or in-progress drag note.
    Preview,
}

impl NoteStyle {
    /// RGBA colour used when painting this style.
    pub fn rgba(&self) -> [u8; 4] {
        match self {
            NoteStyle::Placed => [0xdd, 0x66, 0x66, 0xff],
            NoteStyle::Preview => [0, 0, 0, 0x80],
        }
    }
}

/// Receives the editor's redraws.
pub trait NoteCanvas {
    fn clear(&mut self);
    fn draw_note(&mut self, note: &Note, style: NoteStyle);
    fn set_play_position(&mut self, position: Option<u32>);

    /// Called once the full frame has been drawn.
    fn present(&mut self) {}
}

/// One finished redraw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub notes: Vec<(Note, NoteStyle)>,
    pub play_position: Option<u32>,
    /// Bumped on every completed redraw.
    pub revision: u64,
}

pub type SharedFrame = Arc<Mutex<Frame>>;

/// Canvas that records draw calls into a display list and publishes it to a
/// [`SharedFrame`] when the redraw completes. A GUI thread paints the shared
/// frame on its own schedule.
pub struct FrameCanvas {
    pending: Frame,
    shared: SharedFrame,
    on_present: Option<Box<dyn Fn() + Send>>,
}

impl FrameCanvas {
    pub fn new(shared: SharedFrame) -> Self {
        Self {
            pending: Frame::default(),
            shared,
            on_present: None,
        }
    }

    /// Hook run after each publish, e.g. to request a repaint.
    pub fn with_waker(mut self, waker: impl Fn() + Send + 'static) -> Self {
        self.on_present = Some(Box::new(waker));
        self
    }

    pub fn shared(&self) -> SharedFrame {
        Arc::clone(&self.shared)
    }
}

impl NoteCanvas for FrameCanvas {
    fn clear(&mut self) {
        self.pending.notes.clear();
    }

    fn draw_note(&mut self, note: &Note, style: NoteStyle) {
        self.pending.notes.push((*note, style));
    }

    fn set_play_position(&mut self, position: Option<u32>) {
        self.pending.play_position = position;
    }

    fn present(&mut self) {
        {
            let mut shared = self.shared.lock();
            shared.notes.clone_from(&self.pending.notes);
            shared.play_position = self.pending.play_position;
            shared.revision += 1;
        }
        if let Some(waker) = &self.on_present {
            waker();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_frame_published_on_present() {
        let shared = SharedFrame::default();
        let mut canvas = FrameCanvas::new(Arc::clone(&shared));

        canvas.clear();
        canvas.draw_note(&Note::point(1, 2), NoteStyle::Placed);
        canvas.set_play_position(Some(2));
        assert_eq!(shared.lock().revision, 0);

        canvas.present();
        let frame = shared.lock().clone();
        assert_eq!(frame.revision, 1);
        assert_eq!(frame.notes, vec![(Note::point(1, 2), NoteStyle::Placed)]);
        assert_eq!(frame.play_position, Some(2));
    }

    #[test]
    fn test_clear_drops_previous_notes() {
        let shared = SharedFrame::default();
        let mut canvas = FrameCanvas::new(Arc::clone(&shared));
        canvas.draw_note(&Note::point(1, 2), NoteStyle::Placed);
        canvas.present();
        canvas.clear();
        canvas.present();
        assert!(shared.lock().notes.is_empty());
        assert_eq!(shared.lock().revision, 2);
    }

    #[test]
    fn test_waker_runs_per_present() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let mut canvas = FrameCanvas::new(SharedFrame::default()).with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        canvas.present();
        canvas.present();
        assert_eq!(woken.load(Ordering::SeqCst), 2);
    }
}
