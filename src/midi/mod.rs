/// MIDI output using midir
use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::audio::NotePlayer;
use crate::error::{Error, Result};

const CLIENT_NAME: &str = "Piano Roll MIDI Output";
const VELOCITY: u8 = 100;

/// Cloneable handle onto one MIDI output connection. Every clone shares the
/// connection, so the GUI can switch ports while the editor keeps playing.
#[derive(Clone, Default)]
pub struct MidiOutputDevice {
    connection: Arc<Mutex<Option<MidiOutputConnection>>>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available_ports() -> Vec<String> {
        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(e) => {
                log::warn!("MIDI unavailable: {}", e);
                vec![]
            }
        }
    }

    pub fn connect(&self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| Error::Midi(format!("failed to create output: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports.get(port_index).ok_or(Error::InvalidPort(port_index))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "pianoroll")
            .map_err(|e| Error::Midi(format!("failed to connect: {}", e)))?;

        *self.connection.lock() = Some(connection);
        log::info!("Connected MIDI output to {}", name);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    pub fn send_note_on(&self, note: u8, velocity: u8) -> Result<()> {
        self.send(&[0x90, note & 0x7f, velocity & 0x7f])
    }

    pub fn send_note_off(&self, note: u8) -> Result<()> {
        self.send(&[0x80, note & 0x7f, 0])
    }

    fn send(&self, message: &[u8]) -> Result<()> {
        if let Some(conn) = self.connection.lock().as_mut() {
            conn.send(message)
                .map_err(|e| Error::Midi(format!("failed to send: {}", e)))?;
        }
        Ok(())
    }

    pub fn disconnect(&self) {
        if let Some(conn) = self.connection.lock().take() {
            conn.close();
            log::info!("Disconnected MIDI output");
        }
    }
}

impl NotePlayer for MidiOutputDevice {
    /// Note-on now, note-off from a short-lived thread once the duration
    /// has passed. Send failures are logged and dropped.
    fn play_note(&mut self, pitch: i32, duration_ms: f64) {
        if !self.is_connected() {
            return;
        }
        let note = pitch.clamp(0, 127) as u8;
        if let Err(e) = self.send_note_on(note, VELOCITY) {
            log::warn!("{}", e);
            return;
        }

        let device = self.clone();
        let duration = Duration::from_secs_f64(duration_ms.max(0.0) / 1000.0);
        thread::spawn(move || {
            thread::sleep(duration);
            if let Err(e) = device.send_note_off(note) {
                log::warn!("{}", e);
            }
        });
    }
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
