/// Audio output using cpal
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Fire-and-forget note trigger. `pitch` is an absolute note number
/// (MIDI numbering) and the note sounds for `duration_ms`.
pub trait NotePlayer {
    fn play_note(&mut self, pitch: i32, duration_ms: f64);
}

impl<P: NotePlayer + ?Sized> NotePlayer for Box<P> {
    fn play_note(&mut self, pitch: i32, duration_ms: f64) {
        (**self).play_note(pitch, duration_ms);
    }
}

/// Sends every note to each player in turn.
impl<P: NotePlayer> NotePlayer for Vec<P> {
    fn play_note(&mut self, pitch: i32, duration_ms: f64) {
        for player in self.iter_mut() {
            player.play_note(pitch, duration_ms);
        }
    }
}

/// Keeps every `(pitch, duration_ms)` it is asked to play. Clones share the
/// same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    played: Arc<Mutex<Vec<(i32, f64)>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<(i32, f64)> {
        self.played.lock().clone()
    }

    pub fn clear(&self) {
        self.played.lock().clear();
    }
}

impl NotePlayer for RecordingPlayer {
    fn play_note(&mut self, pitch: i32, duration_ms: f64) {
        self.played.lock().push((pitch, duration_ms));
    }
}

const AMPLITUDE: f32 = 0.2;
const RELEASE_SAMPLES: usize = 256;
const MAX_VOICES: usize = 32;

#[derive(Debug, Clone)]
struct Voice {
    frequency: f32,
    phase: f32,
    remaining: usize,
}

impl Voice {
    fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let envelope = (self.remaining.min(RELEASE_SAMPLES) as f32) / RELEASE_SAMPLES as f32;
        let sample = (self.phase * 2.0 * std::f32::consts::PI).sin() * AMPLITUDE * envelope;
        self.phase += self.frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.remaining = self.remaining.saturating_sub(1);
        sample
    }
}

/// Sendable handle onto the synth's voice list. This is what the editor
/// holds; the stream itself stays with [`AudioOutput`].
#[derive(Clone)]
pub struct Synth {
    voices: Arc<Mutex<Vec<Voice>>>,
    sample_rate: f32,
}

impl Synth {
    fn new(sample_rate: f32) -> Self {
        Self {
            voices: Arc::new(Mutex::new(Vec::new())),
            sample_rate,
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.lock().len()
    }

    pub fn stop_all(&self) {
        self.voices.lock().clear();
    }

    fn render(&self, data: &mut [f32], channels: usize) {
        let mut voices = self.voices.lock();
        for frame in data.chunks_mut(channels.max(1)) {
            let value: f32 = voices
                .iter_mut()
                .map(|voice| voice.next_sample(self.sample_rate))
                .sum();
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
        voices.retain(|voice| voice.remaining > 0);
    }
}

impl NotePlayer for Synth {
    fn play_note(&mut self, pitch: i32, duration_ms: f64) {
        let remaining = (duration_ms.max(0.0) / 1000.0 * self.sample_rate as f64) as usize;
        if remaining == 0 {
            return;
        }
        let mut voices = self.voices.lock();
        if voices.len() >= MAX_VOICES {
            voices.remove(0);
        }
        voices.push(Voice {
            frequency: midi_note_to_frequency(pitch),
            phase: 0.0,
            remaining,
        });
    }
}

/// Owns the output stream. Not `Send` on every platform, so keep it on the
/// thread that created it and hand [`AudioOutput::synth`] to the editor.
pub struct AudioOutput {
    stream: Option<cpal::Stream>,
    synth: Synth,
}

impl AudioOutput {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::AudioStream(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let synth = Synth::new(sample_rate);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let render = synth.clone();
                device
                    .build_output_stream(
                        &config.into(),
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            render.render(data, channels);
                        },
                        |err| log::warn!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| Error::AudioStream(e.to_string()))?
            }
            other => return Err(Error::UnsupportedSampleFormat(format!("{:?}", other))),
        };

        stream.play().map_err(|e| Error::AudioStream(e.to_string()))?;
        log::info!("Audio output running at {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            stream: Some(stream),
            synth,
        })
    }

    /// Output with no device behind it; notes are accepted and discarded
    /// once their time runs out.
    pub fn disconnected() -> Self {
        Self {
            stream: None,
            synth: Synth::new(44_100.0),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn synth(&self) -> Synth {
        self.synth.clone()
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            log::warn!("Audio output unavailable: {}", e);
            Self::disconnected()
        })
    }
}

pub fn midi_note_to_frequency(note: i32) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_frequencies() {
        assert_eq!(midi_note_to_frequency(69), 440.0);
        assert!((midi_note_to_frequency(48) - 130.81).abs() < 0.01);
    }

    #[test]
    fn test_voice_lasts_for_duration() {
        let mut synth = Synth::new(1000.0);
        synth.play_note(60, 10.0);
        assert_eq!(synth.active_voices(), 1);

        let mut buffer = vec![0.0; 8];
        synth.render(&mut buffer, 1);
        assert_eq!(synth.active_voices(), 1);
        synth.render(&mut buffer, 1);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_channels_share_a_frame() {
        let mut synth = Synth::new(1000.0);
        synth.play_note(69, 100.0);
        let mut buffer = vec![0.0; 8];
        synth.render(&mut buffer, 2);
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(buffer.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_zero_duration_is_ignored() {
        let mut synth = Synth::new(1000.0);
        synth.play_note(60, 0.0);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn test_voice_limit() {
        let mut synth = Synth::new(1000.0);
        for pitch in 0..(MAX_VOICES as i32 + 4) {
            synth.play_note(pitch, 100.0);
        }
        assert_eq!(synth.active_voices(), MAX_VOICES);
    }

    #[test]
    fn test_fan_out() {
        let a = Synth::new(1000.0);
        let b = Synth::new(1000.0);
        let mut players = vec![a.clone(), b.clone()];
        players.play_note(60, 50.0);
        assert_eq!(a.active_voices(), 1);
        assert_eq!(b.active_voices(), 1);
    }
}
