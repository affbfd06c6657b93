/// Editor configuration read from TOML - every field has a default, so a
/// partial file (or none at all) works

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sequencer::playback::{DEFAULT_BPM, MAX_BPM, MIN_BPM};
use crate::sequencer::Note;

pub const DEFAULT_PATTERN_LENGTH: u32 = 32;

/// Added to a pitch row to get a note number; row 0 is C3.
pub const DEFAULT_TRANSPOSE: i32 = 48;

/// How long edit previews sound.
pub const DEFAULT_PREVIEW_MS: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Columns in the loop
    pub pattern_length: u32,
    /// Tempo in beats per minute; one column is a sixteenth note
    pub bpm: f64,
    /// Pitch rows on the surface
    pub rows: u32,
    /// Pixels per column
    pub column_width: f32,
    /// Pixels per pitch row
    pub row_height: f32,
    pub transpose: i32,
    pub preview_ms: f64,
    /// Pattern loaded at start-up
    pub notes: Vec<Note>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pattern_length: DEFAULT_PATTERN_LENGTH,
            bpm: DEFAULT_BPM,
            rows: 24,
            column_width: 32.0,
            row_height: 16.0,
            transpose: DEFAULT_TRANSPOSE,
            preview_ms: DEFAULT_PREVIEW_MS,
            notes: Vec::new(),
        }
    }
}

impl EditorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.pattern_length == 0 {
            return Err(Error::InvalidConfig("pattern_length must be at least 1".into()));
        }
        if self.rows == 0 {
            return Err(Error::InvalidConfig("rows must be at least 1".into()));
        }
        if !(self.bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&self.bpm)) {
            return Err(Error::InvalidConfig(format!(
                "bpm must be between {} and {}",
                MIN_BPM, MAX_BPM
            )));
        }
        for (name, size) in [("column_width", self.column_width), ("row_height", self.row_height)] {
            if !(size.is_finite() && size > 0.0) {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.preview_ms.is_finite() && self.preview_ms >= 0.0) {
            return Err(Error::InvalidConfig("preview_ms must not be negative".into()));
        }
        if let Some(note) = self.notes.iter().find(|n| n.length == 0) {
            return Err(Error::InvalidConfig(format!(
                "note at row {} column {} has zero length",
                note.pitch, note.start
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = EditorConfig::from_toml("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.pattern_length, 32);
        assert_eq!(config.transpose, 48);
    }

    #[test]
    fn test_partial_file() {
        let config = EditorConfig::from_toml(
            r#"
            bpm = 90.0
            pattern_length = 16

            [[notes]]
            pitch = 3
            start = 4
            length = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.pattern_length, 16);
        assert_eq!(config.rows, 24);
        assert_eq!(config.notes, vec![Note::new(3, 4, 2)]);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = EditorConfig::default();
        config.notes.push(Note::new(1, 2, 3));
        let text = config.to_toml().unwrap();
        assert_eq!(EditorConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            EditorConfig::from_toml("pattern_length = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml("bpm = 1000.0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml("row_height = 0.0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml("[[notes]]\npitch = 0\nstart = 0\nlength = 0"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            EditorConfig::from_toml("bpm = \"fast\""),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EditorConfig::load("/definitely/not/here.toml"),
            Err(Error::ConfigIo(_))
        ));
    }
}
