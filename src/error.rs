/// Errors raised while setting up devices or loading configuration.
///
/// The editing core never fails; only the edges that touch hardware or
/// files return these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No audio output device available")]
    NoOutputDevice,

    #[error("Audio stream error: {0}")]
    AudioStream(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("Invalid MIDI port index: {0}")]
    InvalidPort(usize),

    #[error("Config IO error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
