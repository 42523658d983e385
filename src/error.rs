use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MusicError>;

#[derive(Debug, Clone, PartialEq)]
pub enum MusicError {
    /// Not one of the twelve chromatic symbols, or an unparseable note.
    InvalidNoteName { name: String },
    /// A direct key lookup fell outside the instrument's range.
    IndexOutOfRange { offset: i32, low: i32, high: i32 },
    /// The audio output device could not be opened or stopped working.
    DeviceUnavailable(String),
    /// Nothing selected to play.
    EmptySelection,
    /// A caller passed a value outside the accepted domain.
    Validation(String),
    /// Malformed configuration or lesson table.
    Config(String),
}

impl MusicError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        MusicError::Validation(msg.into())
    }
}

impl fmt::Display for MusicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MusicError::InvalidNoteName { name } => write!(f, "Invalid note name '{name}'"),
            MusicError::IndexOutOfRange { offset, low, high } => {
                write!(f, "Offset {offset} outside key range [{low}, {high}]")
            }
            MusicError::DeviceUnavailable(reason) => write!(f, "Audio device unavailable: {reason}"),
            MusicError::EmptySelection => write!(f, "No notes selected"),
            MusicError::Validation(msg) => write!(f, "Invalid argument: {msg}"),
            MusicError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for MusicError {}

impl From<serde_json::Error> for MusicError {
    fn from(e: serde_json::Error) -> Self {
        MusicError::Config(e.to_string())
    }
}
