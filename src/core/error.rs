//! Error types for alert delivery and settings persistence

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors while delivering a chat notice or playing a sound
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("sound file not found: {0}")]
    SoundNotFound(String),

    #[error("failed to open sound file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch sound from {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode sound from {origin}: {reason}")]
    Decode { origin: String, reason: String },

    #[error("audio output device unavailable: {0}")]
    Device(String),

    #[error("chat sink rejected message: {0}")]
    Chat(String),
}

/// Errors while loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize settings")]
    Serialize(#[from] serde_json::Error),
}
