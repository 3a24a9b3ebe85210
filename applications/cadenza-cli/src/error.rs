/// CLI error types
use cadenza_playback::PlaybackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] lofty::LoftyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
