use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    /// Malformed level geometry or level document.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stored profile content that is not a well-formed profile object.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GameResult<T> = std::result::Result<T, GameError>;
