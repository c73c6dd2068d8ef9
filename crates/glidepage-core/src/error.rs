use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Invalid stage in gate for {section}: {reason}")]
    InvalidStage { section: String, reason: String },

    #[error("No viewport available: {0}")]
    Environment(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
