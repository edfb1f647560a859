use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KconfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("syntax error at {file}:{line}: {message}")]
    Syntax {
        file: PathBuf,
        line: u32,
        message: String,
    },

    #[error("sourced file not found: {0}")]
    MissingSource(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid rename map: {0}")]
    Rename(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, KconfigError>;
