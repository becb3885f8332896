pub mod config;
pub mod providers;
pub mod research;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Engine(#[from] khoj_core::EngineError),

    #[error("Key store error: {0}")]
    Store(#[from] khoj_core::keys::StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
