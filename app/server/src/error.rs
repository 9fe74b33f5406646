//! Error types for the AddressBridge server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
