use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("invalid address `{0}`: expected 0x followed by 40 hex digits")]
    InvalidAddress(String),
    #[error("invalid amount `{0}`: expected a positive integer in wei")]
    InvalidAmount(String),
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
    #[error("invalid assignment `{0}`: expected key=value")]
    InvalidAssignment(String),
    #[error("node {0} not found")]
    NodeNotFound(Uuid),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlueprintError>;
