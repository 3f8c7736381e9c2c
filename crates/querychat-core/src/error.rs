use thiserror::Error;

/// Failure of the outbound query call itself.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("query endpoint returned status {0}")]
    Status(u16),
    #[error("query endpoint returned a body that is not JSON: {0}")]
    Decode(String),
}

/// Why a decoded response body was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("response body is not an object")]
    NotAnObject,
    #[error("response body has no `response` field")]
    MissingField,
    #[error("`response` field is not a string")]
    NotAString,
    #[error("`response` field is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("unsupported file type: {name} (allowed: .txt, .csv, .json, .md)")]
    UnsupportedExtension { name: String },
}

/// Rejected controller intents. State is left untouched when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("no message at position {0}")]
    NoSuchMessage(usize),
    #[error("message at position {0} was not written by the user")]
    NotAUserMessage(usize),
    #[error("edited message cannot be empty")]
    EmptyEdit,
    #[error("no edit in progress")]
    NoActiveEdit,
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
