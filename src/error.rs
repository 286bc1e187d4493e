use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The DOM cannot be serialized as given (client-side data error).
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("serialization cancelled")]
    Cancelled,

    #[error("HTML error: {0}")]
    Html(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path error: {0}")]
    Path(#[from] std::path::StripPrefixError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
