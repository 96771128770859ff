//! Error type shared by the library components.

use thiserror::Error;

/// Errors raised while loading data, fitting the topic model, or running
/// the classifier.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("transformer error: {0}")]
    Transformer(#[from] rust_bert::RustBertError),

    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] rust_tokenizers::error::TokenizerError),

    #[cfg(feature = "auto-download")]
    #[error("download failed: {0}")]
    Download(#[from] hf_hub::api::sync::ApiError),

    /// A label string the encoder was not fitted on.
    #[error("unknown label: {0:?}")]
    UnknownLabel(String),

    /// A class index outside the encoder's range.
    #[error("label index {index} out of range for {classes} classes")]
    LabelIndex { index: i64, classes: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("model files not found:\n{0}")]
    MissingFiles(String),

    /// A libtorch call panicked; the message is the panic payload.
    #[error("tensor operation panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, Error>;
