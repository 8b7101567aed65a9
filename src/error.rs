//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Separa gli errori fatali (che fermano l'intero run) da quelli per-file
//! - Ogni errore per-file porta con sé il path relativo del file coinvolto
//! - Integra con `thiserror` per messaggi e conversioni automatiche
//!
//! ## Categorie di errori:
//! - `TraversalError`: la directory di input non esiste o non è leggibile
//! - `CodecError`: errori del codec (decode, resize, encode, tool mancanti, pool chiuso)
//! - `TranscodeError`: errori confinati a un singolo job (read, decode, encode, write)
//! - `BatchError`: errori fatali del run (output root, apertura codec, traversal)
//!
//! ## Esempio:
//! ```rust,ignore
//! match optimizer.run().await {
//!     Ok(result) => info!("{}", result.format_summary()),
//!     Err(BatchError::Traversal(e)) => error!("Cannot walk input: {}", e),
//!     Err(e) => error!("{}", e),
//! }
//! ```

use std::path::PathBuf;

/// Failure to enumerate the input tree. Always fatal for the run.
#[derive(thiserror::Error, Debug)]
pub enum TraversalError {
    #[error("Input directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by an image codec collaborator
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("Not a decodable image: {0}")]
    Decode(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Dependency missing: {0}")]
    MissingTool(String),

    #[error("Codec worker failed: {0}")]
    Worker(String),

    #[error("Codec has been closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-job failure, recorded in the batch result and never fatal to the run
#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {cause}")]
    Decode { path: PathBuf, cause: CodecError },

    #[error("Failed to encode {path}: {cause}")]
    Encode { path: PathBuf, cause: CodecError },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Processing of {path} timed out after {seconds}s")]
    Timeout { path: PathBuf, seconds: u64 },

    #[error("Task for {path} aborted: {reason}")]
    Aborted { path: PathBuf, reason: String },
}

impl TranscodeError {
    /// Relative path of the file this error belongs to
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. }
            | Self::Write { path, .. }
            | Self::Timeout { path, .. }
            | Self::Aborted { path, .. } => path,
        }
    }
}

/// Fatal errors: the run stops before (or without) launching jobs
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Cannot prepare output directory {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open image codec: {0}")]
    Codec(#[source] CodecError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),
}
