//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico.
//!
//! ## Responsabilità:
//! - Emette messaggi JSON su stdout (una riga per messaggio)
//! - Nessun evento per singolo file: solo inizio, completamento ed errore fatale
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del run (directory, numero di file, configurazione)
//! - `complete`: fine del run con il riepilogo del `BatchResult`
//! - `error`: errore fatale che ha interrotto il run

use crate::report::BatchResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del run
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: PathBuf,
        total_files: usize,
        config: JsonConfig,
    },

    /// Run completato (anche con fallimenti per-file)
    #[serde(rename = "complete")]
    Complete {
        attempted: usize,
        succeeded: usize,
        failed: usize,
        failures: Vec<JsonFailure>,
        bytes_written: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub target_format: String,
    pub quality: u8,
    pub method: u8,
    pub resize_width: Option<u32>,
    pub extension_rewrite: bool,
    pub workers: usize,
}

/// Un file fallito
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFailure {
    pub path: PathBuf,
    pub error: String,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(input_dir: PathBuf, output_dir: PathBuf, total_files: usize, config: JsonConfig) -> Self {
        Self::Start {
            input_dir,
            output_dir,
            total_files,
            config,
        }
    }

    /// Crea un messaggio di completamento dal risultato del batch
    pub fn complete(result: &BatchResult, duration_seconds: f64) -> Self {
        Self::Complete {
            attempted: result.attempted,
            succeeded: result.succeeded,
            failed: result.failed(),
            failures: result
                .failures
                .iter()
                .map(|f| JsonFailure {
                    path: f.path.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
            bytes_written: result.total_bytes_written,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// Converti Config in JsonConfig
impl From<&crate::Config> for JsonConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            target_format: config.target_format.to_string(),
            quality: config.quality,
            method: config.method,
            resize_width: config.resize_enabled.then_some(config.resize_width),
            extension_rewrite: config.extension_rewrite_enabled,
            workers: config.effective_workers(),
        }
    }
}
