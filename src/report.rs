//! # Batch Result Module
//!
//! Questo modulo raccoglie l'esito aggregato di un run.
//!
//! ## Responsabilità:
//! - `BatchResult`: conteggio job tentati, riusciti e lista dei fallimenti
//! - `JobFailure`: path relativo + errore tipizzato del singolo job
//! - Accumulo indipendente dall'ordine di completamento dei job:
//!   i fallimenti vengono ordinati per path alla finalizzazione
//! - Report finale leggibile (conteggi + path falliti con causa)
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut result = BatchResult::new(files.len());
//! result.record(path, outcome);
//! let result = result.finalize();
//! info!("{}", result.format_summary());
//! ```

use crate::error::TranscodeError;
use std::path::PathBuf;

/// A job that did not produce an output file
#[derive(Debug)]
pub struct JobFailure {
    pub path: PathBuf,
    pub error: TranscodeError,
}

/// Aggregate outcome of a run
#[derive(Debug, Default)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<JobFailure>,
    pub total_bytes_written: u64,
}

impl BatchResult {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Self::default()
        }
    }

    pub fn add_success(&mut self, bytes_written: u64) {
        self.succeeded += 1;
        self.total_bytes_written += bytes_written;
    }

    pub fn add_failure(&mut self, error: TranscodeError) {
        self.failures.push(JobFailure {
            path: error.path().clone(),
            error,
        });
    }

    /// Sorts failures by relative path so the result does not depend on completion order
    pub fn finalize(mut self) -> Self {
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.succeeded == self.attempted
    }

    pub fn failed_paths(&self) -> Vec<&PathBuf> {
        self.failures.iter().map(|f| &f.path).collect()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Attempted: {} files | Succeeded: {} | Failed: {} | Written: {}",
            self.attempted,
            self.succeeded,
            self.failed(),
            crate::file_manager::FileManager::format_size(self.total_bytes_written)
        )
    }

    /// One line per failed file, with its cause
    pub fn format_failures(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.path.display(), f.error))
            .collect()
    }
}
