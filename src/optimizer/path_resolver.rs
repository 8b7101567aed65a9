//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! Il path relativo del file di input viene sempre preservato e ri-radicato
//! sotto la directory di output; cambia al massimo l'estensione.

use crate::codec::TargetFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Se riscrivere l'estensione del file di output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionPolicy {
    /// Sostituisce (o aggiunge) l'estensione del formato target
    Rewrite,
    /// Mantiene il nome originale, contenuto ricodificato
    Keep,
}

impl ExtensionPolicy {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Rewrite
        } else {
            Self::Keep
        }
    }
}

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Mappa un path relativo di input nel path relativo di output
    pub fn map(relative_path: &Path, policy: ExtensionPolicy, format: TargetFormat) -> PathBuf {
        match policy {
            // `with_extension` sostituisce tutto dopo l'ultimo '.' del nome file,
            // oppure aggiunge l'estensione se il nome non ne ha una
            ExtensionPolicy::Rewrite => relative_path.with_extension(format.extension()),
            ExtensionPolicy::Keep => relative_path.to_path_buf(),
        }
    }

    /// Path assoluto di output sotto `output_root`
    pub fn output_path(
        output_root: &Path,
        relative_path: &Path,
        policy: ExtensionPolicy,
        format: TargetFormat,
    ) -> PathBuf {
        output_root.join(Self::map(relative_path, policy, format))
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
