//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva (depth-first) di tutti i file regolari sotto una root
//! - Restituisce path **relativi** alla root, mai appiattiti
//! - Preparazione della directory di output (svuotata e ricreata)
//! - Utilità per formattazione human-readable delle dimensioni
//!
//! ## Policy di traversal:
//! - I link simbolici **non** vengono seguiti e vengono saltati
//! - File non regolari (socket, FIFO, device) vengono saltati
//! - Qualsiasi errore di I/O durante il walk fa fallire l'intero walk:
//!   un walk parziale non è utilizzabile perché il numero di job deve essere noto
//! - L'ordine è deterministico (ordinamento per nome in ogni directory)
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::walk(Path::new("./original"))?;
//! for relative in files {
//!     // es. "a/b/photo.png"
//! }
//! ```

use crate::error::TraversalError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find every regular file under `root`, as paths relative to `root`
    pub fn walk(root: &Path) -> Result<Vec<PathBuf>, TraversalError> {
        let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TraversalError::NotFound(root.to_path_buf()),
            _ => TraversalError::Unreadable {
                path: root.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_dir() {
            return Err(TraversalError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                TraversalError::Unreadable { path, source }
            })?;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                debug!("Skipping symbolic link: {}", entry.path().display());
                continue;
            }
            if !file_type.is_file() {
                debug!("Skipping non-regular file: {}", entry.path().display());
                continue;
            }

            // Entries always live under root, strip_prefix cannot fail here
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }

        debug!("Discovered {} files under {}", files.len(), root.display());
        Ok(files)
    }

    /// Remove `dir` recursively if present, then create it empty
    pub async fn recreate_dir(dir: &Path) -> io::Result<()> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(dir).await
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
