//! # Media Optimizer Main Orchestrator
//!
//! Orchestratore principale del run di transcodifica.
//!
//! ## Flusso di esecuzione:
//! 1. **Output root**: svuota e ricrea la directory di output (fatale se fallisce)
//! 2. **Codec**: apre un unico codec condiviso con `workers` slot paralleli
//! 3. **Discovery**: walk completo della directory di input (fatale se fallisce)
//! 4. **Fan-out**: un task tokio per ogni file, tutti lanciati insieme
//! 5. **Join**: attende tutti i task; ogni esito è registrato separatamente
//! 6. **Close**: chiude il codec una sola volta, dopo il join, su ogni percorso
//! 7. **Report**: restituisce il `BatchResult`
//!
//! ## Gestione concorrenza:
//! - Nessun semaforo a questo livello: il codec è l'unico limite al lavoro
//!   CPU-bound, il lavoro per-job rimanente (I/O, path) è leggero
//! - Il codec è condiviso via `Arc`, nessun lock nell'orchestratore
//! - Il fallimento di un job non cancella né blocca gli altri
//!
//! ## Esempio:
//! ```rust,ignore
//! let optimizer = MediaOptimizer::new(config)?;
//! let result = optimizer.run().await?;
//! ```

use crate::{
    codec::{ImageCodec, ImagePool},
    config::Config,
    error::{BatchError, CodecError, TranscodeError},
    file_manager::FileManager,
    json_output::{JsonConfig, JsonMessage},
    optimizer::task_optimizer::{JobSettings, TaskOptimizer, TranscodeJob},
    report::BatchResult,
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestratore principale
pub struct MediaOptimizer {
    config: Config,
}

impl MediaOptimizer {
    /// Crea nuova istanza dell'orchestratore
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Esegue il run con il codec di default (`ImagePool`)
    pub async fn run(&self) -> Result<BatchResult, BatchError> {
        let encode_options = self.config.encode_options();
        self.run_with(move |workers| ImagePool::new(workers, &encode_options))
            .await
    }

    /// Esegue il run aprendo il codec con `open_codec(workers)`
    pub async fn run_with<C, F>(&self, open_codec: F) -> Result<BatchResult, BatchError>
    where
        C: ImageCodec,
        F: FnOnce(usize) -> Result<C, CodecError>,
    {
        let start_time = Instant::now();
        self.log_configuration();

        let output_root = &self.config.output_dir;
        info!("Cleaning output folder {} ...", output_root.display());
        FileManager::recreate_dir(output_root)
            .await
            .map_err(|source| BatchError::OutputRoot {
                path: output_root.clone(),
                source,
            })?;
        info!("Output folder has been cleaned successfully.");

        let codec = Arc::new(open_codec(self.config.effective_workers()).map_err(BatchError::Codec)?);

        // Da qui in poi il codec va chiuso esattamente una volta, qualunque sia l'esito
        let outcome = self.walk_and_dispatch(Arc::clone(&codec)).await;
        codec.close().await;

        let result = outcome?;
        self.print_final_stats(&result, start_time.elapsed().as_secs_f64());
        Ok(result)
    }

    /// Walk della directory di input, fan-out dei job e join
    async fn walk_and_dispatch<C: ImageCodec>(&self, codec: Arc<C>) -> Result<BatchResult, BatchError> {
        let files = FileManager::walk(&self.config.input_dir)?;
        self.emit_start_message(files.len());

        if files.is_empty() {
            info!("No files found to process in {}", self.config.input_dir.display());
            return Ok(BatchResult::new(0));
        }
        info!("Found {} files to process", files.len());

        let settings = Arc::new(JobSettings::from_config(&self.config));
        let worker = TaskOptimizer::new(codec, Arc::clone(&settings));

        let (paths, tasks): (Vec<PathBuf>, Vec<_>) = files
            .into_iter()
            .map(|relative_path| {
                let job = TranscodeJob::new(relative_path, &settings);
                let path = job.relative_path.clone();
                let worker = worker.clone();
                (path, tokio::spawn(async move { worker.run(job).await }))
            })
            .unzip();
        drop(worker);

        let outcomes = futures::future::join_all(tasks).await;

        let mut result = BatchResult::new(paths.len());
        for (path, outcome) in paths.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(bytes_written)) => {
                    debug!("Done: {}", path.display());
                    result.add_success(bytes_written);
                }
                Ok(Err(e)) => {
                    warn!("{}", e);
                    result.add_failure(e);
                }
                Err(join_error) => {
                    let e = TranscodeError::Aborted {
                        path,
                        reason: join_error.to_string(),
                    };
                    warn!("{}", e);
                    result.add_failure(e);
                }
            }
        }

        Ok(result.finalize())
    }

    /// Invia messaggio di inizio (solo JSON mode)
    fn emit_start_message(&self, total_files: usize) {
        if self.config.json_output {
            JsonMessage::start(
                self.config.input_dir.clone(),
                self.config.output_dir.clone(),
                total_files,
                JsonConfig::from(&self.config),
            )
            .emit();
        }
    }

    /// Logga configurazione
    fn log_configuration(&self) {
        let config = &self.config;
        info!(
            "Transcoding {} -> {}",
            config.input_dir.display(),
            config.output_dir.display()
        );
        info!(
            "Target: {} (quality: {}, method: {})",
            config.target_format, config.quality, config.method
        );
        if config.resize_enabled {
            info!("Resize: width {}px, aspect ratio preserved", config.resize_width);
        } else {
            info!("Resize: disabled");
        }
        if config.extension_rewrite_enabled {
            info!("Extensions: rewritten to .{}", config.target_format.extension());
        } else {
            info!("Extensions: kept");
        }
        info!("Codec workers: {}", config.effective_workers());
        if let Some(secs) = config.job_timeout_secs {
            info!("Per-file timeout: {}s", secs);
        }
    }

    /// Stampa statistiche finali
    fn print_final_stats(&self, result: &BatchResult, duration_seconds: f64) {
        if self.config.json_output {
            JsonMessage::complete(result, duration_seconds).emit();
        }

        info!("{}", result.format_summary());
        if !result.failures.is_empty() {
            warn!("{} files could not be transcoded:", result.failed());
            for line in result.format_failures() {
                warn!("  • {}", line);
            }
        }
        info!("Done in {:.2}s!", duration_seconds);
    }
}
