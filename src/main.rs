//! # Image Transcoder - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Avvio dell'optimizer e contratto sull'exit code
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (RUST_LOG, altrimenti INFO o DEBUG col flag verbose)
//! 3. Carica la configurazione e applica gli override
//! 4. Istanzia MediaOptimizer e avvia il run
//! 5. Exit 0 se il batch termina (anche con file falliti), non-zero su errori fatali
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-transcoder ./original ./squooshed --quality 40 --resize-width 1280 --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use image_transcoder::json_output::JsonMessage;
use image_transcoder::{Config, MediaOptimizer, TargetFormat};

#[derive(Parser)]
#[command(name = "image-transcoder")]
#[command(about = "Transcode an image tree into a mirrored tree of compressed images")]
struct Args {
    /// Input directory (default: ./original)
    input: Option<PathBuf>,

    /// Output directory, wiped and recreated on every run (default: ./squooshed)
    output: Option<PathBuf>,

    /// Load configuration from this JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective configuration to this JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Output format: webp, png or jpeg
    #[arg(short, long)]
    format: Option<TargetFormat>,

    /// Encoder quality (0-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// WebP encoder effort (0-6, higher = slower and smaller)
    #[arg(short, long)]
    method: Option<u8>,

    /// Resize images to this width, keeping the aspect ratio
    #[arg(short, long)]
    resize_width: Option<u32>,

    /// Do not resize images
    #[arg(long, conflicts_with = "resize_width")]
    no_resize: bool,

    /// Keep the original file extensions
    #[arg(long)]
    keep_extension: bool,

    /// Number of parallel codec workers (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-file timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print start/completion messages as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// CLI flags override values loaded from file
    fn apply_to(&self, config: &mut Config) {
        if let Some(ref input) = self.input {
            config.input_dir = input.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(format) = self.format {
            config.target_format = format;
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(width) = self.resize_width {
            config.resize_enabled = true;
            config.resize_width = width;
        }
        if self.no_resize {
            config.resize_enabled = false;
        }
        if self.keep_extension {
            config.extension_rewrite_enabled = false;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.timeout.is_some() {
            config.job_timeout_secs = self.timeout;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

async fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().or_else(Config::default_path);
    let mut config = match path {
        Some(path) => Config::from_file(&path)
            .await
            .with_context(|| format!("Invalid configuration file {}", path.display()))?,
        None => Config::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging on stderr, stdout is reserved for JSON messages
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => return Err(fatal(args.json, e)),
    };

    if let Some(ref path) = args.save_config {
        config.save_to_file(path).await?;
        info!("Configuration saved to {}", path.display());
    }

    let optimizer = MediaOptimizer::new(config).map_err(|e| fatal(args.json, e))?;
    let result = optimizer
        .run()
        .await
        .map_err(|e| fatal(args.json, e.into()))?;

    if !result.is_complete_success() {
        info!(
            "{} of {} files failed, see the warnings above",
            result.failed(),
            result.attempted
        );
    }

    Ok(())
}

/// Logs a fatal error (and emits it as JSON when requested) before exiting non-zero
fn fatal(json: bool, e: anyhow::Error) -> anyhow::Error {
    error!("{:#}", e);
    if json {
        let details = e.chain().nth(1).map(|cause| cause.to_string());
        JsonMessage::error(e.to_string(), details).emit();
    }
    e
}
