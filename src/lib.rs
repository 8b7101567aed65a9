//! # Image Transcoder Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore per traversal, codec, singolo job e run
//! - `file_manager`: Walk della directory di input e gestione output root
//! - `codec`: Trait `ImageCodec` e implementazione `ImagePool` (image + cwebp)
//! - `optimizer`: Orchestratore del run e pipeline per singolo file
//! - `report`: Risultato aggregato del run
//! - `json_output`: Segnale di completamento in JSON
//! - `platform`: Risoluzione dei tool esterni
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_transcoder::{Config, MediaOptimizer};
//!
//! let optimizer = MediaOptimizer::new(Config::default())?;
//! let result = optimizer.run().await?;
//! println!("{}", result.format_summary());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod platform;
pub mod report;

pub use codec::{ImageCodec, ImagePool, TargetFormat};
pub use config::Config;
pub use error::{BatchError, CodecError, TranscodeError, TraversalError};
pub use optimizer::MediaOptimizer;
pub use report::{BatchResult, JobFailure};
