//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del run
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//! - Deriva le opzioni condivise (read-only) passate a ogni job
//!
//! ## Parametri di configurazione:
//! - `input_dir` / `output_dir`: root di input e di output (default: `./original`, `./squooshed`)
//! - `resize_enabled` / `resize_width`: resize vincolato in larghezza (default: true, 1920)
//! - `extension_rewrite_enabled`: riscrive l'estensione col formato target (default: true)
//! - `target_format`: formato di output (default: webp)
//! - `quality`: qualità encoder (0-100, default: 25)
//! - `method`: effort encoder WebP (0-6, default: 6)
//! - `webp`: tuning avanzato di cwebp
//! - `workers`: worker paralleli del codec (default: numero di CPU)
//! - `job_timeout_secs`: timeout per singolo file (default: nessuno)
//!
//! ## Validazione:
//! - `quality` <= 100, `method` <= 6
//! - `resize_width` > 0 se il resize è abilitato
//! - `workers` > 0 se specificato
//! - La directory di output non può coincidere con (o contenere) quella di input,
//!   perché viene svuotata all'inizio di ogni run
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     quality: 60,
//!     resize_enabled: false,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::codec::{EncodeOptions, PreprocessOptions, ResizeOptions, TargetFormat, WebpTuning};
use crate::optimizer::path_resolver::ExtensionPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a transcoding run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the tree to transcode
    pub input_dir: PathBuf,
    /// Root the transcoded tree is written to (recreated on every run)
    pub output_dir: PathBuf,
    /// Resize every image to `resize_width` before encoding
    pub resize_enabled: bool,
    /// Target width in pixels, height follows the aspect ratio
    pub resize_width: u32,
    /// Replace the file extension with the target format's one
    pub extension_rewrite_enabled: bool,
    /// Output format
    pub target_format: TargetFormat,
    /// Encoder quality (0-100)
    pub quality: u8,
    /// Encoder effort (0-6, WebP only)
    pub method: u8,
    /// Advanced WebP encoder settings
    pub webp: WebpTuning,
    /// Number of parallel codec workers (None = available CPUs)
    pub workers: Option<usize>,
    /// Per-file timeout in seconds (None = no timeout)
    pub job_timeout_secs: Option<u64>,
    /// Output the completion signal as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./original"),
            output_dir: PathBuf::from("./squooshed"),
            resize_enabled: true,
            resize_width: 1920,
            extension_rewrite_enabled: true,
            target_format: TargetFormat::Webp,
            quality: 25,
            method: 6,
            webp: WebpTuning::default(),
            workers: None,
            job_timeout_secs: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 0 and 100"));
        }

        if self.method > 6 {
            return Err(anyhow::anyhow!("Encoder method must be between 0 and 6"));
        }

        if self.resize_enabled && self.resize_width == 0 {
            return Err(anyhow::anyhow!("Resize width must be greater than 0"));
        }

        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.job_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Job timeout must be greater than 0 seconds"));
        }

        self.validate_webp()?;
        self.validate_directories()?;

        Ok(())
    }

    fn validate_webp(&self) -> Result<()> {
        let webp = &self.webp;
        let percentages = [
            ("sns_strength", webp.sns_strength),
            ("filter_strength", webp.filter_strength),
            ("partition_limit", webp.partition_limit),
            ("alpha_quality", webp.alpha_quality),
            ("near_lossless", webp.near_lossless),
        ];
        for (name, value) in percentages {
            if value > 100 {
                return Err(anyhow::anyhow!("WebP {} must be between 0 and 100", name));
            }
        }

        if webp.filter_sharpness > 7 {
            return Err(anyhow::anyhow!("WebP filter_sharpness must be between 0 and 7"));
        }
        if !(1..=4).contains(&webp.segments) {
            return Err(anyhow::anyhow!("WebP segments must be between 1 and 4"));
        }
        if !(1..=10).contains(&webp.pass) {
            return Err(anyhow::anyhow!("WebP pass must be between 1 and 10"));
        }
        if webp.target_psnr < 0.0 {
            return Err(anyhow::anyhow!("WebP target_psnr must not be negative"));
        }

        Ok(())
    }

    /// The output root is wiped at startup: it must never hold the input tree
    fn validate_directories(&self) -> Result<()> {
        let input = normalize(&self.input_dir);
        let output = normalize(&self.output_dir);

        if input == output {
            return Err(anyhow::anyhow!(
                "Output directory must differ from input directory: {}",
                self.output_dir.display()
            ));
        }
        if input.starts_with(&output) {
            return Err(anyhow::anyhow!(
                "Output directory {} contains the input directory {} and would be wiped",
                self.output_dir.display(),
                self.input_dir.display()
            ));
        }

        Ok(())
    }

    /// Worker count for the codec, defaulting to the host's parallelism
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Encode options shared by every job
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            target_format: self.target_format,
            quality: self.quality,
            method: self.method,
            webp: self.webp.clone(),
        }
    }

    /// Preprocessing applied to every image
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            resize: self.resize_enabled.then_some(ResizeOptions {
                width: self.resize_width,
            }),
        }
    }

    pub fn extension_policy(&self) -> ExtensionPolicy {
        ExtensionPolicy::from_enabled(self.extension_rewrite_enabled)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-transcoder").join("config.json"))
    }

    /// Load configuration from file.
    ///
    /// Not validated here: callers apply their overrides first, then `validate`.
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Absolute, canonical form when the path exists, lexical otherwise
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.quality = 101;
        assert!(config.validate().is_err());

        config.quality = 0;
        assert!(config.validate().is_ok());

        config.method = 7;
        assert!(config.validate().is_err());

        config.method = 6;
        config.resize_width = 0;
        assert!(config.validate().is_err());

        config.resize_enabled = false;
        assert!(config.validate().is_ok());

        config.workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webp_tuning_validation() {
        let mut config = Config::default();
        config.webp.segments = 0;
        assert!(config.validate().is_err());

        config.webp.segments = 4;
        config.webp.alpha_quality = 150;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_must_not_hold_input() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("photos/original")).unwrap();

        let mut config = Config {
            input_dir: root.join("photos/original"),
            output_dir: root.join("photos/original"),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.output_dir = root.join("photos");
        assert!(config.validate().is_err());

        config.output_dir = root.join("squooshed");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.quality, 25);
        assert_eq!(config.method, 6);
        assert_eq!(config.resize_width, 1920);
        assert!(config.resize_enabled);
        assert!(config.extension_rewrite_enabled);
        assert_eq!(config.target_format, TargetFormat::Webp);
        assert_eq!(config.extension_policy(), ExtensionPolicy::Rewrite);
        assert!(config.effective_workers() >= 1);
        assert_eq!(
            config.preprocess_options().resize,
            Some(ResizeOptions { width: 1920 })
        );
    }

    #[test]
    fn test_resize_disabled_has_no_preprocessing() {
        let config = Config {
            resize_enabled: false,
            ..Default::default()
        };
        assert_eq!(config.preprocess_options(), PreprocessOptions::default());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/config.json");

        let original_config = Config {
            input_dir: temp_dir.path().join("in"),
            output_dir: temp_dir.path().join("out"),
            quality: 80,
            target_format: TargetFormat::Png,
            extension_rewrite_enabled: false,
            workers: Some(3),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.quality, 80);
        assert_eq!(loaded_config.target_format, TargetFormat::Png);
        assert!(!loaded_config.extension_rewrite_enabled);
        assert_eq!(loaded_config.workers, Some(3));
        assert_eq!(loaded_config.output_dir, temp_dir.path().join("out"));
    }

    #[tokio::test]
    async fn test_file_values_can_be_overridden_before_validation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let shared = temp_dir.path().join("photos");

        let from_disk = Config {
            input_dir: shared.clone(),
            output_dir: shared,
            quality: 150,
            ..Default::default()
        };
        from_disk.save_to_file(&config_path).await.unwrap();

        let mut config = Config::from_file(&config_path).await.unwrap();
        assert!(config.validate().is_err());

        config.output_dir = temp_dir.path().join("squooshed");
        config.quality = 40;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_missing_config_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("none.json")).await.unwrap();
        assert_eq!(config.quality, Config::default().quality);
    }
}
