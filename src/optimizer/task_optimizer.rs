//! # Task Optimizer Module
//!
//! Worker per la transcodifica di un singolo file.
//! Separato dall'orchestratore: riceve un `TranscodeJob`, lo consuma e
//! restituisce solo un risultato (nessuno stato condiviso mutabile).
//!
//! Passi per ogni file:
//! 1. Lettura completa del file di input
//! 2. Ingest nel codec (decode)
//! 3. Resize opzionale (sempre eseguito se abilitato)
//! 4. Encode nel formato target
//! 5. Creazione delle directory di output mancanti
//! 6. Scrittura del file (sostituisce un eventuale file esistente)

use crate::{
    codec::{EncodeOptions, ImageCodec, PreprocessOptions},
    config::Config,
    error::TranscodeError,
    optimizer::path_resolver::{ExtensionPolicy, PathResolver},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Impostazioni read-only condivise da tutti i job di un run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub encode: EncodeOptions,
    pub preprocess: PreprocessOptions,
    pub extension_policy: ExtensionPolicy,
    pub timeout: Option<Duration>,
}

impl JobSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_root: config.input_dir.clone(),
            output_root: config.output_dir.clone(),
            encode: config.encode_options(),
            preprocess: config.preprocess_options(),
            extension_policy: config.extension_policy(),
            timeout: config.job_timeout(),
        }
    }
}

/// Unità di lavoro effimera: un file da transcodificare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Path relativo alla root di input
    pub relative_path: PathBuf,
    /// Path di output già risolto sotto la root di output
    pub output_path: PathBuf,
}

impl TranscodeJob {
    pub fn new(relative_path: PathBuf, settings: &JobSettings) -> Self {
        let output_path = PathResolver::output_path(
            &settings.output_root,
            &relative_path,
            settings.extension_policy,
            settings.encode.target_format,
        );
        Self {
            relative_path,
            output_path,
        }
    }
}

/// Worker che esegue i job contro il codec condiviso
pub struct TaskOptimizer<C> {
    codec: Arc<C>,
    settings: Arc<JobSettings>,
}

impl<C> Clone for TaskOptimizer<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<C: ImageCodec> TaskOptimizer<C> {
    pub fn new(codec: Arc<C>, settings: Arc<JobSettings>) -> Self {
        Self { codec, settings }
    }

    /// Esegue un job, applicando il timeout se configurato.
    /// Restituisce il numero di byte scritti.
    pub async fn run(&self, job: TranscodeJob) -> Result<u64, TranscodeError> {
        match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, self.process(&job))
                .await
                .unwrap_or_else(|_| {
                    Err(TranscodeError::Timeout {
                        path: job.relative_path.clone(),
                        seconds: limit.as_secs(),
                    })
                }),
            None => self.process(&job).await,
        }
    }

    /// Processa un singolo file
    async fn process(&self, job: &TranscodeJob) -> Result<u64, TranscodeError> {
        let path = &job.relative_path;
        let input_path = self.settings.input_root.join(path);
        debug!("transcoding {} ...", path.display());

        let bytes = tokio::fs::read(&input_path)
            .await
            .map_err(|source| TranscodeError::Read {
                path: path.clone(),
                source,
            })?;

        let handle = self
            .codec
            .ingest(bytes)
            .await
            .map_err(|cause| TranscodeError::Decode {
                path: path.clone(),
                cause,
            })?;

        // Il resize dipende solo dalla configurazione, non dalle dimensioni dell'immagine
        let handle = if self.settings.preprocess.resize.is_some() {
            self.codec
                .preprocess(handle, &self.settings.preprocess)
                .await
                .map_err(|cause| TranscodeError::Encode {
                    path: path.clone(),
                    cause,
                })?
        } else {
            handle
        };

        let asset = self
            .codec
            .encode(handle, &self.settings.encode)
            .await
            .map_err(|cause| TranscodeError::Encode {
                path: path.clone(),
                cause,
            })?;

        PathResolver::ensure_parent_dirs(&job.output_path)
            .await
            .map_err(|source| TranscodeError::Write {
                path: path.clone(),
                source,
            })?;

        tokio::fs::write(&job.output_path, &asset.bytes)
            .await
            .map_err(|source| TranscodeError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(
            "{} -> {} ({} bytes)",
            path.display(),
            job.output_path.display(),
            asset.bytes.len()
        );
        Ok(asset.bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodedAsset, ResizeOptions, TargetFormat, WebpTuning};
    use crate::error::CodecError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Codec finto: "decodifica" qualsiasi byte che non inizi con `corrupt`
    #[derive(Default)]
    struct EchoCodec {
        preprocess_calls: AtomicUsize,
        slow: bool,
    }

    impl ImageCodec for EchoCodec {
        type Handle = Vec<u8>;

        async fn ingest(&self, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
            if bytes.starts_with(b"corrupt") {
                return Err(CodecError::Decode("unknown format".to_string()));
            }
            if self.slow {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(bytes)
        }

        async fn preprocess(&self, handle: Vec<u8>, ops: &PreprocessOptions) -> Result<Vec<u8>, CodecError> {
            self.preprocess_calls.fetch_add(1, Ordering::SeqCst);
            let width = ops.resize.map(|r| r.width).unwrap_or_default();
            let mut out = format!("resized:{}:", width).into_bytes();
            out.extend(handle);
            Ok(out)
        }

        async fn encode(&self, handle: Vec<u8>, options: &EncodeOptions) -> Result<EncodedAsset, CodecError> {
            let mut bytes = format!("{}:", options.target_format).into_bytes();
            bytes.extend(handle);
            Ok(EncodedAsset {
                format: options.target_format,
                bytes,
            })
        }

        async fn close(&self) {}
    }

    fn settings(root: &TempDir, resize: bool, policy: ExtensionPolicy) -> JobSettings {
        JobSettings {
            input_root: root.path().join("in"),
            output_root: root.path().join("out"),
            encode: EncodeOptions {
                target_format: TargetFormat::Webp,
                quality: 25,
                method: 6,
                webp: WebpTuning::default(),
            },
            preprocess: PreprocessOptions {
                resize: resize.then_some(ResizeOptions { width: 1920 }),
            },
            extension_policy: policy,
            timeout: None,
        }
    }

    fn write_input(root: &TempDir, relative: &str, content: &[u8]) -> PathBuf {
        let path = root.path().join("in").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        PathBuf::from(relative)
    }

    #[test]
    fn test_job_output_path() {
        let root = TempDir::new().unwrap();
        let settings = settings(&root, false, ExtensionPolicy::Rewrite);
        let job = TranscodeJob::new(PathBuf::from("a/b/photo.PNG"), &settings);
        assert_eq!(job.output_path, root.path().join("out/a/b/photo.webp"));
    }

    #[tokio::test]
    async fn test_process_writes_encoded_file() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "a/b/photo.PNG", b"pixels");
        let settings = Arc::new(settings(&root, true, ExtensionPolicy::Rewrite));
        let codec = Arc::new(EchoCodec::default());
        let worker = TaskOptimizer::new(Arc::clone(&codec), Arc::clone(&settings));

        let written = worker.run(TranscodeJob::new(relative, &settings)).await.unwrap();

        let output = std::fs::read(root.path().join("out/a/b/photo.webp")).unwrap();
        assert_eq!(output, b"webp:resized:1920:pixels");
        assert_eq!(written, output.len() as u64);
        assert_eq!(codec.preprocess_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_without_resize_keeps_name() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "photo.PNG", b"pixels");
        let settings = Arc::new(settings(&root, false, ExtensionPolicy::Keep));
        let codec = Arc::new(EchoCodec::default());
        let worker = TaskOptimizer::new(Arc::clone(&codec), Arc::clone(&settings));

        worker.run(TranscodeJob::new(relative, &settings)).await.unwrap();

        let output = std::fs::read(root.path().join("out/photo.PNG")).unwrap();
        assert_eq!(output, b"webp:pixels");
        assert_eq!(codec.preprocess_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_process_replaces_existing_output() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "photo.png", b"new");
        let settings = Arc::new(settings(&root, false, ExtensionPolicy::Rewrite));
        std::fs::create_dir_all(root.path().join("out")).unwrap();
        std::fs::write(root.path().join("out/photo.webp"), b"a much longer stale content").unwrap();

        let worker = TaskOptimizer::new(Arc::new(EchoCodec::default()), Arc::clone(&settings));
        worker.run(TranscodeJob::new(relative, &settings)).await.unwrap();

        assert_eq!(std::fs::read(root.path().join("out/photo.webp")).unwrap(), b"webp:new");
    }

    #[tokio::test]
    async fn test_missing_input_is_read_error() {
        let root = TempDir::new().unwrap();
        let settings = Arc::new(settings(&root, false, ExtensionPolicy::Rewrite));
        let worker = TaskOptimizer::new(Arc::new(EchoCodec::default()), Arc::clone(&settings));

        let err = worker
            .run(TranscodeJob::new(PathBuf::from("gone.png"), &settings))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Read { .. }));
        assert_eq!(err.path(), &PathBuf::from("gone.png"));
    }

    #[tokio::test]
    async fn test_corrupt_input_is_decode_error() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "bad.png", b"corrupt bytes");
        let settings = Arc::new(settings(&root, false, ExtensionPolicy::Rewrite));
        let worker = TaskOptimizer::new(Arc::new(EchoCodec::default()), Arc::clone(&settings));

        let err = worker.run(TranscodeJob::new(relative, &settings)).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Decode { .. }));
        assert!(!root.path().join("out/bad.webp").exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_write_error() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "a/photo.png", b"pixels");
        let settings = Arc::new(settings(&root, false, ExtensionPolicy::Rewrite));
        // A file where the parent directory should be
        std::fs::create_dir_all(root.path().join("out")).unwrap();
        std::fs::write(root.path().join("out/a"), b"not a dir").unwrap();

        let worker = TaskOptimizer::new(Arc::new(EchoCodec::default()), Arc::clone(&settings));
        let err = worker.run(TranscodeJob::new(relative, &settings)).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Write { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let root = TempDir::new().unwrap();
        let relative = write_input(&root, "slow.png", b"pixels");
        let mut job_settings = settings(&root, false, ExtensionPolicy::Rewrite);
        job_settings.timeout = Some(Duration::from_millis(50));
        let settings = Arc::new(job_settings);
        let codec = Arc::new(EchoCodec {
            slow: true,
            ..Default::default()
        });

        let worker = TaskOptimizer::new(codec, Arc::clone(&settings));
        let err = worker.run(TranscodeJob::new(relative, &settings)).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Timeout { .. }));
    }
}
