//! # Image Pool
//!
//! Concrete [`ImageCodec`] backed by the `image` crate, with WebP output
//! delegated to `cwebp`.
//!
//! The pool is the only throttle on CPU-bound work in a run: every operation
//! acquires one of `workers` semaphore permits and then runs on tokio's
//! blocking thread pool (or, for WebP, waits on the cwebp child process).
//! Jobs may be submitted without limit; at most `workers` of them are
//! decoding, resizing or encoding at any moment.

use crate::codec::{resize, webp, EncodeOptions, EncodedAsset, ImageCodec, PreprocessOptions, TargetFormat};
use crate::error::CodecError;
use crate::platform::PlatformCommands;
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

/// Image codec with a fixed number of workers
pub struct ImagePool {
    permits: Arc<Semaphore>,
    workers: usize,
    /// Resolved cwebp binary, present only when encoding to WebP
    cwebp: Option<PathBuf>,
}

impl ImagePool {
    /// Creates a pool with `workers` parallel slots.
    ///
    /// When `options` targets WebP the cwebp encoder is resolved here, so a
    /// missing tool is reported once, before any job runs.
    pub fn new(workers: usize, options: &EncodeOptions) -> Result<Self, CodecError> {
        let workers = workers.max(1);

        let cwebp = match options.target_format {
            TargetFormat::Webp => {
                let platform = PlatformCommands::instance();
                let path = platform.get_tool_path("cwebp").ok_or_else(|| {
                    CodecError::MissingTool(format!(
                        "cwebp (install with: {})",
                        platform.install_instructions("cwebp")
                    ))
                })?;
                Some(path)
            }
            TargetFormat::Png | TargetFormat::Jpeg => None,
        };

        info!(
            "Image pool ready: {} workers, target format {}",
            workers, options.target_format
        );

        Ok(Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            cwebp,
        })
    }

    /// Number of operations allowed to run in parallel
    pub fn workers(&self) -> usize {
        self.workers
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, CodecError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CodecError::Closed)
    }

    /// Runs CPU-bound `work` on the blocking pool while holding a worker slot.
    ///
    /// The permit moves into the blocking closure: if the caller is dropped
    /// (e.g. on a job timeout) the slot stays taken until `work` returns.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, CodecError>
    where
        F: FnOnce() -> Result<T, CodecError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| CodecError::Worker(e.to_string()))?
    }
}

/// Encodes `image` in memory with one of the `image` crate encoders
fn encode_in_memory(image: &DynamicImage, format: ImageOutputFormat) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

impl ImageCodec for ImagePool {
    type Handle = DynamicImage;

    async fn ingest(&self, bytes: Vec<u8>) -> Result<DynamicImage, CodecError> {
        self.run_blocking(move || {
            image::load_from_memory(&bytes).map_err(|e| CodecError::Decode(e.to_string()))
        })
        .await
    }

    async fn preprocess(
        &self,
        handle: DynamicImage,
        ops: &PreprocessOptions,
    ) -> Result<DynamicImage, CodecError> {
        match ops.resize {
            Some(resize) => {
                let width = resize.width;
                self.run_blocking(move || resize::resize_to_width(&handle, width)).await
            }
            None => Ok(handle),
        }
    }

    async fn encode(
        &self,
        handle: DynamicImage,
        options: &EncodeOptions,
    ) -> Result<EncodedAsset, CodecError> {
        let format = options.target_format;
        let bytes = match format {
            TargetFormat::Png => {
                self.run_blocking(move || encode_in_memory(&handle, ImageOutputFormat::Png))
                    .await?
            }
            TargetFormat::Jpeg => {
                // JPEG has no alpha channel
                let quality = options.quality.clamp(1, 100);
                self.run_blocking(move || {
                    let rgb = DynamicImage::ImageRgb8(handle.to_rgb8());
                    encode_in_memory(&rgb, ImageOutputFormat::Jpeg(quality))
                })
                .await?
            }
            TargetFormat::Webp => {
                let cwebp = self
                    .cwebp
                    .as_deref()
                    .ok_or_else(|| CodecError::MissingTool("cwebp".to_string()))?;
                let permit = self.acquire().await?;
                webp::encode_with_cwebp(cwebp, handle, options, permit).await?
            }
        };

        debug!("Encoded {} bytes as {}", bytes.len(), format);
        Ok(EncodedAsset { format, bytes })
    }

    async fn close(&self) {
        self.permits.close();
        info!("Image pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ResizeOptions, WebpTuning};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn options(target_format: TargetFormat) -> EncodeOptions {
        EncodeOptions {
            target_format,
            quality: 75,
            method: 4,
            webp: WebpTuning::default(),
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        encode_in_memory(&DynamicImage::ImageRgba8(image), ImageOutputFormat::Png).unwrap()
    }

    #[tokio::test]
    async fn test_png_roundtrip_with_resize() {
        let pool = ImagePool::new(2, &options(TargetFormat::Png)).unwrap();
        assert_eq!(pool.workers(), 2);

        let handle = pool.ingest(png_bytes(64, 32)).await.unwrap();
        let ops = PreprocessOptions {
            resize: Some(ResizeOptions { width: 16 }),
        };
        let handle = pool.preprocess(handle, &ops).await.unwrap();
        let asset = pool.encode(handle, &options(TargetFormat::Png)).await.unwrap();

        assert_eq!(asset.format, TargetFormat::Png);
        assert_eq!(image::guess_format(&asset.bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));

        pool.close().await;
    }

    #[tokio::test]
    async fn test_jpeg_encode_drops_alpha() {
        let pool = ImagePool::new(1, &options(TargetFormat::Jpeg)).unwrap();
        let handle = pool.ingest(png_bytes(8, 8)).await.unwrap();
        let asset = pool.encode(handle, &options(TargetFormat::Jpeg)).await.unwrap();

        assert_eq!(image::guess_format(&asset.bytes).unwrap(), ImageFormat::Jpeg);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_ingest_rejects_non_image() {
        let pool = ImagePool::new(1, &options(TargetFormat::Png)).unwrap();
        let result = pool.ingest(b"definitely not an image".to_vec()).await;
        assert!(matches!(result, Err(CodecError::Decode(_))));
        pool.close().await;
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        let pool = ImagePool::new(1, &options(TargetFormat::Png)).unwrap();
        pool.close().await;
        let result = pool.ingest(png_bytes(4, 4)).await;
        assert!(matches!(result, Err(CodecError::Closed)));
    }

    /// Blocking job that records how many jobs run at the same time
    fn tracked_work(
        active: &Arc<AtomicUsize>,
        peak: &Arc<AtomicUsize>,
        duration: Duration,
    ) -> impl FnOnce() -> Result<(), CodecError> + Send + 'static {
        let active = Arc::clone(active);
        let peak = Arc::clone(peak);
        move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(duration);
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_in_flight_work_bounded_by_workers() {
        let pool = ImagePool::new(2, &options(TargetFormat::Png)).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..6).map(|_| {
            pool.run_blocking(tracked_work(&active, &peak, Duration::from_millis(50)))
        });
        let results = futures::future::join_all(jobs).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_timed_out_work_keeps_its_worker_slot() {
        let pool = ImagePool::new(1, &options(TargetFormat::Png)).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let slow = pool.run_blocking(tracked_work(&active, &peak, Duration::from_millis(400)));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), slow).await;
        assert!(timed_out.is_err());

        // Waits for the abandoned work to release the only slot
        pool.run_blocking(tracked_work(&active, &peak, Duration::from_millis(10)))
            .await
            .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_webp_encode_when_cwebp_available() {
        if !PlatformCommands::instance().is_command_available("cwebp") {
            // cwebp not installed in this environment
            assert!(matches!(
                ImagePool::new(1, &options(TargetFormat::Webp)),
                Err(CodecError::MissingTool(_))
            ));
            return;
        }

        let pool = ImagePool::new(1, &options(TargetFormat::Webp)).unwrap();
        let handle = pool.ingest(png_bytes(32, 32)).await.unwrap();
        let asset = pool.encode(handle, &options(TargetFormat::Webp)).await.unwrap();
        assert_eq!(image::guess_format(&asset.bytes).unwrap(), ImageFormat::WebP);
        pool.close().await;
    }
}
