//! # Image Codec Module
//!
//! Interfaccia verso il collaboratore che conosce i formati immagine.
//! Il resto del crate vede solo `ImageCodec`: ingest, preprocess, encode, close.
//!
//! - `pool`: implementazione concreta (`ImagePool`) con worker limitati
//! - `resize`: calcolo delle dimensioni per il resize vincolato in larghezza
//! - `webp`: encoding WebP tramite il tool esterno `cwebp`

pub mod pool;
pub mod resize;
pub mod webp;

pub use pool::ImagePool;

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// Output formats the transcoder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Webp,
    Png,
    Jpeg,
}

impl TargetFormat {
    /// File extension written for this format (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Webp => "webp",
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetFormat::Webp => "webp",
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
        };
        f.write_str(name)
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(TargetFormat::Webp),
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            other => Err(format!("Unsupported target format: {other} (expected webp, png or jpeg)")),
        }
    }
}

/// WebP encoder tuning, mirrors the libwebp `WebPConfig` knobs exposed by cwebp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpTuning {
    /// Target size in bytes (0 = disabled)
    pub target_size: u32,
    /// Target PSNR in dB (0 = disabled)
    pub target_psnr: f32,
    /// Spatial noise shaping strength (0-100)
    pub sns_strength: u8,
    /// Deblocking filter strength (0-100)
    pub filter_strength: u8,
    /// Filter sharpness (0-7)
    pub filter_sharpness: u8,
    /// 0 = simple filter, 1 = strong filter
    pub filter_type: u8,
    /// Number of segments (1-4)
    pub segments: u8,
    /// Entropy analysis passes (1-10)
    pub pass: u8,
    /// Preprocessing filter (0 = none)
    pub preprocessing: u8,
    pub autofilter: bool,
    /// Partition 0 quality degradation limit (0-100)
    pub partition_limit: u8,
    /// Alpha compression method (0 = none, 1 = lossless)
    pub alpha_compression: u8,
    /// Alpha predictive filter (0 = none, 1 = fast, 2 = best)
    pub alpha_filtering: u8,
    /// Alpha plane quality (0-100)
    pub alpha_quality: u8,
    pub lossless: bool,
    /// Preserve RGB values under transparent areas
    pub exact: bool,
    /// Near-lossless preprocessing level (100 = off)
    pub near_lossless: u8,
    pub use_sharp_yuv: bool,
    pub low_memory: bool,
    /// Tune parameters to match JPEG output size
    pub emulate_jpeg_size: bool,
    /// 0 = default, 1 = picture, 2 = photo, 3 = graph
    pub image_hint: u8,
}

impl Default for WebpTuning {
    fn default() -> Self {
        Self {
            target_size: 0,
            target_psnr: 0.0,
            sns_strength: 50,
            filter_strength: 60,
            filter_sharpness: 0,
            filter_type: 1,
            segments: 4,
            pass: 1,
            preprocessing: 0,
            autofilter: false,
            partition_limit: 0,
            alpha_compression: 1,
            alpha_filtering: 1,
            alpha_quality: 100,
            lossless: false,
            exact: false,
            near_lossless: 100,
            use_sharp_yuv: false,
            low_memory: false,
            emulate_jpeg_size: false,
            image_hint: 0,
        }
    }
}

/// Encode parameters shared read-only by every job of a run
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub target_format: TargetFormat,
    /// Encoder quality (0-100)
    pub quality: u8,
    /// Encoder effort, WebP `-m` (0 = fast, 6 = slowest/best)
    pub method: u8,
    pub webp: WebpTuning,
}

/// Width-constrained, aspect-preserving resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOptions {
    pub width: u32,
}

/// Operations applied to a decoded image before encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessOptions {
    pub resize: Option<ResizeOptions>,
}

/// Encoded output of a single image
#[derive(Debug, Clone)]
pub struct EncodedAsset {
    pub format: TargetFormat,
    pub bytes: Vec<u8>,
}

/// Capability interface of the image codec collaborator.
///
/// A single instance is shared by every in-flight job of a run, so every
/// operation takes `&self`; bounding how much work runs in parallel is the
/// implementation's job. `close` is called exactly once, after all jobs have
/// settled; any call made afterwards fails with [`CodecError::Closed`].
pub trait ImageCodec: Send + Sync + 'static {
    /// Opaque decoded image
    type Handle: Send + 'static;

    fn ingest(&self, bytes: Vec<u8>) -> impl Future<Output = Result<Self::Handle, CodecError>> + Send;

    fn preprocess(
        &self,
        handle: Self::Handle,
        ops: &PreprocessOptions,
    ) -> impl Future<Output = Result<Self::Handle, CodecError>> + Send;

    fn encode(
        &self,
        handle: Self::Handle,
        options: &EncodeOptions,
    ) -> impl Future<Output = Result<EncodedAsset, CodecError>> + Send;

    fn close(&self) -> impl Future<Output = ()> + Send;
}
