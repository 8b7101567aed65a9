//! WebP encoding through the external `cwebp` encoder.
//!
//! The decoded (and possibly resized) image is staged as a lossless PNG in a
//! private temporary directory, `cwebp` encodes it with the configured
//! quality, method and tuning flags, and the resulting bytes are read back.

use crate::codec::{EncodeOptions, WebpTuning};
use crate::error::CodecError;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

/// Builds the cwebp command line for `input` -> `output`
pub fn cwebp_args(options: &EncodeOptions, input: &Path, output: &Path) -> Vec<String> {
    let tuning = &options.webp;
    let mut args = owned([
        "-quiet",
        "-q",
        &options.quality.to_string(),
        "-m",
        &options.method.to_string(),
        "-sns",
        &tuning.sns_strength.to_string(),
        "-f",
        &tuning.filter_strength.to_string(),
        "-sharpness",
        &tuning.filter_sharpness.to_string(),
        if tuning.filter_type == 0 { "-nostrong" } else { "-strong" },
        "-segments",
        &tuning.segments.to_string(),
        "-pass",
        &tuning.pass.to_string(),
        "-alpha_q",
        &tuning.alpha_quality.to_string(),
        "-alpha_method",
        &tuning.alpha_compression.to_string(),
        "-alpha_filter",
        alpha_filter_name(tuning),
    ]);

    if tuning.target_size > 0 {
        args.extend(owned(["-size", &tuning.target_size.to_string()]));
    }
    if tuning.target_psnr > 0.0 {
        args.extend(owned(["-psnr", &tuning.target_psnr.to_string()]));
    }
    if tuning.partition_limit > 0 {
        args.extend(owned(["-partition_limit", &tuning.partition_limit.to_string()]));
    }
    if tuning.preprocessing > 0 {
        args.extend(owned(["-pre", &tuning.preprocessing.to_string()]));
    }
    if let Some(hint) = image_hint_name(tuning) {
        args.extend(owned(["-hint", hint]));
    }
    if tuning.near_lossless < 100 {
        args.extend(owned(["-near_lossless", &tuning.near_lossless.to_string()]));
    }

    let switches = [
        (tuning.autofilter, "-af"),
        (tuning.lossless, "-lossless"),
        (tuning.exact, "-exact"),
        (tuning.use_sharp_yuv, "-sharp_yuv"),
        (tuning.low_memory, "-low_memory"),
        (tuning.emulate_jpeg_size, "-jpeg_like"),
    ];
    args.extend(switches.iter().filter(|(on, _)| *on).map(|(_, flag)| flag.to_string()));

    args.push(input.to_string_lossy().into_owned());
    args.push("-o".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

fn owned<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

fn alpha_filter_name(tuning: &WebpTuning) -> &'static str {
    match tuning.alpha_filtering {
        0 => "none",
        1 => "fast",
        _ => "best",
    }
}

fn image_hint_name(tuning: &WebpTuning) -> Option<&'static str> {
    match tuning.image_hint {
        1 => Some("picture"),
        2 => Some("photo"),
        3 => Some("graph"),
        _ => None,
    }
}

/// Encodes `image` to WebP with the cwebp binary at `cwebp`.
///
/// `permit` is the caller's worker slot. It is held by the staging thread
/// and then for the lifetime of the cwebp child, which is killed if this
/// future is dropped.
pub async fn encode_with_cwebp(
    cwebp: &Path,
    image: DynamicImage,
    options: &EncodeOptions,
    permit: OwnedSemaphorePermit,
) -> Result<Vec<u8>, CodecError> {
    let workdir = tempfile::tempdir()?;
    let input = workdir.path().join("input.png");
    let output = workdir.path().join("output.webp");

    let staged = input.clone();
    let (staging, _permit) = tokio::task::spawn_blocking(move || {
        (image.save_with_format(&staged, ImageFormat::Png), permit)
    })
    .await
    .map_err(|e| CodecError::Worker(e.to_string()))?;
    staging.map_err(|e| CodecError::Encode(format!("Failed to stage image for cwebp: {}", e)))?;

    let args = cwebp_args(options, &input, &output);
    debug!("Command arguments: {:?}", args);

    let start_time = Instant::now();
    let result = Command::new(cwebp)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await?;
    let elapsed = start_time.elapsed();

    if !result.status.success() {
        return Err(CodecError::Encode(format!(
            "cwebp failed after {:?} ({}): {}",
            elapsed,
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }
    debug!("cwebp completed successfully in {:?}", elapsed);

    Ok(tokio::fs::read(&output).await?)
}
