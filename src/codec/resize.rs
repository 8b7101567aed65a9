//! # Image Resize Module
//!
//! Resize vincolato in larghezza che preserva l'aspect ratio.
//! Il resize viene sempre eseguito quando abilitato, anche in upscaling:
//! la larghezza finale è sempre quella configurata.

use crate::error::CodecError;
use image::imageops::FilterType;
use image::DynamicImage;

/// Filtro usato per il resize (Lanczos3 - migliore qualità per downscaling)
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Calcola le dimensioni finali per una larghezza target
pub fn target_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    (target_width, (scaled as u32).max(1))
}

/// Ridimensiona l'immagine alla larghezza richiesta
pub fn resize_to_width(image: &DynamicImage, target_width: u32) -> Result<DynamicImage, CodecError> {
    if target_width == 0 {
        return Err(CodecError::Preprocess("Resize width must be greater than 0".to_string()));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::Preprocess(format!(
            "Cannot resize an empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let (width, height) = target_dimensions(image.width(), image.height(), target_width);
    Ok(image.resize_exact(width, height, RESIZE_FILTER))
}
