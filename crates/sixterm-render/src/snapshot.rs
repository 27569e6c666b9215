#![forbid(unsafe_code)]

//! PNG snapshots of a canvas, for debugging and golden-image tests.
//!
//! Indices with no palette entry render black.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::canvas::PixelCanvas;
use crate::palette::{ColorPalette, Rgb};

/// Errors from snapshot export.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("cannot snapshot an empty canvas")]
    Empty,
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode error: {0}")]
    Encode(#[from] image::ImageError),
}

/// Resolve every cell to its RGB color.
#[must_use]
pub fn canvas_to_rgb(canvas: &PixelCanvas, palette: &ColorPalette) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let rgb = canvas
            .get(x, y)
            .and_then(|index| palette.rgb(index))
            .unwrap_or(Rgb::new(0, 0, 0));
        image::Rgb([rgb.r, rgb.g, rgb.b])
    })
}

/// Encode the canvas as PNG bytes.
pub fn encode_png(canvas: &PixelCanvas, palette: &ColorPalette) -> Result<Vec<u8>, SnapshotError> {
    if canvas.is_empty() {
        return Err(SnapshotError::Empty);
    }
    let mut out = Cursor::new(Vec::new());
    canvas_to_rgb(canvas, palette).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Write the canvas to `path` as PNG, creating parent directories.
pub fn save_png(
    canvas: &PixelCanvas,
    palette: &ColorPalette,
    path: impl AsRef<Path>,
) -> Result<(), SnapshotError> {
    let bytes = encode_png(canvas, palette)?;
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), "canvas snapshot written");
    Ok(())
}
