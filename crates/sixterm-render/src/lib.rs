#![forbid(unsafe_code)]

//! Indexed-color drawing surface and sixel codec.
//!
//! A [`ColorPalette`] hands out stable indices for named colors, a
//! [`PixelCanvas`] holds those indices, and [`encode_frame`] serializes the
//! pair into one sixel payload ready for a single terminal write.
//!
//! ```
//! use sixterm_render::{ColorPalette, PixelCanvas, encode_frame};
//!
//! let mut palette = ColorPalette::new();
//! let bg = palette.register("background", 0, 0, 0).unwrap();
//! let fg = palette.register("accent", 70, 130, 200).unwrap();
//!
//! let mut canvas = PixelCanvas::filled(16, 12, bg);
//! canvas.set(3, 4, fg);
//!
//! let bytes = encode_frame(&canvas, &palette);
//! assert!(bytes.starts_with(b"\x1bPq\"1;1;16;12"));
//! assert!(bytes.ends_with(b"\x1b\\"));
//! ```

pub mod canvas;
pub mod decode;
pub mod palette;
pub mod sixel;
#[cfg(feature = "png")]
pub mod snapshot;
pub mod wire;

pub use canvas::PixelCanvas;
pub use decode::{DecodeError, DecodedImage, RoundTripError, SixelDecoder, verify_roundtrip};
pub use palette::{ColorPalette, PaletteError, Rgb, scale_to_percent};
pub use sixel::{SixelEncoder, band_count, encode_frame};
