#![forbid(unsafe_code)]

//! Sixel encoder.
//!
//! Output layout for one frame:
//!
//! ```text
//! ESC P q  "1;1;W;H  #0;2;r;g;b #1;2;r;g;b ...  <band 0> - <band 1> - ...  ESC \
//! ```
//!
//! Each band covers six canvas rows. Inside a band, every color that appears
//! in those rows gets one pass: `#index` followed by one run-length encoded
//! glyph per column, where bit `i` of the glyph is set when row `band + i`
//! holds that color. Passes are emitted in ascending index order and
//! separated by `$`, which rewinds to the start of the band.
//!
//! The encoder is a pure function of canvas and palette.

use crate::canvas::PixelCanvas;
use crate::palette::ColorPalette;
use crate::wire::{self, push_decimal};

/// Runs at least this long use the `!N<glyph>` form by default.
pub const DEFAULT_RLE_THRESHOLD: usize = 3;

/// Number of bands needed for `height` rows.
#[inline]
#[must_use]
pub const fn band_count(height: u32) -> u32 {
    height.div_ceil(wire::BAND_HEIGHT)
}

/// Encode `canvas` with the default settings.
#[must_use]
pub fn encode_frame(canvas: &PixelCanvas, palette: &ColorPalette) -> Vec<u8> {
    SixelEncoder::default().encode(canvas, palette)
}

/// Canvas-to-sixel serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SixelEncoder {
    rle_threshold: usize,
}

impl Default for SixelEncoder {
    fn default() -> Self {
        Self {
            rle_threshold: DEFAULT_RLE_THRESHOLD,
        }
    }
}

impl SixelEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the repeat form for runs of at least `threshold` columns.
    ///
    /// Any threshold produces valid output; 0 behaves like 1.
    #[must_use]
    pub fn with_rle_threshold(mut self, threshold: usize) -> Self {
        self.rle_threshold = threshold.max(1);
        self
    }

    #[must_use]
    pub const fn rle_threshold(&self) -> usize {
        self.rle_threshold
    }

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn encode(&self, canvas: &PixelCanvas, palette: &ColorPalette) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(canvas, palette, &mut out);
        out
    }

    /// Append the encoded frame to `out`.
    pub fn encode_into(&self, canvas: &PixelCanvas, palette: &ColorPalette, out: &mut Vec<u8>) {
        let width = canvas.width();
        let height = canvas.height();
        let bands = band_count(height);
        let _span = tracing::trace_span!("sixel.encode", width, height, bands).entered();

        out.reserve(64 + palette.len() * 16 + width as usize * bands as usize * 2);
        out.extend_from_slice(wire::INTRODUCER);
        out.push(wire::RASTER);
        out.extend_from_slice(b"1;1;");
        push_decimal(out, width);
        out.push(b';');
        push_decimal(out, height);
        palette.write_preamble(out);

        let mut values = vec![0u8; width as usize];
        for band in 0..bands {
            if band > 0 {
                out.push(wire::BAND_SEPARATOR);
            }
            self.encode_band(canvas, band * wire::BAND_HEIGHT, &mut values, out);
        }

        out.extend_from_slice(wire::TERMINATOR);
    }

    fn encode_band(&self, canvas: &PixelCanvas, top: u32, values: &mut [u8], out: &mut Vec<u8>) {
        let band_rows: Vec<&[u8]> = (top..top + wire::BAND_HEIGHT)
            .map_while(|y| canvas.row(y))
            .collect();

        let mut present = [false; 256];
        for row in &band_rows {
            for &cell in *row {
                present[usize::from(cell)] = true;
            }
        }

        let mut first_pass = true;
        for color in (0..=255u8).filter(|&c| present[usize::from(c)]) {
            for (x, value) in values.iter_mut().enumerate() {
                *value = band_rows
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| row[x] == color)
                    .fold(0, |acc, (bit, _)| acc | (1 << bit));
            }
            if values.iter().all(|&v| v == 0) {
                continue;
            }
            if !first_pass {
                out.push(wire::CARRIAGE_RETURN);
            }
            first_pass = false;
            out.push(wire::COLOR);
            push_decimal(out, u32::from(color));
            encode_rle(values, self.rle_threshold, out);
        }
    }
}

/// Append the run-length encoding of sixel `values` (each 0..=63) to `out`.
///
/// A run of `n >= threshold` identical values becomes `!n<glyph>`; shorter
/// runs are written out literally.
pub fn encode_rle(values: &[u8], threshold: usize, out: &mut Vec<u8>) {
    let threshold = threshold.max(1);
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let run = values[i..].iter().take_while(|&&v| v == value).count();
        let glyph = wire::GLYPH_BASE + (value & 0x3F);
        if run >= threshold {
            out.push(wire::REPEAT);
            push_decimal(out, run as u32);
            out.push(glyph);
        } else {
            out.extend(std::iter::repeat_n(glyph, run));
        }
        i += run;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;

    fn two_colors() -> ColorPalette {
        ColorPalette::from_entries([("bg", Rgb::new(0, 0, 0)), ("fg", Rgb::new(255, 255, 255))])
            .unwrap()
    }

    fn rle(values: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_rle(values, DEFAULT_RLE_THRESHOLD, &mut out);
        out
    }

    fn count(haystack: &[u8], byte: u8) -> usize {
        haystack.iter().filter(|&&b| b == byte).count()
    }

    #[test]
    fn rle_long_run_uses_repeat() {
        assert_eq!(rle(&[0, 0, 0, 0, 0]), b"!5?".to_vec());
    }

    #[test]
    fn rle_short_run_is_literal() {
        assert_eq!(rle(&[1, 1]), b"@@".to_vec());
    }

    #[test]
    fn rle_mixed_runs() {
        // 63 -> '~', 1 -> '@', 0 -> '?'
        assert_eq!(rle(&[63, 63, 63, 1, 0, 0]), b"!3~@??".to_vec());
    }

    #[test]
    fn rle_threshold_is_configurable() {
        let mut out = Vec::new();
        encode_rle(&[2, 2], 2, &mut out);
        assert_eq!(out, b"!2A".to_vec());
        out.clear();
        encode_rle(&[2, 2, 2], 10, &mut out);
        assert_eq!(out, b"AAA".to_vec());
    }

    #[test]
    fn band_counts() {
        assert_eq!(band_count(0), 0);
        assert_eq!(band_count(1), 1);
        assert_eq!(band_count(6), 1);
        assert_eq!(band_count(7), 2);
        assert_eq!(band_count(12), 2);
    }

    #[test]
    fn exact_output_single_band() {
        let mut canvas = PixelCanvas::new(4, 2);
        canvas.set(1, 0, 1);
        canvas.set(1, 1, 1);
        let out = encode_frame(&canvas, &two_colors());
        // Color 0: rows 0,1 at columns 0,2,3 -> value 3 ('B'), column 1 -> 0 ('?').
        // Color 1: column 1 -> value 3.
        let expected = b"\x1bPq\"1;1;4;2#0;2;0;0;0#1;2;100;100;100#0B?BB$#1?B??\x1b\\";
        assert_eq!(out, expected.to_vec());
    }

    #[test]
    fn scenario_two_color_band() {
        let mut canvas = PixelCanvas::new(10, 6);
        for y in 0..6 {
            for x in 5..10 {
                canvas.set(x, y, 1);
            }
        }
        let out = encode_frame(&canvas, &two_colors());
        assert!(out.starts_with(wire::INTRODUCER));
        assert!(out.ends_with(wire::TERMINATOR));
        assert!(out.windows(9).any(|w| w == b"\"1;1;10;6"));
        assert_eq!(count(&out, b'$'), 1);
        assert_eq!(count(&out, b'-'), 0);
        assert!(out.windows(4).any(|w| w == b"#0!5"));
        assert!(out.windows(4).any(|w| w == b"#1!5"));
    }

    #[test]
    fn all_background_is_structurally_complete() {
        let canvas = PixelCanvas::new(12, 12);
        let out = encode_frame(&canvas, &two_colors());
        let expected = b"\x1bPq\"1;1;12;12#0;2;0;0;0#1;2;100;100;100#0!12~-#0!12~\x1b\\";
        assert_eq!(out, expected.to_vec());
    }

    #[test]
    fn color_never_drawn_is_skipped() {
        // Only index 1 is present: no pass for color 0 and no '$'.
        let canvas = PixelCanvas::filled(3, 6, 1);
        let out = encode_frame(&canvas, &two_colors());
        assert!(out.ends_with(b";100#1!3~\x1b\\"));
        assert_eq!(count(&out, b'$'), 0);
    }

    #[test]
    fn partial_final_band_only_uses_real_rows() {
        let canvas = PixelCanvas::filled(1, 7, 1);
        let out = encode_frame(&canvas, &two_colors());
        // Band 0: six rows -> '~'. Band 1: one row -> bit 0 -> '@'.
        assert!(out.ends_with(b"#1~-#1@\x1b\\"));
    }

    #[test]
    fn single_pixel_canvas() {
        let canvas = PixelCanvas::filled(1, 1, 0);
        let out = encode_frame(&canvas, &two_colors());
        assert!(out.ends_with(b"#0@\x1b\\"));
        assert_eq!(count(&out, b'-'), 0);
    }

    #[test]
    fn passes_are_in_ascending_index_order() {
        let palette = ColorPalette::from_entries([
            ("a", Rgb::new(0, 0, 0)),
            ("b", Rgb::new(1, 1, 1)),
            ("c", Rgb::new(2, 2, 2)),
        ])
        .unwrap();
        let mut canvas = PixelCanvas::new(3, 1);
        canvas.set(0, 0, 2);
        canvas.set(1, 0, 1);
        let out = encode_frame(&canvas, &palette);
        let pos = |needle: &[u8]| out.windows(needle.len()).position(|w| w == needle).unwrap();
        let body = pos(b"#0?");
        assert!(body < pos(b"$#1"));
        assert!(pos(b"$#1") < pos(b"$#2"));
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut canvas = PixelCanvas::new(9, 13);
        for i in 0..9 {
            canvas.set(i, i, 1);
        }
        let palette = two_colors();
        let encoder = SixelEncoder::new();
        assert_eq!(encoder.encode(&canvas, &palette), encoder.encode(&canvas, &palette));
    }

    #[test]
    fn encode_into_appends() {
        let canvas = PixelCanvas::new(1, 1);
        let mut out = b"prefix".to_vec();
        SixelEncoder::new().encode_into(&canvas, &two_colors(), &mut out);
        assert!(out.starts_with(b"prefix\x1bPq"));
    }
}
