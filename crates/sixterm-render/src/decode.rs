#![forbid(unsafe_code)]

//! Sixel decoder.
//!
//! Parses the subset of the format the encoder produces, plus the leniencies
//! real streams need: optional raster attributes, color definitions anywhere
//! in the body, arbitrary `$`/`-` placement, and ignorable whitespace. Pixels
//! never painted decode to index 0.

use std::fmt;

use crate::canvas::PixelCanvas;
use crate::wire;

/// Largest width or height the decoder will allocate.
pub const MAX_DECODE_DIMENSION: u32 = 1 << 14;

/// Errors from [`SixelDecoder::decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing sixel introducer")]
    MissingIntroducer,
    #[error("missing string terminator")]
    MissingTerminator,
    #[error("invalid number at offset {offset}")]
    InvalidNumber { offset: usize },
    #[error("color index {index} out of range at offset {offset}")]
    ColorOutOfRange { index: u32, offset: usize },
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },
    #[error("image exceeds {max}x{max} pixels", max = MAX_DECODE_DIMENSION)]
    RasterOverflow,
}

/// A color definition on the wire: color space plus three components.
///
/// For RGB (space 2) the components are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDefinition {
    pub space: u32,
    pub components: [u32; 3],
}

/// Result of decoding one sixel payload.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub canvas: PixelCanvas,
    /// Raster attributes `(width, height)` if the stream declared them.
    pub raster: Option<(u32, u32)>,
    colors: Vec<Option<ColorDefinition>>,
}

impl DecodedImage {
    /// Color defined for `index`, if any.
    #[must_use]
    pub fn color(&self, index: u8) -> Option<ColorDefinition> {
        self.colors.get(usize::from(index)).copied().flatten()
    }

    /// Number of color definitions seen.
    #[must_use]
    pub fn defined_colors(&self) -> usize {
        self.colors.iter().filter(|c| c.is_some()).count()
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.canvas.width())
            .field("height", &self.canvas.height())
            .field("raster", &self.raster)
            .field("defined_colors", &self.defined_colors())
            .finish()
    }
}

/// Stateless entry point for decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SixelDecoder;

impl SixelDecoder {
    /// Decode one complete `ESC P q ... ESC \` payload.
    pub fn decode(input: &[u8]) -> Result<DecodedImage, DecodeError> {
        let body = input
            .strip_prefix(wire::INTRODUCER)
            .ok_or(DecodeError::MissingIntroducer)?;
        let body = body
            .strip_suffix(wire::TERMINATOR)
            .ok_or(DecodeError::MissingTerminator)?;
        let mut parser = Parser::new(body, wire::INTRODUCER.len());
        parser.run()?;
        Ok(parser.finish())
    }
}

struct Parser<'a> {
    body: &'a [u8],
    pos: usize,
    base: usize,
    x: u32,
    band_top: u32,
    color: u8,
    max_x: u32,
    rows: Vec<Vec<u8>>,
    raster: Option<(u32, u32)>,
    colors: Vec<Option<ColorDefinition>>,
}

impl<'a> Parser<'a> {
    fn new(body: &'a [u8], base: usize) -> Self {
        Self {
            body,
            pos: 0,
            base,
            x: 0,
            band_top: 0,
            color: 0,
            max_x: 0,
            rows: Vec::new(),
            raster: None,
            colors: vec![None; 256],
        }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.body.get(self.pos).copied()
    }

    fn number(&mut self) -> Result<u32, DecodeError> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(byte @ b'0'..=b'9') = self.peek() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                .ok_or(DecodeError::InvalidNumber {
                    offset: self.base + start,
                })?;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(DecodeError::InvalidNumber {
                offset: self.base + start,
            });
        }
        Ok(value)
    }

    /// `;`-separated numbers following the current position.
    fn parameters(&mut self, first: u32, max: usize) -> Result<Vec<u32>, DecodeError> {
        let mut params = vec![first];
        while params.len() < max && self.peek() == Some(b';') {
            self.pos += 1;
            params.push(self.number()?);
        }
        Ok(params)
    }

    fn run(&mut self) -> Result<(), DecodeError> {
        while let Some(byte) = self.peek() {
            match byte {
                wire::RASTER => {
                    self.pos += 1;
                    let first = self.number()?;
                    let params = self.parameters(first, 4)?;
                    if let [_, _, w, h] = params[..] {
                        if w > MAX_DECODE_DIMENSION || h > MAX_DECODE_DIMENSION {
                            return Err(DecodeError::RasterOverflow);
                        }
                        self.raster = Some((w, h));
                    }
                }
                wire::COLOR => {
                    let at = self.offset();
                    self.pos += 1;
                    let index = self.number()?;
                    let slot = u8::try_from(index)
                        .map_err(|_| DecodeError::ColorOutOfRange { index, offset: at })?;
                    let params = self.parameters(index, 5)?;
                    if let [_, space, a, b, c] = params[..] {
                        self.colors[usize::from(slot)] = Some(ColorDefinition {
                            space,
                            components: [a, b, c],
                        });
                    } else if params.len() > 1 {
                        return Err(DecodeError::InvalidNumber { offset: at });
                    }
                    self.color = slot;
                }
                wire::REPEAT => {
                    self.pos += 1;
                    let count = self.number()?;
                    let glyph_at = self.offset();
                    match self.peek() {
                        Some(glyph @ 63..=126) => {
                            self.pos += 1;
                            self.paint(glyph - wire::GLYPH_BASE, count)?;
                        }
                        Some(other) => {
                            return Err(DecodeError::UnexpectedByte {
                                byte: other,
                                offset: glyph_at,
                            });
                        }
                        None => return Err(DecodeError::MissingTerminator),
                    }
                }
                wire::CARRIAGE_RETURN => {
                    self.pos += 1;
                    self.x = 0;
                }
                wire::BAND_SEPARATOR => {
                    self.pos += 1;
                    self.x = 0;
                    self.band_top = self.band_top.saturating_add(wire::BAND_HEIGHT);
                }
                63..=126 => {
                    self.pos += 1;
                    self.paint(byte - wire::GLYPH_BASE, 1)?;
                }
                b' ' | b'\r' | b'\n' | b'\t' => self.pos += 1,
                other => {
                    return Err(DecodeError::UnexpectedByte {
                        byte: other,
                        offset: self.offset(),
                    });
                }
            }
        }
        Ok(())
    }

    fn paint(&mut self, value: u8, count: u32) -> Result<(), DecodeError> {
        let end = self.x.checked_add(count).ok_or(DecodeError::RasterOverflow)?;
        if end > MAX_DECODE_DIMENSION || self.band_top >= MAX_DECODE_DIMENSION {
            return Err(DecodeError::RasterOverflow);
        }
        if value != 0 {
            for bit in 0..wire::BAND_HEIGHT {
                if value & (1 << bit) == 0 {
                    continue;
                }
                let y = (self.band_top + bit) as usize;
                if self.rows.len() <= y {
                    self.rows.resize_with(y + 1, Vec::new);
                }
                let row = &mut self.rows[y];
                if row.len() < end as usize {
                    row.resize(end as usize, 0);
                }
                row[self.x as usize..end as usize].fill(self.color);
            }
        }
        self.x = end;
        self.max_x = self.max_x.max(end);
        Ok(())
    }

    fn finish(self) -> DecodedImage {
        let (width, height) = self
            .raster
            .unwrap_or((self.max_x, self.rows.len() as u32));
        let mut canvas = PixelCanvas::new(width, height);
        for (y, row) in self.rows.iter().enumerate().take(height as usize) {
            for (x, &index) in row.iter().enumerate().take(width as usize) {
                canvas.set(x as i32, y as i32, index);
            }
        }
        DecodedImage {
            canvas,
            raster: self.raster,
            colors: self.colors,
        }
    }
}

/// Why an encoded frame does not reproduce its source canvas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundTripError {
    #[error("encoded frame does not decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("size mismatch: expected {expected:?}, decoded {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("pixel ({x}, {y}): expected {expected}, decoded {actual}")]
    Pixel {
        x: u32,
        y: u32,
        expected: u8,
        actual: u8,
    },
}

/// Decode `encoded` and compare it cell-for-cell with `canvas`.
///
/// Reports the first mismatch in row-major order.
pub fn verify_roundtrip(canvas: &PixelCanvas, encoded: &[u8]) -> Result<(), RoundTripError> {
    let decoded = SixelDecoder::decode(encoded)?.canvas;
    let expected = (canvas.width(), canvas.height());
    let actual = (decoded.width(), decoded.height());
    if expected != actual {
        return Err(RoundTripError::SizeMismatch { expected, actual });
    }
    for (y, (want, got)) in canvas.rows().zip(decoded.rows()).enumerate() {
        if let Some(x) = want.iter().zip(got).position(|(a, b)| a != b) {
            return Err(RoundTripError::Pixel {
                x: x as u32,
                y: y as u32,
                expected: want[x],
                actual: got[x],
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{ColorPalette, Rgb};
    use crate::sixel::encode_frame;

    fn palette() -> ColorPalette {
        ColorPalette::from_entries([
            ("bg", Rgb::new(0, 0, 0)),
            ("fg", Rgb::new(255, 128, 0)),
            ("hi", Rgb::new(10, 20, 30)),
        ])
        .unwrap()
    }

    #[test]
    fn decodes_handwritten_stream() {
        let image = SixelDecoder::decode(b"\x1bPq\"1;1;3;2#1;2;100;0;0#1!3B\x1b\\").unwrap();
        assert_eq!(image.raster, Some((3, 2)));
        assert_eq!(image.canvas, PixelCanvas::filled(3, 2, 1));
        assert_eq!(
            image.color(1),
            Some(ColorDefinition {
                space: 2,
                components: [100, 0, 0]
            })
        );
        assert_eq!(image.color(0), None);
    }

    #[test]
    fn literal_and_repeat_forms_agree() {
        let literal = SixelDecoder::decode(b"\x1bPq#0~~~~\x1b\\").unwrap();
        let repeat = SixelDecoder::decode(b"\x1bPq#0!4~\x1b\\").unwrap();
        assert_eq!(literal.canvas, repeat.canvas);
        assert_eq!(literal.canvas.width(), 4);
        assert_eq!(literal.canvas.height(), 6);
    }

    #[test]
    fn overlay_with_carriage_return() {
        let image = SixelDecoder::decode(b"\x1bPq\"1;1;2;1#0@?$#1?@\x1b\\").unwrap();
        assert_eq!(image.canvas.row(0), Some(&[0, 1][..]));
    }

    #[test]
    fn missing_framing() {
        assert_eq!(
            SixelDecoder::decode(b"#0~\x1b\\"),
            Err(DecodeError::MissingIntroducer)
        );
        assert_eq!(
            SixelDecoder::decode(b"\x1bPq#0~"),
            Err(DecodeError::MissingTerminator)
        );
    }

    #[test]
    fn bad_bytes_are_reported_with_offsets() {
        assert_eq!(
            SixelDecoder::decode(b"\x1bPq#0*\x1b\\"),
            Err(DecodeError::UnexpectedByte {
                byte: b'*',
                offset: 5
            })
        );
        assert_eq!(
            SixelDecoder::decode(b"\x1bPq#x\x1b\\"),
            Err(DecodeError::InvalidNumber { offset: 4 })
        );
        assert!(matches!(
            SixelDecoder::decode(b"\x1bPq#300\x1b\\"),
            Err(DecodeError::ColorOutOfRange { index: 300, .. })
        ));
    }

    #[test]
    fn huge_repeat_is_rejected() {
        assert_eq!(
            SixelDecoder::decode(b"\x1bPq#0!99999999~\x1b\\"),
            Err(DecodeError::RasterOverflow)
        );
    }

    #[test]
    fn encoder_output_roundtrips() {
        let mut canvas = PixelCanvas::new(11, 13);
        for i in 0..11 {
            canvas.set(i, i, 1);
            canvas.set(10 - i, i, 2);
        }
        let encoded = encode_frame(&canvas, &palette());
        assert_eq!(verify_roundtrip(&canvas, &encoded), Ok(()));
        let image = SixelDecoder::decode(&encoded).unwrap();
        assert_eq!(image.defined_colors(), 3);
        assert_eq!(
            image.color(1).map(|c| c.components),
            Some([100, 50, 0])
        );
    }

    #[test]
    fn all_background_decodes_to_zero() {
        let canvas = PixelCanvas::new(12, 12);
        let image = SixelDecoder::decode(&encode_frame(&canvas, &palette())).unwrap();
        assert_eq!(image.canvas, canvas);
    }

    #[test]
    fn verify_reports_first_mismatch() {
        let canvas = PixelCanvas::new(3, 2);
        let mut other = canvas.clone();
        other.set(2, 1, 1);
        let encoded = encode_frame(&other, &palette());
        assert_eq!(
            verify_roundtrip(&canvas, &encoded),
            Err(RoundTripError::Pixel {
                x: 2,
                y: 1,
                expected: 0,
                actual: 1
            })
        );
        let bigger = encode_frame(&PixelCanvas::new(4, 2), &palette());
        assert!(matches!(
            verify_roundtrip(&canvas, &bigger),
            Err(RoundTripError::SizeMismatch { .. })
        ));
    }
}
