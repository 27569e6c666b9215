//! Sixel wire-format tokens.

/// `ESC P q`: device control string introducing a sixel image.
pub const INTRODUCER: &[u8] = b"\x1bPq";

/// `ESC \`: string terminator.
pub const TERMINATOR: &[u8] = b"\x1b\\";

/// Starts the raster attributes `"Pan;Pad;Ph;Pv`.
pub const RASTER: u8 = b'"';

/// Starts a color definition or color selection.
pub const COLOR: u8 = b'#';

/// Moves to the next band (graphics new line).
pub const BAND_SEPARATOR: u8 = b'-';

/// Returns to the start of the current band (graphics carriage return).
pub const CARRIAGE_RETURN: u8 = b'$';

/// Starts a repeat introducer `!N<glyph>`.
pub const REPEAT: u8 = b'!';

/// Glyph for sixel value 0; value `v` is `GLYPH_BASE + v`.
pub const GLYPH_BASE: u8 = 63;

/// Rows per band.
pub const BAND_HEIGHT: u32 = 6;

/// Color-space selector for RGB in a color definition.
pub const RGB_SPACE: u8 = 2;

/// Append the decimal form of `n` without allocating.
pub(crate) fn push_decimal(out: &mut Vec<u8>, mut n: u32) {
    let mut digits = [0u8; 10];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    out.extend_from_slice(&digits[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_formatting() {
        for n in [0u32, 7, 10, 255, 1000, u32::MAX] {
            let mut out = Vec::new();
            push_decimal(&mut out, n);
            assert_eq!(out, n.to_string().into_bytes());
        }
    }
}
