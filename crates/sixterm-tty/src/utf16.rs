//! UTF-16 code units to UTF-8 bytes, for console key events.
#![cfg_attr(not(windows), allow(dead_code))]

use std::collections::VecDeque;

/// Reassembles surrogate pairs that arrive in separate key events.
#[derive(Debug, Default)]
pub(crate) struct Utf16Assembler {
    high_surrogate: Option<u16>,
}

impl Utf16Assembler {
    /// Feed one code unit, appending any completed character to `out`.
    ///
    /// Unpaired surrogates become U+FFFD.
    pub(crate) fn push(&mut self, unit: u16, out: &mut VecDeque<u8>) {
        if let Some(high) = self.high_surrogate.take() {
            if is_low_surrogate(unit) {
                let ch = char::decode_utf16([high, unit])
                    .next()
                    .and_then(Result::ok)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                push_char(ch, out);
                return;
            }
            push_char(char::REPLACEMENT_CHARACTER, out);
        }
        if is_high_surrogate(unit) {
            self.high_surrogate = Some(unit);
            return;
        }
        let ch = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
        push_char(ch, out);
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn push_char(ch: char, out: &mut VecDeque<u8>) {
    let mut buf = [0u8; 4];
    out.extend(ch.encode_utf8(&mut buf).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(units: &[u16]) -> Vec<u8> {
        let mut asm = Utf16Assembler::default();
        let mut out = VecDeque::new();
        for &unit in units {
            asm.push(unit, &mut out);
        }
        out.into_iter().collect()
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(feed(&[u16::from(b'q'), 0x0D]), b"q\r");
    }

    #[test]
    fn bmp_char_encodes_to_utf8() {
        assert_eq!(feed(&[0x00E9]), "é".as_bytes());
    }

    #[test]
    fn surrogate_pair_across_events() {
        let units: Vec<u16> = "🦀".encode_utf16().collect();
        assert_eq!(units.len(), 2);
        assert_eq!(feed(&units), "🦀".as_bytes());
    }

    #[test]
    fn unpaired_surrogates_are_replaced() {
        let replacement = "\u{FFFD}".as_bytes();
        assert_eq!(feed(&[0xDC00]), replacement);
        let mut expected = replacement.to_vec();
        expected.push(b'a');
        assert_eq!(feed(&[0xD83E, u16::from(b'a')]), expected);
    }
}
