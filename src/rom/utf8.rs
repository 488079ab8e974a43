//! Modified-UTF8 decoding and diagnostic escaping
//!
//! ROM-class strings use the JVM's "modified" UTF-8: no embedded NUL byte
//! (NUL is the two-byte sequence `0xC0 0x80`), and supplementary characters
//! appear as explicitly-encoded surrogate pairs. The walker and renderers
//! only ever need the 16-bit code units, so decoding stops at that level.

/// Iterator over the 16-bit code units of a modified-UTF8 byte slice
///
/// Malformed trailing bytes terminate the iteration rather than erroring:
/// the renderers prefer a truncated preview over refusing to print.
pub struct CodeUnits<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CodeUnits<'a> {
    pub fn new(bytes: &'a [u8]) -> CodeUnits<'a> {
        CodeUnits { bytes, pos: 0 }
    }
}

impl<'a> Iterator for CodeUnits<'a> {
    /// `(code unit, encoded byte count)`
    type Item = (u16, usize);

    fn next(&mut self) -> Option<(u16, usize)> {
        let first = *self.bytes.get(self.pos)? as u16;
        let (unit, width) = if first & 0x80 == 0 {
            (first, 1)
        } else if first & 0xe0 == 0xc0 {
            let second = *self.bytes.get(self.pos + 1)? as u16;
            ((first & 0x1f) << 6 | (second & 0x3f), 2)
        } else if first & 0xf0 == 0xe0 {
            let second = *self.bytes.get(self.pos + 1)? as u16;
            let third = *self.bytes.get(self.pos + 2)? as u16;
            ((first & 0x0f) << 12 | (second & 0x3f) << 6 | (third & 0x3f), 3)
        } else {
            return None;
        };
        self.pos += width;
        Some((unit, width))
    }
}

/// Escape a modified-UTF8 payload for diagnostic output
///
/// Code units that needed more than one encoded byte, and single-byte units
/// outside printable ASCII (`0x20..=0x7e`), render as `\uxxxx` with four
/// lowercase hex digits; everything else is copied verbatim. At most
/// `max_chars` decoded characters are emitted, and truncation always falls
/// on a full-character boundary: an escape sequence or multi-byte source
/// character is never split.
pub fn escape_utf8(bytes: &[u8], max_chars: usize) -> String {
    let mut out = String::new();
    for (emitted, (unit, width)) in CodeUnits::new(bytes).enumerate() {
        if emitted == max_chars {
            break;
        }
        if width == 1 && (0x20..=0x7e).contains(&unit) {
            out.push(unit as u8 as char);
        } else {
            out.push_str(&format!("\\u{:04x}", unit));
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_ascii_is_verbatim() {
        assert_eq!(escape_utf8(b"java/lang/Object", 256), "java/lang/Object");
        assert_eq!(escape_utf8(b"<init>", 256), "<init>");
    }

    #[test]
    fn control_characters_escape() {
        for b in (0x00u8..0x20).chain([0x7f]) {
            // NUL can't appear as a single byte in modified UTF8, but the
            // escaper must still render it safely if it does
            assert_eq!(escape_utf8(&[b], 256), format!("\\u{:04x}", b));
        }
    }

    #[test]
    fn multi_byte_units_always_escape() {
        // two-byte encoding of U+0104
        assert_eq!(escape_utf8(&[0xc4, 0x84], 256), "\\u0104");
        // three-byte encoding of U+0904
        assert_eq!(escape_utf8(&[0xe0, 0xa4, 0x84], 256), "\\u0904");
        // modified-UTF8 NUL
        assert_eq!(escape_utf8(&[0xc0, 0x80], 256), "\\u0000");
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        // "ab" + U+0104: limit of 2 must not start the third character
        assert_eq!(escape_utf8(&[b'a', b'b', 0xc4, 0x84], 2), "ab");
        assert_eq!(escape_utf8(&[b'a', b'b', 0xc4, 0x84], 3), "ab\\u0104");
    }

    #[test]
    fn malformed_tail_stops_cleanly() {
        // dangling lead byte: decode what precedes it, drop the rest
        assert_eq!(escape_utf8(&[b'o', b'k', 0xc4], 256), "ok");
    }

    #[test]
    fn code_unit_widths() {
        let units: Vec<(u16, usize)> = CodeUnits::new(&[b'a', 0xc4, 0x84, 0xe0, 0xa4, 0x84]).collect();
        assert_eq!(units, vec![(0x61, 1), (0x104, 2), (0x904, 3)]);
    }
}
