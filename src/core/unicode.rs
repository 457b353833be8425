//! XML 1.0 (Fifth Edition) character classes
//!
//! ASCII is answered with a byte match, everything else falls through to
//! the code point ranges of the `Char`, `NameStartChar` and `NameChar`
//! productions.

/// `S ::= (#x20 | #x9 | #xD | #xA)+`
#[inline]
pub fn is_xml_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// `Char` production: tab, newline, carriage return and everything from
/// U+0020 except the two non-characters U+FFFE and U+FFFF.
/// Surrogates cannot occur in a `char`.
#[inline]
pub fn is_xml_char(c: char) -> bool {
    match c as u32 {
        0x09 | 0x0A | 0x0D => true,
        cp if cp < 0x20 => false,
        0xFFFE | 0xFFFF => false,
        _ => true,
    }
}

#[inline]
pub fn is_name_start_char(c: char) -> bool {
    if c.is_ascii() {
        return matches!(c, 'A'..='Z' | 'a'..='z' | ':' | '_');
    }
    is_name_start_codepoint(c as u32)
}

#[inline]
pub fn is_name_char(c: char) -> bool {
    if c.is_ascii() {
        return matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | ':' | '_' | '-' | '.');
    }
    is_name_start_codepoint(c as u32)
        || matches!(c as u32, 0xB7 | 0x0300..=0x036F | 0x203F..=0x2040)
}

fn is_name_start_codepoint(cp: u32) -> bool {
    matches!(cp,
        0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0x2FF | 0x370..=0x37D |
        0x37F..=0x1FFF | 0x200C..=0x200D | 0x2070..=0x218F |
        0x2C00..=0x2FEF | 0x3001..=0xD7FF | 0xF900..=0xFDCF |
        0xFDF0..=0xFFFD | 0x10000..=0xEFFFF
    )
}
