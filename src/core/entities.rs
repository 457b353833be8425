//! XML reference decoding
//!
//! The tokenizer reports text and attribute values raw. This module turns
//! references inside such raw text into characters:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no references are present.

use std::borrow::Cow;

use memchr::memchr;

use super::cursor::Cursor;

/// A parsed `&...;` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// Predefined entity or character reference, already resolved
    Char(char),
    /// Any other named entity, left unresolved
    Entity(&'a str),
}

/// Resolve predefined and numeric references in raw text.
///
/// Unknown named entities and malformed references are copied through
/// unchanged. Returns Borrowed if there is nothing to resolve.
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: no `&`, nothing to do
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut cursor = Cursor::new(input);
    let mut copied = 0;

    while let Some(amp) = cursor.find_byte(b'&') {
        out.push_str(&input[copied..amp]);
        cursor.jump_to(amp);

        match cursor.try_consume_reference() {
            Some(Reference::Char(c)) => out.push(c),
            Some(Reference::Entity(_)) => out.push_str(cursor.slice_back(amp)),
            None => {
                out.push('&');
                cursor.advance(1);
            }
        }
        copied = cursor.pos();
    }

    out.push_str(&input[copied..]);
    Cow::Owned(out)
}
