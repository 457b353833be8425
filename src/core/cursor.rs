//! Input cursor over the document text
//!
//! A position-tracking view over a borrowed `&str` with the lexical
//! primitives the tokenizer is built from. Delimiter searches use memchr:
//! - `memchr` for single bytes (the `<` ending a text run)
//! - `memmem` for multi-byte terminators (`-->`, `]]>`, `?>`)

use std::borrow::Cow;

use memchr::{memchr, memmem};

use super::entities::Reference;
use super::error::{ErrorKind, TextPos, XmlError};
use super::token::TextRange;
use super::unicode::{is_name_char, is_name_start_char, is_xml_char, is_xml_space};

/// Cursor over the document being tokenized
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0 }
    }

    /// The whole document
    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Text from the current position to the end
    #[inline]
    pub fn remaining(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Current byte, failing at the end of input
    #[inline]
    pub fn curr_byte(&self) -> Result<u8, XmlError> {
        self.peek()
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEndOfStream))
    }

    /// Byte after the current one, failing at the end of input
    #[inline]
    pub fn next_byte(&self) -> Result<u8, XmlError> {
        self.text
            .as_bytes()
            .get(self.pos + 1)
            .copied()
            .ok_or_else(|| self.error_at(ErrorKind::UnexpectedEndOfStream, self.text.len()))
    }

    /// Current character, failing at the end of input
    pub fn curr_char(&self) -> Result<char, XmlError> {
        self.remaining()
            .chars()
            .next()
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEndOfStream))
    }

    /// Advance by n bytes. Callers only step over ASCII they have matched.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    #[inline]
    pub(crate) fn jump_to(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.remaining().starts_with(prefix)
    }

    #[inline]
    pub fn starts_with_space(&self) -> bool {
        self.peek().map_or(false, is_xml_space)
    }

    #[inline]
    pub fn skip_spaces(&mut self) {
        self.skip_bytes_while(is_xml_space);
    }

    /// Skip at least one whitespace character
    pub fn consume_spaces(&mut self) -> Result<(), XmlError> {
        if self.at_end() {
            return Err(self.error(ErrorKind::UnexpectedEndOfStream));
        }
        if !self.starts_with_space() {
            return Err(self.unexpected("a whitespace"));
        }
        self.skip_spaces();
        Ok(())
    }

    pub fn consume_byte(&mut self, expected: u8) -> Result<(), XmlError> {
        if self.curr_byte()? != expected {
            return Err(self.unexpected(format!("'{}'", expected as char)));
        }
        self.pos += 1;
        Ok(())
    }

    /// Consume `b` if it is the current byte
    #[inline]
    pub fn try_consume_byte(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip a literal keyword such as `SYSTEM` or `?>`
    pub fn skip_string(&mut self, s: &'static str) -> Result<(), XmlError> {
        if !self.starts_with(s) {
            return Err(self.error(ErrorKind::InvalidString(s)));
        }
        self.pos += s.len();
        Ok(())
    }

    /// Skip bytes while `pred` holds.
    ///
    /// The predicate must answer the same for every byte >= 0x80 so that
    /// multi-byte characters are never split.
    pub fn skip_bytes_while<P: Fn(u8) -> bool>(&mut self, pred: P) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && pred(bytes[self.pos]) {
            self.pos += 1;
        }
        while !self.text.is_char_boundary(self.pos) {
            self.pos += 1;
        }
    }

    pub fn consume_bytes_while<P: Fn(u8) -> bool>(&mut self, pred: P) -> &'a str {
        let start = self.pos;
        self.skip_bytes_while(pred);
        self.slice_back(start)
    }

    /// Skip characters while `pred` holds, rejecting non-XML characters
    pub fn skip_chars_while<P>(&mut self, mut pred: P) -> Result<(), XmlError>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.pos;
        for (i, c) in self.remaining().char_indices() {
            if !pred(c) {
                self.pos = start + i;
                return Ok(());
            }
            if !is_xml_char(c) {
                return Err(self.error_at(ErrorKind::NonXmlChar(c), start + i));
            }
        }
        self.pos = self.text.len();
        Ok(())
    }

    pub fn consume_chars_while<P>(&mut self, pred: P) -> Result<&'a str, XmlError>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.pos;
        self.skip_chars_while(pred)?;
        Ok(self.slice_back(start))
    }

    /// Absolute offset of the next `needle`
    #[inline]
    pub fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(self.remaining().as_bytes(), needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Absolute offset of the next `b`
    #[inline]
    pub fn find_byte(&self, b: u8) -> Option<usize> {
        memchr(b, self.remaining().as_bytes()).map(|i| self.pos + i)
    }

    /// Position of the `>` closing a markup declaration.
    /// A `>` inside a quoted literal does not count.
    pub fn find_markup_end(&self) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut quote = None;
        for (pos, &b) in bytes.iter().enumerate().skip(self.pos) {
            match (b, quote) {
                (b'"' | b'\'', None) => quote = Some(b),
                (b, Some(q)) if b == q => quote = None,
                (b'>', None) => return Some(pos),
                _ => {}
            }
        }
        None
    }

    /// Consume up to (not including) the absolute offset `end`,
    /// rejecting non-XML characters.
    pub fn consume_to(&mut self, end: usize) -> Result<&'a str, XmlError> {
        let start = self.pos;
        let slice = self
            .text
            .get(start..end)
            .ok_or_else(|| self.error_at(ErrorKind::UnexpectedEndOfStream, self.text.len()))?;
        self.check_chars(start, slice)?;
        self.pos = end;
        Ok(slice)
    }

    /// Consume everything before the next `terminator`, which stays unconsumed
    pub fn consume_until(&mut self, terminator: &'static str) -> Result<&'a str, XmlError> {
        match self.find(terminator) {
            Some(end) => self.consume_to(end),
            None => Err(self.error_at(ErrorKind::InvalidString(terminator), self.text.len())),
        }
    }

    /// Consume a text run up to the next `<` or the end of input
    pub fn consume_text(&mut self) -> Result<&'a str, XmlError> {
        let end = self.find_byte(b'<').unwrap_or(self.text.len());
        self.consume_to(end)
    }

    fn check_chars(&self, start: usize, slice: &str) -> Result<(), XmlError> {
        // Anything below 0x20 and the EF lead byte of U+FFFE/U+FFFF need a closer look
        let plain = slice
            .bytes()
            .all(|b| (b >= 0x20 && b != 0xEF) || matches!(b, b'\t' | b'\n' | b'\r'));
        if plain {
            return Ok(());
        }
        match slice.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            Some((i, c)) => Err(self.error_at(ErrorKind::NonXmlChar(c), start + i)),
            None => Ok(()),
        }
    }

    pub fn consume_name(&mut self) -> Result<&'a str, XmlError> {
        let start = self.pos;
        self.skip_name()?;
        Ok(self.slice_back(start))
    }

    pub fn skip_name(&mut self) -> Result<(), XmlError> {
        let start = self.pos;
        let first = self.curr_char()?;
        if !is_name_start_char(first) {
            return Err(self.error_at(ErrorKind::InvalidName, start));
        }
        self.pos += first.len_utf8();

        for c in self.remaining().chars() {
            if !is_name_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok(())
    }

    /// Consume `prefix:local` or `local`; the prefix is empty when absent
    pub fn consume_qname(&mut self) -> Result<(&'a str, &'a str), XmlError> {
        let start = self.pos;
        self.curr_byte()?;

        let mut colon = None;
        for c in self.remaining().chars() {
            if c == ':' {
                if colon.is_some() {
                    return Err(self.error_at(ErrorKind::InvalidName, start));
                }
                colon = Some(self.pos);
            } else if !is_name_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }

        let (prefix, local) = match colon {
            Some(at) => (&self.text[start..at], &self.text[at + 1..self.pos]),
            None => ("", self.slice_back(start)),
        };

        let starts_ok = |s: &str| s.chars().next().map_or(false, is_name_start_char);
        if (colon.is_some() && !starts_ok(prefix)) || !starts_ok(local) {
            return Err(self.error_at(ErrorKind::InvalidName, start));
        }
        Ok((prefix, local))
    }

    /// Consume an opening `'` or `"` and return it
    pub fn consume_quote(&mut self) -> Result<u8, XmlError> {
        match self.curr_byte()? {
            q @ (b'"' | b'\'') => {
                self.pos += 1;
                Ok(q)
            }
            _ => Err(self.unexpected("a quote")),
        }
    }

    /// Consume `&name;`, `&#N;` or `&#xH;` when one starts here.
    /// Leaves the cursor untouched if the input is not a valid reference.
    pub fn try_consume_reference(&mut self) -> Option<Reference<'a>> {
        let mut probe = *self;
        let reference = probe.parse_reference()?;
        *self = probe;
        Some(reference)
    }

    pub fn consume_reference(&mut self) -> Result<Reference<'a>, XmlError> {
        self.try_consume_reference()
            .ok_or_else(|| self.error(ErrorKind::UnknownToken("invalid reference")))
    }

    fn parse_reference(&mut self) -> Option<Reference<'a>> {
        if !self.try_consume_byte(b'&') {
            return None;
        }

        let reference = if self.try_consume_byte(b'#') {
            let (digits, radix) = if self.try_consume_byte(b'x') {
                (self.consume_bytes_while(|b| b.is_ascii_hexdigit()), 16)
            } else {
                (self.consume_bytes_while(|b| b.is_ascii_digit()), 10)
            };
            let c = u32::from_str_radix(digits, radix)
                .ok()
                .and_then(char::from_u32)
                .filter(|c| is_xml_char(*c))?;
            Reference::Char(c)
        } else {
            let name = self.consume_name().ok()?;
            match name {
                "quot" => Reference::Char('"'),
                "amp" => Reference::Char('&'),
                "apos" => Reference::Char('\''),
                "lt" => Reference::Char('<'),
                "gt" => Reference::Char('>'),
                _ => Reference::Entity(name),
            }
        };

        if !self.try_consume_byte(b';') {
            return None;
        }
        Some(reference)
    }

    /// Text from `start` to the current position
    #[inline]
    pub fn slice_back(&self, start: usize) -> &'a str {
        self.text.get(start..self.pos).unwrap_or("")
    }

    #[inline]
    pub fn range_from(&self, start: usize) -> TextRange {
        TextRange::new(start, self.pos)
    }

    /// Row/column of the current position. Linear in the offset.
    pub fn gen_text_pos(&self) -> TextPos {
        TextPos::from_offset(self.text, self.pos)
    }

    pub fn gen_text_pos_from(&self, pos: usize) -> TextPos {
        TextPos::from_offset(self.text, pos)
    }

    pub fn error(&self, kind: ErrorKind) -> XmlError {
        self.error_at(kind, self.pos)
    }

    pub fn error_at(&self, kind: ErrorKind, pos: usize) -> XmlError {
        XmlError::new(kind, self.gen_text_pos_from(pos), pos)
    }

    /// `InvalidChar` naming the current character, or end of stream
    pub fn unexpected(&self, expected: impl Into<Cow<'static, str>>) -> XmlError {
        match self.remaining().chars().next() {
            Some(actual) => self.error(ErrorKind::InvalidChar {
                expected: expected.into(),
                actual,
            }),
            None => self.error(ErrorKind::UnexpectedEndOfStream),
        }
    }
}
