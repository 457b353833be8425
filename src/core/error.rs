//! Tokenizer errors
//!
//! Errors form a closed set of grammar and encoding violations. Each error
//! remembers the byte offset it was raised at and the 1-based text position
//! derived from it. The position is computed when the error is created,
//! which only happens on the failure path.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Human readable position inside the document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPos {
    pub row: u32,
    pub col: u32,
}

impl TextPos {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        TextPos { row, col }
    }

    /// Compute the position of a byte offset by scanning `text` from the start.
    ///
    /// Rows advance on `\n`, columns count characters. Offsets past the end
    /// are clamped to the end of the text.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut end = offset.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }

        let mut row = 1;
        let mut col = 1;
        for c in text[..end].chars() {
            if c == '\n' {
                row += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        TextPos::new(row, col)
    }
}

impl Default for TextPos {
    fn default() -> Self {
        TextPos::new(1, 1)
    }
}

impl fmt::Display for TextPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Kind of a grammar violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid name token")]
    InvalidName,

    #[error("a non-XML character {0:?} found")]
    NonXmlChar(char),

    #[error("expected {expected} not {actual:?}")]
    InvalidChar {
        expected: Cow<'static, str>,
        actual: char,
    },

    #[error("expected '{0}'")]
    InvalidString(&'static str),

    #[error("invalid attribute value")]
    InvalidAttributeValue,

    #[error("invalid ExternalID")]
    InvalidExternalId,

    #[error("comment contains '--'")]
    InvalidComment,

    #[error("']]>' is not allowed inside a character data")]
    InvalidCharacterData,

    #[error("unexpected XML declaration")]
    UnexpectedDeclaration,

    #[error("XML with DTD detected")]
    DtdDetected,

    #[error("expected '{expected}' close tag, not '{actual}'")]
    UnexpectedCloseTag { expected: String, actual: String },

    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,

    #[error("unknown token: {0}")]
    UnknownToken(&'static str),
}

/// A tokenizer error with its location
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {pos}")]
pub struct XmlError {
    pub kind: ErrorKind,
    pub pos: TextPos,
    /// Byte offset the error was raised at
    pub offset: usize,
}

impl XmlError {
    pub fn new(kind: ErrorKind, pos: TextPos, offset: usize) -> Self {
        XmlError { kind, pos, offset }
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn pos(&self) -> TextPos {
        self.pos
    }
}
