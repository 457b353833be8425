//! Core XML tokenizing primitives
//!
//! This module contains the fundamental building blocks for tokenizing:
//! - Cursor: position-tracking lexical primitives, memchr-accelerated searches
//! - Unicode: XML 1.0 character and name classes
//! - Entities: reference parsing and decoding with Cow (zero-copy when possible)
//! - Token: the token vocabulary with byte ranges
//! - Error: the closed error set with lazily computed positions
//! - Tokenizer: the grammar walk feeding a TokenSink
//! - DTD: DOCTYPE and internal subset handling

pub mod cursor;
pub mod dtd;
pub mod entities;
pub mod error;
pub mod token;
pub mod tokenizer;
pub mod unicode;

pub use cursor::Cursor;
pub use entities::{decode_text, Reference};
pub use error::{ErrorKind, TextPos, XmlError};
pub use token::{qname, ElementEnd, TextRange, Token};
pub use tokenizer::{ParseOptions, TokenSink, Tokenizer};
