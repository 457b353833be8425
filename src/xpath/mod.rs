//! XPath-like path expressions
//!
//! Compiles a restricted XPath syntax into [`SelectPath`]s for the streaming
//! selector:
//! - Lexer: expression tokens with byte offsets
//! - Parser: recursive descent into path segments
//! - Cache: LRU of compiled expressions, shared process-wide

pub mod cache;
pub mod lexer;
pub mod parser;

pub use cache::{compile_cached, PathCache, DEFAULT_CACHE_CAPACITY};

use thiserror::Error;

use crate::selector::SelectPath;

/// Rejected path expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {position}")]
pub struct PathSyntaxError {
    pub message: String,
    /// Byte offset into the expression
    pub position: usize,
}

impl PathSyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        PathSyntaxError {
            message: message.into(),
            position,
        }
    }
}

/// Compile an expression, one path per `|` branch
pub fn compile(expr: &str) -> Result<Vec<SelectPath>, PathSyntaxError> {
    parser::Parser::new(expr)?.parse()
}
