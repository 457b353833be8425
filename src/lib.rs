//! xml-tokenizer - XML tokenizing and streaming multi-path selection
//!
//! Layers:
//! A: Tokenizer over a complete document (tokenize, try_tokenize)
//! B: Streaming path selector fed by the tokenizer (select, try_select)
//! C: XPath-like expression compiler with an LRU cache (select_xpath)
//! D: Serializer back to XML text (tokens_to_xml)
//! E: Parallel batch selection (strategy::parallel)

pub mod core;
pub mod selector;
pub mod serializer;
pub mod strategy;
pub mod xpath;

use thiserror::Error;
use tracing::debug;

pub use crate::core::{
    decode_text, qname, ElementEnd, ErrorKind, ParseOptions, TextPos, TextRange, Token,
    TokenSink, Tokenizer, XmlError,
};
pub use selector::{
    select, select_to_strings, try_select, AttributeFilter, Axis, MatchStrategy, NodeSnapshot,
    PathSegment, SelectPath, SelectStats, Selected, StringMatch, TokenSelector,
};
pub use serializer::{selected_to_xml, tokens_to_xml, write_token};
pub use xpath::{compile, compile_cached, PathSyntaxError};

// ============================================================================
// Errors
// ============================================================================

/// Failure of an operation that compiles an expression and reads a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Path(#[from] PathSyntaxError),
}

// ============================================================================
// Layer A: Tokenizer
// ============================================================================

/// Tokenize a complete document, handing each token to `on_token`.
///
/// A DOCTYPE is rejected with `DtdDetected` unless `allow_dtd` is set.
pub fn tokenize<'a, F>(text: &'a str, allow_dtd: bool, mut on_token: F) -> Result<(), XmlError>
where
    F: FnMut(Token<'a>),
{
    try_tokenize(text, &ParseOptions::new().allow_dtd(allow_dtd), |token| {
        on_token(token);
        Ok::<_, XmlError>(())
    })
}

/// Tokenize with a fallible callback. The first error, from the grammar or
/// from `on_token`, stops tokenization and is returned.
pub fn try_tokenize<'a, E, F>(
    text: &'a str,
    options: &ParseOptions,
    mut on_token: F,
) -> Result<(), E>
where
    F: FnMut(Token<'a>) -> Result<(), E>,
    E: From<XmlError>,
{
    debug!(len = text.len(), allow_dtd = options.allow_dtd, "tokenize started");
    let result = Tokenizer::new(text, *options).run(&mut on_token);
    match &result {
        Ok(()) => debug!("tokenize finished"),
        Err(_) => debug!("tokenize aborted"),
    }
    result
}

// ============================================================================
// Layer C: Compiled Expressions
// ============================================================================

/// Select with an XPath-like expression, compiled through the shared cache
pub fn select_xpath<'a, F>(text: &'a str, expr: &str, on_selected: F) -> Result<(), Error>
where
    F: FnMut(Selected<'a>),
{
    let paths = compile_cached(expr)?;
    select(text, &paths, on_selected)?;
    Ok(())
}

/// Serialized subtrees selected by an XPath-like expression
pub fn select_xpath_to_strings(text: &str, expr: &str) -> Result<Vec<String>, Error> {
    let paths = compile_cached(expr)?;
    Ok(select_to_strings(text, &paths)?)
}
