//! Streaming path selection
//!
//! - Path: segment, attribute filter and string test types
//! - Flags: per-segment match criteria and cache properties
//! - Machine: the state of one path expression
//! - Engine: the multi-path selector fed by the tokenizer

pub mod engine;
pub mod flags;
pub mod machine;
pub mod path;

#[cfg(test)]
pub(crate) mod fixtures;

pub use engine::{SelectStats, Selected, TokenSelector};
pub use flags::{CacheProps, MatchCriteria};
pub use path::{
    AttributeFilter, Axis, MatchStrategy, NodeAttribute, NodePredicate, NodeSnapshot, PathSegment,
    SelectPath, StringMatch,
};

use tracing::debug;

use crate::core::{ParseOptions, Token, Tokenizer, XmlError};
use crate::serializer::write_token;

/// Tokenize `text` and hand every selected token to `on_selected`.
///
/// Selection stops at the first error, either from the tokenizer or
/// returned by `on_selected`.
pub fn try_select<'a, E, F>(
    text: &'a str,
    paths: &[SelectPath],
    options: &ParseOptions,
    mut on_selected: F,
) -> Result<SelectStats, E>
where
    F: FnMut(Selected<'a>) -> Result<(), E>,
    E: From<XmlError>,
{
    debug!(len = text.len(), paths = paths.len(), "select started");

    let mut selector = TokenSelector::new(paths);
    let result = Tokenizer::new(text, *options)
        .run(&mut |token: Token<'a>| selector.pipe_token(token, &mut on_selected));

    match result {
        Ok(()) => {
            let stats = selector.stats();
            debug!(
                selections = stats.selections,
                matched = stats.matched_elements,
                "select finished"
            );
            Ok(stats)
        }
        Err(e) => {
            debug!(depth = selector.depth(), "select aborted");
            Err(e)
        }
    }
}

/// Select with default options and an infallible callback
pub fn select<'a, F>(
    text: &'a str,
    paths: &[SelectPath],
    mut on_selected: F,
) -> Result<(), XmlError>
where
    F: FnMut(Selected<'a>),
{
    try_select(text, paths, &ParseOptions::default(), |selected| {
        on_selected(selected);
        Ok::<_, XmlError>(())
    })
    .map(|_| ())
}

/// Serialized XML of every selected subtree, in document order
pub fn select_to_strings(text: &str, paths: &[SelectPath]) -> Result<Vec<String>, XmlError> {
    let mut out = Vec::new();
    let mut current = String::new();
    select(text, paths, |selected| match selected {
        Selected::SelectionStart => current.clear(),
        Selected::Token(token) => write_token(&mut current, &token),
        Selected::SelectionEnd => out.push(std::mem::take(&mut current)),
    })?;
    Ok(out)
}
