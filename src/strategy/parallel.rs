//! Parallel Batch Selection
//!
//! Uses Rayon to run independent selection passes over many documents.
//! Each document gets its own tokenizer and selector; only the compiled
//! paths are shared.

use rayon::prelude::*;
use tracing::debug;

use crate::core::XmlError;
use crate::selector::{select_to_strings, SelectPath};
use crate::xpath::{compile_cached, PathSyntaxError};

/// Select from every document in parallel.
///
/// Results keep the order of `docs`; a malformed document fails alone.
pub fn select_parallel(docs: &[&str], paths: &[SelectPath]) -> Vec<Result<Vec<String>, XmlError>> {
    debug!(docs = docs.len(), paths = paths.len(), "parallel select");
    docs.par_iter()
        .map(|doc| select_to_strings(doc, paths))
        .collect()
}

/// Compile `expr` once through the cache, then select from every document
pub fn select_xpath_parallel(
    docs: &[&str],
    expr: &str,
) -> Result<Vec<Result<Vec<String>, XmlError>>, PathSyntaxError> {
    let paths = compile_cached(expr)?;
    Ok(select_parallel(docs, &paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::selector::PathSegment;

    #[test]
    fn test_parallel_select() {
        let docs = ["<r><a>1</a></r>", "<r><b/></r>", "<r><a/><a>2</a></r>"];
        let paths = [SelectPath::new(vec![PathSegment::descendant("a")])];

        let results = select_parallel(&docs, &paths);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &vec!["<a>1</a>".to_string()]);
        assert!(results[1].as_ref().unwrap().is_empty());
        assert_eq!(results[2].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_errors_stay_per_document() {
        let docs = ["<r><a/></r>", "<r><a></r>"];
        let results = select_xpath_parallel(&docs, "//a").unwrap();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(XmlError {
                kind: ErrorKind::UnexpectedCloseTag { .. },
                ..
            })
        ));

        assert!(select_xpath_parallel(&docs, "a[").is_err());
    }
}
