//! Streaming selection over a token stream
//!
//! [`TokenSelector`] runs one [`PathMachine`] per path expression over the
//! tokens of a document and re-emits every subtree that satisfies any of
//! them, bracketed by [`Selected::SelectionStart`]/[`Selected::SelectionEnd`].
//!
//! Tokens of an element whose last-segment tests are still undecided are
//! buffered and replayed once the element matches. Only one subtree is
//! recorded at a time: matches inside it, or decided while it is being
//! recorded, are counted, not bracketed.

use tracing::trace;

use super::flags::CacheProps;
use super::machine::{PathMachine, Transition};
use super::path::{NodeAttribute, SelectPath};
use crate::core::{ElementEnd, Token};

/// Item handed to a selection callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected<'a> {
    SelectionStart,
    Token(Token<'a>),
    SelectionEnd,
}

impl<'a> Selected<'a> {
    #[inline]
    pub fn token(&self) -> Option<&Token<'a>> {
        match self {
            Selected::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn into_owned(self) -> Selected<'static> {
        match self {
            Selected::SelectionStart => Selected::SelectionStart,
            Selected::Token(token) => Selected::Token(token.into_owned()),
            Selected::SelectionEnd => Selected::SelectionEnd,
        }
    }
}

/// Counters for one selection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectStats {
    /// Bracketed subtrees emitted
    pub selections: usize,
    /// Elements that satisfied a complete path, nested ones included
    pub matched_elements: usize,
}

#[derive(Debug, Default)]
struct Observation {
    /// Depth of the element whose selection starts with this token
    started: Option<usize>,
    closed_root: bool,
}

/// Multi-path selector fed one token at a time
#[derive(Debug)]
pub struct TokenSelector<'p, 'a> {
    machines: Vec<PathMachine<'p>>,
    depth: usize,
    /// Depth of the root of the subtree being recorded
    recording: Option<usize>,
    /// Tokens held for undecided candidates, tagged with their depth
    buffer: Vec<(usize, Token<'a>)>,
    /// Attributes of the element whose start tag is being read
    attributes: Vec<NodeAttribute<'a>>,
    /// Depths of open elements already counted as matched
    counted: Vec<usize>,
    finals: Vec<usize>,
    stats: SelectStats,
}

impl<'p, 'a> TokenSelector<'p, 'a> {
    pub fn new(paths: &'p [SelectPath]) -> Self {
        TokenSelector {
            machines: paths.iter().map(PathMachine::new).collect(),
            depth: 0,
            recording: None,
            buffer: Vec::new(),
            attributes: Vec::new(),
            counted: Vec::new(),
            finals: Vec::new(),
            stats: SelectStats::default(),
        }
    }

    /// Forget all state so the selector can run over another document
    pub fn reset(&mut self) {
        self.machines.iter_mut().for_each(PathMachine::reset);
        self.depth = 0;
        self.recording = None;
        self.buffer.clear();
        self.attributes.clear();
        self.counted.clear();
        self.finals.clear();
        self.stats = SelectStats::default();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    #[inline]
    pub fn selections(&self) -> usize {
        self.stats.selections
    }

    #[inline]
    pub fn matched_elements(&self) -> usize {
        self.stats.matched_elements
    }

    #[inline]
    pub fn stats(&self) -> SelectStats {
        self.stats
    }

    /// Feed the next token of the document.
    ///
    /// `emit` receives the selected tokens in document order. An error from
    /// `emit` is returned unchanged and leaves the selector mid-document.
    pub fn pipe_token<E, F>(&mut self, token: Token<'a>, emit: &mut F) -> Result<(), E>
    where
        F: FnMut(Selected<'a>) -> Result<(), E>,
    {
        let seen = self.observe(&token);

        if let Some(root) = seen.started {
            self.stats.selections += 1;
            emit(Selected::SelectionStart)?;

            // A match on its own start tag has nothing buffered yet
            let from = match token {
                Token::ElementStart { .. } => self.buffer.len(),
                _ => self
                    .buffer
                    .iter()
                    .rposition(|(depth, t)| {
                        *depth == root && matches!(t, Token::ElementStart { .. })
                    })
                    .unwrap_or(self.buffer.len()),
            };
            trace!(
                depth = root,
                replayed = self.buffer.len() - from,
                "selection started"
            );
            if self.wants_tokens(root) {
                for (_, buffered) in &self.buffer[from..] {
                    emit(Selected::Token(buffered.clone()))?;
                }
            } else {
                self.buffer.drain(..from);
                for (_, buffered) in self.buffer.drain(..) {
                    emit(Selected::Token(buffered))?;
                }
            }
        }

        if let Some(root) = self.recording {
            // An undecided ancestor may still need this token
            if self.wants_tokens(root) {
                self.buffer.push((self.depth, token.clone()));
            } else {
                self.buffer.clear();
            }
            emit(Selected::Token(token))?;
            if seen.closed_root {
                self.recording = None;
                trace!(depth = self.depth, "selection ended");
                emit(Selected::SelectionEnd)?;
            }
        } else if self.wants_tokens(usize::MAX) {
            self.buffer.push((self.depth, token));
        } else {
            self.buffer.clear();
        }

        Ok(())
    }

    /// Union of what the pending candidates need cached
    fn pending_cache(&self) -> CacheProps {
        self.machines
            .iter()
            .fold(CacheProps::NONE, |acc, m| acc | m.pending_cache())
    }

    /// Whether a candidate above `depth` still needs the tokens seen
    fn wants_tokens(&self, depth: usize) -> bool {
        self.machines.iter().any(|m| m.wants_tokens(depth))
    }

    fn observe(&mut self, token: &Token<'a>) -> Observation {
        let mut seen = Observation::default();
        let mut finals = std::mem::take(&mut self.finals);
        finals.clear();
        let mut closing = None;

        match token {
            Token::ElementStart { prefix, local, .. } => {
                self.depth += 1;
                self.attributes.clear();
                for (i, machine) in self.machines.iter_mut().enumerate() {
                    let transition = machine.element_start(self.depth, prefix, local, &mut finals);
                    trace_transition(i, self.depth, transition);
                }
            }
            Token::Attribute {
                prefix,
                local,
                value,
                ..
            } => {
                if self.pending_cache().contains(CacheProps::ATTRIBUTES) {
                    self.attributes.push(NodeAttribute {
                        prefix: prefix.clone(),
                        local: local.clone(),
                        value: value.clone(),
                    });
                    for (i, machine) in self.machines.iter_mut().enumerate() {
                        let transition = machine.attribute(&self.attributes, &mut finals);
                        trace_transition(i, self.depth, transition);
                    }
                }
            }
            Token::ElementEnd {
                end: ElementEnd::Open,
                ..
            } => {
                for (i, machine) in self.machines.iter_mut().enumerate() {
                    let transition = machine.start_tag_end(&self.attributes, &mut finals);
                    trace_transition(i, self.depth, transition);
                }
            }
            Token::ElementEnd { end, .. } => {
                let empty = matches!(end, ElementEnd::Empty);
                closing = Some(self.depth);
                self.depth = self.depth.saturating_sub(1);
                for (i, machine) in self.machines.iter_mut().enumerate() {
                    if empty {
                        let transition = machine.start_tag_end(&self.attributes, &mut finals);
                        trace_transition(i, self.depth + 1, transition);
                    }
                    let transition = machine.element_end(self.depth, &mut finals);
                    trace_transition(i, self.depth + 1, transition);
                }
            }
            Token::Text { text, .. } | Token::Cdata { text, .. } => {
                if self.pending_cache().contains(CacheProps::TEXT) {
                    for (i, machine) in self.machines.iter_mut().enumerate() {
                        let transition = machine.text(text, &mut finals);
                        trace_transition(i, self.depth, transition);
                    }
                }
            }
            Token::Declaration { .. }
            | Token::Comment { .. }
            | Token::ProcessingInstruction { .. }
            | Token::EntityDeclaration { .. } => {}
        }

        self.settle(&finals, &mut seen);
        self.finals = finals;

        if let Some(closing) = closing {
            self.counted.retain(|&d| d < closing);
            seen.closed_root = self.recording == Some(closing);
        }
        seen
    }

    /// Count the elements that completed a path and start recording the
    /// outermost one when nothing is being recorded
    fn settle(&mut self, finals: &[usize], seen: &mut Observation) {
        for &depth in finals {
            if !self.counted.contains(&depth) {
                self.counted.push(depth);
                self.stats.matched_elements += 1;
            }
        }
        if self.recording.is_none() {
            if let Some(&root) = finals.iter().min() {
                self.recording = Some(root);
                seen.started = Some(root);
            }
        }
    }
}

fn trace_transition(path: usize, depth: usize, transition: Transition) {
    match transition {
        Transition::Advanced => trace!(path, depth, "segment matched"),
        Transition::Final => trace!(path, depth, "path matched"),
        Transition::Failed => trace!(path, depth, "candidate failed"),
        Transition::Idle | Transition::Pending => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, ParseOptions, TextPos, Tokenizer, XmlError};
    use crate::selector::path::{AttributeFilter, PathSegment, StringMatch};

    fn run<'t>(text: &'t str, paths: &[SelectPath]) -> (Vec<Selected<'t>>, SelectStats) {
        let mut selector = TokenSelector::new(paths);
        let mut out = Vec::new();
        Tokenizer::new(text, ParseOptions::default())
            .run(&mut |token: Token<'t>| {
                selector.pipe_token(token, &mut |selected: Selected<'t>| {
                    out.push(selected);
                    Ok::<_, XmlError>(())
                })
            })
            .unwrap();
        (out, selector.stats())
    }

    fn brackets(selected: &[Selected<'_>]) -> (usize, usize) {
        let starts = selected
            .iter()
            .filter(|s| **s == Selected::SelectionStart)
            .count();
        let ends = selected
            .iter()
            .filter(|s| **s == Selected::SelectionEnd)
            .count();
        (starts, ends)
    }

    #[test]
    fn test_selects_empty_element() {
        let paths = [SelectPath::new(vec![PathSegment::child("a")])];
        let (out, stats) = run("<a/>", &paths);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], Selected::SelectionStart);
        assert_matches::assert_matches!(out[1].token(), Some(Token::ElementStart { .. }));
        assert_eq!(out[3], Selected::SelectionEnd);
        assert_eq!(stats.selections, 1);
    }

    #[test]
    fn test_buffer_replayed_after_attribute_match() {
        let paths = [SelectPath::new(vec![
            PathSegment::child("r"),
            PathSegment::child("b").with_attribute(
                AttributeFilter::named("k").with_value(StringMatch::exact("yes")),
            ),
        ])];
        let (out, stats) = run(r#"<r><b k="no"/><b x="1" k="yes">t</b></r>"#, &paths);
        assert_eq!(stats.selections, 1);
        assert_eq!(brackets(&out), (1, 1));

        // SelectionStart, <b, x, k, >, t, </b>, SelectionEnd
        assert_eq!(out.len(), 8);
        assert_matches::assert_matches!(
            out[2].token(),
            Some(Token::Attribute { local, .. }) if local == "x"
        );
    }

    #[test]
    fn test_failed_candidate_drops_buffer() {
        let paths = [SelectPath::new(vec![
            PathSegment::descendant("b").with_attribute(AttributeFilter::named("k"))
        ])];
        let (out, stats) = run("<r><b>1</b><b/></r>", &paths);
        assert!(out.is_empty());
        assert_eq!(stats, SelectStats::default());
    }

    #[test]
    fn test_one_bracket_for_overlapping_paths() {
        let paths = [
            SelectPath::new(vec![PathSegment::child("a")]),
            SelectPath::new(vec![PathSegment::descendant("b")]),
        ];
        let (out, stats) = run("<a><b/><c><b/></c></a>", &paths);
        assert_eq!(brackets(&out), (1, 1));
        assert_eq!(stats.selections, 1);
        assert_eq!(stats.matched_elements, 3);
    }

    #[test]
    fn test_sibling_selections() {
        let paths = [SelectPath::new(vec![
            PathSegment::child("r"),
            PathSegment::child("*"),
        ])];
        let (out, stats) = run("<r><a/>text<b></b></r>", &paths);
        assert_eq!(brackets(&out), (2, 2));
        assert_eq!(stats.selections, 2);
        assert!(out.iter().all(|s| !matches!(s.token(), Some(Token::Text { .. }))));
    }

    #[test]
    fn test_ancestor_decided_after_nested_selection() {
        let paths = [
            SelectPath::new(vec![PathSegment::descendant("b")]),
            SelectPath::new(vec![
                PathSegment::descendant("a").with_text(StringMatch::exact("x"))
            ]),
        ];
        let (out, stats) = run("<r><a><b/>x</a></r>", &paths);
        assert_eq!(stats.selections, 2);
        assert_eq!(stats.matched_elements, 2);
        assert_eq!(brackets(&out), (2, 2));

        // <b/> is selected first, then <a> is replayed from its start tag
        let tokens: Vec<&Token<'_>> = out.iter().filter_map(Selected::token).collect();
        assert_eq!(tokens.len(), 2 + 6);
        assert_matches::assert_matches!(
            tokens[2],
            Token::ElementStart { local, .. } if local == "a"
        );
    }

    #[test]
    fn test_emit_error_aborts() {
        let paths = [SelectPath::new(vec![PathSegment::child("a")])];
        let mut selector = TokenSelector::new(&paths);
        let mut seen = 0;
        let result = Tokenizer::new("<a><b/></a>", ParseOptions::default()).run(
            &mut |token: Token<'static>| {
                selector.pipe_token(token, &mut |_selected: Selected<'_>| {
                    seen += 1;
                    if seen == 2 {
                        Err(XmlError::new(ErrorKind::UnknownToken("stop"), TextPos::default(), 0))
                    } else {
                        Ok(())
                    }
                })
            },
        );
        assert_matches::assert_matches!(
            result,
            Err(XmlError {
                kind: ErrorKind::UnknownToken("stop"),
                ..
            })
        );
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_reset() {
        let paths = [SelectPath::new(vec![PathSegment::child("a")])];
        let mut selector = TokenSelector::new(&paths);
        let mut sink = |_selected: Selected<'_>| Ok::<_, XmlError>(());
        selector
            .pipe_token(
                Token::ElementStart {
                    prefix: "".into(),
                    local: "a".into(),
                    start: 0,
                },
                &mut sink,
            )
            .unwrap();
        assert!(selector.is_recording());
        assert_eq!(selector.depth(), 1);

        selector.reset();
        assert!(!selector.is_recording());
        assert_eq!(selector.depth(), 0);
        assert_eq!(selector.selections(), 0);
        assert_eq!(selector.matched_elements(), 0);
    }
}
