//! Per-path matching state
//!
//! A [`PathMachine`] walks one path expression against the element stack.
//! Every open element that matched an intermediate segment is kept as an
//! entry, so a segment can continue from any matching ancestor and not only
//! from the outermost one. The state is bounded by document depth times
//! path length.
//!
//! A segment whose tests cannot be decided from the start tag becomes a
//! candidate. Attribute tests are resolved by the start tag's attributes,
//! text tests and custom predicates by the first text anywhere under the
//! element. A candidate still waiting for text when its element closes is
//! resolved without text.

use std::borrow::Cow;

use super::flags::{CacheProps, MatchCriteria};
use super::path::{Axis, NodeAttribute, NodeSnapshot, PathSegment, SelectPath};

/// What a token did to a machine, strongest effect last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Transition {
    /// Nothing changed
    Idle,
    /// A pending candidate was discarded
    Failed,
    /// A candidate was registered or is still waiting
    Pending,
    /// An intermediate segment matched
    Advanced,
    /// The last segment matched
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Start tag still open
    Attributes,
    /// Waiting for the first text under the element
    Text,
}

/// Open element that matched segment `index`
#[derive(Debug, Clone, Copy)]
struct Entry {
    index: usize,
    depth: usize,
}

#[derive(Debug)]
struct Candidate {
    index: usize,
    depth: usize,
    stage: Stage,
    /// Collected only for segments with a custom predicate
    node: Option<NodeSnapshot<'static>>,
}

#[derive(Debug)]
pub(crate) struct PathMachine<'p> {
    segments: &'p [PathSegment],
    criteria: Vec<MatchCriteria>,
    cache: Vec<CacheProps>,
    entries: Vec<Entry>,
    candidates: Vec<Candidate>,
}

impl<'p> PathMachine<'p> {
    pub fn new(path: &'p SelectPath) -> Self {
        let segments = path.segments();
        let last = segments.len().saturating_sub(1);
        let criteria: Vec<MatchCriteria> = segments.iter().map(MatchCriteria::of).collect();
        let cache = criteria
            .iter()
            .enumerate()
            .map(|(i, c)| CacheProps::of(*c, i == last))
            .collect();

        PathMachine {
            segments,
            criteria,
            cache,
            entries: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.candidates.clear();
    }

    #[inline]
    fn last(&self) -> Option<usize> {
        self.segments.len().checked_sub(1)
    }

    /// Deepest segment matched by an open element
    pub fn current(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.index).max()
    }

    /// What the pending candidates need cached
    pub fn pending_cache(&self) -> CacheProps {
        self.candidates.iter().fold(CacheProps::NONE, |acc, c| {
            let mut props = self.cache[c.index];
            match c.stage {
                Stage::Attributes => props = props.difference(CacheProps::TEXT),
                Stage::Text => props = props.difference(CacheProps::ATTRIBUTES),
            }
            acc | props
        })
    }

    /// Whether a candidate above `depth` could still start a selection
    pub fn wants_tokens(&self, depth: usize) -> bool {
        self.candidates
            .iter()
            .any(|c| c.depth < depth && self.cache[c.index].contains(CacheProps::TOKENS))
    }

    /// Whether segment `index` may match an element at `depth`
    fn reachable(&self, index: usize, depth: usize) -> bool {
        let axis = self.segments[index].axis;
        let fits = |base: usize| match axis {
            Axis::Child => depth == base + 1,
            Axis::SelfOrDescendant => depth > base,
        };
        match index.checked_sub(1) {
            None => fits(0),
            Some(parent) => self
                .entries
                .iter()
                .any(|e| e.index == parent && e.depth < depth && fits(e.depth)),
        }
    }

    /// Start tag of an element at `depth` (root is 1). Depths of elements
    /// that completed the path are pushed to `finals`.
    pub fn element_start(
        &mut self,
        depth: usize,
        prefix: &str,
        local: &str,
        finals: &mut Vec<usize>,
    ) -> Transition {
        let mut result = Transition::Idle;

        for index in 0..self.segments.len() {
            if !self.reachable(index, depth) {
                continue;
            }
            let criteria = self.criteria[index];
            if criteria.contains(MatchCriteria::NAME)
                && !self.segments[index].matches_name(prefix, local)
            {
                continue;
            }

            if !criteria.is_deferred() {
                result = result.max(self.enter(index, depth, finals));
                continue;
            }

            let stage = if criteria.contains(MatchCriteria::ATTRIBUTES)
                || criteria.contains(MatchCriteria::NODE)
            {
                Stage::Attributes
            } else {
                Stage::Text
            };
            let node = criteria.contains(MatchCriteria::NODE).then(|| NodeSnapshot {
                prefix: Cow::Owned(prefix.to_owned()),
                local: Cow::Owned(local.to_owned()),
                ..Default::default()
            });
            self.candidates.push(Candidate {
                index,
                depth,
                stage,
                node,
            });
            result = result.max(Transition::Pending);
        }

        result
    }

    /// Attribute of the open start tag, `attributes` holds all seen so far
    pub fn attribute(
        &mut self,
        attributes: &[NodeAttribute<'_>],
        finals: &mut Vec<usize>,
    ) -> Transition {
        let mut result = Transition::Idle;
        let mut i = 0;
        while i < self.candidates.len() {
            let c = &self.candidates[i];
            let criteria = self.criteria[c.index];
            if c.stage != Stage::Attributes {
                i += 1;
                continue;
            }
            // Later stages need the complete start tag
            if criteria.contains(MatchCriteria::TEXT)
                || criteria.contains(MatchCriteria::NODE)
                || !self.attributes_match(c.index, attributes)
            {
                result = result.max(Transition::Pending);
                i += 1;
                continue;
            }
            let c = self.candidates.remove(i);
            result = result.max(self.enter(c.index, c.depth, finals));
        }
        result
    }

    /// `>` or `/>`: the start tag's attributes are complete
    pub fn start_tag_end(
        &mut self,
        attributes: &[NodeAttribute<'_>],
        finals: &mut Vec<usize>,
    ) -> Transition {
        let mut result = Transition::Idle;
        let mut i = 0;
        while i < self.candidates.len() {
            if self.candidates[i].stage != Stage::Attributes {
                result = result.max(Transition::Pending);
                i += 1;
                continue;
            }
            let index = self.candidates[i].index;
            let criteria = self.criteria[index];

            if !self.attributes_match(index, attributes) {
                self.candidates.remove(i);
                result = result.max(Transition::Failed);
                continue;
            }
            if criteria.contains(MatchCriteria::TEXT) || criteria.contains(MatchCriteria::NODE) {
                let c = &mut self.candidates[i];
                c.stage = Stage::Text;
                if let Some(node) = c.node.as_mut() {
                    node.attributes = attributes
                        .iter()
                        .cloned()
                        .map(NodeAttribute::into_owned)
                        .collect();
                }
                result = result.max(Transition::Pending);
                i += 1;
                continue;
            }
            let c = self.candidates.remove(i);
            result = result.max(self.enter(c.index, c.depth, finals));
        }
        result
    }

    /// First text under every candidate waiting for it
    pub fn text(&mut self, text: &str, finals: &mut Vec<usize>) -> Transition {
        self.resolve_waiting(Some(text), |_| true, finals)
    }

    /// An element closed; `depth` is the depth after leaving it
    pub fn element_end(&mut self, depth: usize, finals: &mut Vec<usize>) -> Transition {
        let result = self.resolve_waiting(None, |c| c.depth > depth, finals);
        self.candidates.retain(|c| c.depth <= depth);
        self.entries.retain(|e| e.depth <= depth);
        result
    }

    /// Decide the text-stage candidates selected by `which`, outermost first
    fn resolve_waiting<W>(
        &mut self,
        text: Option<&str>,
        which: W,
        finals: &mut Vec<usize>,
    ) -> Transition
    where
        W: Fn(&Candidate) -> bool,
    {
        let segments = self.segments;
        let mut result = Transition::Idle;
        let mut i = 0;
        while i < self.candidates.len() {
            let c = &self.candidates[i];
            if c.stage != Stage::Text || !which(c) {
                i += 1;
                continue;
            }
            let mut c = self.candidates.remove(i);
            let segment = &segments[c.index];

            let text_ok = match (&segment.text, text) {
                (None, _) => true,
                (Some(test), Some(text)) => test.matches(text),
                (Some(_), None) => false,
            };
            let node_ok = match (&segment.predicate, c.node.as_mut()) {
                (Some(predicate), Some(node)) => {
                    node.text = text.map(|t| Cow::Owned(t.to_owned()));
                    predicate.test(node)
                }
                _ => true,
            };

            result = result.max(if text_ok && node_ok {
                self.enter(c.index, c.depth, finals)
            } else {
                Transition::Failed
            });
        }
        result
    }

    fn attributes_match(&self, index: usize, attributes: &[NodeAttribute<'_>]) -> bool {
        self.segments[index].attributes.iter().all(|filter| {
            attributes
                .iter()
                .any(|a| filter.matches(&a.prefix, &a.local, &a.value))
        })
    }

    fn enter(&mut self, index: usize, depth: usize, finals: &mut Vec<usize>) -> Transition {
        if Some(index) == self.last() {
            finals.push(depth);
            Transition::Final
        } else {
            self.entries.push(Entry { index, depth });
            Transition::Advanced
        }
    }
}
