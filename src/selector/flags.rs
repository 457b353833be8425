//! Small flag sets describing what a path segment tests and what the
//! selector has to keep around while those tests are pending.

use std::ops::BitOr;

use super::path::{PathSegment, StringMatch};

macro_rules! flag_set {
    ($name:ident { $($flag:ident = $bit:expr),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u8);

        impl $name {
            pub const NONE: $name = $name(0);
            $(pub const $flag: $name = $name($bit);)*

            #[inline]
            pub const fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            #[inline]
            pub const fn union(self, other: $name) -> $name {
                $name(self.0 | other.0)
            }

            #[inline]
            pub const fn difference(self, other: $name) -> $name {
                $name(self.0 & !other.0)
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = $name;

            #[inline]
            fn bitor(self, rhs: $name) -> $name {
                self.union(rhs)
            }
        }
    };
}

flag_set!(MatchCriteria {
    NAME = 0x01,
    ATTRIBUTES = 0x02,
    TEXT = 0x04,
    NODE = 0x08,
});

flag_set!(CacheProps {
    ATTRIBUTES = 0x01,
    TEXT = 0x02,
    TOKENS = 0x04,
});

impl MatchCriteria {
    /// Tests declared by a segment
    pub fn of(segment: &PathSegment) -> Self {
        let mut criteria = MatchCriteria::NONE;
        let tests_name = |m: &Option<StringMatch>| m.as_ref().is_some_and(|m| !m.is_any());
        if tests_name(&segment.local) || tests_name(&segment.prefix) {
            criteria = criteria | MatchCriteria::NAME;
        }
        if !segment.attributes.is_empty() {
            criteria = criteria | MatchCriteria::ATTRIBUTES;
        }
        if segment.text.is_some() {
            criteria = criteria | MatchCriteria::TEXT;
        }
        if segment.predicate.is_some() {
            criteria = criteria | MatchCriteria::NODE;
        }
        criteria
    }

    /// Whether a match has to wait for tokens after the start tag
    #[inline]
    pub fn is_deferred(self) -> bool {
        self.contains(MatchCriteria::ATTRIBUTES)
            || self.contains(MatchCriteria::TEXT)
            || self.contains(MatchCriteria::NODE)
    }
}

impl CacheProps {
    pub fn of(criteria: MatchCriteria, is_last: bool) -> Self {
        let node = criteria.contains(MatchCriteria::NODE);
        let mut props = CacheProps::NONE;
        if node || criteria.contains(MatchCriteria::ATTRIBUTES) {
            props = props | CacheProps::ATTRIBUTES;
        }
        if node || criteria.contains(MatchCriteria::TEXT) {
            props = props | CacheProps::TEXT;
        }
        if is_last {
            props = props | CacheProps::TOKENS;
        }
        props
    }
}
