//! Token vocabulary
//!
//! Tokens borrow their text from the document being tokenized. Use
//! [`Token::into_owned`] when a token has to outlive the input buffer.

use std::borrow::Cow;

/// Half-open byte range into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        TextRange { start, end }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Extract the covered text, `None` if the range does not fit `text`
    #[inline]
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

/// How an element tag ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementEnd<'a> {
    /// `>` of a start tag
    Open,
    /// `/>` of an empty element
    Empty,
    /// `</prefix:local>`
    Close {
        prefix: Cow<'a, str>,
        local: Cow<'a, str>,
    },
}

/// A token emitted by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<?xml version="1.0" ...?>`
    Declaration {
        version: Cow<'a, str>,
        encoding: Option<Cow<'a, str>>,
        standalone: Option<Cow<'a, str>>,
        range: TextRange,
    },
    /// `<prefix:local`, attributes follow
    ElementStart {
        prefix: Cow<'a, str>,
        local: Cow<'a, str>,
        /// Offset of the `<`
        start: usize,
    },
    /// `prefix:local="value"` of the most recently started element.
    /// The value is raw: references are not resolved.
    Attribute {
        prefix: Cow<'a, str>,
        local: Cow<'a, str>,
        value: Cow<'a, str>,
        range: TextRange,
    },
    ElementEnd {
        end: ElementEnd<'a>,
        range: TextRange,
    },
    /// Character data between tags, whitespace-only runs included
    Text { text: Cow<'a, str>, range: TextRange },
    Cdata { text: Cow<'a, str>, range: TextRange },
    Comment { text: Cow<'a, str>, range: TextRange },
    ProcessingInstruction {
        target: Cow<'a, str>,
        content: Option<Cow<'a, str>>,
        range: TextRange,
    },
    /// General entity with a literal value, from the internal DTD subset
    EntityDeclaration {
        name: Cow<'a, str>,
        definition: Cow<'a, str>,
        range: TextRange,
    },
}

impl<'a> Token<'a> {
    /// Byte range of the token in the source document
    pub fn range(&self) -> TextRange {
        match self {
            Token::ElementStart {
                prefix,
                local,
                start,
            } => {
                let name_len = if prefix.is_empty() {
                    local.len()
                } else {
                    prefix.len() + 1 + local.len()
                };
                TextRange::new(*start, start + 1 + name_len)
            }
            Token::Declaration { range, .. }
            | Token::Attribute { range, .. }
            | Token::ElementEnd { range, .. }
            | Token::Text { range, .. }
            | Token::Cdata { range, .. }
            | Token::Comment { range, .. }
            | Token::ProcessingInstruction { range, .. }
            | Token::EntityDeclaration { range, .. } => *range,
        }
    }

    /// Qualified name of an element start, attribute or close tag
    pub fn qname(&self) -> Option<Cow<'_, str>> {
        match self {
            Token::ElementStart { prefix, local, .. } | Token::Attribute { prefix, local, .. } => {
                Some(qname(prefix, local))
            }
            Token::ElementEnd {
                end: ElementEnd::Close { prefix, local },
                ..
            } => Some(qname(prefix, local)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_element_start(&self) -> bool {
        matches!(self, Token::ElementStart { .. })
    }

    /// True for `/>` and `</name>`, the tokens that leave an element
    #[inline]
    pub fn is_element_close(&self) -> bool {
        matches!(
            self,
            Token::ElementEnd {
                end: ElementEnd::Empty | ElementEnd::Close { .. },
                ..
            }
        )
    }

    /// Copy all borrowed text so the token no longer depends on the input
    pub fn into_owned(self) -> Token<'static> {
        match self {
            Token::Declaration {
                version,
                encoding,
                standalone,
                range,
            } => Token::Declaration {
                version: own(version),
                encoding: encoding.map(own),
                standalone: standalone.map(own),
                range,
            },
            Token::ElementStart {
                prefix,
                local,
                start,
            } => Token::ElementStart {
                prefix: own(prefix),
                local: own(local),
                start,
            },
            Token::Attribute {
                prefix,
                local,
                value,
                range,
            } => Token::Attribute {
                prefix: own(prefix),
                local: own(local),
                value: own(value),
                range,
            },
            Token::ElementEnd { end, range } => Token::ElementEnd {
                end: match end {
                    ElementEnd::Open => ElementEnd::Open,
                    ElementEnd::Empty => ElementEnd::Empty,
                    ElementEnd::Close { prefix, local } => ElementEnd::Close {
                        prefix: own(prefix),
                        local: own(local),
                    },
                },
                range,
            },
            Token::Text { text, range } => Token::Text {
                text: own(text),
                range,
            },
            Token::Cdata { text, range } => Token::Cdata {
                text: own(text),
                range,
            },
            Token::Comment { text, range } => Token::Comment {
                text: own(text),
                range,
            },
            Token::ProcessingInstruction {
                target,
                content,
                range,
            } => Token::ProcessingInstruction {
                target: own(target),
                content: content.map(own),
                range,
            },
            Token::EntityDeclaration {
                name,
                definition,
                range,
            } => Token::EntityDeclaration {
                name: own(name),
                definition: own(definition),
                range,
            },
        }
    }
}

/// Render `prefix:local`, or just `local` when the prefix is empty
pub fn qname<'b>(prefix: &'b str, local: &'b str) -> Cow<'b, str> {
    if prefix.is_empty() {
        Cow::Borrowed(local)
    } else {
        Cow::Owned(format!("{}:{}", prefix, local))
    }
}

#[inline]
fn own(text: Cow<'_, str>) -> Cow<'static, str> {
    Cow::Owned(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname() {
        assert_eq!(qname("", "book"), "book");
        assert_eq!(qname("x", "book"), "x:book");

        let token = Token::ElementEnd {
            end: ElementEnd::Close {
                prefix: "test".into(),
                local: "node".into(),
            },
            range: TextRange::new(0, 12),
        };
        assert_eq!(token.qname().as_deref(), Some("test:node"));
        assert!(token.is_element_close());
    }

    #[test]
    fn test_element_start_range() {
        let token = Token::ElementStart {
            prefix: "a".into(),
            local: "bc".into(),
            start: 4,
        };
        assert_eq!(token.range(), TextRange::new(4, 9));
    }

    #[test]
    fn test_into_owned_outlives_input() {
        let owned = {
            let input = String::from("value");
            let token = Token::Text {
                text: Cow::Borrowed(input.as_str()),
                range: TextRange::new(0, 5),
            };
            token.into_owned()
        };
        assert_eq!(
            owned,
            Token::Text {
                text: "value".into(),
                range: TextRange::new(0, 5)
            }
        );
    }
}
