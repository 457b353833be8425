//! Path expression parser
//!
//! Recursive descent over the lexer's tokens, producing one [`SelectPath`]
//! per `|`-separated branch. Supported grammar:
//!
//! ```text
//! union     := path ('|' path)*
//! path      := ('/' | '//') step (('/' | '//') step)*
//! step      := (axis '::')? nametest predicate*
//! nametest  := '*' | name | prefix ':' name | prefix ':' '*'
//! predicate := '[' test ('and' test)* ']'
//! test      := '@' nametest ('=' literal)?
//!            | 'text()' '=' literal
//!            | fn '(' ('@' nametest | 'text()') ',' literal ')'
//! fn        := 'contains' | 'starts-with' | 'ends-with'
//! ```

use super::lexer::{Lexer, Spanned, Token};
use super::PathSyntaxError;
use crate::selector::{AttributeFilter, Axis, PathSegment, SelectPath, StringMatch};

/// What a predicate function is applied to
enum Subject {
    Attribute(AttributeFilter),
    Text,
}

pub struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, PathSyntaxError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser { tokens, index: 0 })
    }

    /// Parse the whole expression
    pub fn parse(&mut self) -> Result<Vec<SelectPath>, PathSyntaxError> {
        let mut paths = vec![self.parse_path()?];
        while self.current() == &Token::Pipe {
            self.advance();
            paths.push(self.parse_path()?);
        }
        if self.current() != &Token::Eof {
            return Err(self.error("unexpected token after path"));
        }
        Ok(paths)
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.index)
            .map_or(&Token::Eof, |spanned| &spanned.token)
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.index + 1)
            .map_or(&Token::Eof, |spanned| &spanned.token)
    }

    fn pos(&self) -> usize {
        match self.tokens.get(self.index) {
            Some(spanned) => spanned.pos,
            None => self.tokens.last().map_or(0, |spanned| spanned.pos),
        }
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    fn error(&self, message: &str) -> PathSyntaxError {
        PathSyntaxError::new(message, self.pos())
    }

    fn expect(&mut self, expected: Token, message: &str) -> Result<(), PathSyntaxError> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn parse_path(&mut self) -> Result<SelectPath, PathSyntaxError> {
        let mut segments = Vec::new();
        loop {
            let axis = match self.current() {
                Token::Slash => Axis::Child,
                Token::DoubleSlash => Axis::SelfOrDescendant,
                _ if segments.is_empty() => return Err(self.error("expected '/' or '//'")),
                _ => break,
            };
            self.advance();
            segments.push(self.parse_step(axis)?);
        }
        Ok(SelectPath::new(segments))
    }

    fn parse_step(&mut self, axis: Axis) -> Result<PathSegment, PathSyntaxError> {
        let axis = match self.current().clone() {
            Token::Axis(name) => {
                let explicit = match name.as_str() {
                    "child" => axis,
                    "descendant" | "descendant-or-self" => Axis::SelfOrDescendant,
                    _ => return Err(self.error("unsupported axis")),
                };
                self.advance();
                self.expect(Token::DoubleColon, "expected '::'")?;
                explicit
            }
            _ => axis,
        };

        let (prefix, local) = self.parse_name_test()?;
        let mut segment = PathSegment {
            axis,
            local: Some(local),
            prefix,
            ..Default::default()
        };

        while self.current() == &Token::LeftBracket {
            self.advance();
            self.parse_predicate(&mut segment)?;
            while self.current() == &Token::And {
                self.advance();
                self.parse_predicate(&mut segment)?;
            }
            self.expect(Token::RightBracket, "expected ']'")?;
        }

        Ok(segment)
    }

    /// `*`, `name`, `p:name` or `p:*` as (prefix test, local test)
    fn parse_name_test(&mut self) -> Result<(Option<StringMatch>, StringMatch), PathSyntaxError> {
        let test = match self.current() {
            Token::Star => (None, StringMatch::any()),
            Token::Name(name) => (None, StringMatch::exact(name.as_str())),
            Token::NameTest { prefix, local } => (
                Some(StringMatch::exact(prefix.as_str())),
                match local {
                    Some(local) => StringMatch::exact(local.as_str()),
                    None => StringMatch::any(),
                },
            ),
            _ => return Err(self.error("expected a name test")),
        };
        self.advance();
        Ok(test)
    }

    fn parse_attribute_filter(&mut self) -> Result<AttributeFilter, PathSyntaxError> {
        self.expect(Token::At, "expected '@'")?;
        let (prefix, local) = self.parse_name_test()?;
        Ok(AttributeFilter {
            local: Some(local),
            prefix,
            value: None,
        })
    }

    fn parse_text_node(&mut self) -> Result<(), PathSyntaxError> {
        self.advance();
        self.expect(Token::LeftParen, "expected '('")?;
        self.expect(Token::RightParen, "expected ')'")
    }

    fn parse_literal(&mut self) -> Result<String, PathSyntaxError> {
        match self.current().clone() {
            Token::String(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(self.error("expected a string literal")),
        }
    }

    fn parse_predicate(&mut self, segment: &mut PathSegment) -> Result<(), PathSyntaxError> {
        match self.current().clone() {
            Token::At => {
                let mut filter = self.parse_attribute_filter()?;
                if self.current() == &Token::Eq {
                    self.advance();
                    filter.value = Some(StringMatch::exact(self.parse_literal()?));
                }
                segment.attributes.push(filter);
                Ok(())
            }
            Token::NodeType(_) => {
                let at = self.pos();
                self.parse_text_node()?;
                self.expect(Token::Eq, "expected '='")?;
                let value = StringMatch::exact(self.parse_literal()?);
                set_text(segment, value, at)
            }
            Token::Name(function) if self.peek() == &Token::LeftParen => {
                let at = self.pos();
                let make: fn(String) -> StringMatch = match function.as_str() {
                    "contains" => |v| StringMatch::contains(v),
                    "starts-with" => |v| StringMatch::starts_with(v),
                    "ends-with" => |v| StringMatch::ends_with(v),
                    _ => return Err(self.error("unsupported function")),
                };
                self.advance();
                self.advance();

                let subject = match self.current() {
                    Token::At => Subject::Attribute(self.parse_attribute_filter()?),
                    Token::NodeType(_) => {
                        self.parse_text_node()?;
                        Subject::Text
                    }
                    _ => return Err(self.error("expected an attribute or text()")),
                };
                self.expect(Token::Comma, "expected ','")?;
                let value = make(self.parse_literal()?);
                self.expect(Token::RightParen, "expected ')'")?;

                match subject {
                    Subject::Attribute(mut filter) => {
                        filter.value = Some(value);
                        segment.attributes.push(filter);
                        Ok(())
                    }
                    Subject::Text => set_text(segment, value, at),
                }
            }
            _ => Err(self.error("unsupported predicate")),
        }
    }
}

fn set_text(
    segment: &mut PathSegment,
    value: StringMatch,
    at: usize,
) -> Result<(), PathSyntaxError> {
    if segment.text.is_some() {
        return Err(PathSyntaxError::new("only one text test per step", at));
    }
    segment.text = Some(value);
    Ok(())
}
