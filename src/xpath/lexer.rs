//! Path expression lexer
//!
//! Splits an XPath-like expression into tokens, each tagged with the byte
//! offset it starts at so the parser can point at the offending input.

use super::PathSyntaxError;
use crate::core::unicode::{is_name_char, is_name_start_char};

/// Path expression token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Slash,       // /
    DoubleSlash, // //
    At,          // @
    Pipe,        // |
    Star,        // *
    Eq,          // =
    Comma,       // ,
    DoubleColon, // ::
    And,         // and

    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    String(String),

    /// NCName, also function names
    Name(String),
    /// `prefix:local`, or `prefix:*` when `local` is `None`
    NameTest { prefix: String, local: Option<String> },
    /// `text` followed by `(`
    NodeType(String),
    /// Name followed by `::`
    Axis(String),

    Eof,
}

/// Token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> PathSyntaxError {
        PathSyntaxError::new(message, pos)
    }

    pub fn next_token(&mut self) -> Result<Spanned, PathSyntaxError> {
        self.skip_whitespace();
        let pos = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    pos,
                })
            }
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '*' => {
                self.advance(1);
                Token::Star
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ':' if self.peek_at(1) == Some(':') => {
                self.advance(2);
                Token::DoubleColon
            }
            '"' | '\'' => self.read_string(c)?,
            _ if is_ncname_start_char(c) => self.read_name_or_keyword(),
            _ => return Err(self.error(format!("unexpected character '{}'", c), pos)),
        };

        Ok(Spanned { token, pos })
    }

    fn read_string(&mut self, quote: char) -> Result<Token, PathSyntaxError> {
        let open = self.pos;
        self.advance(1);
        let start = self.pos;

        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.advance(len + 1);
                Ok(Token::String(value))
            }
            None => Err(self.error("unterminated string literal", open)),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ncname_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if name == "and" {
            return Token::And;
        }

        // Prefixed name test
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.advance(2);
                    return Token::NameTest {
                        prefix: name.to_string(),
                        local: None,
                    };
                }
                Some(c) if is_ncname_start_char(c) => {
                    self.advance(1);
                    let local = self.read_ncname();
                    return Token::NameTest {
                        prefix: name.to_string(),
                        local: Some(local.to_string()),
                    };
                }
                _ => {}
            }
        }

        let save = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            self.pos = save;
            return Token::Axis(name.to_string());
        }
        let call = self.peek() == Some('(');
        self.pos = save;

        if call && name == "text" {
            Token::NodeType(name.to_string())
        } else {
            Token::Name(name.to_string())
        }
    }

    /// Tokenize the entire input, `Eof` included
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, PathSyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[inline]
fn is_ncname_start_char(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

#[inline]
fn is_ncname_char(c: char) -> bool {
    c != ':' && is_name_char(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root//child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::DoubleSlash,
                Token::Name("child".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test' and text()=\"x\"]"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::String("test".to_string()),
                Token::And,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::Eq,
                Token::String("x".to_string()),
                Token::RightBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_name_tests_and_axes() {
        assert_eq!(
            tokens("test:node p:* child::x starts-with("),
            vec![
                Token::NameTest {
                    prefix: "test".to_string(),
                    local: Some("node".to_string())
                },
                Token::NameTest {
                    prefix: "p".to_string(),
                    local: None
                },
                Token::Axis("child".to_string()),
                Token::DoubleColon,
                Token::Name("x".to_string()),
                Token::Name("starts-with".to_string()),
                Token::LeftParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let spanned = Lexer::new("/a | //b").tokenize().unwrap();
        let positions: Vec<usize> = spanned.iter().map(|s| s.pos).collect();
        assert_eq!(positions, vec![0, 1, 3, 5, 7, 8]);
    }

    #[test]
    fn test_errors() {
        let err = Lexer::new("/a[@x='open").tokenize().unwrap_err();
        assert_eq!(err.position, 6);

        let err = Lexer::new("/a#").tokenize().unwrap_err();
        assert_eq!(err.position, 2);
    }
}
