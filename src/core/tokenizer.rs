//! XML Tokenizer - single-pass grammar walk
//!
//! Walks the XML 1.0 grammar over a [`Cursor`] and hands every token to a
//! [`TokenSink`] the moment it is recognized:
//! - XML declaration, DOCTYPE internal subset entity declarations
//! - Element start tags, attributes and end tags
//! - Text content, CDATA sections, comments, processing instructions
//!
//! Nesting is tracked with an explicit stack of open element names instead
//! of recursion. Close tags are checked against that stack.
//!
//! The first grammar violation aborts the walk; there is no recovery.

use super::cursor::Cursor;
use super::error::{ErrorKind, XmlError};
use super::token::{qname, ElementEnd, TextRange, Token};

/// Tokenizer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Accept a `<!DOCTYPE ...>`. When false a DOCTYPE is `DtdDetected`.
    pub allow_dtd: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_dtd(mut self, allow: bool) -> Self {
        self.allow_dtd = allow;
        self
    }
}

/// Receiver of tokens
///
/// Implemented for every `FnMut(Token) -> Result<(), E>` closure. Returning
/// an error aborts tokenization and the error is handed back to the caller
/// unchanged.
pub trait TokenSink<'a> {
    type Error: From<XmlError>;

    fn token(&mut self, token: Token<'a>) -> Result<(), Self::Error>;
}

impl<'a, F, E> TokenSink<'a> for F
where
    F: FnMut(Token<'a>) -> Result<(), E>,
    E: From<XmlError>,
{
    type Error = E;

    #[inline]
    fn token(&mut self, token: Token<'a>) -> Result<(), E> {
        self(token)
    }
}

/// XML tokenizer over a complete document
pub struct Tokenizer<'a> {
    pub(super) cursor: Cursor<'a>,
    pub(super) options: ParseOptions,
    /// `(prefix, local)` of every element still open
    open: Vec<(&'a str, &'a str)>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str, options: ParseOptions) -> Self {
        Tokenizer {
            cursor: Cursor::new(text),
            options,
            open: Vec::new(),
        }
    }

    /// Tokenize the whole document, feeding `sink` in document order
    pub fn run<S: TokenSink<'a>>(mut self, sink: &mut S) -> Result<(), S::Error> {
        // Byte order mark
        if self.cursor.starts_with("\u{FEFF}") {
            self.cursor.advance('\u{FEFF}'.len_utf8());
        }

        if self.cursor.starts_with("<?xml ") {
            self.parse_declaration(sink)?;
        }

        self.parse_misc(sink)?;

        if self.cursor.starts_with("<!DOCTYPE") {
            if !self.options.allow_dtd {
                return Err(self.cursor.error(ErrorKind::DtdDetected).into());
            }
            self.parse_doctype(sink)?;
            self.parse_misc(sink)?;
        }

        match self.cursor.peek() {
            Some(b'<') => self.parse_root(sink)?,
            Some(_) => {
                return Err(self
                    .cursor
                    .error(ErrorKind::UnknownToken("expected the root element"))
                    .into())
            }
            None => return Err(self.cursor.error(ErrorKind::UnexpectedEndOfStream).into()),
        }

        self.parse_misc(sink)?;

        if !self.cursor.at_end() {
            return Err(self.cursor.error(ErrorKind::UnknownToken("not at end")).into());
        }
        Ok(())
    }

    /// `<?xml version="1.0" encoding="..." standalone="..."?>`
    fn parse_declaration<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(5);
        self.consume_decl_spaces()?;

        let attr_start = self.cursor.pos();
        let (prefix, local, version, _) = self.parse_attribute()?;
        if !prefix.is_empty() || local != "version" {
            return Err(self
                .cursor
                .error_at(ErrorKind::InvalidString("version"), attr_start)
                .into());
        }
        self.consume_decl_spaces()?;

        let mut encoding = None;
        if self.cursor.starts_with("encoding") {
            let (_, _, value, _) = self.parse_attribute()?;
            encoding = Some(value.into());
            self.consume_decl_spaces()?;
        }

        let mut standalone = None;
        if self.cursor.starts_with("standalone") {
            let (_, _, value, _) = self.parse_attribute()?;
            standalone = Some(value.into());
            self.consume_decl_spaces()?;
        }

        self.cursor.skip_spaces();
        self.cursor.skip_string("?>")?;

        sink.token(Token::Declaration {
            version: version.into(),
            encoding,
            standalone,
            range: self.cursor.range_from(start),
        })
    }

    /// Whitespace between pseudo-attributes, optional right before `?>`
    fn consume_decl_spaces(&mut self) -> Result<(), XmlError> {
        if self.cursor.starts_with_space() {
            self.cursor.skip_spaces();
        } else if !self.cursor.starts_with("?>") && !self.cursor.at_end() {
            return Err(self.cursor.unexpected("a whitespace"));
        }
        Ok(())
    }

    /// Comments, processing instructions and whitespace outside the root.
    /// Whitespace runs are emitted as `Text` so the document round-trips.
    pub(super) fn parse_misc<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        loop {
            let start = self.cursor.pos();
            self.cursor.skip_spaces();
            if self.cursor.pos() > start {
                sink.token(Token::Text {
                    text: self.cursor.slice_back(start).into(),
                    range: self.cursor.range_from(start),
                })?;
            }
            if self.cursor.starts_with("<!--") {
                self.parse_comment(sink)?;
            } else if self.cursor.starts_with("<?") {
                self.parse_pi(sink)?;
            } else {
                return Ok(());
            }
        }
    }

    /// `<!-- text -->`, where text holds no `--` and does not end in `-`
    pub(super) fn parse_comment<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(4);

        // The first `--` after the opener has to be the terminator
        let dashes = match self.cursor.find("--") {
            Some(at) => at,
            None => {
                let end = self.cursor.text().len();
                return Err(self.cursor.error_at(ErrorKind::InvalidString("-->"), end).into());
            }
        };
        let text = self.cursor.consume_to(dashes)?;
        if !self.cursor.starts_with("-->") {
            return Err(self.cursor.error_at(ErrorKind::InvalidComment, start).into());
        }
        self.cursor.advance(3);

        sink.token(Token::Comment {
            text: text.into(),
            range: self.cursor.range_from(start),
        })
    }

    /// `<?target content?>`
    pub(super) fn parse_pi<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        if self.cursor.starts_with("<?xml ") {
            return Err(self.cursor.error(ErrorKind::UnexpectedDeclaration).into());
        }

        let start = self.cursor.pos();
        self.cursor.advance(2);
        let target = self.cursor.consume_name()?;
        self.cursor.skip_spaces();
        let content = self.cursor.consume_until("?>")?;
        self.cursor.advance(2);

        sink.token(Token::ProcessingInstruction {
            target: target.into(),
            content: (!content.is_empty()).then(|| content.into()),
            range: self.cursor.range_from(start),
        })
    }

    /// Root element and everything nested in it
    fn parse_root<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        self.parse_element_start(sink)?;

        while !self.open.is_empty() {
            if self.cursor.curr_byte()? != b'<' {
                self.parse_text(sink)?;
                continue;
            }

            match self.cursor.next_byte()? {
                b'!' => {
                    if self.cursor.starts_with("<!--") {
                        self.parse_comment(sink)?;
                    } else if self.cursor.starts_with("<![CDATA[") {
                        self.parse_cdata(sink)?;
                    } else {
                        return Err(self
                            .cursor
                            .error(ErrorKind::UnknownToken("unexpected '<!' markup in content"))
                            .into());
                    }
                }
                b'?' => self.parse_pi(sink)?,
                b'/' => self.parse_close_tag(sink)?,
                _ => self.parse_element_start(sink)?,
            }
        }
        Ok(())
    }

    /// `<name attr="value" ...` followed by `>` or `/>`
    fn parse_element_start<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(1);
        let (prefix, local) = self.cursor.consume_qname()?;

        sink.token(Token::ElementStart {
            prefix: prefix.into(),
            local: local.into(),
            start,
        })?;

        loop {
            let has_space = self.cursor.starts_with_space();
            self.cursor.skip_spaces();
            let tag_end = self.cursor.pos();

            match self.cursor.curr_byte()? {
                b'/' => {
                    self.cursor.advance(1);
                    self.cursor.consume_byte(b'>')?;
                    return sink.token(Token::ElementEnd {
                        end: ElementEnd::Empty,
                        range: self.cursor.range_from(tag_end),
                    });
                }
                b'>' => {
                    self.cursor.advance(1);
                    self.open.push((prefix, local));
                    return sink.token(Token::ElementEnd {
                        end: ElementEnd::Open,
                        range: self.cursor.range_from(tag_end),
                    });
                }
                _ => {
                    if !has_space {
                        return Err(self.cursor.unexpected("a whitespace").into());
                    }
                    let (prefix, local, value, range) = self.parse_attribute()?;
                    sink.token(Token::Attribute {
                        prefix: prefix.into(),
                        local: local.into(),
                        value: value.into(),
                        range,
                    })?;
                }
            }
        }
    }

    /// `prefix:local = "value"`
    fn parse_attribute(&mut self) -> Result<(&'a str, &'a str, &'a str, TextRange), XmlError> {
        let start = self.cursor.pos();
        let (prefix, local) = self.cursor.consume_qname()?;
        self.cursor.skip_spaces();
        self.cursor.consume_byte(b'=')?;
        self.cursor.skip_spaces();

        let quote = self.cursor.consume_quote()?;
        let quote_char = quote as char;
        let value = self
            .cursor
            .consume_chars_while(|c| c != quote_char && c != '<')?;
        if self.cursor.peek() == Some(b'<') {
            return Err(self.cursor.error(ErrorKind::InvalidAttributeValue));
        }
        self.cursor.consume_byte(quote)?;

        Ok((prefix, local, value, self.cursor.range_from(start)))
    }

    /// `</prefix:local>`, which must close the innermost open element
    fn parse_close_tag<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(2);
        let (prefix, local) = self.cursor.consume_qname()?;
        self.cursor.skip_spaces();
        self.cursor.consume_byte(b'>')?;

        match self.open.pop() {
            Some((open_prefix, open_local)) if open_prefix == prefix && open_local == local => {}
            Some((open_prefix, open_local)) => {
                let kind = ErrorKind::UnexpectedCloseTag {
                    expected: qname(open_prefix, open_local).into_owned(),
                    actual: qname(prefix, local).into_owned(),
                };
                return Err(self.cursor.error_at(kind, start).into());
            }
            None => {
                return Err(self
                    .cursor
                    .error_at(ErrorKind::UnknownToken("close tag without an open element"), start)
                    .into())
            }
        }

        sink.token(Token::ElementEnd {
            end: ElementEnd::Close {
                prefix: prefix.into(),
                local: local.into(),
            },
            range: self.cursor.range_from(start),
        })
    }

    /// `<![CDATA[ ... ]]>`
    fn parse_cdata<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(9);
        let text = self.cursor.consume_until("]]>")?;
        self.cursor.advance(3);

        sink.token(Token::Cdata {
            text: text.into(),
            range: self.cursor.range_from(start),
        })
    }

    /// Character data up to the next `<`
    fn parse_text<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        let text = self.cursor.consume_text()?;

        if let Some(at) = memchr::memmem::find(text.as_bytes(), b"]]>") {
            return Err(self
                .cursor
                .error_at(ErrorKind::InvalidCharacterData, start + at)
                .into());
        }

        sink.token(Token::Text {
            text: text.into(),
            range: self.cursor.range_from(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TextPos;
    use assert_matches::assert_matches;

    fn collect_with<'t>(text: &'t str, options: ParseOptions) -> Result<Vec<Token<'t>>, XmlError> {
        let mut tokens = Vec::new();
        Tokenizer::new(text, options).run(&mut |token: Token<'t>| {
            tokens.push(token);
            Ok::<_, XmlError>(())
        })?;
        Ok(tokens)
    }

    fn collect(text: &str) -> Result<Vec<Token<'_>>, XmlError> {
        collect_with(text, ParseOptions::default())
    }

    fn text(t: &str, start: usize, end: usize) -> Token<'_> {
        Token::Text {
            text: t.into(),
            range: TextRange::new(start, end),
        }
    }

    #[test]
    fn test_simple_element() {
        let tokens = collect("<root>content</root>").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::ElementStart {
                    prefix: "".into(),
                    local: "root".into(),
                    start: 0
                },
                Token::ElementEnd {
                    end: ElementEnd::Open,
                    range: TextRange::new(5, 6)
                },
                text("content", 6, 13),
                Token::ElementEnd {
                    end: ElementEnd::Close {
                        prefix: "".into(),
                        local: "root".into()
                    },
                    range: TextRange::new(13, 20)
                },
            ]
        );
    }

    #[test]
    fn test_empty_element_with_attributes() {
        let tokens = collect("<br a='1'  x:b=\"two\"/>").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(
            tokens[1],
            Token::Attribute {
                prefix: "".into(),
                local: "a".into(),
                value: "1".into(),
                range: TextRange::new(4, 9)
            }
        );
        assert_eq!(
            tokens[2],
            Token::Attribute {
                prefix: "x".into(),
                local: "b".into(),
                value: "two".into(),
                range: TextRange::new(11, 20)
            }
        );
        assert_eq!(
            tokens[3],
            Token::ElementEnd {
                end: ElementEnd::Empty,
                range: TextRange::new(20, 22)
            }
        );
    }

    #[test]
    fn test_cdata_ranges() {
        let tokens = collect("<p><![CDATA[content]]></p>").unwrap();
        assert_eq!(
            tokens[1],
            Token::ElementEnd {
                end: ElementEnd::Open,
                range: TextRange::new(2, 3)
            }
        );
        assert_eq!(
            tokens[2],
            Token::Cdata {
                text: "content".into(),
                range: TextRange::new(3, 22)
            }
        );
        assert_eq!(tokens[3].range(), TextRange::new(22, 26));
    }

    #[test]
    fn test_comment_and_pi() {
        let tokens = collect("<!-- comment --><?pi some data?><a><?empty?></a>").unwrap();
        assert_eq!(
            tokens[0],
            Token::Comment {
                text: " comment ".into(),
                range: TextRange::new(0, 16)
            }
        );
        assert_eq!(
            tokens[1],
            Token::ProcessingInstruction {
                target: "pi".into(),
                content: Some("some data".into()),
                range: TextRange::new(16, 32)
            }
        );
        assert_matches!(
            &tokens[4],
            Token::ProcessingInstruction { target, content: None, .. } if target == "empty"
        );
    }

    #[test]
    fn test_declaration() {
        let tokens =
            collect("<?xml version=\"1.0\" encoding='UTF-8' standalone=\"yes\" ?><a/>").unwrap();
        assert_eq!(
            tokens[0],
            Token::Declaration {
                version: "1.0".into(),
                encoding: Some("UTF-8".into()),
                standalone: Some("yes".into()),
                range: TextRange::new(0, 56)
            }
        );

        let err = collect("<?xml encoding='UTF-8'?><a/>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidString("version"));
    }

    #[test]
    fn test_bom_is_skipped() {
        let tokens = collect("\u{FEFF}<a/>").unwrap();
        assert_matches!(&tokens[0], Token::ElementStart { start: 3, .. });
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let tokens = collect("<a>\n  <b/>\n</a>").unwrap();
        assert_eq!(tokens[2], text("\n  ", 3, 6));
        assert_eq!(tokens[5], text("\n", 10, 11));
    }

    #[test]
    fn test_prolog_and_epilog_whitespace() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- c -->\n<a/>\n";
        let tokens = collect(xml).unwrap();
        assert_eq!(tokens[1], text("\n", 21, 22));
        assert_eq!(tokens[3], text("\n", 32, 33));
        assert_eq!(tokens.last(), Some(&text("\n", 37, 38)));
        assert_eq!(crate::serializer::tokens_to_xml(&tokens), xml);
    }

    #[test]
    fn test_malformed_comment() {
        let err = collect("<!----!>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidComment);
        assert_eq!(err.pos, TextPos::new(1, 1));

        let err = collect("<a><!-- a -- b --></a>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidComment);
        assert_eq!(err.pos, TextPos::new(1, 4));

        let err = collect("<a><!-- trailing ---></a>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidComment);

        let err = collect("<a><!-- open").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidString("-->"));
    }

    #[test]
    fn test_cdata_end_in_text() {
        let err = collect("<p>]]></p>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCharacterData);
        assert_eq!(err.pos, TextPos::new(1, 4));
    }

    #[test]
    fn test_mismatched_close_tag() {
        let err = collect("<a></b>").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnexpectedCloseTag {
                expected: "a".into(),
                actual: "b".into()
            }
        );
        assert_eq!(err.pos, TextPos::new(1, 4));

        let err = collect("<x:a></a>").unwrap_err();
        assert_matches!(err.kind, ErrorKind::UnexpectedCloseTag { .. });
    }

    #[test]
    fn test_declaration_termination_position() {
        let err = collect("\n<?xml\n&jg'];").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidString("?>"));
        assert_eq!(err.pos.row, 3);
        assert_eq!(err.pos, TextPos::new(3, 7));
    }

    #[test]
    fn test_misplaced_declaration() {
        let err = collect("<a/><?xml version='1.0'?>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedDeclaration);
    }

    #[test]
    fn test_attribute_errors() {
        let err = collect("<a b='1'c='2'/>").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::InvalidChar {
                expected: "a whitespace".into(),
                actual: 'c'
            }
        );

        let err = collect("<a b='x<y'/>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAttributeValue);

        let err = collect("<a b/>").unwrap_err();
        assert_matches!(err.kind, ErrorKind::InvalidChar { actual: '/', .. });
    }

    #[test]
    fn test_document_structure_errors() {
        assert_eq!(collect("").unwrap_err().kind, ErrorKind::UnexpectedEndOfStream);
        assert_eq!(collect("<a>").unwrap_err().kind, ErrorKind::UnexpectedEndOfStream);
        assert_eq!(
            collect("<a/><b/>").unwrap_err().kind,
            ErrorKind::UnknownToken("not at end")
        );
        assert_matches!(collect("text").unwrap_err().kind, ErrorKind::UnknownToken(_));
        assert_matches!(collect("<a><!foo></a>").unwrap_err().kind, ErrorKind::UnknownToken(_));
    }

    #[test]
    fn test_non_xml_char() {
        let err = collect("<a>\u{1}</a>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonXmlChar('\u{1}'));
        assert_eq!(err.pos, TextPos::new(1, 4));
    }

    #[test]
    fn test_sink_error_aborts() {
        #[derive(Debug, PartialEq)]
        enum Stop {
            Xml,
            Enough,
        }
        impl From<XmlError> for Stop {
            fn from(_: XmlError) -> Self {
                Stop::Xml
            }
        }

        let mut seen = 0;
        let result = Tokenizer::new("<a><b/><c/></a>", ParseOptions::default()).run(
            &mut |_token: Token<'_>| {
                seen += 1;
                if seen == 3 {
                    Err(Stop::Enough)
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(result, Err(Stop::Enough));
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_element_depth_balance() {
        let tokens = collect("<a><b><c/></b><d x='1'>t</d></a>").unwrap();
        let mut depth: i32 = 0;
        let mut starts = 0;
        let mut ends = 0;
        for token in &tokens {
            match token {
                Token::ElementStart { .. } => {
                    starts += 1;
                    depth += 1;
                }
                Token::ElementEnd { end, .. } => {
                    match end {
                        ElementEnd::Open => ends += 1,
                        ElementEnd::Empty => {
                            ends += 1;
                            depth -= 1;
                        }
                        ElementEnd::Close { .. } => depth -= 1,
                    }
                }
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(starts, 4);
        assert_eq!(starts, ends);
        assert_eq!(depth, 0);
    }
}
