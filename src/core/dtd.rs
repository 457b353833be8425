//! DOCTYPE parsing
//!
//! Only declaration bookkeeping is done here: general entities with a
//! literal value are reported as `EntityDeclaration` tokens. Parameter
//! entities, external IDs, NDATA, and `<!ELEMENT>`/`<!ATTLIST>`/`<!NOTATION>`
//! declarations are checked for shape and then dropped.

use super::error::{ErrorKind, XmlError};
use super::token::Token;
use super::tokenizer::{TokenSink, Tokenizer};

impl<'a> Tokenizer<'a> {
    /// `<!DOCTYPE name ExternalID? [ internal subset ]? >`
    pub(super) fn parse_doctype<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        self.cursor.advance(9);
        self.cursor.consume_spaces()?;
        self.cursor.skip_name()?;
        self.cursor.skip_spaces();
        self.parse_external_id()?;
        self.cursor.skip_spaces();

        match self.cursor.curr_byte()? {
            b'>' => {
                self.cursor.advance(1);
                Ok(())
            }
            b'[' => {
                self.cursor.advance(1);
                self.parse_internal_subset(sink)
            }
            _ => Err(self.cursor.unexpected("'[' or '>'").into()),
        }
    }

    fn parse_internal_subset<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        loop {
            self.cursor.skip_spaces();

            if self.cursor.starts_with("<!ENTITY") {
                self.parse_entity_decl(sink)?;
            } else if self.cursor.starts_with("<!--") {
                self.parse_comment(sink)?;
            } else if self.cursor.starts_with("<?") {
                self.parse_pi(sink)?;
            } else if self.cursor.starts_with("]") {
                self.cursor.advance(1);
                self.cursor.skip_spaces();
                self.cursor.consume_byte(b'>')?;
                return Ok(());
            } else if self.cursor.starts_with("<!ELEMENT")
                || self.cursor.starts_with("<!ATTLIST")
                || self.cursor.starts_with("<!NOTATION")
            {
                self.skip_markup_decl()?;
            } else if self.cursor.at_end() {
                return Err(self.cursor.error(ErrorKind::UnexpectedEndOfStream).into());
            } else {
                return Err(self
                    .cursor
                    .error(ErrorKind::UnknownToken("unexpected markup in the internal subset"))
                    .into());
            }
        }
    }

    /// Step over a declaration up to its `>`
    fn skip_markup_decl(&mut self) -> Result<(), XmlError> {
        match self.cursor.find_markup_end() {
            Some(end) => {
                self.cursor.jump_to(end + 1);
                Ok(())
            }
            None => {
                let end = self.cursor.text().len();
                Err(self.cursor.error_at(ErrorKind::UnexpectedEndOfStream, end))
            }
        }
    }

    /// `<!ENTITY name "value">` or `<!ENTITY % name ...>`
    fn parse_entity_decl<S: TokenSink<'a>>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let start = self.cursor.pos();
        self.cursor.advance(8);
        self.cursor.consume_spaces()?;

        let general = !self.cursor.try_consume_byte(b'%');
        if !general {
            self.cursor.consume_spaces()?;
        }

        let name = self.cursor.consume_name()?;
        self.cursor.consume_spaces()?;
        let definition = self.parse_entity_def(general)?;
        self.cursor.skip_spaces();
        self.cursor.consume_byte(b'>')?;

        match definition {
            Some(definition) if general => sink.token(Token::EntityDeclaration {
                name: name.into(),
                definition: definition.into(),
                range: self.cursor.range_from(start),
            }),
            _ => Ok(()),
        }
    }

    /// Literal value, or an external ID (with optional NDATA) that yields none
    fn parse_entity_def(&mut self, general: bool) -> Result<Option<&'a str>, XmlError> {
        match self.cursor.curr_byte()? {
            b'"' | b'\'' => {
                let quote = self.cursor.consume_quote()?;
                let value = self.cursor.consume_bytes_while(|b| b != quote);
                self.cursor.consume_byte(quote)?;
                Ok(Some(value))
            }
            b'S' | b'P' => {
                let at = self.cursor.pos();
                if !self.parse_external_id()? {
                    return Err(self.cursor.error_at(ErrorKind::InvalidExternalId, at));
                }
                if general {
                    self.cursor.skip_spaces();
                    if self.cursor.starts_with("NDATA") {
                        self.cursor.advance(5);
                        self.cursor.consume_spaces()?;
                        self.cursor.skip_name()?;
                    }
                }
                Ok(None)
            }
            _ => Err(self.cursor.unexpected("a quote, SYSTEM or PUBLIC")),
        }
    }

    /// `SYSTEM "uri"` or `PUBLIC "id" "uri"`. Returns false when neither keyword is present.
    fn parse_external_id(&mut self) -> Result<bool, XmlError> {
        let public = if self.cursor.starts_with("SYSTEM") {
            false
        } else if self.cursor.starts_with("PUBLIC") {
            true
        } else {
            return Ok(false);
        };

        self.cursor.advance(6);
        self.cursor.consume_spaces()?;
        self.skip_quoted_literal()?;
        if public {
            self.cursor.consume_spaces()?;
            self.skip_quoted_literal()?;
        }
        Ok(true)
    }

    fn skip_quoted_literal(&mut self) -> Result<(), XmlError> {
        let quote = self.cursor.consume_quote()?;
        self.cursor.skip_bytes_while(|b| b != quote);
        self.cursor.consume_byte(quote)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::error::{ErrorKind, XmlError};
    use crate::core::token::{TextRange, Token};
    use crate::core::tokenizer::{ParseOptions, Tokenizer};
    use assert_matches::assert_matches;

    fn collect_dtd<'t>(text: &'t str) -> Result<Vec<Token<'t>>, XmlError> {
        let mut tokens = Vec::new();
        Tokenizer::new(text, ParseOptions::new().allow_dtd(true)).run(&mut |token: Token<'t>| {
            tokens.push(token);
            Ok::<_, XmlError>(())
        })?;
        Ok(tokens)
    }

    #[test]
    fn test_dtd_rejected_by_default() {
        let mut count = 0;
        let err = Tokenizer::new("<!DOCTYPE a><a/>", ParseOptions::default())
            .run(&mut |_token: Token<'_>| {
                count += 1;
                Ok::<_, XmlError>(())
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DtdDetected);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_entity_declarations() {
        let xml = "<!DOCTYPE note [\n\
                   <!ENTITY writer \"Donald Duck.\">\n\
                   <!ENTITY % param 'ignored'>\n\
                   <!ENTITY logo SYSTEM \"logo.gif\" NDATA gif>\n\
                   <!ELEMENT note (#PCDATA)>\n\
                   <!ATTLIST note kind CDATA \"a>b\">\n\
                   <!NOTATION gif PUBLIC \"image/gif\" \"viewer\">\n\
                   ]>\n<note/>";
        let tokens = collect_dtd(xml).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_matches!(
            &tokens[0],
            Token::EntityDeclaration { name, definition, .. }
                if name == "writer" && definition == "Donald Duck."
        );
        assert_eq!(
            tokens[0].range().slice(xml),
            Some("<!ENTITY writer \"Donald Duck.\">")
        );
        assert_matches!(&tokens[1], Token::Text { text, .. } if text == "\n");
        assert_matches!(&tokens[2], Token::ElementStart { local, .. } if local == "note");
    }

    #[test]
    fn test_doctype_external_id() {
        let tokens = collect_dtd(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0//EN\" 'x.dtd'><html/>",
        )
        .unwrap();
        assert_eq!(tokens.len(), 2);

        let tokens = collect_dtd("<!DOCTYPE a SYSTEM 'a.dtd' [<!-- c -->]><a/>").unwrap();
        assert_eq!(
            tokens[0],
            Token::Comment {
                text: " c ".into(),
                range: TextRange::new(28, 38)
            }
        );
    }

    #[test]
    fn test_doctype_errors() {
        let err = collect_dtd("<!DOCTYPE a \"x\"><a/>").unwrap_err();
        assert_matches!(err.kind, ErrorKind::InvalidChar { actual: '"', .. });

        let err = collect_dtd("<!DOCTYPE a [<!ENTITY x foo>]><a/>").unwrap_err();
        assert_matches!(err.kind, ErrorKind::InvalidChar { actual: 'f', .. });

        let err = collect_dtd("<!DOCTYPE a [<!BOGUS>]><a/>").unwrap_err();
        assert_matches!(err.kind, ErrorKind::UnknownToken(_));

        let err = collect_dtd("<!DOCTYPE a [<!ENTITY x 'y'>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStream);

        let err = collect_dtd("<!DOCTYPE a [<!ELEMENT a ANY").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEndOfStream);
    }
}
