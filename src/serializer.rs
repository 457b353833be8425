//! Token serialization
//!
//! Writes tokens back as XML text. Token text is raw (references were never
//! resolved) so nothing is escaped here. Attribute values are written in
//! double quotes unless they contain a `"`.

use crate::core::{ElementEnd, Token};
use crate::selector::Selected;

/// Append the XML form of one token to `buf`
pub fn write_token(buf: &mut String, token: &Token<'_>) {
    match token {
        Token::Declaration {
            version,
            encoding,
            standalone,
            ..
        } => {
            buf.push_str("<?xml version=\"");
            buf.push_str(version);
            buf.push('"');
            if let Some(encoding) = encoding {
                buf.push_str(" encoding=\"");
                buf.push_str(encoding);
                buf.push('"');
            }
            if let Some(standalone) = standalone {
                buf.push_str(" standalone=\"");
                buf.push_str(standalone);
                buf.push('"');
            }
            buf.push_str("?>");
        }
        Token::ElementStart { prefix, local, .. } => {
            buf.push('<');
            push_qname(buf, prefix, local);
        }
        Token::Attribute {
            prefix,
            local,
            value,
            ..
        } => {
            let quote = if value.contains('"') { '\'' } else { '"' };
            buf.push(' ');
            push_qname(buf, prefix, local);
            buf.push('=');
            buf.push(quote);
            buf.push_str(value);
            buf.push(quote);
        }
        Token::ElementEnd { end, .. } => match end {
            ElementEnd::Open => buf.push('>'),
            ElementEnd::Empty => buf.push_str("/>"),
            ElementEnd::Close { prefix, local } => {
                buf.push_str("</");
                push_qname(buf, prefix, local);
                buf.push('>');
            }
        },
        Token::Text { text, .. } => buf.push_str(text),
        Token::Cdata { text, .. } => {
            buf.push_str("<![CDATA[");
            buf.push_str(text);
            buf.push_str("]]>");
        }
        Token::Comment { text, .. } => {
            buf.push_str("<!--");
            buf.push_str(text);
            buf.push_str("-->");
        }
        Token::ProcessingInstruction {
            target, content, ..
        } => {
            buf.push_str("<?");
            buf.push_str(target);
            if let Some(content) = content {
                buf.push(' ');
                buf.push_str(content);
            }
            buf.push_str("?>");
        }
        Token::EntityDeclaration {
            name, definition, ..
        } => {
            let quote = if definition.contains('"') { '\'' } else { '"' };
            buf.push_str("<!ENTITY ");
            buf.push_str(name);
            buf.push(' ');
            buf.push(quote);
            buf.push_str(definition);
            buf.push(quote);
            buf.push('>');
        }
    }
}

#[inline]
fn push_qname(buf: &mut String, prefix: &str, local: &str) {
    if !prefix.is_empty() {
        buf.push_str(prefix);
        buf.push(':');
    }
    buf.push_str(local);
}

/// Serialize a token sequence
pub fn tokens_to_xml(tokens: &[Token<'_>]) -> String {
    let mut buf = String::with_capacity(tokens.len() * 16);
    for token in tokens {
        write_token(&mut buf, token);
    }
    buf
}

/// Serialize selector output, dropping the selection brackets
pub fn selected_to_xml(selected: &[Selected<'_>]) -> String {
    let mut buf = String::with_capacity(selected.len() * 16);
    for token in selected.iter().filter_map(Selected::token) {
        write_token(&mut buf, token);
    }
    buf
}
