//! Minimal XML reader for schema documents.
//!
//! Supports elements, attributes, text, CDATA sections, comments, processing
//! instructions, a skipped `DOCTYPE`, the five predefined entities, and
//! numeric character references. Namespaces and DTD validation are not
//! interpreted.

use thiserror::Error;

/// A malformed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {line}:{column}")]
pub struct XmlError {
    /// What was wrong.
    pub message: String,
    /// Line (1-based).
    pub line: usize,
    /// Column (1-based).
    pub column: usize,
}

/// A parsed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
    /// Line of the opening tag.
    pub line: usize,
}

/// Element content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data with entities decoded.
    Text(String),
}

impl Element {
    /// Looks up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text content of direct children, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }
}

/// Parses a complete document and returns its root element.
///
/// # Errors
///
/// Returns [`XmlError`] with the position of the first malformed construct.
pub fn parse(source: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::new(source);
    reader.skip_misc()?;
    if reader.peek_char() != Some('<') {
        return Err(reader.error("expected root element"));
    }
    let root = reader.parse_element()?;
    reader.skip_misc()?;
    if !reader.rest.is_empty() {
        return Err(reader.error("content after root element"));
    }
    Ok(root)
}

struct Reader<'src> {
    rest: &'src str,
    line: usize,
    column: usize,
}

impl<'src> Reader<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            rest: source.strip_prefix('\u{feff}').unwrap_or(source),
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> XmlError {
        XmlError {
            message: message.into(),
            line: self.line,
            column: self.column,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.rest = &self.rest[c.len_utf8()..];
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = self.rest.len() - bytes;
        while self.rest.len() > target {
            self.advance();
        }
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest.starts_with(literal) {
            self.advance_by(literal.len());
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Consumes up to and including `terminator`, returning what came before.
    fn take_until(&mut self, terminator: &str, what: &str) -> Result<&'src str, XmlError> {
        let Some(end) = self.rest.find(terminator) else {
            return Err(self.error(format!("unterminated {what}")));
        };
        let taken = &self.rest[..end];
        self.advance_by(end + terminator.len());
        Ok(taken)
    }

    /// Skips whitespace, comments, processing instructions, and doctype.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_whitespace();
            if self.eat("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if self.eat("<!--") {
                self.take_until("-->", "comment")?;
            } else if self.eat("<!DOCTYPE") {
                self.take_until(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> &'src str {
        let len = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(self.rest.len());
        let name = &self.rest[..len];
        self.advance_by(len);
        name
    }

    fn parse_element(&mut self) -> Result<Element, XmlError> {
        let line = self.line;
        self.advance(); // '<'
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("expected element name"));
        }
        let mut element = Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            line,
        };

        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(element);
            }
            if self.eat(">") {
                break;
            }
            let attr = self.read_name();
            if attr.is_empty() {
                return Err(self.error(format!("unexpected character in <{name}>")));
            }
            self.skip_whitespace();
            if !self.eat("=") {
                return Err(self.error(format!("expected '=' after attribute {attr}")));
            }
            self.skip_whitespace();
            let quote = match self.peek_char() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error(format!("expected quoted value for {attr}"))),
            };
            self.advance();
            let raw = self.take_until(&quote.to_string(), "attribute value")?;
            let value = self.decode(raw)?;
            if element.attribute(attr).is_some() {
                return Err(self.error(format!("duplicate attribute {attr} on <{name}>")));
            }
            element.attributes.push((attr.to_string(), value));
        }

        loop {
            if self.rest.is_empty() {
                return Err(self.error(format!("unclosed element <{name}>")));
            }
            if self.eat("</") {
                let closing = self.read_name();
                if closing != name {
                    return Err(self.error(format!(
                        "mismatched closing tag </{closing}> for <{name}>"
                    )));
                }
                self.skip_whitespace();
                if !self.eat(">") {
                    return Err(self.error(format!("expected '>' after </{closing}")));
                }
                return Ok(element);
            } else if self.eat("<!--") {
                self.take_until("-->", "comment")?;
            } else if self.eat("<![CDATA[") {
                let data = self.take_until("]]>", "CDATA section")?;
                element.children.push(Node::Text(data.to_string()));
            } else if self.eat("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if self.peek_char() == Some('<') {
                element.children.push(Node::Element(self.parse_element()?));
            } else {
                let len = self.rest.find('<').unwrap_or(self.rest.len());
                let raw = &self.rest[..len];
                let text = self.decode(raw)?;
                self.advance_by(len);
                element.children.push(Node::Text(text));
            }
        }
    }

    fn decode(&self, raw: &str) -> Result<String, XmlError> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            rest = &rest[amp + 1..];
            let Some(semi) = rest.find(';') else {
                return Err(self.error("unterminated entity reference"));
            };
            let entity = &rest[..semi];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            match decoded {
                Some(c) => out.push(c),
                None => return Err(self.error(format!("unknown entity &{entity};"))),
            }
            rest = &rest[semi + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
