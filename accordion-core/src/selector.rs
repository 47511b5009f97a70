use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::node::Node;

/// A parsed CSS selector list.
///
/// Supports the subset needed to locate accordion parts: type selectors, `*`, `#id`,
/// `.class`, `[attr]` and `[attr=value]`, joined by descendant or `>` combinators, and
/// grouped with `,`. The [`Display`](fmt::Display) output is a canonical form that native
/// `querySelectorAll` accepts.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Selector(Vec<Complex>);

#[derive(Clone, PartialEq, Eq, Debug)]
struct Complex {
    parts: Vec<Compound>,
    // combinators[i] joins parts[i] and parts[i + 1]
    combinators: Vec<Combinator>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Default, PartialEq, Eq, Debug)]
struct Compound {
    tag: Option<String>,
    simple: Vec<Simple>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum Simple {
    Id(String),
    Class(String),
    Attr(String, Option<String>),
}

#[derive(Clone, PartialEq, Eq, Error, Debug)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{found}` at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("unterminated string in attribute selector")]
    UnterminatedString,
    #[error("`{0}` is rejected by the document's selector engine")]
    Unsupported(String),
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        Parser { input, pos: 0 }.parse()
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::simple(Simple::Class(name.into()))
    }

    pub fn attr(name: impl Into<String>) -> Self {
        Self::simple(Simple::Attr(name.into(), None))
    }

    pub fn attr_eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::simple(Simple::Attr(name.into(), Some(value.into())))
    }

    fn simple(simple: Simple) -> Self {
        let compound = Compound {
            tag: None,
            simple: vec![simple],
        };
        Self(vec![Complex {
            parts: vec![compound],
            combinators: vec![],
        }])
    }

    pub fn matches<N: Node>(&self, node: &N) -> bool {
        self.0.iter().any(|complex| complex.matches(node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Complex {
    fn matches<N: Node>(&self, node: &N) -> bool {
        self.matches_at(self.parts.len() - 1, node)
    }

    fn matches_at<N: Node>(&self, idx: usize, node: &N) -> bool {
        if !self.parts[idx].matches(node) {
            return false;
        }
        let Some(prev) = idx.checked_sub(1) else {
            return true;
        };

        match self.combinators[prev] {
            Combinator::Child => node
                .parent()
                .is_some_and(|parent| self.matches_at(prev, &parent)),
            Combinator::Descendant => {
                let mut ancestor = node.parent();
                while let Some(node) = ancestor {
                    if self.matches_at(prev, &node) {
                        return true;
                    }
                    ancestor = node.parent();
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<N: Node>(&self, node: &N) -> bool {
        if let Some(tag) = &self.tag {
            if !node.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        self.simple.iter().all(|simple| match simple {
            Simple::Id(id) => node.attr("id").as_deref() == Some(id.as_str()),
            Simple::Class(class) => node.has_class(class),
            Simple::Attr(name, None) => node.attr(name).is_some(),
            Simple::Attr(name, Some(value)) => node.attr(name).as_deref() == Some(value.as_str()),
        })
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut list = vec![];
        loop {
            list.push(self.complex()?);
            self.skip_ws();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(found) => return Err(self.unexpected_at(found, self.pos - found.len_utf8())),
            }
        }
        Ok(Selector(list))
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_ws();
        let mut parts = vec![self.compound()?];
        let mut combinators = vec![];

        loop {
            let spaced = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if spaced => Combinator::Descendant,
                Some(found) => return Err(self.unexpected_at(found, self.pos)),
            };
            combinators.push(combinator);
            parts.push(self.compound()?);
        }

        Ok(Complex { parts, combinators })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.simple.push(Simple::Id(self.ident()?));
                }
                Some('.') => {
                    self.bump();
                    compound.simple.push(Simple::Class(self.ident()?));
                }
                Some('[') => {
                    self.bump();
                    compound.simple.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(found) => self.unexpected_at(found, self.pos),
                None => SelectorError::UnexpectedEnd,
            });
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<Simple, SelectorError> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();

        let value = match self.bump() {
            Some(']') => return Ok(Simple::Attr(name, None)),
            Some('=') => {
                self.skip_ws();
                match self.peek() {
                    Some('"' | '\'') => self.string()?,
                    _ => self.ident()?,
                }
            }
            Some(found) => return Err(self.unexpected_at(found, self.pos - found.len_utf8())),
            None => return Err(SelectorError::UnexpectedEnd),
        };

        self.skip_ws();
        match self.bump() {
            Some(']') => Ok(Simple::Attr(name, Some(value))),
            Some(found) => Err(self.unexpected_at(found, self.pos - found.len_utf8())),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(found) => self.unexpected_at(found, self.pos),
                None => SelectorError::UnexpectedEnd,
            });
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn string(&mut self) -> Result<String, SelectorError> {
        let quote = self.bump().ok_or(SelectorError::UnexpectedEnd)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorError::UnterminatedString),
                Some('\\') => out.push(self.bump().ok_or(SelectorError::UnterminatedString)?),
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != start
    }

    fn unexpected_at(&self, found: char, offset: usize) -> SelectorError {
        SelectorError::Unexpected { found, offset }
    }
}

/// Whether `name` can appear unescaped as a class or attribute name.
pub fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some('-') => chars.next(),
        first => first,
    };
    first.is_some_and(is_ident_start) && chars.all(is_ident_char)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{complex}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if let Some(combinator) = i.checked_sub(1).map(|i| self.combinators[i]) {
                match combinator {
                    Combinator::Descendant => f.write_str(" ")?,
                    Combinator::Child => f.write_str(" > ")?,
                }
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.simple.is_empty() => f.write_str("*")?,
            None => {}
        }

        for simple in &self.simple {
            match simple {
                Simple::Id(id) => write!(f, "#{id}")?,
                Simple::Class(class) => write!(f, ".{class}")?,
                Simple::Attr(name, None) => write!(f, "[{name}]")?,
                Simple::Attr(name, Some(value)) => write!(f, "[{name}=\"{}\"]", escape(value))?,
            }
        }
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{is_ident, Selector, SelectorError};

    fn canonical(input: &str) -> String {
        Selector::parse(input).unwrap().to_string()
    }

    #[test]
    fn parses_simple_selectors() {
        assert_eq!(canonical(".j-accordion"), ".j-accordion");
        assert_eq!(canonical("#faq"), "#faq");
        assert_eq!(canonical("DIV.accordion"), "div.accordion");
        assert_eq!(canonical("*"), "*");
        assert_eq!(canonical("[data-item]"), "[data-item]");
    }

    #[test]
    fn parses_attribute_values() {
        assert_eq!(canonical("[data-body=a]"), "[data-body=\"a\"]");
        assert_eq!(canonical("[data-body='a b']"), "[data-body=\"a b\"]");
        assert_eq!(canonical("[ data-body = \"x\\\"y\" ]"), "[data-body=\"x\\\"y\"]");
    }

    #[test]
    fn parses_combinators_and_lists() {
        assert_eq!(canonical("main  .faq>ul li"), "main .faq > ul li");
        assert_eq!(canonical(".a,.b , #c"), ".a, .b, #c");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Selector::parse("  "), Err(SelectorError::Empty));
        assert_eq!(Selector::parse(".a,"), Err(SelectorError::UnexpectedEnd));
        assert_eq!(
            Selector::parse("[data-x='y]"),
            Err(SelectorError::UnterminatedString)
        );
        assert_eq!(
            Selector::parse(".a > > .b"),
            Err(SelectorError::Unexpected {
                found: '>',
                offset: 5
            })
        );
        assert!(Selector::parse("div{").is_err());
    }

    #[test]
    fn identifiers() {
        assert!(is_ident("accordion__btn_active"));
        assert!(is_ident("-x"));
        assert!(is_ident("btn-2"));
        assert!(!is_ident(""));
        assert!(!is_ident("-"));
        assert!(!is_ident("2col"));
        assert!(!is_ident("is open"));
        assert!(!is_ident("a.b"));
    }

    #[test]
    fn constructed_selectors_escape_values() {
        assert_eq!(Selector::class("open").to_string(), ".open");
        assert_eq!(Selector::attr("data-btn").to_string(), "[data-btn]");
        assert_eq!(
            Selector::attr_eq("data-body", "it's \"quoted\"").to_string(),
            "[data-body=\"it's \\\"quoted\\\"\"]"
        );
    }
}
