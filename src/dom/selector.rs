//! A small CSS selector engine
//!
//! Supports selector groups (`a, b`), compound selectors built from a tag
//! name or `*`, `#id`, `.class`, `[attr]` and `[attr=value]` (value bare,
//! single- or double-quoted), and the descendant and child (`>`) combinators.
//! Selectors are tokenized with logos and parsed with chumsky.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::Logos;
use thiserror::Error;

use super::document::{Document, NodeId};

/// Errors produced while parsing a selector
#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{ch}' at offset {offset}")]
    Unexpected { ch: char, offset: usize },

    #[error("unexpected end of selector")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq)]
enum AttrTest {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(el) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && !el.name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(wanted) = &self.id {
            if el.attr("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|test| match test {
            AttrTest::Exists(name) => el.attr(name).is_some(),
            AttrTest::Equals(name, value) => el.attr(name) == Some(value.as_str()),
        })
    }
}

/// One complex selector: compounds joined by combinators, left to right
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    /// The combinator on each entry links it to the previous entry
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches_at(&self, doc: &Document, id: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.parts[idx];
        if !compound.matches(doc, id) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(id)
                .is_some_and(|p| self.matches_at(doc, p, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(id);
                while let Some(p) = current {
                    if self.matches_at(doc, p, idx - 1) {
                        return true;
                    }
                    current = doc.parent(p);
                }
                false
            }
        }
    }
}

/// A parsed selector group
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    groups: Vec<Complex>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let base = input.len() - input.trim_start().len();
        let unexpected = |offset: usize| {
            match trimmed.get(offset..).and_then(|rest| rest.chars().next()) {
                Some(ch) => SelectorError::Unexpected {
                    ch,
                    offset: base + offset,
                },
                None => SelectorError::UnexpectedEnd,
            }
        };

        let tokens = SelToken::lexer(trimmed)
            .spanned()
            .map(|(tok, span)| match tok {
                Ok(tok) => Ok((tok, SimpleSpan::from(span))),
                Err(()) => Err(span.start),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(unexpected)?;

        let len = trimmed.len();
        let stream = Stream::from_iter(tokens).map((len..len).into(), |(t, s): (_, _)| (t, s));

        selector_parser()
            .parse(stream)
            .into_result()
            .map(|groups| Selector { groups })
            .map_err(|errs| match errs.first() {
                Some(err) => unexpected(err.span().into_range().start),
                None => SelectorError::UnexpectedEnd,
            })
    }

    /// Whether the node matches any selector in the group
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.groups
            .iter()
            .any(|complex| complex.matches_at(doc, id, complex.parts.len() - 1))
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
enum SelToken {
    // Whitespace around combinators, commas and inside brackets belongs to
    // the punctuation; a bare run of whitespace is the descendant combinator.
    #[regex(r"[ \t\r\n\x0C]*>[ \t\r\n\x0C]*")]
    Child,
    #[regex(r"[ \t\r\n\x0C]*,[ \t\r\n\x0C]*")]
    Comma,
    #[regex(r"[ \t\r\n\x0C]+")]
    Space,
    #[token("*")]
    Star,
    #[regex(r"\[[ \t\r\n\x0C]*")]
    OpenBracket,
    #[regex(r"[ \t\r\n\x0C]*\]")]
    CloseBracket,
    #[regex(r"[ \t\r\n\x0C]*=[ \t\r\n\x0C]*")]
    Equals,
    #[regex(r"#[A-Za-z0-9_\-\x{80}-\x{10FFFF}]+", |lex| lex.slice()[1..].to_string())]
    Hash(String),
    #[regex(r"\.[A-Za-z0-9_\-\x{80}-\x{10FFFF}]+", |lex| lex.slice()[1..].to_string())]
    Class(String),
    #[regex(r"[A-Za-z0-9_\-\x{80}-\x{10FFFF}]+", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| unquote(lex.slice()))]
    Quoted(String),
}

fn unquote(slice: &str) -> String {
    slice[1..slice.len() - 1].to_string()
}

enum Simple {
    Id(String),
    Class(String),
    Attr(AttrTest),
}

fn selector_parser<'a, I>(
) -> impl Parser<'a, I, Vec<Complex>, extra::Err<Rich<'a, SelToken>>> + Clone
where
    I: ValueInput<'a, Token = SelToken, Span = SimpleSpan>,
{
    let name = select! { SelToken::Ident(name) => name };
    let value = select! {
        SelToken::Ident(value) => value,
        SelToken::Quoted(value) => value,
    };

    let attribute = just(SelToken::OpenBracket)
        .ignore_then(name)
        .then(just(SelToken::Equals).ignore_then(value).or_not())
        .then_ignore(just(SelToken::CloseBracket))
        .map(|(name, value)| match value {
            Some(value) => AttrTest::Equals(name, value),
            None => AttrTest::Exists(name),
        });

    let simple = choice((
        select! {
            SelToken::Hash(id) => Simple::Id(id),
            SelToken::Class(class) => Simple::Class(class),
        },
        attribute.map(Simple::Attr),
    ));

    let tag = choice((
        just(SelToken::Star).to("*".to_string()),
        name.map(|name| name.to_ascii_lowercase()),
    ));

    let compound = tag
        .or_not()
        .then(simple.repeated().collect::<Vec<_>>())
        .try_map(|(tag, simples), span| {
            let mut compound = Compound {
                tag,
                ..Compound::default()
            };
            for simple in simples {
                match simple {
                    Simple::Id(id) => compound.id = Some(id),
                    Simple::Class(class) => compound.classes.push(class),
                    Simple::Attr(test) => compound.attrs.push(test),
                }
            }
            if compound.is_empty() {
                return Err(Rich::custom(span, "expected a selector"));
            }
            Ok(compound)
        });

    let combinator = select! {
        SelToken::Child => Combinator::Child,
        SelToken::Space => Combinator::Descendant,
    };

    let complex = compound
        .clone()
        .then(combinator.then(compound).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            let mut parts = vec![(Combinator::Descendant, first)];
            parts.extend(rest);
            Complex { parts }
        });

    complex
        .separated_by(just(SelToken::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(doc: &Document, selector: &str) -> Vec<String> {
        doc.select(selector)
            .nodes()
            .iter()
            .map(|&n| doc.attribute(n, "id").unwrap_or("").to_string())
            .collect()
    }

    fn fixture() -> Document {
        Document::parse(concat!(
            r#"<div id="a" class="box"><p id="b" class="x y">"#,
            r#"<span id="c" data-k="1"></span></p></div>"#,
            r#"<section id="d"><span id="e" data-k="two words"></span></section>"#,
        ))
    }

    #[test]
    fn test_simple_selectors() {
        let doc = fixture();
        assert_eq!(ids(&doc, "span"), vec!["c", "e"]);
        assert_eq!(ids(&doc, "#d"), vec!["d"]);
        assert_eq!(ids(&doc, ".y"), vec!["b"]);
        assert_eq!(ids(&doc, "p.x.y"), vec!["b"]);
        assert_eq!(ids(&doc, "*[data-k]"), vec!["c", "e"]);
    }

    #[test]
    fn test_attribute_values() {
        let doc = fixture();
        assert_eq!(ids(&doc, "[data-k=1]"), vec!["c"]);
        assert_eq!(ids(&doc, r#"span[data-k="two words"]"#), vec!["e"]);
        assert_eq!(ids(&doc, "span[data-k='two words']"), vec!["e"]);
    }

    #[test]
    fn test_combinators() {
        let doc = fixture();
        assert_eq!(ids(&doc, "div span"), vec!["c"]);
        assert_eq!(ids(&doc, "div > span"), Vec::<String>::new());
        assert_eq!(ids(&doc, "p>span"), vec!["c"]);
        assert_eq!(ids(&doc, ".box p > span"), vec!["c"]);
    }

    #[test]
    fn test_groups_keep_document_order() {
        let doc = fixture();
        assert_eq!(ids(&doc, "#e, #a"), vec!["a", "e"]);
    }

    #[test]
    fn test_invalid_selectors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
        assert!(Selector::parse("div >").is_err());
        assert_eq!(
            Selector::parse("a!"),
            Err(SelectorError::Unexpected { ch: '!', offset: 1 })
        );
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("div,").is_err());
        assert!(Selector::parse("[a=\"b]").is_err());
        assert!(Selector::parse("a!").is_err());
    }

    #[test]
    fn test_invalid_selector_selects_nothing() {
        let doc = fixture();
        let sel = doc.select("div[");
        assert!(sel.is_empty());
        assert_eq!(sel.selector(), Some("div["));
    }
}
