//! Block tokenization and pseudo-HTML tag lexing.

use nom::{
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::collections::BTreeMap;
use std::ops::Range;

/// Tag attributes, keyed by lowercased name.
pub type Attributes = BTreeMap<String, String>;

/// A top-level block from the Markdown tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Verbatim source of the block.
    pub raw: String,
    /// Heading text, fence body, or the trimmed source for other kinds.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Heading(u8),
    Paragraph,
    Html,
    Fence { markup: String, info: String },
    /// Lists, block quotes, tables, rules and indented code
    Other,
}

impl Token {
    pub fn html(text: String) -> Self {
        Self {
            kind: TokenKind::Html,
            content: text.clone(),
            raw: text,
        }
    }

    /// Text of the token as it must appear when spliced back into source.
    pub fn source_text(&self) -> String {
        match &self.kind {
            TokenKind::Fence { markup, info } => {
                let mut out = format!("{}{}\n{}", markup, info, self.content);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(markup);
                out
            }
            _ => self.raw.clone(),
        }
    }

    /// Language tag of a fence: the first word of its info string.
    pub fn language(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Fence { info, .. } => info.split_whitespace().next(),
            _ => None,
        }
    }
}

/// Split source text into a flat sequence of top-level block tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(PendingKind, usize, usize)> = None;
    let mut text = String::new();

    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        if let Some((_, _, end)) = current.as_mut() {
            *end = (*end).max(range.end);
        }

        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    current = Some((PendingKind::from_tag(&tag), range.start, range.end));
                    text.clear();
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some((kind, start, end)) = current.take() {
                        tokens.push(kind.finish(&source[start..end], &text));
                    }
                }
            }
            Event::Text(t) if depth > 0 => text.push_str(&t),
            Event::Html(t) if depth == 0 => tokens.push(Token::html(t.trim_end().to_string())),
            _ if depth == 0 => {
                let raw = source[range].trim_end().to_string();
                if !raw.is_empty() {
                    tokens.push(Token {
                        kind: TokenKind::Other,
                        content: raw.clone(),
                        raw,
                    });
                }
            }
            _ => {}
        }
    }

    tokens
}

enum PendingKind {
    Heading(u8),
    Paragraph,
    Html,
    Fence(String),
    Other,
}

impl PendingKind {
    fn from_tag(tag: &Tag<'_>) -> Self {
        match tag {
            Tag::Heading { level, .. } => Self::Heading(*level as u8),
            Tag::Paragraph => Self::Paragraph,
            Tag::HtmlBlock => Self::Html,
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Self::Fence(info.to_string()),
            _ => Self::Other,
        }
    }

    fn finish(self, raw: &str, text: &str) -> Token {
        let raw = raw.trim_end().to_string();
        match self {
            Self::Heading(level) => Token {
                kind: TokenKind::Heading(level),
                content: heading_text(&raw).to_string(),
                raw,
            },
            Self::Fence(info) => {
                let markup: String = raw
                    .trim_start()
                    .chars()
                    .take_while(|c| *c == '`' || *c == '~')
                    .collect();
                Token {
                    kind: TokenKind::Fence { markup, info },
                    content: text.to_string(),
                    raw,
                }
            }
            Self::Paragraph => Token {
                kind: TokenKind::Paragraph,
                content: raw.clone(),
                raw,
            },
            Self::Html => Token::html(raw),
            Self::Other => Token {
                kind: TokenKind::Other,
                content: raw.clone(),
                raw,
            },
        }
    }
}

/// Text of an ATX or setext heading without its markers.
fn heading_text(raw: &str) -> &str {
    let trimmed = raw.trim();

    if trimmed.starts_with('#') {
        let text = trimmed.trim_start_matches('#').trim();
        let without_closing = text.trim_end_matches('#');
        if without_closing.is_empty() || without_closing.ends_with(' ') {
            return without_closing.trim_end();
        }
        return text;
    }

    // Setext: everything above the underline.
    match trimmed.rfind('\n') {
        Some(pos) => trimmed[..pos].trim(),
        None => trimmed,
    }
}

/// An opening (or self-closing) tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag<'a> {
    pub name: &'a str,
    pub attrs: Attributes,
    pub self_closing: bool,
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '-'),
    ))(input)
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    nom::branch::alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '=' | '<' | '>' | '`' | '/')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        attribute_name,
        opt(preceded(
            tuple((multispace0, char('='), multispace0)),
            attribute_value,
        )),
    )(input)
}

/// Parse `<name attr="value" ...>` or `<name .../>`.
pub fn open_tag(input: &str) -> IResult<&str, OpenTag<'_>> {
    let (input, _) = char('<')(input)?;
    let (input, name) = tag_name(input)?;
    let (input, attrs) = many0(preceded(multispace1, attribute))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, slash) = opt(char('/'))(input)?;
    let (input, _) = char('>')(input)?;

    let attrs = attrs
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.unwrap_or_default().to_string()))
        .collect();

    Ok((
        input,
        OpenTag {
            name,
            attrs,
            self_closing: slash.is_some(),
        },
    ))
}

/// Parse `</name>`.
pub fn close_tag(input: &str) -> IResult<&str, &str> {
    delimited(tag("</"), tag_name, pair(multispace0, char('>')))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("<!--"), take_until("-->"), tag("-->"))))(input)
}

/// Find the `</name>` balancing an already-consumed `<name>`, honoring
/// nested tags of the same name. Returns the byte span of the closing tag.
pub fn find_close(input: &str, name: &str) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut pos = 0;

    while let Some(found) = input[pos..].find('<') {
        let at = pos + found;
        let rest = &input[at..];

        if let Ok((after, closing)) = close_tag(rest) {
            let end = input.len() - after.len();
            if closing.eq_ignore_ascii_case(name) {
                depth -= 1;
                if depth == 0 {
                    return Some((at, end));
                }
            }
            pos = end;
        } else if let Ok((after, open)) = open_tag(rest) {
            if open.name.eq_ignore_ascii_case(name) && !open.self_closing {
                depth += 1;
            }
            pos = input.len() - after.len();
        } else {
            pos = at + 1;
        }
    }

    None
}

/// A tag together with everything up to its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub name: &'a str,
    pub attrs: Attributes,
    pub inner: &'a str,
    pub raw: &'a str,
    /// False when no closing tag was found; `inner` is then empty.
    pub terminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Element(Element<'a>),
    Text(&'a str),
    /// A closing tag with no matching opener
    StrayClose(&'a str),
}

/// Split an HTML string into top-level elements and the text between them.
/// Whitespace-only text and comments are skipped.
pub fn scan_elements(input: &str) -> Vec<Node<'_>> {
    scan_spanned(input).into_iter().map(|(_, node)| node).collect()
}

/// Like [`scan_elements`], pairing each node with the byte range of `input`
/// it was read from.
pub fn scan_spanned(input: &str) -> Vec<(Range<usize>, Node<'_>)> {
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(found) = input[pos..].find('<') {
        let at = pos + found;
        let rest = &input[at..];

        if let Ok((after, _)) = comment(rest) {
            push_text(&mut nodes, input, text_start..at);
            pos = input.len() - after.len();
            text_start = pos;
            continue;
        }

        if let Ok((after, name)) = close_tag(rest) {
            push_text(&mut nodes, input, text_start..at);
            pos = input.len() - after.len();
            nodes.push((at..pos, Node::StrayClose(name)));
            text_start = pos;
            continue;
        }

        let (after, open) = match open_tag(rest) {
            Ok(parsed) => parsed,
            Err(_) => {
                pos = at + 1;
                continue;
            }
        };

        push_text(&mut nodes, input, text_start..at);
        let tag_end = input.len() - after.len();

        let element = if open.self_closing {
            Element {
                name: open.name,
                attrs: open.attrs,
                inner: "",
                raw: &input[at..tag_end],
                terminated: true,
            }
        } else {
            match find_close(&input[tag_end..], open.name) {
                Some((close_start, close_end)) => Element {
                    name: open.name,
                    attrs: open.attrs,
                    inner: &input[tag_end..tag_end + close_start],
                    raw: &input[at..tag_end + close_end],
                    terminated: true,
                },
                None => Element {
                    name: open.name,
                    attrs: open.attrs,
                    inner: "",
                    raw: &input[at..tag_end],
                    terminated: false,
                },
            }
        };

        pos = at + element.raw.len();
        text_start = pos;
        nodes.push((at..pos, Node::Element(element)));
    }

    push_text(&mut nodes, input, text_start..input.len());
    nodes
}

fn push_text<'a>(nodes: &mut Vec<(Range<usize>, Node<'a>)>, input: &'a str, range: Range<usize>) {
    let text = &input[range.clone()];
    if !text.trim().is_empty() {
        nodes.push((range, Node::Text(text)));
    }
}

/// Remove the indentation common to all non-blank lines.
pub fn dedent(text: &str) -> String {
    let indent_of = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();

    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(indent_of)
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}
