//! Chapter/section/subsection tree assembly.

use super::block::{assemble, body_items, BLOCK_SEPARATOR};
use super::lexer::{tokenize, Token, TokenKind};
use super::{Context, Env, ParseResult};
use crate::ast::{SectionItem, SectionKind};
use crate::error::ParseError;
use crate::reference::TEXT;
use log::{debug, trace};
use nom::{
    branch::alt,
    character::complete::{char, digit1, multispace1, satisfy},
    combinator::{eof, opt, recognize},
    multi::many0,
    sequence::{pair, terminated},
    IResult,
};
use serde::Deserialize;
use std::collections::HashSet;

/// Fence language marking TOML metadata for the enclosing container.
pub(crate) const FRONT_MATTER: &str = "frontmatter";

/// Deepest heading level that opens a container.
const MAX_CONTAINER_LEVEL: u8 = 3;

#[derive(Debug, Deserialize)]
struct PageMetadata {
    page: Option<u32>,
}

/// Compile a whole document into its chapters.
pub(crate) fn assemble_tree(source: &str, env: &mut Env<'_>) -> ParseResult<Vec<SectionItem>> {
    let tokens = assemble(tokenize(source))?;
    let mut stack = ContainerStack::new(reserved_ids(&tokens));

    for token in tokens {
        match &token.kind {
            TokenKind::Heading(level) if *level <= MAX_CONTAINER_LEVEL => {
                stack.open(*level, &token.content, env)?
            }
            TokenKind::Fence { .. } if token.language() == Some(FRONT_MATTER) => {
                stack.set_page(&token.content)?
            }
            _ => stack.append(&token, env)?,
        }
    }

    Ok(stack.finish())
}

/// Ids fixed by the headings themselves. Generated ids skip these.
fn reserved_ids(tokens: &[Token]) -> HashSet<String> {
    tokens
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Heading(level) if level <= MAX_CONTAINER_LEVEL => {
                absolute_id(level, &token.content)
            }
            _ => None,
        })
        .collect()
}

/// Closed chapters plus the path of containers still open.
#[derive(Debug, Default)]
struct ContainerStack {
    chapters: Vec<SectionItem>,
    /// Chapter first, innermost last.
    open: Vec<SectionItem>,
    reserved: HashSet<String>,
    /// Ids of every container opened so far.
    used: HashSet<String>,
}

impl ContainerStack {
    fn new(reserved: HashSet<String>) -> Self {
        Self {
            reserved,
            ..Self::default()
        }
    }

    fn open(&mut self, level: u8, heading: &str, env: &Env<'_>) -> ParseResult<()> {
        let depth = usize::from(level.saturating_sub(1));
        let kind = match SectionKind::from_depth(depth) {
            Some(kind) if self.open.len() >= depth => kind,
            _ => {
                return Err(ParseError::OrphanHeading {
                    level,
                    heading: heading.to_string(),
                })
            }
        };

        self.close_to(depth);

        let (parent, siblings) = match self.open.last() {
            Some(parent) => (Some(parent.id.clone()), parent.sections.len()),
            None => (None, self.chapters.len()),
        };
        let (id, name) = split_heading(heading, parent.as_deref());
        let id = match id {
            Some(id) if self.used.contains(&id) => {
                return Err(ParseError::DuplicateContainer { id })
            }
            Some(id) => id,
            None => self.generate_id(parent.as_deref(), siblings + 1),
        };
        self.used.insert(id.clone());
        let reference = env.reference(TEXT, &id);

        trace!("Opening {:?} {} ({})", kind, id, reference);
        self.open.push(SectionItem::new(kind, id, reference, name));
        Ok(())
    }

    /// First free ordinal id under `parent`, counting up from `ordinal`.
    fn generate_id(&self, parent: Option<&str>, ordinal: usize) -> String {
        (ordinal..)
            .map(|n| match parent {
                Some(parent) => format!("{}.{}", parent, n),
                None => n.to_string(),
            })
            .find(|id| !self.used.contains(id) && !self.reserved.contains(id))
            .unwrap_or_default()
    }

    /// Fold open containers into their parents until `depth` remain.
    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            let Some(closed) = self.open.pop() else { break };
            match self.open.last_mut() {
                Some(parent) => parent.sections.push(closed),
                None => self.chapters.push(closed),
            }
        }
    }

    fn set_page(&mut self, front_matter: &str) -> ParseResult<()> {
        let container = self.open.last_mut().ok_or(ParseError::OrphanMetadata)?;

        let metadata: PageMetadata =
            toml::from_str(front_matter).map_err(|e| ParseError::FrontMatter {
                container: container.id.clone(),
                message: e.to_string(),
            })?;

        let page = metadata.page.ok_or_else(|| ParseError::MissingPage {
            container: container.id.clone(),
        })?;

        container.page = Some(page);
        Ok(())
    }

    fn append(&mut self, token: &Token, env: &mut Env<'_>) -> ParseResult<()> {
        let Some(container) = self.open.last_mut() else {
            debug!("Ignoring content before the first chapter: {:?}", token.raw);
            return Ok(());
        };

        let ctx = Context::new(TEXT, &container.id);
        let items = body_items(token, &ctx, env)?;

        if !container.content.is_empty() {
            container.content.push_str(BLOCK_SEPARATOR);
        }
        container.content.push_str(&token.source_text());
        container.body.extend(items);
        Ok(())
    }

    fn finish(mut self) -> Vec<SectionItem> {
        self.close_to(0);
        self.chapters
    }
}

/// Split a heading into its explicit id, if it has one, and display name.
///
/// An explicit `{#id}` label wins, then a leading number such as `2`, `A`,
/// `2.1` or `2.1.3`. A single-component number under `parent` is prefixed
/// with the parent id.
fn split_heading(heading: &str, parent: Option<&str>) -> (Option<String>, String) {
    let (text, label) = extract_label(heading);
    if let Some(label) = label {
        return (Some(label.to_string()), text.to_string());
    }

    match heading_number(text) {
        Ok((rest, number)) => {
            let number = number.trim_end_matches('.');
            let id = match parent {
                Some(parent) if !number.contains('.') => format!("{}.{}", parent, number),
                _ => number.to_string(),
            };
            (Some(id), rest.trim().to_string())
        }
        Err(_) => (None, text.trim().to_string()),
    }
}

/// The id a heading fixes whatever ids its parents end up with.
fn absolute_id(level: u8, heading: &str) -> Option<String> {
    let (text, label) = extract_label(heading);
    if let Some(label) = label {
        return Some(label.to_string());
    }

    let (_, number) = heading_number(text).ok()?;
    let number = number.trim_end_matches('.');
    (level == 1 || number.contains('.')).then(|| number.to_string())
}

/// Strip a trailing `{#label}` from a heading.
fn extract_label(heading: &str) -> (&str, Option<&str>) {
    let trimmed = heading.trim_end();
    if let Some(start) = trimmed.rfind("{#") {
        if trimmed.ends_with('}') {
            let label = trimmed[start + 2..trimmed.len() - 1].trim();
            if !label.is_empty() {
                return (trimmed[..start].trim_end(), Some(label));
            }
        }
    }
    (heading, None)
}

fn dotted_digits(input: &str) -> IResult<&str, Vec<(char, &str)>> {
    many0(pair(char('.'), digit1))(input)
}

/// Leading `1`, `1.2`, `1.2.3`, `A` or `A.1`, with an optional trailing dot,
/// followed by whitespace or the end of the heading.
fn heading_number(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(pair(
            alt((
                recognize(pair(digit1, dotted_digits)),
                recognize(pair(satisfy(|c| c.is_ascii_uppercase()), dotted_digits)),
            )),
            opt(char('.')),
        )),
        alt((multispace1, eof)),
    )(input)
}
