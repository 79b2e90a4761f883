//! Builders for the pseudo-HTML tag vocabulary.

use super::block::parse_body;
use super::inline::{is_inline_tag, text_item};
use super::lexer::{dedent, scan_elements, scan_spanned, Attributes, Element, Node};
use super::{Context, Env, ParseResult};
use crate::ast::{
    BodyItem, EnvironmentItem, ListEntry, ListItems, ListType, ProofItem, ResultItem,
};
use crate::error::ParseError;
use crate::reference::TABLE;
use log::debug;
use std::ops::Range;

/// Recognized block-level tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    List,
    Proof,
    PageBreak,
    Equation,
    Algorithm,
    TextTable,
    Result,
    Exercise,
    Figure,
    ContextOptional,
    /// Anything else; dropped under the default policy.
    Unknown,
}

impl TagKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "ol" => Self::List,
            "proof" => Self::Proof,
            "pagebreak" => Self::PageBreak,
            "equation" => Self::Equation,
            "algorithm" => Self::Algorithm,
            "texttable" => Self::TextTable,
            "result" => Self::Result,
            "exercise" => Self::Exercise,
            "figure" => Self::Figure,
            "context-optional" => Self::ContextOptional,
            _ => Self::Unknown,
        }
    }

    /// Whether the tag wraps content and needs a closing tag.
    pub fn requires_closing(self) -> bool {
        !matches!(self, Self::PageBreak | Self::Unknown)
    }

    /// Type segment used in references to elements of this kind.
    fn reference_type(self) -> Option<&'static str> {
        match self {
            Self::Proof => Some("proof"),
            Self::Equation => Some("equation"),
            Self::Algorithm => Some("algorithm"),
            Self::TextTable => Some(TABLE),
            Self::Result => Some("result"),
            Self::Exercise => Some("exercise"),
            Self::Figure => Some("figure"),
            Self::List | Self::PageBreak | Self::ContextOptional | Self::Unknown => None,
        }
    }
}

/// Name of the first recognized tag in `html` that is missing its closing tag.
pub(crate) fn unclosed_tag(html: &str) -> Option<String> {
    scan_elements(html).into_iter().find_map(|node| match node {
        Node::Element(element)
            if !element.terminated && TagKind::from_name(element.name).requires_closing() =>
        {
            Some(element.name.to_string())
        }
        _ => None,
    })
}

/// Build body items from a complete HTML block.
///
/// Text between block tags, together with any inline reference tags in it,
/// becomes a single text item.
pub(crate) fn dispatch(html: &str, ctx: &Context, env: &mut Env<'_>) -> ParseResult<Vec<BodyItem>> {
    let mut items = Vec::new();
    let mut run: Option<Range<usize>> = None;

    for (span, node) in scan_spanned(html) {
        match node {
            Node::Text(_) => extend_run(&mut run, span),
            Node::Element(element) if is_inline_tag(element.name) => extend_run(&mut run, span),
            Node::Element(element) => {
                flush_run(html, &mut run, env, &mut items);
                build_element(&element, ctx, env, &mut items)?
            }
            Node::StrayClose(name) => {
                flush_run(html, &mut run, env, &mut items);
                debug!("Ignoring stray closing tag </{}>", name)
            }
        }
    }
    flush_run(html, &mut run, env, &mut items);

    Ok(items)
}

fn extend_run(run: &mut Option<Range<usize>>, span: Range<usize>) {
    *run = Some(match run.take() {
        Some(current) => current.start..span.end,
        None => span,
    });
}

fn flush_run(html: &str, run: &mut Option<Range<usize>>, env: &Env<'_>, items: &mut Vec<BodyItem>) {
    if let Some(range) = run.take() {
        items.push(text_item(html[range].trim(), env.config));
    }
}

fn build_element(
    element: &Element<'_>,
    ctx: &Context,
    env: &mut Env<'_>,
    items: &mut Vec<BodyItem>,
) -> ParseResult<()> {
    let kind = TagKind::from_name(element.name);

    if kind.requires_closing() && !element.terminated {
        return Err(ParseError::UnterminatedTag {
            tag: element.name.to_string(),
        });
    }

    match kind {
        TagKind::List => items.push(build_list(element, ctx, env)?),
        TagKind::Proof => items.push(build_proof(element, ctx, env)?),
        TagKind::PageBreak => items.push(BodyItem::PageBreak {
            page: required_page(element)?,
        }),
        TagKind::Result => items.push(build_result(element, ctx, env)?),
        TagKind::Equation => items.push(BodyItem::Equation(build_environment(kind, element, ctx, env)?)),
        TagKind::Algorithm => items.push(BodyItem::Algorithm(build_environment(kind, element, ctx, env)?)),
        TagKind::TextTable => items.push(BodyItem::Table(build_environment(kind, element, ctx, env)?)),
        TagKind::Exercise => items.push(BodyItem::Exercise(build_environment(kind, element, ctx, env)?)),
        TagKind::Figure => items.push(BodyItem::Figure(build_environment(kind, element, ctx, env)?)),
        TagKind::ContextOptional => items.extend(parse_body(&dedent(element.inner), ctx, env)?),
        TagKind::Unknown => env.drop_tag(element.name)?,
    }

    Ok(())
}

/// Context for children of an element: keyed to its id when it has one.
fn child_context(kind: TagKind, id: Option<&str>, ctx: &Context) -> Context {
    match (kind.reference_type(), id) {
        (Some(ref_type), Some(id)) => Context::new(ref_type, id),
        _ => ctx.clone(),
    }
}

/// Id and reference of an element carrying the given identifying attribute.
fn identify(
    kind: TagKind,
    element: &Element<'_>,
    key: &str,
    env: &Env<'_>,
) -> (Option<String>, Option<String>) {
    let id = attr(&element.attrs, key);
    let reference = match (kind.reference_type(), &id) {
        (Some(ref_type), Some(id)) => Some(env.reference(ref_type, id)),
        _ => None,
    };
    (id, reference)
}

fn build_result(element: &Element<'_>, ctx: &Context, env: &mut Env<'_>) -> ParseResult<BodyItem> {
    let (id, reference) = identify(TagKind::Result, element, "id", env);
    let child = child_context(TagKind::Result, id.as_deref(), ctx);

    Ok(BodyItem::Result(ResultItem {
        result_type: attr(&element.attrs, "type"),
        name: attr(&element.attrs, "name"),
        content: element.inner.to_string(),
        body: parse_body(&dedent(element.inner), &child, env)?,
        id,
        reference,
    }))
}

fn build_proof(element: &Element<'_>, ctx: &Context, env: &mut Env<'_>) -> ParseResult<BodyItem> {
    let (of, reference) = identify(TagKind::Proof, element, "of", env);
    let child = child_context(TagKind::Proof, of.as_deref(), ctx);

    Ok(BodyItem::Proof(ProofItem {
        content: element.inner.to_string(),
        body: parse_body(&dedent(element.inner), &child, env)?,
        of,
        reference,
    }))
}

fn build_environment(
    kind: TagKind,
    element: &Element<'_>,
    ctx: &Context,
    env: &mut Env<'_>,
) -> ParseResult<EnvironmentItem> {
    let (id, reference) = identify(kind, element, "id", env);
    let child = child_context(kind, id.as_deref(), ctx);

    Ok(EnvironmentItem {
        name: attr(&element.attrs, "name"),
        content: element.inner.to_string(),
        body: parse_body(&dedent(element.inner), &child, env)?,
        id,
        reference,
    })
}

fn build_list(element: &Element<'_>, ctx: &Context, env: &mut Env<'_>) -> ParseResult<BodyItem> {
    let list_type = ListType::from_attr(element.attrs.get("type").map(String::as_str));
    let page = optional_page(element)?;
    let mut body = Vec::new();

    for node in scan_elements(element.inner) {
        match node {
            Node::Element(child) if child.name.eq_ignore_ascii_case("li") => {
                if !child.terminated {
                    return Err(ParseError::UnterminatedTag {
                        tag: child.name.to_string(),
                    });
                }
                body.push(build_list_entry(&child, list_type, ctx, env)?);
            }
            Node::Element(child) => build_element(&child, ctx, env, &mut body)?,
            Node::Text(text) => env.drop_text(text.trim()),
            Node::StrayClose(name) => debug!("Ignoring stray closing tag </{}> in list", name),
        }
    }

    Ok(BodyItem::List(ListItems {
        list_type,
        page,
        content: element.inner.to_string(),
        body,
    }))
}

fn build_list_entry(
    element: &Element<'_>,
    list_type: ListType,
    ctx: &Context,
    env: &mut Env<'_>,
) -> ParseResult<BodyItem> {
    let value = attr(&element.attrs, "value");
    let roman = attr(&element.attrs, "roman");
    let letter = attr(&element.attrs, "letter");

    let label = match list_type {
        ListType::Roman => roman.as_ref().or(letter.as_ref()).or(value.as_ref()),
        ListType::Letter => letter.as_ref().or(roman.as_ref()).or(value.as_ref()),
        ListType::Number => value.as_ref().or(roman.as_ref()).or(letter.as_ref()),
    };

    let id = label.map(|label| format!("{}({})", ctx.parent_id, label));
    let reference = id.as_ref().map(|id| env.reference(&ctx.parent_type, id));

    Ok(BodyItem::ListItem(ListEntry {
        content: element.inner.to_string(),
        body: parse_body(&dedent(element.inner), ctx, env)?,
        value,
        roman,
        letter,
        id,
        reference,
    }))
}

fn attr(attrs: &Attributes, key: &str) -> Option<String> {
    attrs
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_page(element: &Element<'_>, value: &str) -> ParseResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidAttribute {
            tag: element.name.to_string(),
            attribute: "page".to_string(),
            value: value.to_string(),
        })
}

fn optional_page(element: &Element<'_>) -> ParseResult<Option<u32>> {
    element
        .attrs
        .get("page")
        .map(|value| parse_page(element, value))
        .transpose()
}

fn required_page(element: &Element<'_>) -> ParseResult<u32> {
    optional_page(element)?.ok_or_else(|| ParseError::MissingAttribute {
        tag: element.name.to_string(),
        attribute: "page".to_string(),
    })
}
