//! Inline-level extraction of references and page breaks from paragraph text.

use super::lexer::{find_close, open_tag};
use super::CompileConfig;
use crate::ast::{BodyItem, InlineItem};
use crate::reference::{synthesize, INLINE_TYPES};
use std::ops::Range;

/// Split paragraph text into inline items.
pub fn extract_inline(text: &str, config: &CompileConfig) -> Vec<InlineItem> {
    scan_inline(text, config)
        .into_iter()
        .map(|(_, item)| item)
        .collect()
}

/// Split paragraph text into inline items, each paired with the byte range
/// of `text` it was read from. The ranges are contiguous and cover `text`.
pub fn scan_inline(text: &str, config: &CompileConfig) -> Vec<(Range<usize>, InlineItem)> {
    let mut items = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(found) = text[pos..].find('<') {
        let at = pos + found;

        match try_parse_inline_tag(&text[at..], config) {
            Some((len, item)) => {
                if text_start < at {
                    items.push((text_start..at, plain(&text[text_start..at])));
                }
                items.push((at..at + len, item));
                pos = at + len;
                text_start = pos;
            }
            None => pos = at + 1,
        }
    }

    if text_start < text.len() {
        items.push((text_start..text.len(), plain(&text[text_start..])));
    }

    items
}

/// Build a text body item from a paragraph.
pub(crate) fn text_item(text: &str, config: &CompileConfig) -> BodyItem {
    BodyItem::Text {
        content: text.to_string(),
        body: extract_inline(text, config),
    }
}

/// Reference type named by an inline tag such as `resultref`.
fn inline_type(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();
    let ref_type = name.strip_suffix("ref")?;
    INLINE_TYPES.iter().copied().find(|t| *t == ref_type)
}

/// Whether a tag belongs to the inline reference vocabulary.
pub(crate) fn is_inline_tag(name: &str) -> bool {
    inline_type(name).is_some()
}

fn plain(text: &str) -> InlineItem {
    InlineItem::Text {
        content: text.to_string(),
    }
}

/// Parse a `<TYPEref>` element or a `<pagebreak/>` at the start of `input`,
/// returning the number of bytes consumed.
fn try_parse_inline_tag(input: &str, config: &CompileConfig) -> Option<(usize, InlineItem)> {
    let (after, open) = open_tag(input).ok()?;
    let tag_end = input.len() - after.len();

    if open.name.eq_ignore_ascii_case("pagebreak") {
        let page = open.attrs.get("page")?.trim().parse().ok()?;
        return Some((tag_end, InlineItem::PageBreak { page }));
    }

    let reference_type = inline_type(open.name)?;

    let (label, len) = if open.self_closing {
        ("", tag_end)
    } else {
        let (close_start, close_end) = find_close(after, open.name)?;
        (&after[..close_start], tag_end + close_end)
    };

    let id = open.attrs.get("id").cloned();
    let roman = open.attrs.get("roman").cloned();
    let letter = open.attrs.get("letter").cloned();
    let number = open.attrs.get("number").cloned();

    let reference = id.as_ref().map(|id| {
        let target = match roman.as_ref().or(letter.as_ref()) {
            Some(item) => format!("{}({})", id, item),
            None => id.clone(),
        };
        synthesize(&config.namespace, &config.book, reference_type, &target)
    });

    Some((
        len,
        InlineItem::Reference {
            reference_type: reference_type.to_string(),
            id,
            roman,
            letter,
            number,
            label: label.to_string(),
            reference,
            content: input[..len].to_string(),
        },
    ))
}
