//! nom grammar for reference strings, in exact and partial modes.

use super::{PartialReference, RangeEnd, Reference, ReferenceRange};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{all_consuming, eof, map, not, opt, recognize, value, verify},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

/// How a list item label was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItemLabel {
    Roman(u32),
    Letter(char),
}

/// Parse a complete reference. Any deviation from the grammar yields `None`.
pub fn parse_exact(input: &str) -> Option<Reference> {
    all_consuming(reference)(input).ok().map(|(_, r)| r)
}

/// Parse a reference that may still be incomplete.
///
/// Returns `None` for empty input or when a recognizable address is followed
/// by text that cannot continue it.
pub fn parse_partial(input: &str) -> Option<PartialReference> {
    if input.trim().is_empty() {
        return None;
    }

    let mut out = PartialReference::default();

    let rest = match header(input) {
        Ok((rest, (namespace, book, ref_type))) => {
            out.namespace = Some(namespace.to_string());
            out.book = Some(book.to_string());
            out.ref_type = Some(ref_type.to_string());
            rest
        }
        Err(_) => return Some(fuzzy_fallback(input, out)),
    };

    if rest.is_empty() {
        return Some(out);
    }

    match partial_locator(rest) {
        Ok(("", locator)) => {
            locator.apply(&mut out);
            Some(out)
        }
        Ok(_) => None,
        Err(_) => {
            out.fuzzy_query = Some(rest.to_string());
            Some(out)
        }
    }
}

/// Classify a list item label. Roman numerals win over letters, so `i`, `v`
/// and `x` are numerals.
pub fn classify_list_item(label: &str) -> Option<ListItemLabel> {
    if let Ok((_, numeral)) = all_consuming(roman)(label) {
        return roman_value(numeral).map(ListItemLabel::Roman);
    }
    all_consuming(letter)(label)
        .ok()
        .and_then(|(_, l)| l.chars().next())
        .map(ListItemLabel::Letter)
}

fn fuzzy_fallback(input: &str, mut out: PartialReference) -> PartialReference {
    let mut rest = input;

    if let Ok((after, namespace)) = terminated(name, char(':'))(rest) {
        out.namespace = Some(namespace.to_string());
        rest = after;
        if let Ok((after, book)) = terminated(name, char('/'))(rest) {
            out.book = Some(book.to_string());
            rest = after;
        }
    }

    if !rest.is_empty() {
        out.fuzzy_query = Some(rest.to_string());
    }
    out
}

fn reference(input: &str) -> IResult<&str, Reference> {
    let (input, (namespace, book, ref_type)) = header(input)?;
    let (input, locator) = locator(input)?;

    let (list_item, range) = match locator.range {
        LocatorRange::Items(start, end) => (
            None,
            Some(ReferenceRange::ListItems {
                start: start.to_string(),
                end: end.to_string(),
            }),
        ),
        LocatorRange::Span(item, end) => (
            item.map(String::from),
            end.map(|(address, item)| {
                ReferenceRange::Span(RangeEnd {
                    chapter: address.chapter.to_string(),
                    section: address.section.map(String::from),
                    subsection: address.subsection.map(String::from),
                    list_item: item.map(String::from),
                })
            }),
        ),
    };

    Ok((
        input,
        Reference {
            namespace: namespace.to_string(),
            book: book.to_string(),
            ref_type: ref_type.to_string(),
            chapter: locator.start.chapter.to_string(),
            section: locator.start.section.map(String::from),
            subsection: locator.start.subsection.map(String::from),
            list_item,
            range,
        },
    ))
}

/// `namespace:book/type/`
fn header(input: &str) -> IResult<&str, (&str, &str, &str)> {
    map(
        tuple((name, char(':'), name, char('/'), ref_type, char('/'))),
        |(namespace, _, book, _, ref_type, _)| (namespace, book, ref_type),
    )(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))(input)
}

fn ref_type(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_lowercase() || c == '_')(input)
}

fn chapter(input: &str) -> IResult<&str, &str> {
    alt((digit1, recognize(satisfy(|c| c.is_ascii_uppercase()))))(input)
}

fn roman(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| matches!(c, 'i' | 'v' | 'x' | 'l' | 'c' | 'd' | 'm')),
        |numeral: &str| roman_value(numeral).is_some(),
    )(input)
}

fn letter(input: &str) -> IResult<&str, &str> {
    recognize(satisfy(|c| c.is_ascii_lowercase()))(input)
}

fn list_item(input: &str) -> IResult<&str, &str> {
    alt((roman, letter))(input)
}

/// `(item)`
fn item_in_parens(input: &str) -> IResult<&str, &str> {
    delimited(char('('), list_item, char(')'))(input)
}

#[derive(Debug, Clone, Copy, Default)]
struct Address<'a> {
    chapter: &'a str,
    section: Option<&'a str>,
    subsection: Option<&'a str>,
}

/// `chapter[.section[.subsection]]`, each level nested inside the previous.
fn address(input: &str) -> IResult<&str, Address<'_>> {
    map(
        pair(
            chapter,
            opt(preceded(char('.'), pair(digit1, opt(preceded(char('.'), digit1))))),
        ),
        |(chapter, rest)| Address {
            chapter,
            section: rest.map(|(section, _)| section),
            subsection: rest.and_then(|(_, subsection)| subsection),
        },
    )(input)
}

enum LocatorRange<'a> {
    Items(&'a str, &'a str),
    Span(Option<&'a str>, Option<(Address<'a>, Option<&'a str>)>),
}

struct Locator<'a> {
    start: Address<'a>,
    range: LocatorRange<'a>,
}

fn locator(input: &str) -> IResult<&str, Locator<'_>> {
    alt((
        map(
            pair(
                address,
                delimited(
                    char('('),
                    separated_pair(list_item, tag(".."), list_item),
                    char(')'),
                ),
            ),
            |(start, (from, to))| Locator {
                start,
                range: LocatorRange::Items(from, to),
            },
        ),
        map(
            tuple((
                address,
                opt(item_in_parens),
                opt(preceded(tag(".."), pair(address, opt(item_in_parens)))),
            )),
            |(start, item, end)| Locator {
                start,
                range: LocatorRange::Span(item, end),
            },
        ),
    ))(input)
}

// Partial mode: every delimiter may be the last thing typed.

/// A `.` that separates address levels, not the first half of `..`.
fn level_separator(input: &str) -> IResult<&str, char> {
    terminated(char('.'), not(char('.')))(input)
}

/// `..`, or a lone trailing `.` the user is about to double.
fn range_dots(input: &str) -> IResult<&str, &str> {
    alt((tag(".."), terminated(tag("."), eof)))(input)
}

fn partial_address(input: &str) -> IResult<&str, Address<'_>> {
    map(
        pair(
            chapter,
            opt(preceded(
                level_separator,
                opt(pair(digit1, opt(preceded(level_separator, opt(digit1))))),
            )),
        ),
        |(chapter, rest)| {
            let rest = rest.flatten();
            Address {
                chapter,
                section: rest.map(|(section, _)| section),
                subsection: rest.and_then(|(_, subsection)| subsection.flatten()),
            }
        },
    )(input)
}

#[derive(Debug, Clone, Copy)]
enum PartialItem<'a> {
    Closed(&'a str),
    Open(&'a str),
    Range(&'a str, Option<&'a str>),
}

/// What follows `(`: an item, possibly closed, possibly the start of a range.
fn partial_item(input: &str) -> IResult<&str, PartialItem<'_>> {
    let (input, first) = list_item(input)?;
    alt((
        value(PartialItem::Closed(first), char(')')),
        map(
            preceded(range_dots, pair(opt(list_item), opt(char(')')))),
            move |(end, _)| PartialItem::Range(first, end),
        ),
        value(PartialItem::Open(first), eof),
    ))(input)
}

#[derive(Default)]
struct PartialLocator<'a> {
    start: Address<'a>,
    list_item: Option<&'a str>,
    item_range: Option<(&'a str, Option<&'a str>)>,
    end: Option<Address<'a>>,
    end_item: Option<&'a str>,
}

impl PartialLocator<'_> {
    fn apply(&self, out: &mut PartialReference) {
        out.chapter = Some(self.start.chapter.to_string());
        out.section = self.start.section.map(String::from);
        out.subsection = self.start.subsection.map(String::from);
        out.list_item = self.list_item.map(String::from);
        if let Some((start, end)) = self.item_range {
            out.list_item_range_start = Some(start.to_string());
            out.list_item_range_end = end.map(String::from);
        }
        if let Some(end) = &self.end {
            out.chapter_end = Some(end.chapter.to_string());
            out.section_end = end.section.map(String::from);
            out.subsection_end = end.subsection.map(String::from);
        }
        out.list_item_end = self.end_item.map(String::from);
    }
}

fn partial_locator(input: &str) -> IResult<&str, PartialLocator<'_>> {
    let (input, start) = partial_address(input)?;
    let (input, item) = opt(preceded(char('('), opt(partial_item)))(input)?;

    let mut locator = PartialLocator {
        start,
        ..Default::default()
    };

    match item.flatten() {
        Some(PartialItem::Range(from, to)) => {
            locator.item_range = Some((from, to));
            return Ok((input, locator));
        }
        Some(PartialItem::Open(label)) => {
            locator.list_item = Some(label);
            return Ok((input, locator));
        }
        Some(PartialItem::Closed(label)) => locator.list_item = Some(label),
        None => {}
    }

    let (input, end) = opt(preceded(
        range_dots,
        opt(pair(
            partial_address,
            opt(preceded(char('('), opt(terminated(list_item, opt(char(')')))))),
        )),
    ))(input)?;

    if let Some((address, item)) = end.flatten() {
        locator.end = Some(address);
        locator.end_item = item.flatten();
    }

    Ok((input, locator))
}

/// Value of a canonical lowercase roman numeral, `None` if not canonical.
fn roman_value(numeral: &str) -> Option<u32> {
    let mut total = 0;
    let mut previous = 0;

    for c in numeral.chars().rev() {
        let digit = match c {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if digit < previous {
            total -= digit;
        } else {
            total += digit;
            previous = digit;
        }
    }

    if total == 0 || total > 3999 || to_roman(total) != numeral {
        return None;
    }
    Some(total)
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}
