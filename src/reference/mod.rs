//! Reference strings addressing elements of a compiled book.
//!
//! A reference has the form
//!
//! ```text
//! namespace:book/type/chapter[.section[.subsection]][(item)][..chapter[.section[.subsection]][(item)]]
//! namespace:book/type/chapter[.section[.subsection]](start..end)
//! ```
//!
//! The first form optionally spans up to an end address; the second spans a
//! run of list items inside one address. A reference never carries both.

mod grammar;

pub use grammar::{classify_list_item, parse_exact, parse_partial, ListItemLabel};

use crate::error::ReferenceError;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Reference type used for chapters, sections and subsections.
pub const TEXT: &str = "text";

/// Reference type used for `<texttable>` items.
pub const TABLE: &str = "table";

/// Reference types that may appear as inline `<TYPEref>` tags.
pub const INLINE_TYPES: [&str; 7] = [
    TEXT,
    "result",
    "proof",
    "exercise",
    "figure",
    "equation",
    "algorithm",
];

/// Build the canonical reference string for an element.
pub fn synthesize(namespace: &str, book: &str, ref_type: &str, id: &str) -> String {
    format!("{}:{}/{}/{}", namespace, book, ref_type, id)
}

/// A fully parsed reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub namespace: String,
    pub book: String,
    #[serde(rename = "type")]
    pub ref_type: String,
    pub chapter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
    #[serde(flatten)]
    pub range: Option<ReferenceRange>,
}

/// The two mutually exclusive range forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ReferenceRange {
    /// `(start..end)`: list items within the start address.
    ListItems {
        #[serde(rename = "listItemRangeStart")]
        start: String,
        #[serde(rename = "listItemRangeEnd")]
        end: String,
    },
    /// `..end`: everything from the start address up to another address.
    Span(RangeEnd),
}

/// End anchor of a full range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RangeEnd {
    #[serde(rename = "chapterEnd")]
    pub chapter: String,
    #[serde(rename = "sectionEnd", skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(rename = "subsectionEnd", skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    #[serde(rename = "listItemEnd", skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
}

impl Reference {
    /// `chapter[.section[.subsection]]` of the start of the reference.
    pub fn address(&self) -> String {
        join_address(&self.chapter, self.section.as_deref(), self.subsection.as_deref())
    }

    /// Id of the first element addressed, including its list item.
    pub fn start_id(&self) -> String {
        let item = match &self.range {
            Some(ReferenceRange::ListItems { start, .. }) => Some(start.as_str()),
            _ => self.list_item.as_deref(),
        };
        with_item(self.address(), item)
    }

    /// Id of the last element addressed, if this is a range.
    pub fn end_id(&self) -> Option<String> {
        match &self.range {
            None => None,
            Some(ReferenceRange::ListItems { end, .. }) => Some(with_item(self.address(), Some(end))),
            Some(ReferenceRange::Span(end)) => Some(with_item(
                join_address(&end.chapter, end.section.as_deref(), end.subsection.as_deref()),
                end.list_item.as_deref(),
            )),
        }
    }

    /// Canonical reference string of the first element addressed.
    pub fn start_reference(&self) -> String {
        synthesize(&self.namespace, &self.book, &self.ref_type, &self.start_id())
    }

    /// Canonical reference string of the last element addressed.
    pub fn end_reference(&self) -> Option<String> {
        self.end_id()
            .map(|id| synthesize(&self.namespace, &self.book, &self.ref_type, &id))
    }

    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }

    pub fn chapter_end(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::Span(end)) => Some(&end.chapter),
            _ => None,
        }
    }

    pub fn section_end(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::Span(end)) => end.section.as_deref(),
            _ => None,
        }
    }

    pub fn subsection_end(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::Span(end)) => end.subsection.as_deref(),
            _ => None,
        }
    }

    pub fn list_item_end(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::Span(end)) => end.list_item.as_deref(),
            _ => None,
        }
    }

    pub fn list_item_range_start(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::ListItems { start, .. }) => Some(start),
            _ => None,
        }
    }

    pub fn list_item_range_end(&self) -> Option<&str> {
        match &self.range {
            Some(ReferenceRange::ListItems { end, .. }) => Some(end),
            _ => None,
        }
    }

    /// Everything after `type/` in the canonical form.
    pub fn locator(&self) -> String {
        let mut out = self.address();
        match &self.range {
            Some(ReferenceRange::ListItems { start, end }) => {
                out.push_str(&format!("({}..{})", start, end));
            }
            Some(ReferenceRange::Span(end)) => {
                if let Some(item) = &self.list_item {
                    out.push_str(&format!("({})", item));
                }
                out.push_str("..");
                out.push_str(&join_address(
                    &end.chapter,
                    end.section.as_deref(),
                    end.subsection.as_deref(),
                ));
                if let Some(item) = &end.list_item {
                    out.push_str(&format!("({})", item));
                }
            }
            None => {
                if let Some(item) = &self.list_item {
                    out.push_str(&format!("({})", item));
                }
            }
        }
        out
    }

    /// URL fragment for this reference, e.g. `exercise-1.2(ii)`.
    pub fn anchor(&self) -> String {
        format!("{}-{}", self.ref_type, self.locator())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}",
            self.namespace,
            self.book,
            self.ref_type,
            self.locator()
        )
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_exact(s).ok_or_else(|| ReferenceError::Invalid(s.to_string()))
    }
}

/// Whatever could be recovered from a possibly incomplete reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item_range_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item_range_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item_end: Option<String>,
    /// Unstructured remainder, for search-as-you-type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_query: Option<String>,
}

/// Resolve a URL fragment such as `#result-1.2` against a book.
pub fn parse_anchor(fragment: &str, namespace: &str, book: &str) -> Option<Reference> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let (ref_type, locator) = fragment.split_once('-')?;
    parse_exact(&synthesize(namespace, book, ref_type, locator))
}

/// A `[[reference]]` link found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// Byte span of the whole link, brackets included.
    pub span: Range<usize>,
    pub reference: Reference,
}

/// Find every wiki link whose target is a valid reference.
pub fn extract_wiki_links(text: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    let mut offset = 0;

    while let Some(open) = text[offset..].find("[[") {
        let start = offset + open;
        let inner_start = start + 2;
        let close = match text[inner_start..].find("]]") {
            Some(c) => inner_start + c,
            None => break,
        };

        if let Some(reference) = parse_exact(text[inner_start..close].trim()) {
            links.push(WikiLink {
                span: start..close + 2,
                reference,
            });
            offset = close + 2;
        } else {
            offset = inner_start;
        }
    }

    links
}

fn join_address(chapter: &str, section: Option<&str>, subsection: Option<&str>) -> String {
    let mut out = chapter.to_string();
    if let Some(section) = section {
        out.push('.');
        out.push_str(section);
        if let Some(subsection) = subsection {
            out.push('.');
            out.push_str(subsection);
        }
    }
    out
}

fn with_item(mut address: String, item: Option<&str>) -> String {
    if let Some(item) = item {
        address.push('(');
        address.push_str(item);
        address.push(')');
    }
    address
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_synthesize() {
        assert_eq!(synthesize("acme", "v1", "result", "1.2.3"), "acme:v1/result/1.2.3");
    }

    #[test]
    fn test_display_round_trips_canonical_forms() {
        for text in [
            "acme:v1/text/1",
            "acme:v1/text/A.2",
            "acme:v1/exercise/1.2(ii)",
            "acme:v1/text/1.1.3(ii..xv)",
            "acme:v1/text/1.1.3(ii)..2.1.1(iii)",
            "acme:v1/text/1..3",
        ] {
            let reference: Reference = text.parse().unwrap();
            assert_eq!(reference.to_string(), text);
        }
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        let err = "acme:v1/text/".parse::<Reference>().unwrap_err();
        assert_eq!(err, ReferenceError::Invalid("acme:v1/text/".to_string()));
    }

    #[test]
    fn test_start_and_end_ids() {
        let span = parse_exact("acme:v1/text/1.2(ii)..1.3").unwrap();
        assert_eq!(span.start_id(), "1.2(ii)");
        assert_eq!(span.end_id().as_deref(), Some("1.3"));

        let items = parse_exact("acme:v1/exercise/4.1(a..d)").unwrap();
        assert_eq!(items.start_reference(), "acme:v1/exercise/4.1(a)");
        assert_eq!(items.end_reference().as_deref(), Some("acme:v1/exercise/4.1(d)"));
    }

    #[test]
    fn test_anchor() {
        let reference = parse_exact("acme:v1/result/1.2").unwrap();
        assert_eq!(reference.anchor(), "result-1.2");

        let reference = parse_exact("acme:v1/exercise/1.2(ii)").unwrap();
        assert_eq!(reference.anchor(), "exercise-1.2(ii)");
    }

    #[test]
    fn test_parse_anchor() {
        let reference = parse_anchor("#exercise-1.2(ii)", "acme", "v1").unwrap();
        assert_eq!(reference.to_string(), "acme:v1/exercise/1.2(ii)");
        assert_eq!(reference.list_item.as_deref(), Some("ii"));

        assert!(parse_anchor("#nothing", "acme", "v1").is_none());
        assert!(parse_anchor("result-", "acme", "v1").is_none());
    }

    #[test]
    fn test_extract_wiki_links() {
        let text = "See [[acme:v1/result/1.2]] and [[not a ref]] or [[ acme:v1/text/2 ]].";
        let links = extract_wiki_links(text);

        assert_eq!(links.len(), 2);
        assert_eq!(&text[links[0].span.clone()], "[[acme:v1/result/1.2]]");
        assert_eq!(links[0].reference.ref_type, "result");
        assert_eq!(&text[links[1].span.clone()], "[[ acme:v1/text/2 ]]");
    }

    #[test]
    fn test_wiki_link_unclosed() {
        assert!(extract_wiki_links("dangling [[acme:v1/text/1").is_empty());
    }

    #[test]
    fn test_serialize_flattens_range() {
        let reference = parse_exact("acme:v1/text/1.1.3(ii..xv)").unwrap();
        let json = serde_json::to_value(&reference).unwrap();

        assert_eq!(json["listItemRangeStart"], "ii");
        assert_eq!(json["listItemRangeEnd"], "xv");
        assert_eq!(json["type"], "text");
        assert!(json.get("listItem").is_none());
        assert!(json.get("chapterEnd").is_none());
    }
}
