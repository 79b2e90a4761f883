//! Document tree produced by the compiler.

use serde::{Serialize, Serializer};

/// A compiled book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub namespace: String,
    pub book: String,
    /// Chapters in source order, serialized as a map keyed by chapter id.
    #[serde(serialize_with = "chapters_by_id")]
    pub chapters: Vec<SectionItem>,
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl Book {
    /// Find a chapter by id.
    pub fn chapter(&self, id: &str) -> Option<&SectionItem> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// Chapter ids in source order.
    pub fn chapter_ids(&self) -> impl Iterator<Item = &str> {
        self.chapters.iter().map(|c| c.id.as_str())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Serialize the chapter map to JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn chapters_by_id<S: Serializer>(chapters: &[SectionItem], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(chapters.iter().map(|c| (&c.id, c)))
}

/// Non-fatal observations made during compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Names of unrecognized tags whose content was dropped, in source order.
    pub dropped_tags: Vec<String>,
    /// Loose text found directly inside `<ol>`, outside any `<li>`.
    pub dropped_text: Vec<String>,
}

impl Diagnostics {
    pub fn dropped_tag_count(&self) -> usize {
        self.dropped_tags.len()
    }
}

/// Level of a section container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Chapter,
    Section,
    Subsection,
}

impl SectionKind {
    /// Kind opened by a heading of the given depth (0 = chapter).
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(Self::Chapter),
            1 => Some(Self::Section),
            2 => Some(Self::Subsection),
            _ => None,
        }
    }
}

/// A chapter, section or subsection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionItem {
    pub kind: SectionKind,
    pub id: String,
    pub reference: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Verbatim source belonging directly to this container.
    pub content: String,
    pub body: Vec<BodyItem>,
    /// Sections of a chapter or subsections of a section.
    pub sections: Vec<SectionItem>,
}

impl SectionItem {
    pub fn new(kind: SectionKind, id: String, reference: String, name: String) -> Self {
        Self {
            kind,
            id,
            reference,
            name,
            page: None,
            content: String::new(),
            body: Vec::new(),
            sections: Vec::new(),
        }
    }
}

/// One typed content unit inside a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyItem {
    /// A paragraph
    Text {
        content: String,
        body: Vec<InlineItem>,
    },

    /// A heading of level 4 or deeper, or any heading nested inside a tag
    StandaloneHeading {
        level: u8,
        content: String,
        body: Vec<InlineItem>,
    },

    Result(ResultItem),

    Proof(ProofItem),

    Equation(EnvironmentItem),

    Algorithm(EnvironmentItem),

    /// `<texttable>`
    Table(EnvironmentItem),

    Figure(EnvironmentItem),

    Exercise(EnvironmentItem),

    /// `<ol>`: list items interleaved with page breaks
    List(ListItems),

    ListItem(ListEntry),

    /// A fenced code block
    Fence {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        content: String,
    },

    PageBreak {
        page: u32,
    },
}

impl BodyItem {
    /// Synthesized reference, for items that have an id.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Result(item) => item.reference.as_deref(),
            Self::Proof(item) => item.reference.as_deref(),
            Self::Equation(item)
            | Self::Algorithm(item)
            | Self::Table(item)
            | Self::Figure(item)
            | Self::Exercise(item) => item.reference.as_deref(),
            Self::ListItem(item) => item.reference.as_deref(),
            _ => None,
        }
    }

    /// Verbatim source of the item, empty for page breaks.
    pub fn content(&self) -> &str {
        match self {
            Self::Text { content, .. }
            | Self::StandaloneHeading { content, .. }
            | Self::Fence { content, .. } => content,
            Self::Result(item) => &item.content,
            Self::Proof(item) => &item.content,
            Self::Equation(item)
            | Self::Algorithm(item)
            | Self::Table(item)
            | Self::Figure(item)
            | Self::Exercise(item) => &item.content,
            Self::List(list) => &list.content,
            Self::ListItem(item) => &item.content,
            Self::PageBreak { .. } => "",
        }
    }

    /// Nested body items.
    pub fn children(&self) -> &[BodyItem] {
        match self {
            Self::Result(item) => &item.body,
            Self::Proof(item) => &item.body,
            Self::Equation(item)
            | Self::Algorithm(item)
            | Self::Table(item)
            | Self::Figure(item)
            | Self::Exercise(item) => &item.body,
            Self::List(list) => &list.body,
            Self::ListItem(item) => &item.body,
            Self::Text { .. }
            | Self::StandaloneHeading { .. }
            | Self::Fence { .. }
            | Self::PageBreak { .. } => &[],
        }
    }
}

/// `<result id type name>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    pub id: Option<String>,
    pub reference: Option<String>,
    /// The `type` attribute (theorem, lemma, ...)
    pub result_type: Option<String>,
    pub name: Option<String>,
    pub content: String,
    pub body: Vec<BodyItem>,
}

/// `<proof of>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofItem {
    pub of: Option<String>,
    pub reference: Option<String>,
    pub content: String,
    pub body: Vec<BodyItem>,
}

/// Equations, algorithms, tables, figures and exercises.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentItem {
    pub id: Option<String>,
    pub reference: Option<String>,
    pub name: Option<String>,
    pub content: String,
    pub body: Vec<BodyItem>,
}

/// Numbering style of an `<ol>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Roman,
    Letter,
    #[default]
    Number,
}

impl ListType {
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("roman") | Some("i") => Self::Roman,
            Some("letter") | Some("a") => Self::Letter,
            _ => Self::Number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItems {
    pub list_type: ListType,
    pub page: Option<u32>,
    pub content: String,
    /// `ListItem` and `PageBreak` items in source order
    pub body: Vec<BodyItem>,
}

/// `<li value roman letter>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub value: Option<String>,
    pub roman: Option<String>,
    pub letter: Option<String>,
    /// `parentId(label)`
    pub id: Option<String>,
    pub reference: Option<String>,
    pub content: String,
    pub body: Vec<BodyItem>,
}

/// A typed fragment of paragraph text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineItem {
    Text {
        content: String,
    },

    /// `<TYPEref id roman letter number>label</TYPEref>`
    Reference {
        reference_type: String,
        id: Option<String>,
        roman: Option<String>,
        letter: Option<String>,
        number: Option<String>,
        label: String,
        reference: Option<String>,
        content: String,
    },

    PageBreak {
        page: u32,
    },
}
