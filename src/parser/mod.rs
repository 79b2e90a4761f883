//! Compiler from textbook Markdown to a document tree.

mod block;
mod inline;
mod lexer;
mod tags;
mod tree;

pub use inline::{extract_inline, scan_inline};
pub use lexer::{tokenize, Token, TokenKind};

use crate::ast::{Book, Diagnostics};
use crate::error::{ConfigError, ParseError, Result};
use log::debug;
use serde::Deserialize;

type ParseResult<T> = std::result::Result<T, ParseError>;

/// What to do with tags outside the recognized vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    /// Drop the tag and its content, recording it in the diagnostics.
    #[default]
    Drop,
    /// Abort compilation.
    Reject,
}

/// Book identity and compiler switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompileConfig {
    pub namespace: String,
    pub book: String,
    #[serde(default)]
    pub unknown_tags: UnknownTagPolicy,
}

impl CompileConfig {
    pub fn new(namespace: impl Into<String>, book: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            book: book.into(),
            unknown_tags: UnknownTagPolicy::default(),
        }
    }

    /// Load from a TOML book manifest.
    ///
    /// ```text
    /// namespace = "acme"
    /// book = "v1"
    /// unknown_tags = "reject"
    /// ```
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: CompileConfig = toml::from_str(input).map_err(ConfigError::from)?;

        if config.namespace.trim().is_empty() {
            return Err(ConfigError::Empty("namespace").into());
        }
        if config.book.trim().is_empty() {
            return Err(ConfigError::Empty("book").into());
        }

        Ok(config)
    }
}

/// Compile a textbook source document into its chapter tree.
pub fn compile(source: &str, config: &CompileConfig) -> Result<Book> {
    let mut diagnostics = Diagnostics::default();
    let chapters = {
        let mut env = Env {
            config,
            diagnostics: &mut diagnostics,
        };
        tree::assemble_tree(source, &mut env)?
    };

    Ok(Book {
        namespace: config.namespace.clone(),
        book: config.book.clone(),
        chapters,
        diagnostics,
    })
}

/// Per-compilation state threaded through the builders.
pub(crate) struct Env<'a> {
    pub config: &'a CompileConfig,
    pub diagnostics: &'a mut Diagnostics,
}

impl Env<'_> {
    fn reference(&self, ref_type: &str, id: &str) -> String {
        crate::reference::synthesize(&self.config.namespace, &self.config.book, ref_type, id)
    }

    fn drop_tag(&mut self, name: &str) -> ParseResult<()> {
        match self.config.unknown_tags {
            UnknownTagPolicy::Drop => {
                debug!("Dropping unrecognized tag <{}>", name);
                self.diagnostics.dropped_tags.push(name.to_string());
                Ok(())
            }
            UnknownTagPolicy::Reject => Err(ParseError::UnknownTag {
                tag: name.to_string(),
            }),
        }
    }

    fn drop_text(&mut self, text: &str) {
        debug!("Dropping text outside list items: {:?}", text);
        self.diagnostics.dropped_text.push(text.to_string());
    }
}

/// The element new references are built relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Context {
    pub parent_type: String,
    pub parent_id: String,
}

impl Context {
    pub fn new(parent_type: &str, parent_id: &str) -> Self {
        Self {
            parent_type: parent_type.to_string(),
            parent_id: parent_id.to_string(),
        }
    }
}
