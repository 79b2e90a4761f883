//! # textbook-markup
//!
//! A compiler for annotated textbook Markdown and the reference grammar used to
//! address every element of a compiled book.
//!
//! ## Features
//!
//! - **Document tree**: Chapters, sections and subsections from level 1-3 headings
//! - **Textbook environments**: Results, proofs, exercises, figures, equations,
//!   algorithms and tables written as pseudo-HTML tags
//! - **Numbered lists**: Roman, letter and numeric list items with their own references
//! - **Page metadata**: `frontmatter` fences carrying the printed page of a container
//! - **Reference grammar**: Exact and as-you-type parsing of `namespace:book/type/address`
//! - **Reverse lookup**: Find the element, or run of elements, a reference points at
//!
//! ## Quick Start
//!
//! ```rust
//! use textbook_markup::{compile, parse_exact, CompileConfig, ReferenceIndex};
//!
//! let input = r#"
//! ## 1 Vector spaces
//!
//! <result id="1.1" type="definition" name="Vector space">
//! A set closed under addition and scaling.
//! </result>
//!
//! ### 1.1 Subspaces
//!
//! By <resultref id="1.1">Definition 1.1</resultref>, every subspace is a vector space.
//! "#;
//!
//! let book = compile(input, &CompileConfig::new("acme", "linear-algebra")).unwrap();
//! assert_eq!(book.chapters[0].sections[0].reference, "acme:linear-algebra/text/1.1");
//!
//! let index = ReferenceIndex::build(&book);
//! let reference = parse_exact("acme:linear-algebra/result/1.1").unwrap();
//! assert!(index.lookup(&reference).is_some());
//! ```
//!
//! ## Syntax Reference
//!
//! ### Structure
//!
//! ```text
//! # 1 Chapter
//! ## 1.2 Section
//! ### 1.2.3 Subsection
//! #### Any deeper heading stays in the body
//! ```
//!
//! A heading's leading number becomes its id. Headings without one are
//! numbered after their siblings, skipping ids other headings claim, and
//! `{#id}` sets the id explicitly.
//!
//! ### Page Metadata
//!
//! ````text
//! ```frontmatter
//! page = 42
//! ```
//! ````
//!
//! ### Environments
//!
//! ```text
//! <result id="2.4" type="theorem" name="Rank-nullity">...</result>
//! <proof of="2.4">...</proof>
//! <exercise id="2.1">
//! <ol type="roman">
//!   <li roman="i">...</li>
//!   <pagebreak page="43"/>
//!   <li roman="ii">...</li>
//! </ol>
//! </exercise>
//! ```
//!
//! Inline references use `<TYPEref id="..." roman="...">label</TYPEref>`.
//!
//! ### References
//!
//! ```text
//! acme:v1/text/1.2.3
//! acme:v1/exercise/2.1(ii)
//! acme:v1/text/1.1.3(ii)..2.1.1(iii)
//! acme:v1/exercise/2.1(ii..iv)
//! ```
//!
//! ## FFI
//!
//! The library provides a C-compatible FFI returning JSON. See the `ffi`
//! module documentation for details.
//!
//! ## Features
//!
//! - `wasm`: Enable WebAssembly bindings (requires `wasm-bindgen`)

pub mod ast;
pub mod error;
pub mod parser;
pub mod reference;
pub mod resolve;

// FFI module (always compiled for cdylib)
pub mod ffi;

// WASM module (only with feature)
#[cfg(feature = "wasm")]
pub mod wasm;

// Convenience re-exports
pub use ast::{
    BodyItem, Book, Diagnostics, InlineItem, ListType, SectionItem, SectionKind,
};
pub use error::{ConfigError, Error, ParseError, ReferenceError, Result};
pub use parser::{compile, CompileConfig, UnknownTagPolicy};
pub use reference::{
    classify_list_item, extract_wiki_links, parse_anchor, parse_exact, parse_partial,
    synthesize, ListItemLabel, PartialReference, RangeEnd, Reference, ReferenceRange,
    WikiLink,
};
pub use resolve::{ReferenceIndex, Target};

/// Compile a document and serialize it to JSON in one step.
///
/// # Example
///
/// ```rust
/// use textbook_markup::{compile_to_json, CompileConfig};
///
/// let json = compile_to_json("# 1 Hello", &CompileConfig::new("acme", "v1")).unwrap();
/// assert!(json.starts_with("{\"namespace\":\"acme\""));
/// ```
pub fn compile_to_json(input: &str, config: &CompileConfig) -> Result<String> {
    compile(input, config)?.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> CompileConfig {
        CompileConfig::new("acme", "v1")
    }

    #[test]
    fn test_full_pipeline() {
        let input = r#"# 1 Limits

```frontmatter
page = 1
```

<result id="1.1" type="theorem">
Limits are unique.
</result>

<proof of="1.1">
Suppose not.
</proof>

## 1.1 Sequences

See <resultref id="1.1">Theorem 1.1</resultref>.
"#;

        let book = compile(input, &config()).unwrap();
        let chapter = book.chapter("1").unwrap();

        assert_eq!(chapter.page, Some(1));
        assert_eq!(chapter.body.len(), 2);
        assert_eq!(chapter.body[0].reference(), Some("acme:v1/result/1.1"));
        assert_eq!(chapter.body[1].reference(), Some("acme:v1/proof/1.1"));

        let section = &chapter.sections[0];
        match &section.body[0] {
            BodyItem::Text { body, .. } => assert_eq!(body.len(), 3),
            other => panic!("Expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_to_json() {
        let json = compile_to_json("# 1 One\n\n# 2 Two", &config()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["chapters"]["2"]["name"], "Two");
        assert_eq!(value["chapters"]["1"]["kind"], "chapter");
    }

    #[test]
    fn test_errors_convert() {
        let err = compile("### 1.1.1 Deep", &config()).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::OrphanHeading { level: 3, .. })));
        assert!(err.to_string().starts_with("Parse error:"));
    }
}
