//! Block-level parsing of container bodies.

use super::inline::{extract_inline, text_item};
use super::lexer::{open_tag, tokenize, Token, TokenKind};
use super::tags::{dispatch, unclosed_tag, TagKind};
use super::{Context, Env, ParseResult};
use crate::ast::BodyItem;
use crate::error::ParseError;

/// Separator the tokenizer strips between blocks.
pub(crate) const BLOCK_SEPARATOR: &str = "\n\n";

/// Merge HTML tokens whose tags close in later tokens into single tokens.
pub(crate) fn assemble(tokens: Vec<Token>) -> ParseResult<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        let token = promote(token);
        if token.kind != TokenKind::Html {
            out.push(token);
            continue;
        }

        let mut text = token.raw;
        while let Some(tag) = unclosed_tag(&text) {
            let next = tokens
                .next()
                .ok_or(ParseError::UnterminatedTag { tag })?;
            text.push_str(BLOCK_SEPARATOR);
            text.push_str(&next.source_text());
        }
        out.push(Token::html(text));
    }

    Ok(out)
}

/// Treat a paragraph opening with a container tag as HTML. The tokenizer
/// only starts an HTML block at such a tag when nothing follows it on the line.
fn promote(token: Token) -> Token {
    if token.kind != TokenKind::Paragraph {
        return token;
    }
    let opens_container = matches!(
        open_tag(&token.raw),
        Ok((_, open)) if TagKind::from_name(open.name).requires_closing()
    );
    if opens_container {
        Token::html(token.raw)
    } else {
        token
    }
}

/// Parse a fragment of markup into body items.
pub(crate) fn parse_body(source: &str, ctx: &Context, env: &mut Env<'_>) -> ParseResult<Vec<BodyItem>> {
    let mut items = Vec::new();
    for token in assemble(tokenize(source))? {
        items.extend(body_items(&token, ctx, env)?);
    }
    Ok(items)
}

/// Body items for a single assembled token.
pub(crate) fn body_items(token: &Token, ctx: &Context, env: &mut Env<'_>) -> ParseResult<Vec<BodyItem>> {
    let items = match &token.kind {
        TokenKind::Heading(level) => vec![BodyItem::StandaloneHeading {
            level: *level,
            content: token.content.clone(),
            body: extract_inline(&token.content, env.config),
        }],
        TokenKind::Paragraph | TokenKind::Other => vec![text_item(&token.content, env.config)],
        TokenKind::Html => dispatch(&token.raw, ctx, env)?,
        TokenKind::Fence { .. } => vec![BodyItem::Fence {
            language: token.language().map(String::from),
            content: token.content.clone(),
        }],
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Diagnostics, InlineItem};
    use crate::parser::CompileConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assemble_spanning_tag() {
        let source = "<result id=\"1\">\n\nStatement.\n\n```python\nx = 1\n```\n\n</result>\n\nAfter.";
        let tokens = assemble(tokenize(source)).unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(
            tokens[0].raw,
            "<result id=\"1\">\n\nStatement.\n\n```python\nx = 1\n```\n\n</result>"
        );
        assert_eq!(tokens[1].kind, TokenKind::Paragraph);
    }

    #[test]
    fn test_assemble_leaves_closed_tags_alone() {
        let source = "<pagebreak page=\"3\"/>\n\n<figure id=\"2\">A plot</figure>";
        let tokens = assemble(tokenize(source)).unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Html));
    }

    #[test]
    fn test_promotes_single_line_tags() {
        let source = "<proof of=\"1\">Obvious.</proof>\n\n<b>bold</b> text";
        let tokens = assemble(tokenize(source)).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Html);
        assert_eq!(tokens[1].kind, TokenKind::Paragraph);
    }

    #[test]
    fn test_assemble_unterminated() {
        let source = "<proof of=\"1\">\n\nTrivial.";
        assert_eq!(
            assemble(tokenize(source)).unwrap_err(),
            ParseError::UnterminatedTag {
                tag: "proof".into()
            }
        );
    }

    #[test]
    fn test_deep_heading_keeps_inline_references() {
        let config = CompileConfig::new("acme", "v1");
        let mut diagnostics = Diagnostics::default();
        let mut env = Env {
            config: &config,
            diagnostics: &mut diagnostics,
        };
        let source = "#### Using <resultref id=\"2.1\">Lemma 2.1</resultref>";

        let items = parse_body(source, &Context::new("text", "2"), &mut env).unwrap();
        match &items[0] {
            BodyItem::StandaloneHeading { level: 4, body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(
                    &body[1],
                    InlineItem::Reference { reference: Some(r), .. } if r == "acme:v1/result/2.1"
                ));
            }
            other => panic!("Expected heading, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_body_nested() {
        let config = CompileConfig::new("acme", "v1");
        let mut diagnostics = Diagnostics::default();
        let mut env = Env {
            config: &config,
            diagnostics: &mut diagnostics,
        };
        let source = "<result id=\"2.1\" type=\"lemma\">\n\n#### Claim\n\nIt holds.\n\n```frontmatter\npage = 3\n```\n\n</result>";

        let items = parse_body(source, &Context::new("text", "2"), &mut env).unwrap();
        assert_eq!(items.len(), 1);

        let children = items[0].children();
        assert!(matches!(&children[0], BodyItem::StandaloneHeading { level: 4, content, .. } if content == "Claim"));
        assert!(matches!(&children[1], BodyItem::Text { content, .. } if content == "It holds."));
        assert!(matches!(&children[2], BodyItem::Fence { language: Some(l), .. } if l == "frontmatter"));
    }
}
