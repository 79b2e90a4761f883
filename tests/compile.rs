use pretty_assertions::assert_eq;
use textbook_markup::parser::scan_inline;
use textbook_markup::{
    compile, BodyItem, CompileConfig, Error, InlineItem, ListType, ParseError, SectionKind,
    UnknownTagPolicy,
};

const BOOK: &str = r#"Front matter printed before chapter one is ignored.

# 1 Foundations

```frontmatter
page = 1
```

Opening remarks, illustrated by <figureref id="1.1">Figure 1.1</figureref>.

## 1.1 Sets

```frontmatter
page = 2
```

<result id="1.1.1" type="definition" name="Set">
A set is a collection of distinct objects.
</result>

### 1.1.1 Membership

```frontmatter
page = 3
```

<exercise id="1.2" name="Practice">
<ol type="roman" page="3">
<li roman="i">Prove that the empty set is unique.</li>
<li roman="ii">Show that <resultref id="1.1.1">Definition 1.1.1</resultref> is needed.</li>
</ol>
</exercise>

## 1.2 Functions

<figure id="1.1" name="Arrow diagram">
A diagram of a function.
</figure>

# 2 Logic

## Proofs

### Induction

<aside>Margin note</aside>

The principle of induction.
"#;

fn config() -> CompileConfig {
    CompileConfig::new("acme", "v1")
}

fn compile_err(source: &str, config: &CompileConfig) -> ParseError {
    match compile(source, config) {
        Err(Error::Parse(err)) => err,
        other => panic!("Expected parse error, got {:?}", other),
    }
}

#[test]
fn test_structure_is_preserved() {
    let book = compile(BOOK, &config()).unwrap();

    assert_eq!(book.chapter_ids().collect::<Vec<_>>(), vec!["1", "2"]);

    let one = book.chapter("1").unwrap();
    let ids: Vec<_> = one.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1.1", "1.2"]);
    assert_eq!(one.sections[0].sections[0].id, "1.1.1");
    assert_eq!(one.sections[0].sections[0].kind, SectionKind::Subsection);
    assert!(one.sections[1].sections.is_empty());

    let two = book.chapter("2").unwrap();
    assert_eq!(two.sections[0].id, "2.1");
    assert_eq!(two.sections[0].name, "Proofs");
    assert_eq!(two.sections[0].sections[0].id, "2.1.1");
    assert_eq!(two.sections[0].sections[0].reference, "acme:v1/text/2.1.1");
}

#[test]
fn test_front_matter_sets_innermost_page() {
    let book = compile(BOOK, &config()).unwrap();
    let one = book.chapter("1").unwrap();

    assert_eq!(one.page, Some(1));
    assert_eq!(one.sections[0].page, Some(2));
    assert_eq!(one.sections[0].sections[0].page, Some(3));
    assert_eq!(one.sections[1].page, None);
}

#[test]
fn test_result_reference() {
    let book = compile(BOOK, &config()).unwrap();
    let section = &book.chapter("1").unwrap().sections[0];

    match &section.body[0] {
        BodyItem::Result(result) => {
            assert_eq!(result.reference.as_deref(), Some("acme:v1/result/1.1.1"));
            assert_eq!(result.result_type.as_deref(), Some("definition"));
            assert_eq!(result.name.as_deref(), Some("Set"));
        }
        other => panic!("Expected result, got {:?}", other),
    }
}

#[test]
fn test_exercise_list_items() {
    let book = compile(BOOK, &config()).unwrap();
    let subsection = &book.chapter("1").unwrap().sections[0].sections[0];

    let exercise = match &subsection.body[0] {
        BodyItem::Exercise(exercise) => exercise,
        other => panic!("Expected exercise, got {:?}", other),
    };
    assert_eq!(exercise.name.as_deref(), Some("Practice"));

    let list = match &exercise.body[0] {
        BodyItem::List(list) => list,
        other => panic!("Expected list, got {:?}", other),
    };
    assert_eq!(list.list_type, ListType::Roman);
    assert_eq!(list.page, Some(3));

    let references: Vec<_> = list.body.iter().filter_map(|item| item.reference()).collect();
    assert_eq!(
        references,
        vec!["acme:v1/exercise/1.2(i)", "acme:v1/exercise/1.2(ii)"]
    );

    // The second item's paragraph carries an inline reference.
    match &list.body[1].children()[0] {
        BodyItem::Text { body, .. } => match &body[1] {
            InlineItem::Reference { reference, .. } => {
                assert_eq!(reference.as_deref(), Some("acme:v1/result/1.1.1"))
            }
            other => panic!("Expected inline reference, got {:?}", other),
        },
        other => panic!("Expected text, got {:?}", other),
    }
}

#[test]
fn test_unknown_tags_are_dropped_and_counted() {
    let book = compile(BOOK, &config()).unwrap();
    assert_eq!(book.diagnostics().dropped_tags, vec!["aside".to_string()]);

    let induction = &book.chapter("2").unwrap().sections[0].sections[0];
    assert_eq!(induction.body.len(), 1);
    assert!(
        matches!(&induction.body[0], BodyItem::Text { content, .. } if content == "The principle of induction.")
    );
}

#[test]
fn test_unknown_tags_rejected_by_policy() {
    let config = CompileConfig {
        unknown_tags: UnknownTagPolicy::Reject,
        ..config()
    };
    assert_eq!(
        compile_err(BOOK, &config),
        ParseError::UnknownTag {
            tag: "aside".into()
        }
    );
}

#[test]
fn test_container_content_is_verbatim() {
    let source = "# 1 One\n\nFirst paragraph.\n\n<figure id=\"1\">\nPlot\n</figure>\n\n## 1.1 Next\n\nOther.";
    let book = compile(source, &config()).unwrap();
    let chapter = book.chapter("1").unwrap();

    assert_eq!(
        chapter.content,
        "First paragraph.\n\n<figure id=\"1\">\nPlot\n</figure>"
    );
    assert_eq!(chapter.sections[0].content, "Other.");
}

#[test]
fn test_fence_inside_tag_keeps_markers() {
    let source = "# 1 One\n\n<algorithm id=\"1.4\" name=\"Search\">\n\n```python\nprint(1)\n```\n\n</algorithm>";
    let book = compile(source, &config()).unwrap();

    match &book.chapter("1").unwrap().body[0] {
        BodyItem::Algorithm(algorithm) => {
            assert_eq!(algorithm.content, "\n\n```python\nprint(1)\n```\n\n");
            assert_eq!(
                algorithm.body,
                vec![BodyItem::Fence {
                    language: Some("python".into()),
                    content: "print(1)\n".into()
                }]
            );
        }
        other => panic!("Expected algorithm, got {:?}", other),
    }
}

#[test]
fn test_single_line_environment() {
    let book = compile(
        "# 1 One\n\n<equation id=\"1.3\">E = mc^2</equation>\n\n<texttable id=\"2\">a | b</texttable>",
        &config(),
    )
    .unwrap();
    let body = &book.chapter("1").unwrap().body;

    assert_eq!(body[0].reference(), Some("acme:v1/equation/1.3"));
    assert_eq!(body[1].reference(), Some("acme:v1/table/2"));
}

#[test]
fn test_context_optional_children_join_parent() {
    let source = "# 1 One\n\n<context-optional>\n\n<result id=\"1.9\">Aside result.</result>\n\n</context-optional>";
    let book = compile(source, &config()).unwrap();
    let body = &book.chapter("1").unwrap().body;

    assert_eq!(body.len(), 1);
    assert_eq!(body[0].reference(), Some("acme:v1/result/1.9"));
}

#[test]
fn test_errors() {
    assert_eq!(
        compile_err("# 1 One\n\n<proof of=\"1\">\n\nNever closed.", &config()),
        ParseError::UnterminatedTag {
            tag: "proof".into()
        }
    );
    assert!(matches!(
        compile_err("## 1.1 Lost", &config()),
        ParseError::OrphanHeading { level: 2, .. }
    ));
    assert_eq!(
        compile_err("# 1 One\n\n## 1.1 Two\n\n```frontmatter\nchapter = 1\n```", &config()),
        ParseError::MissingPage {
            container: "1.1".into()
        }
    );
    assert_eq!(
        compile_err("# 1 One\n\n<pagebreak page=\"two\"/>", &config()),
        ParseError::InvalidAttribute {
            tag: "pagebreak".into(),
            attribute: "page".into(),
            value: "two".into()
        }
    );
}

#[test]
fn test_inline_ranges_rebuild_paragraph() {
    let text = "Compare <resultref id=\"2.1\">Lemma 2.1</resultref><pagebreak page=\"8\"/> with <exerciseref id=\"3\" letter=\"b\">(b)</exerciseref>, and <span>this</span>.";
    let items = scan_inline(text, &config());

    let rebuilt: String = items.iter().map(|(range, _)| &text[range.clone()]).collect();
    assert_eq!(rebuilt, text);

    let kinds: Vec<_> = items
        .iter()
        .map(|(_, item)| match item {
            InlineItem::Text { .. } => "text",
            InlineItem::Reference { .. } => "ref",
            InlineItem::PageBreak { .. } => "page",
        })
        .collect();
    assert_eq!(kinds, vec!["text", "ref", "page", "text", "ref", "text"]);
}

#[test]
fn test_inline_references_after_block_tag() {
    let source = "# 1 One\n\n<pagebreak page=\"5\"/>\ncontinued, by <resultref id=\"1.1\">Theorem 1.1</resultref>.\n";
    let config = CompileConfig {
        unknown_tags: UnknownTagPolicy::Reject,
        ..config()
    };
    let book = compile(source, &config).unwrap();
    let body = &book.chapter("1").unwrap().body;

    assert_eq!(body.len(), 2);
    assert_eq!(body[0], BodyItem::PageBreak { page: 5 });
    match &body[1] {
        BodyItem::Text { body, .. } => {
            let references: Vec<_> = body
                .iter()
                .filter_map(|item| match item {
                    InlineItem::Reference { reference, .. } => reference.as_deref(),
                    _ => None,
                })
                .collect();
            assert_eq!(references, vec!["acme:v1/result/1.1"]);
            assert_eq!(body.len(), 3);
        }
        other => panic!("Expected text, got {:?}", other),
    }
    assert!(book.diagnostics().dropped_tags.is_empty());
}

#[test]
fn test_unnumbered_preface_keeps_every_chapter() {
    let source = "# Preface\n\nHello.\n\n# 1 Intro\n\nWorld.\n\n## Overview\n\n## 1.1 Sets\n";
    let book = compile(source, &config()).unwrap();

    assert_eq!(book.chapter_ids().collect::<Vec<_>>(), vec!["2", "1"]);
    assert_eq!(book.chapter("2").unwrap().name, "Preface");
    let sections: Vec<_> = book.chapter("1").unwrap().sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sections, vec!["1.2", "1.1"]);

    let value: serde_json::Value = serde_json::from_str(&book.to_json().unwrap()).unwrap();
    let chapters = value["chapters"].as_object().unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters["2"]["reference"], "acme:v1/text/2");
}

#[test]
fn test_repeated_heading_number_is_rejected() {
    assert_eq!(
        compile_err("# 1 One\n\n# 1 One again", &config()),
        ParseError::DuplicateContainer { id: "1".into() }
    );
}

#[test]
fn test_json_output() {
    let book = compile(BOOK, &config()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&book.to_json().unwrap()).unwrap();

    let chapter = &value["chapters"]["1"];
    assert_eq!(chapter["reference"], "acme:v1/text/1");
    assert_eq!(chapter["sections"][0]["body"][0]["type"], "result");
    assert_eq!(chapter["sections"][0]["body"][0]["reference"], "acme:v1/result/1.1.1");
}
