use batch::{BatchUpdate, EncodeOptions, ParagraphView, SimulatedDocument, encode};
use docmark::{CompileOptions, IndexUnit, compile_markdown};

fn replay_with(source: &str, options: &CompileOptions, doc: &mut SimulatedDocument) -> String {
    let result = compile_markdown(source, options).expect("compile failed");
    let batch = encode(&result, &EncodeOptions::default());
    doc.apply(&batch).expect("replay failed");
    result.plain_text
}

fn replay(source: &str) -> SimulatedDocument {
    let mut doc = SimulatedDocument::default();
    replay_with(source, &CompileOptions::default(), &mut doc);
    doc
}

fn bullets(doc: &SimulatedDocument) -> Vec<(String, String, usize)> {
    doc.paragraphs()
        .into_iter()
        .filter_map(|p: ParagraphView| Some((p.bullet?, p.text, p.nesting)))
        .collect()
}

#[test]
fn body_holds_the_compiled_text() {
    let mut doc = SimulatedDocument::default();
    let text = replay_with(
        "# T\n\nsome *text*\n\n---\n",
        &CompileOptions::default(),
        &mut doc,
    );
    assert_eq!(doc.text(), format!("{}\n", text));
}

#[test]
fn heading_paragraph_gets_named_style() {
    let doc = replay("## Title\n\nBody");
    let paragraphs = doc.paragraphs();
    assert_eq!(paragraphs[0].text, "Title");
    assert_eq!(paragraphs[0].named_style.as_deref(), Some("HEADING_2"));
    assert_eq!(paragraphs[1].text, "Body");
    assert_eq!(paragraphs[1].named_style, None);
}

#[test]
fn nested_bullets_become_nesting_levels() {
    let doc = replay("- Top level\n  - Sub-bullet\n    - Sub-sub-bullet\n- Back to top");
    let disc = "BULLET_DISC_CIRCLE_SQUARE".to_string();
    assert_eq!(
        bullets(&doc),
        vec![
            (disc.clone(), "Top level".to_string(), 0),
            (disc.clone(), "Sub-bullet".to_string(), 1),
            (disc.clone(), "Sub-sub-bullet".to_string(), 2),
            (disc, "Back to top".to_string(), 0),
        ]
    );
    assert!(!doc.text().contains('\t'));
}

#[test]
fn mixed_lists_keep_their_presets() {
    let doc = replay("- Unordered top\n  1. Ordered nested\n  2. Another ordered\n- Back to unordered");
    let presets: Vec<(String, usize)> = bullets(&doc)
        .into_iter()
        .map(|(preset, _, nesting)| (preset, nesting))
        .collect();
    assert_eq!(
        presets,
        vec![
            ("BULLET_DISC_CIRCLE_SQUARE".to_string(), 0),
            ("NUMBERED_DECIMAL_ALPHA_ROMAN".to_string(), 1),
            ("NUMBERED_DECIMAL_ALPHA_ROMAN".to_string(), 1),
            ("BULLET_DISC_CIRCLE_SQUARE".to_string(), 0),
        ]
    );
}

#[test]
fn styles_survive_tab_removal() {
    let doc = replay("- a\n  - **b** c\n    - *d* [e](https://e.io)");
    assert_eq!(doc.runs_where(|s| s.bold), vec!["b"]);
    assert_eq!(doc.runs_where(|s| s.italic), vec!["d"]);
    assert_eq!(doc.runs_where(|s| s.link.is_some()), vec!["e"]);
}

#[test]
fn inline_styles_land_on_their_words() {
    let doc = replay("**bold** and *italic* and ~~gone~~ and `code`");
    assert_eq!(doc.runs_where(|s| s.bold), vec!["bold"]);
    assert_eq!(doc.runs_where(|s| s.italic), vec!["italic"]);
    assert_eq!(doc.runs_where(|s| s.strikethrough), vec!["gone"]);
    assert_eq!(
        doc.runs_where(|s| s.font_family.as_deref() == Some("Courier New")),
        vec!["code"]
    );
}

#[test]
fn code_block_font_covers_every_line() {
    let doc = replay("```\nfn main() {}\nlet x = 1;\n```");
    assert_eq!(
        doc.runs_where(|s| s.font_family.is_some()),
        vec!["fn main() {}\nlet x = 1;"]
    );
}

#[test]
fn insertion_after_existing_content() {
    let mut doc = SimulatedDocument::with_body("intro\n", IndexUnit::CodePoint);
    let options = CompileOptions {
        base_index: 7,
        ..CompileOptions::default()
    };
    replay_with("# **x**", &options, &mut doc);
    assert_eq!(doc.text(), "intro\nx\n\n");
    assert_eq!(doc.runs_where(|s| s.bold), vec!["x"]);
    let paragraphs = doc.paragraphs();
    assert_eq!(paragraphs[0].named_style, None);
    assert_eq!(paragraphs[1].named_style.as_deref(), Some("HEADING_1"));
}

#[test]
fn utf16_indices_match_a_utf16_document() {
    let options = CompileOptions {
        index_unit: IndexUnit::Utf16,
        ..CompileOptions::default()
    };
    let mut doc = SimulatedDocument::new(IndexUnit::Utf16);
    replay_with("😀 **x** 🎉 *y*", &options, &mut doc);
    assert_eq!(doc.runs_where(|s| s.bold), vec!["x"]);
    assert_eq!(doc.runs_where(|s| s.italic), vec!["y"]);
}

#[test]
fn mismatched_unit_misplaces_styles() {
    let mut doc = SimulatedDocument::new(IndexUnit::Utf16);
    replay_with("😀 **x**", &CompileOptions::default(), &mut doc);
    assert_ne!(doc.runs_where(|s| s.bold), vec!["x"]);
}

#[test]
fn table_and_rule_text() {
    let doc = replay("| a | b |\n|---|---|\n| c | d |\n\n---");
    let texts: Vec<String> = doc.paragraphs().into_iter().map(|p| p.text).collect();
    assert_eq!(texts[0], "a\tb");
    assert_eq!(texts[1], "c\td");
    assert_eq!(texts[2], "─".repeat(39));
}

#[test]
fn wire_json_reads_back() {
    let result = compile_markdown("# T\n\n- **a**", &CompileOptions::default()).unwrap();
    let batch = encode(&result, &EncodeOptions::default());
    let json = batch.to_json_pretty().unwrap();
    let parsed: BatchUpdate = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, batch);
}
