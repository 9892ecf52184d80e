//! Lowering of a compiled document into one ordered batch of requests.
//!
//! The text goes in first. Paragraph and text styles follow in compile
//! order. Bullets go last and in reverse document order: creating a bullet
//! strips the leading tabs of its paragraph, which shifts every index after
//! it, so the later paragraphs have to be handled before the earlier ones.

use docmark::{CompileResult, FormatOperation, IndexRange};
use serde::Deserialize;
use tracing::debug;

use crate::request::{
    BatchUpdate, CreateParagraphBulletsRequest, InsertTextRequest, Link, Location,
    ParagraphStyle, Range, Request, TextStyle, UpdateParagraphStyleRequest,
    UpdateTextStyleRequest, WeightedFontFamily,
};

pub const DEFAULT_CODE_FONT: &str = "Courier New";
pub const DEFAULT_BULLET_PRESET: &str = "BULLET_DISC_CIRCLE_SQUARE";
pub const DEFAULT_NUMBERED_PRESET: &str = "NUMBERED_DECIMAL_ALPHA_ROMAN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
    pub code_font: String,
    pub bullet_preset: String,
    pub numbered_preset: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            code_font: DEFAULT_CODE_FONT.to_string(),
            bullet_preset: DEFAULT_BULLET_PRESET.to_string(),
            numbered_preset: DEFAULT_NUMBERED_PRESET.to_string(),
        }
    }
}

pub fn encode(result: &CompileResult, options: &EncodeOptions) -> BatchUpdate {
    let mut requests = Vec::with_capacity(result.operations.len() + 1);

    if !result.plain_text.is_empty() {
        requests.push(Request::InsertText(InsertTextRequest {
            text: result.plain_text.clone(),
            location: Location {
                index: result.base_index,
            },
        }));
    }

    let (bullets, styles): (Vec<_>, Vec<_>) = result
        .operations
        .iter()
        .partition(|op| matches!(op, FormatOperation::Bullet { .. }));

    requests.extend(styles.into_iter().map(|op| request_for(op, options)));
    requests.extend(bullets.into_iter().rev().map(|op| request_for(op, options)));

    debug!(
        requests = requests.len(),
        base = result.base_index,
        "encoded batch"
    );
    BatchUpdate { requests }
}

/// The request that applies a single operation.
pub fn request_for(op: &FormatOperation, options: &EncodeOptions) -> Request {
    let range = wire_range(op.range());
    match op {
        FormatOperation::HeadingStyle { level, .. } => {
            Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                range,
                paragraph_style: ParagraphStyle {
                    named_style_type: Some(heading_style_name(*level)),
                },
                fields: "namedStyleType".to_string(),
            })
        }
        FormatOperation::Bold { .. } => text_style(
            range,
            TextStyle {
                bold: Some(true),
                ..TextStyle::default()
            },
            "bold",
        ),
        FormatOperation::Italic { .. } => text_style(
            range,
            TextStyle {
                italic: Some(true),
                ..TextStyle::default()
            },
            "italic",
        ),
        FormatOperation::Strikethrough { .. } => text_style(
            range,
            TextStyle {
                strikethrough: Some(true),
                ..TextStyle::default()
            },
            "strikethrough",
        ),
        FormatOperation::Code { .. } => text_style(
            range,
            TextStyle {
                weighted_font_family: Some(WeightedFontFamily {
                    font_family: options.code_font.clone(),
                }),
                ..TextStyle::default()
            },
            "weightedFontFamily",
        ),
        FormatOperation::Link { url, .. } => text_style(
            range,
            TextStyle {
                link: Some(Link { url: url.clone() }),
                ..TextStyle::default()
            },
            "link",
        ),
        FormatOperation::Bullet { ordered, .. } => {
            let preset = if *ordered {
                &options.numbered_preset
            } else {
                &options.bullet_preset
            };
            Request::CreateParagraphBullets(CreateParagraphBulletsRequest {
                range,
                bullet_preset: preset.clone(),
            })
        }
    }
}

pub fn heading_style_name(level: u8) -> String {
    format!("HEADING_{}", level.clamp(1, 6))
}

fn text_style(range: Range, text_style: TextStyle, fields: &str) -> Request {
    Request::UpdateTextStyle(UpdateTextStyleRequest {
        range,
        text_style,
        fields: fields.to_string(),
    })
}

fn wire_range(range: IndexRange) -> Range {
    Range {
        start_index: range.start,
        end_index: range.end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmark::{CompileOptions, compile_markdown};
    use serde_json::json;

    fn encode_source(source: &str) -> BatchUpdate {
        let result = compile_markdown(source, &CompileOptions::default()).unwrap();
        encode(&result, &EncodeOptions::default())
    }

    #[test]
    fn empty_document_has_no_requests() {
        assert!(encode_source("").is_empty());
    }

    #[test]
    fn insert_comes_first() {
        let batch = encode_source("# Title");
        assert_eq!(batch.requests.len(), 2);
        assert_eq!(
            batch.requests[0],
            Request::InsertText(InsertTextRequest {
                text: "Title\n".into(),
                location: Location { index: 1 },
            })
        );
        match &batch.requests[1] {
            Request::UpdateParagraphStyle(req) => {
                assert_eq!(req.paragraph_style.named_style_type.as_deref(), Some("HEADING_1"));
                assert_eq!(
                    req.range,
                    Range {
                        start_index: 1,
                        end_index: 6
                    }
                );
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn bullets_are_last_and_reversed() {
        let batch = encode_source("- a\n  - **b**\n- c");
        let starts: Vec<u64> = batch
            .requests
            .iter()
            .filter_map(|req| match req {
                Request::CreateParagraphBullets(b) => Some(b.range.start_index),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![6, 3, 1]);
        assert!(matches!(
            batch.requests.last(),
            Some(Request::CreateParagraphBullets(_))
        ));
        assert!(matches!(batch.requests[1], Request::UpdateTextStyle(_)));
    }

    #[test]
    fn presets_follow_list_kind() {
        let options = EncodeOptions {
            bullet_preset: "BULLET_ARROW".into(),
            ..EncodeOptions::default()
        };
        let result = compile_markdown("1. a\n\n- b", &CompileOptions::default()).unwrap();
        let presets: Vec<String> = encode(&result, &options)
            .requests
            .into_iter()
            .filter_map(|req| match req {
                Request::CreateParagraphBullets(b) => Some(b.bullet_preset),
                _ => None,
            })
            .collect();
        assert_eq!(presets, vec!["BULLET_ARROW", DEFAULT_NUMBERED_PRESET]);
    }

    #[test]
    fn wire_format_is_camel_case() {
        let batch = encode_source("`x` [l](https://l.io)");
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value,
            json!({
                "requests": [
                    { "insertText": { "text": "x l\n", "location": { "index": 1 } } },
                    { "updateTextStyle": {
                        "range": { "startIndex": 1, "endIndex": 2 },
                        "textStyle": { "weightedFontFamily": { "fontFamily": "Courier New" } },
                        "fields": "weightedFontFamily"
                    } },
                    { "updateTextStyle": {
                        "range": { "startIndex": 3, "endIndex": 4 },
                        "textStyle": { "link": { "url": "https://l.io" } },
                        "fields": "link"
                    } }
                ]
            })
        );
    }

    #[test]
    fn heading_names_are_clamped() {
        assert_eq!(heading_style_name(0), "HEADING_1");
        assert_eq!(heading_style_name(3), "HEADING_3");
        assert_eq!(heading_style_name(9), "HEADING_6");
    }
}
