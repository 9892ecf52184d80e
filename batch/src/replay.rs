//! An in-memory document body that applies batches with the same index
//! rules as the remote service. Used to check a batch before it is sent.

use std::fmt;

use docmark::IndexUnit;
use thiserror::Error;
use tracing::{debug, trace};

use crate::request::{
    BatchUpdate, CreateParagraphBulletsRequest, InsertTextRequest, Range, Request,
    UpdateParagraphStyleRequest, UpdateTextStyleRequest,
};

/// Largest insertion index a replay document is padded out to.
pub const MAX_REPLAY_BASE: u64 = 1 << 20;

const NAMED_STYLES: &[&str] = &[
    "NORMAL_TEXT",
    "TITLE",
    "SUBTITLE",
    "HEADING_1",
    "HEADING_2",
    "HEADING_3",
    "HEADING_4",
    "HEADING_5",
    "HEADING_6",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("request {request}: insertion index {index} is outside the body [1, {end})")]
    InsertOutOfBounds { request: usize, index: u64, end: u64 },
    #[error("request {request}: index {index} splits a surrogate pair")]
    SplitsCharacter { request: usize, index: u64 },
    #[error("request {request}: range [{start}, {end}) is outside the body [1, {body_end}]")]
    RangeOutOfBounds {
        request: usize,
        start: u64,
        end: u64,
        body_end: u64,
    },
    #[error("request {request}: range [{start}, {end}) is empty or inverted")]
    EmptyRange { request: usize, start: u64, end: u64 },
    #[error("request {request}: unknown named style {style:?}")]
    UnknownNamedStyle { request: usize, style: String },
    #[error("request {request}: unknown field {field:?} in field mask")]
    UnknownField { request: usize, field: String },
    #[error("insertion index {base} is above the replay limit {max}", max = MAX_REPLAY_BASE)]
    BaseTooLarge { base: u64 },
}

/// Character formatting of one index unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextStyleState {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub font_family: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ParagraphState {
    named_style: Option<String>,
    bullet: Option<String>,
    nesting: usize,
}

/// One index unit of the body. `ch` is `None` for the second half of a
/// surrogate pair when indexing in UTF-16 units. Paragraph state is only
/// read from newline units.
#[derive(Debug, Clone)]
struct Slot {
    ch: Option<char>,
    style: TextStyleState,
    paragraph: ParagraphState,
}

impl Slot {
    fn new(ch: Option<char>) -> Self {
        Self {
            ch,
            style: TextStyleState::default(),
            paragraph: ParagraphState::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphView {
    pub start: u64,
    pub end: u64,
    /// Paragraph text without its terminating newline.
    pub text: String,
    pub named_style: Option<String>,
    pub bullet: Option<String>,
    pub nesting: usize,
}

impl fmt::Display for ParagraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) {}",
            self.start,
            self.end,
            self.named_style.as_deref().unwrap_or("NORMAL_TEXT")
        )?;
        if let Some(preset) = &self.bullet {
            write!(f, " {}/{}", preset, self.nesting)?;
        }
        write!(f, " {:?}", self.text)
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedDocument {
    unit: IndexUnit,
    slots: Vec<Slot>,
}

impl SimulatedDocument {
    /// An empty body: a single paragraph holding only the final newline.
    pub fn new(unit: IndexUnit) -> Self {
        Self::with_body("", unit)
    }

    /// A body holding `text` followed by the final newline.
    pub fn with_body(text: &str, unit: IndexUnit) -> Self {
        let mut doc = Self {
            unit,
            slots: Vec::new(),
        };
        let mut slots = doc.slots_for(text);
        slots.push(Slot::new(Some('\n')));
        doc.slots = slots;
        doc
    }

    /// A body of `base - 1` empty paragraphs, so that `base` is the first
    /// index after them.
    pub fn for_insertion_at(base: u64, unit: IndexUnit) -> Result<Self, ReplayError> {
        if base > MAX_REPLAY_BASE {
            return Err(ReplayError::BaseTooLarge { base });
        }
        let prefix = "\n".repeat(base.saturating_sub(1) as usize);
        Ok(Self::with_body(&prefix, unit))
    }

    /// First index past the body.
    pub fn end_index(&self) -> u64 {
        self.slots.len() as u64 + 1
    }

    pub fn text(&self) -> String {
        self.slots.iter().filter_map(|slot| slot.ch).collect()
    }

    pub fn style_at(&self, index: u64) -> Option<&TextStyleState> {
        let pos = usize::try_from(index.checked_sub(1)?).ok()?;
        self.slots.get(pos).map(|slot| &slot.style)
    }

    /// Contiguous runs of text whose style satisfies `matches`.
    pub fn runs_where(&self, matches: impl Fn(&TextStyleState) -> bool) -> Vec<String> {
        let mut runs = Vec::new();
        let mut current: Option<String> = None;
        for slot in &self.slots {
            if matches(&slot.style) {
                let run = current.get_or_insert_with(String::new);
                if let Some(ch) = slot.ch {
                    run.push(ch);
                }
            } else if let Some(run) = current.take() {
                runs.push(run);
            }
        }
        runs.extend(current);
        runs
    }

    pub fn paragraphs(&self) -> Vec<ParagraphView> {
        self.paragraph_bounds()
            .into_iter()
            .map(|(start, newline)| {
                let state = &self.slots[newline].paragraph;
                ParagraphView {
                    start: start as u64 + 1,
                    end: newline as u64 + 2,
                    text: self.slots[start..newline]
                        .iter()
                        .filter_map(|slot| slot.ch)
                        .collect(),
                    named_style: state.named_style.clone(),
                    bullet: state.bullet.clone(),
                    nesting: state.nesting,
                }
            })
            .collect()
    }

    /// Apply every request in order. Nothing changes unless all succeed.
    pub fn apply(&mut self, batch: &BatchUpdate) -> Result<(), ReplayError> {
        debug!(requests = batch.requests.len(), "replaying batch");
        let mut next = self.clone();
        for (request, req) in batch.requests.iter().enumerate() {
            trace!(request, ?req, "apply");
            next.apply_request(request, req)?;
        }
        *self = next;
        Ok(())
    }

    fn apply_request(&mut self, request: usize, req: &Request) -> Result<(), ReplayError> {
        match req {
            Request::InsertText(insert) => self.insert_text(request, insert),
            Request::UpdateParagraphStyle(update) => self.update_paragraph_style(request, update),
            Request::UpdateTextStyle(update) => self.update_text_style(request, update),
            Request::CreateParagraphBullets(create) => self.create_bullets(request, create),
        }
    }

    fn insert_text(&mut self, request: usize, insert: &InsertTextRequest) -> Result<(), ReplayError> {
        let index = insert.location.index;
        let end = self.end_index();
        if index == 0 || index >= end {
            return Err(ReplayError::InsertOutOfBounds {
                request,
                index,
                end,
            });
        }
        let pos = (index - 1) as usize;
        if self.slots[pos].ch.is_none() {
            return Err(ReplayError::SplitsCharacter { request, index });
        }
        let inserted = self.slots_for(&insert.text);
        self.slots.splice(pos..pos, inserted);
        Ok(())
    }

    fn update_paragraph_style(
        &mut self,
        request: usize,
        update: &UpdateParagraphStyleRequest,
    ) -> Result<(), ReplayError> {
        let span = self.check_range(request, update.range)?;
        let mut named_style = None;
        for field in mask(&update.fields) {
            match field {
                "namedStyleType" => {
                    let style = update.paragraph_style.named_style_type.clone();
                    if let Some(name) = &style {
                        if !NAMED_STYLES.contains(&name.as_str()) {
                            return Err(ReplayError::UnknownNamedStyle {
                                request,
                                style: name.clone(),
                            });
                        }
                    }
                    named_style = Some(style);
                }
                other => {
                    return Err(ReplayError::UnknownField {
                        request,
                        field: other.to_string(),
                    });
                }
            }
        }
        if let Some(style) = named_style {
            for (_, newline) in self.touched_paragraphs(span) {
                self.slots[newline].paragraph.named_style = style.clone();
            }
        }
        Ok(())
    }

    fn update_text_style(
        &mut self,
        request: usize,
        update: &UpdateTextStyleRequest,
    ) -> Result<(), ReplayError> {
        let span = self.check_range(request, update.range)?;
        let fields: Vec<&str> = mask(&update.fields).collect();
        for field in &fields {
            if !matches!(
                *field,
                "bold" | "italic" | "strikethrough" | "weightedFontFamily" | "link"
            ) {
                return Err(ReplayError::UnknownField {
                    request,
                    field: field.to_string(),
                });
            }
        }

        let given = &update.text_style;
        for slot in &mut self.slots[span] {
            let style = &mut slot.style;
            for field in &fields {
                match *field {
                    "bold" => style.bold = given.bold.unwrap_or(false),
                    "italic" => style.italic = given.italic.unwrap_or(false),
                    "strikethrough" => style.strikethrough = given.strikethrough.unwrap_or(false),
                    "weightedFontFamily" => {
                        style.font_family = given
                            .weighted_font_family
                            .as_ref()
                            .map(|family| family.font_family.clone())
                    }
                    "link" => style.link = given.link.as_ref().map(|link| link.url.clone()),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Leading tabs of each touched paragraph are removed and become its
    /// nesting level.
    fn create_bullets(
        &mut self,
        request: usize,
        create: &CreateParagraphBulletsRequest,
    ) -> Result<(), ReplayError> {
        let span = self.check_range(request, create.range)?;
        let paragraphs = self.touched_paragraphs(span);
        for (start, newline) in paragraphs.into_iter().rev() {
            let tabs = self.slots[start..newline]
                .iter()
                .take_while(|slot| slot.ch == Some('\t'))
                .count();
            self.slots.drain(start..start + tabs);
            let state = &mut self.slots[newline - tabs].paragraph;
            state.bullet = Some(create.bullet_preset.clone());
            state.nesting = tabs;
        }
        Ok(())
    }

    /// Slot positions covered by `range`, after checking it against the body.
    fn check_range(
        &self,
        request: usize,
        range: Range,
    ) -> Result<std::ops::Range<usize>, ReplayError> {
        let Range {
            start_index: start,
            end_index: end,
        } = range;
        if start >= end {
            return Err(ReplayError::EmptyRange {
                request,
                start,
                end,
            });
        }
        let body_end = self.end_index();
        if start == 0 || end > body_end {
            return Err(ReplayError::RangeOutOfBounds {
                request,
                start,
                end,
                body_end,
            });
        }
        Ok((start - 1) as usize..(end - 1) as usize)
    }

    /// `(first slot, newline slot)` of every paragraph.
    fn paragraph_bounds(&self) -> Vec<(usize, usize)> {
        let mut bounds = Vec::new();
        let mut start = 0;
        for (pos, slot) in self.slots.iter().enumerate() {
            if slot.ch == Some('\n') {
                bounds.push((start, pos));
                start = pos + 1;
            }
        }
        bounds
    }

    fn touched_paragraphs(&self, span: std::ops::Range<usize>) -> Vec<(usize, usize)> {
        self.paragraph_bounds()
            .into_iter()
            .filter(|&(start, newline)| start < span.end && newline >= span.start)
            .collect()
    }

    fn slots_for(&self, text: &str) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(text.len());
        for ch in text.chars() {
            slots.push(Slot::new(Some(ch)));
            if self.unit == IndexUnit::Utf16 && ch.len_utf16() == 2 {
                slots.push(Slot::new(None));
            }
        }
        slots
    }
}

impl Default for SimulatedDocument {
    fn default() -> Self {
        Self::new(IndexUnit::default())
    }
}

fn mask(fields: &str) -> impl Iterator<Item = &str> {
    fields.split(',').map(str::trim).filter(|field| !field.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Location, ParagraphStyle, TextStyle};

    fn insert(text: &str, index: u64) -> Request {
        Request::InsertText(InsertTextRequest {
            text: text.into(),
            location: Location { index },
        })
    }

    fn range(start_index: u64, end_index: u64) -> Range {
        Range {
            start_index,
            end_index,
        }
    }

    fn bold(start: u64, end: u64) -> Request {
        Request::UpdateTextStyle(UpdateTextStyleRequest {
            range: range(start, end),
            text_style: TextStyle {
                bold: Some(true),
                ..TextStyle::default()
            },
            fields: "bold".into(),
        })
    }

    fn batch(requests: Vec<Request>) -> BatchUpdate {
        BatchUpdate { requests }
    }

    #[test]
    fn empty_body_is_one_newline() {
        let doc = SimulatedDocument::default();
        assert_eq!(doc.text(), "\n");
        assert_eq!(doc.end_index(), 2);
        assert_eq!(doc.paragraphs().len(), 1);
    }

    #[test]
    fn insertion_point_after_blank_paragraphs() {
        let mut doc = SimulatedDocument::for_insertion_at(4, IndexUnit::CodePoint).unwrap();
        assert_eq!(doc.end_index(), 5);
        doc.apply(&batch(vec![insert("x\n", 4), bold(4, 5)])).unwrap();
        assert_eq!(doc.text(), "\n\n\nx\n\n");
        assert_eq!(doc.runs_where(|s| s.bold), vec!["x"]);
    }

    #[test]
    fn insertion_point_is_capped() {
        let err = SimulatedDocument::for_insertion_at(u64::MAX, IndexUnit::CodePoint).unwrap_err();
        assert_eq!(err, ReplayError::BaseTooLarge { base: u64::MAX });
        assert!(SimulatedDocument::for_insertion_at(MAX_REPLAY_BASE, IndexUnit::Utf16).is_ok());
    }

    #[test]
    fn insert_then_style() {
        let mut doc = SimulatedDocument::default();
        doc.apply(&batch(vec![insert("ab cd\n", 1), bold(4, 6)]))
            .unwrap();
        assert_eq!(doc.text(), "ab cd\n\n");
        assert_eq!(doc.runs_where(|s| s.bold), vec!["cd"]);
        assert!(doc.style_at(4).unwrap().bold);
        assert!(!doc.style_at(3).unwrap().bold);
    }

    #[test]
    fn failed_batch_leaves_document_untouched() {
        let mut doc = SimulatedDocument::default();
        let err = doc
            .apply(&batch(vec![insert("abc\n", 1), bold(2, 40)]))
            .unwrap_err();
        assert_eq!(
            err,
            ReplayError::RangeOutOfBounds {
                request: 1,
                start: 2,
                end: 40,
                body_end: 6
            }
        );
        assert_eq!(doc.text(), "\n");
    }

    #[test]
    fn insert_past_the_final_newline_is_rejected() {
        let mut doc = SimulatedDocument::default();
        let err = doc.apply(&batch(vec![insert("x", 2)])).unwrap_err();
        assert!(matches!(err, ReplayError::InsertOutOfBounds { index: 2, .. }));
    }

    #[test]
    fn empty_range_is_rejected() {
        let mut doc = SimulatedDocument::with_body("abc\n", IndexUnit::CodePoint);
        let err = doc.apply(&batch(vec![bold(2, 2)])).unwrap_err();
        assert!(matches!(err, ReplayError::EmptyRange { .. }));
    }

    #[test]
    fn unknown_named_style_is_rejected() {
        let mut doc = SimulatedDocument::with_body("abc\n", IndexUnit::CodePoint);
        let req = Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range: range(1, 4),
            paragraph_style: ParagraphStyle {
                named_style_type: Some("HEADING_9".into()),
            },
            fields: "namedStyleType".into(),
        });
        let err = doc.apply(&batch(vec![req])).unwrap_err();
        assert!(matches!(err, ReplayError::UnknownNamedStyle { .. }));
    }

    #[test]
    fn bullets_consume_leading_tabs() {
        let mut doc = SimulatedDocument::default();
        let bullets = Request::CreateParagraphBullets(CreateParagraphBulletsRequest {
            range: range(1, 9),
            bullet_preset: "BULLET_DISC_CIRCLE_SQUARE".into(),
        });
        doc.apply(&batch(vec![insert("a\n\tb\n\t\tc\n", 1), bullets]))
            .unwrap();
        assert_eq!(doc.text(), "a\nb\nc\n\n");
        let nesting: Vec<(String, usize)> = doc
            .paragraphs()
            .into_iter()
            .filter(|p| p.bullet.is_some())
            .map(|p| (p.text, p.nesting))
            .collect();
        assert_eq!(
            nesting,
            vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
        );
    }

    #[test]
    fn utf16_units_occupy_two_indices() {
        let mut doc = SimulatedDocument::new(IndexUnit::Utf16);
        doc.apply(&batch(vec![insert("😀 x\n", 1), bold(4, 5)]))
            .unwrap();
        assert_eq!(doc.runs_where(|s| s.bold), vec!["x"]);
        assert_eq!(doc.end_index(), 7);

        let err = doc.apply(&batch(vec![insert("y", 2)])).unwrap_err();
        assert!(matches!(err, ReplayError::SplitsCharacter { index: 2, .. }));
    }

    #[test]
    fn paragraph_view_display() {
        let view = ParagraphView {
            start: 1,
            end: 6,
            text: "Title".into(),
            named_style: Some("HEADING_1".into()),
            bullet: None,
            nesting: 0,
        };
        assert_eq!(view.to_string(), "[1, 6) HEADING_1 \"Title\"");
    }
}
