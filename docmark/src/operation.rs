use std::fmt;

use crate::error::{CompileError, Notice};

/// Half-open `[start, end)` interval in target-document index units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub start: u64,
    pub end: u64,
}

impl IndexRange {
    /// Build a range from cursor positions. An empty span yields `Ok(None)`;
    /// an inverted one means the cursor moved backwards and is reported as an
    /// internal error.
    pub fn try_new(start: u64, end: u64) -> Result<Option<Self>, CompileError> {
        if start > end {
            return Err(CompileError::InvertedRange { start, end });
        }
        if start == end {
            return Ok(None);
        }
        Ok(Some(IndexRange { start, end }))
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One range-addressed styling instruction, applied to the target document
/// after the plain text has been inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOperation {
    HeadingStyle { range: IndexRange, level: u8 },
    Bold { range: IndexRange },
    Italic { range: IndexRange },
    Strikethrough { range: IndexRange },
    Code { range: IndexRange },
    Link { range: IndexRange, url: String },
    Bullet { range: IndexRange, ordered: bool },
}

impl FormatOperation {
    pub fn range(&self) -> IndexRange {
        match self {
            FormatOperation::HeadingStyle { range, .. }
            | FormatOperation::Bold { range }
            | FormatOperation::Italic { range }
            | FormatOperation::Strikethrough { range }
            | FormatOperation::Code { range }
            | FormatOperation::Link { range, .. }
            | FormatOperation::Bullet { range, .. } => *range,
        }
    }

    fn range_mut(&mut self) -> &mut IndexRange {
        match self {
            FormatOperation::HeadingStyle { range, .. }
            | FormatOperation::Bold { range }
            | FormatOperation::Italic { range }
            | FormatOperation::Strikethrough { range }
            | FormatOperation::Code { range }
            | FormatOperation::Link { range, .. }
            | FormatOperation::Bullet { range, .. } => range,
        }
    }

    /// Paragraph-level operations, as opposed to text-run styles.
    pub fn is_paragraph_style(&self) -> bool {
        matches!(
            self,
            FormatOperation::HeadingStyle { .. } | FormatOperation::Bullet { .. }
        )
    }

    /// Same inline style and payload, ignoring the range. Only these
    /// operations are ever merged.
    pub(crate) fn same_inline_style(&self, other: &FormatOperation) -> bool {
        match (self, other) {
            (FormatOperation::Bold { .. }, FormatOperation::Bold { .. })
            | (FormatOperation::Italic { .. }, FormatOperation::Italic { .. })
            | (FormatOperation::Strikethrough { .. }, FormatOperation::Strikethrough { .. }) => {
                true
            }
            (FormatOperation::Link { url: a, .. }, FormatOperation::Link { url: b, .. }) => a == b,
            _ => false,
        }
    }

    pub(crate) fn extend_to(&mut self, end: u64) {
        let range = self.range_mut();
        if end > range.end {
            range.end = end;
        }
    }
}

/// Compact notation, e.g. `heading(1) [1, 6)` or `link(https://x) [3, 9)`.
impl fmt::Display for FormatOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatOperation::HeadingStyle { range, level } => {
                write!(f, "heading({}) {}", level, range)
            }
            FormatOperation::Bold { range } => write!(f, "bold {}", range),
            FormatOperation::Italic { range } => write!(f, "italic {}", range),
            FormatOperation::Strikethrough { range } => write!(f, "strikethrough {}", range),
            FormatOperation::Code { range } => write!(f, "code {}", range),
            FormatOperation::Link { range, url } => write!(f, "link({}) {}", url, range),
            FormatOperation::Bullet { range, ordered } => {
                if *ordered {
                    write!(f, "bullet(ordered) {}", range)
                } else {
                    write!(f, "bullet {}", range)
                }
            }
        }
    }
}

/// The output of one compile call: text to insert at `base_index`, and the
/// operations to apply afterwards, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub plain_text: String,
    pub operations: Vec<FormatOperation>,
    pub base_index: u64,
    /// `base_index` plus the length of `plain_text` in the configured unit.
    pub end_index: u64,
    /// Content that was degraded rather than compiled faithfully.
    pub notices: Vec<Notice>,
}

impl CompileResult {
    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty()
    }

    /// Check every operation lies inside `[base_index, end_index]`.
    pub fn validate(&self) -> Result<(), CompileError> {
        for operation in &self.operations {
            let range = operation.range();
            if range.start > range.end {
                return Err(CompileError::InvertedRange {
                    start: range.start,
                    end: range.end,
                });
            }
            if range.start == 0 || range.start < self.base_index || range.end > self.end_index {
                return Err(CompileError::RangeOutOfBounds {
                    range,
                    base: self.base_index,
                    end: self.end_index,
                });
            }
        }
        Ok(())
    }
}
