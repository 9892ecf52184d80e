use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

use crate::compile::MAX_BASE_INDEX;
use crate::operation::IndexRange;

/// Compilation never fails on unusual markdown. These errors mean the caller
/// passed an unusable base index, or the compiler broke its own range
/// bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("base index must be at least 1, got {0}")]
    InvalidBaseIndex(u64),

    #[error("base index {0} is above the supported maximum {max}", max = MAX_BASE_INDEX)]
    BaseIndexTooLarge(u64),

    #[error("internal error: inverted range [{start}, {end})")]
    InvertedRange { start: u64, end: u64 },

    #[error("internal error: operation range {range} lies outside [{base}, {end}]")]
    RangeOutOfBounds { range: IndexRange, base: u64, end: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// An image was replaced by its bracketed alt text.
    ImageAltText,
    /// Raw HTML was dropped from the output.
    HtmlDropped,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::ImageAltText => write!(f, "image replaced by its alt text"),
            NoticeKind::HtmlDropped => write!(f, "raw HTML dropped"),
        }
    }
}

/// A record of content that was degraded during compilation. Never affects
/// the text or operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    /// Byte span of the degraded node in the markdown source.
    pub span: Range<usize>,
}

impl Notice {
    /// Convert to a codespan-reporting warning for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::warning()
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
    }
}
