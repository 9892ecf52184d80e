use std::ops::Range;

use tracing::trace;

use crate::compile::buffer::{IndexTracker, IndexUnit, LinearBuffer, Mark};
use crate::error::{CompileError, Notice, NoticeKind};
use crate::operation::{CompileResult, FormatOperation, IndexRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListContext {
    pub ordered: bool,
    /// 1 for a top-level list.
    pub depth: usize,
}

/// Mutable context of a single compile call. Nothing in here outlives it.
pub struct CompileState {
    buffer: LinearBuffer,
    tracker: IndexTracker,
    operations: Vec<FormatOperation>,
    lists: Vec<ListContext>,
    notices: Vec<Notice>,
    /// Inline operations before this index cannot touch the current text
    /// run, so merging never looks past it.
    merge_floor: usize,
    /// Nesting depth of table cells currently being compiled.
    pub cell_depth: usize,
}

impl CompileState {
    pub fn new(base_index: u64, unit: IndexUnit) -> Self {
        CompileState {
            buffer: LinearBuffer::new(unit),
            tracker: IndexTracker::new(base_index),
            operations: Vec::new(),
            lists: Vec::new(),
            notices: Vec::new(),
            merge_floor: 0,
            cell_depth: 0,
        }
    }

    pub fn current(&self) -> u64 {
        self.tracker.current(&self.buffer)
    }

    /// Append leaf text that inline styles may cover.
    pub fn append(&mut self, text: &str) {
        self.buffer.append(text);
    }

    /// Append text no inline style covers: separators, rule glyphs, list
    /// prefixes, code. It ends any run of inline styling.
    pub fn append_unstyled(&mut self, text: &str) {
        self.buffer.append(text);
        self.merge_floor = self.operations.len();
    }

    pub fn mark(&self) -> Mark {
        self.buffer.mark()
    }

    /// Take back text written since `mark`. Only valid while no operation
    /// has been emitted over that text.
    pub fn rewind(&mut self, mark: Mark) {
        self.buffer.rewind(mark);
    }

    /// Emit a block-level or code operation over `[start, end)`. Empty spans
    /// are dropped.
    pub fn emit(
        &mut self,
        start: u64,
        end: u64,
        make: impl FnOnce(IndexRange) -> FormatOperation,
    ) -> Result<(), CompileError> {
        if let Some(range) = IndexRange::try_new(start, end)? {
            let operation = make(range);
            trace!(%operation, "emit");
            self.operations.push(operation);
        }
        Ok(())
    }

    /// Emit an inline style operation, extending an earlier one of the same
    /// style when it ends exactly where this one starts.
    pub fn emit_inline(&mut self, operation: FormatOperation) {
        let range = operation.range();
        let floor = self.merge_floor;
        if let Some(previous) = self.operations[floor..]
            .iter_mut()
            .rev()
            .find(|op| op.same_inline_style(&operation) && op.range().end == range.start)
        {
            previous.extend_to(range.end);
            trace!(operation = %previous, "extend");
            return;
        }
        trace!(%operation, "emit");
        self.operations.push(operation);
    }

    pub fn push_list(&mut self, ordered: bool) {
        let depth = self.lists.len() + 1;
        self.lists.push(ListContext { ordered, depth });
    }

    pub fn pop_list(&mut self) {
        self.lists.pop();
    }

    /// The innermost active list, if any.
    pub fn list(&self) -> Option<ListContext> {
        self.lists.last().copied()
    }

    pub fn notice(&mut self, kind: NoticeKind, span: Range<usize>) {
        self.notices.push(Notice { kind, span });
    }

    /// Close the output: guarantee a trailing newline on non-empty text and
    /// check every range against the final length.
    pub fn finish(mut self) -> Result<CompileResult, CompileError> {
        if !self.buffer.is_empty() && !self.buffer.as_str().ends_with('\n') {
            self.buffer.append("\n");
        }

        let result = CompileResult {
            base_index: self.tracker.base(),
            end_index: self.current(),
            plain_text: self.buffer.into_string(),
            operations: self.operations,
            notices: self.notices,
        };
        result.validate()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold(start: u64, end: u64) -> FormatOperation {
        FormatOperation::Bold {
            range: IndexRange { start, end },
        }
    }

    #[test]
    fn contiguous_inline_runs_merge() {
        let mut state = CompileState::new(1, IndexUnit::CodePoint);
        state.append("abcd");
        state.emit_inline(bold(1, 3));
        state.emit_inline(FormatOperation::Italic {
            range: IndexRange { start: 3, end: 4 },
        });
        state.emit_inline(bold(3, 4));
        state.emit_inline(bold(4, 5));
        let result = state.finish().unwrap();
        assert_eq!(
            result.operations,
            vec![
                bold(1, 5),
                FormatOperation::Italic {
                    range: IndexRange { start: 3, end: 4 }
                }
            ]
        );
    }

    #[test]
    fn separators_stop_merging() {
        let mut state = CompileState::new(1, IndexUnit::CodePoint);
        state.append("a");
        state.emit_inline(bold(1, 2));
        state.append_unstyled("\n");
        state.append("b");
        // Contrived: a range that happens to touch the earlier one.
        state.emit_inline(bold(2, 3));
        let result = state.finish().unwrap();
        assert_eq!(result.operations, vec![bold(1, 2), bold(2, 3)]);
    }

    #[test]
    fn empty_block_ranges_are_dropped() {
        let mut state = CompileState::new(1, IndexUnit::CodePoint);
        state
            .emit(1, 1, |range| FormatOperation::HeadingStyle { range, level: 1 })
            .unwrap();
        let result = state.finish().unwrap();
        assert!(result.operations.is_empty());
        assert!(result.plain_text.is_empty());
    }

    #[test]
    fn finish_adds_single_newline() {
        let mut state = CompileState::new(1, IndexUnit::CodePoint);
        state.append("x");
        let result = state.finish().unwrap();
        assert_eq!(result.plain_text, "x\n");
        assert_eq!(result.end_index, 3);
    }

    #[test]
    fn list_depth_tracks_nesting() {
        let mut state = CompileState::new(1, IndexUnit::CodePoint);
        state.push_list(false);
        state.push_list(true);
        assert_eq!(
            state.list(),
            Some(ListContext {
                ordered: true,
                depth: 2
            })
        );
        state.pop_list();
        assert_eq!(
            state.list(),
            Some(ListContext {
                ordered: false,
                depth: 1
            })
        );
        state.pop_list();
        assert_eq!(state.list(), None);
    }
}
