//! Block-level emission: headings, paragraphs, lists, code, rules, tables,
//! images.

use crate::compile::Walker;
use crate::error::{CompileError, NoticeKind};
use crate::operation::FormatOperation;
use crate::tree::{NodeId, NodeKind};

/// Horizontal rules become a line of box-drawing glyphs.
pub const RULE_LINE: &str = "───────────────────────────────────────\n";

impl Walker<'_> {
    /// A heading with no text writes nothing, not even its newline.
    pub(super) fn heading(&mut self, id: NodeId, level: u8) -> Result<(), CompileError> {
        let start = self.state.current();
        self.walk_children(id)?;
        let end = self.state.current();
        if start == end {
            return Ok(());
        }
        self.state.append_unstyled("\n");
        let level = level.clamp(1, 6);
        self.state
            .emit(start, end, |range| FormatOperation::HeadingStyle { range, level })
    }

    pub(super) fn paragraph(&mut self, id: NodeId) -> Result<(), CompileError> {
        // Cell layout is handled by the table separators.
        if self.state.cell_depth > 0 {
            return self.walk_children(id);
        }

        let mark = self.state.mark();
        let start = self.state.current();
        let list = self.state.list();
        if let Some(list) = list {
            // Nested items carry one tab per extra level inside their bullet
            // range; the target turns leading tabs into nesting.
            if list.depth > 1 {
                self.state.append_unstyled(&"\t".repeat(list.depth - 1));
            }
        }
        let content_start = self.state.current();
        self.walk_children(id)?;
        let end = self.state.current();
        if end == content_start {
            // Nothing survived (dropped HTML, empty text): no blank line and
            // no orphaned tab prefix.
            self.state.rewind(mark);
            return Ok(());
        }
        self.state.append_unstyled("\n");

        match list {
            Some(list) => self.state.emit(start, end, |range| FormatOperation::Bullet {
                range,
                ordered: list.ordered,
            }),
            None => Ok(()),
        }
    }

    pub(super) fn list(&mut self, id: NodeId, ordered: bool) -> Result<(), CompileError> {
        self.state.push_list(ordered);
        let walked = self.walk_children(id);
        self.state.pop_list();
        walked
    }

    /// Code is copied verbatim with no inline styling. Trailing line
    /// terminators are replaced by the single block separator; a block with
    /// no code left writes nothing.
    pub(super) fn code_block(&mut self, lines: &[String]) -> Result<(), CompileError> {
        let code = lines.concat();
        let code = code.trim_end_matches(['\n', '\r']);
        if code.is_empty() {
            return Ok(());
        }

        let start = self.state.current();
        self.state.append_unstyled(code);
        let end = self.state.current();
        self.state.append_unstyled("\n");
        self.state
            .emit(start, end, |range| FormatOperation::Code { range })
    }

    pub(super) fn thematic_break(&mut self) {
        self.state.append_unstyled(RULE_LINE);
    }

    /// Rows are separated by newlines and cells by tabs. A newline closes the
    /// table so following blocks start on their own line. Rows whose cells
    /// are all empty are left out.
    pub(super) fn table(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.state.cell_depth += 1;
        let rows = self.table_rows(id);
        self.state.cell_depth -= 1;
        if rows? > 0 {
            self.state.append_unstyled("\n");
        }
        Ok(())
    }

    /// Returns how many rows produced text.
    fn table_rows(&mut self, id: NodeId) -> Result<usize, CompileError> {
        let tree = self.tree;
        let mut written = 0;
        for &row in tree.children(id) {
            let mark = self.state.mark();
            if written > 0 {
                self.state.append_unstyled("\n");
            }
            let mut has_text = false;
            for (cell_index, &cell) in tree.children(row).iter().enumerate() {
                if cell_index > 0 {
                    self.state.append_unstyled("\t");
                }
                let before = self.state.current();
                self.walk_children(cell)?;
                has_text |= self.state.current() != before;
            }
            if has_text {
                written += 1;
            } else {
                self.state.rewind(mark);
            }
        }
        Ok(written)
    }

    /// Images cannot be inserted as text; they degrade to `[alt]` built from
    /// their direct text children.
    pub(super) fn image(&mut self, id: NodeId) {
        let tree = self.tree;
        let mut alt = String::from("[");
        for &child in tree.children(id) {
            if let NodeKind::Text(text) = tree.kind(child) {
                alt.push_str(text);
            }
        }
        alt.push(']');
        self.state.append_unstyled(&alt);
        self.state
            .notice(NoticeKind::ImageAltText, tree.get(id).span.clone());
    }
}
