//! Markdown tree to (plain text, format operations) compiler.
//!
//! The walker enters each node, records the cursor, lets the node's text flow
//! through the buffer, and on exit emits operations whose ranges run from the
//! recorded start to the cursor at that moment. All state lives in one
//! [`CompileState`] owned by the call, so independent compiles can run on
//! separate threads.

mod block;
pub mod buffer;
mod state;
pub mod style;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CompileError, NoticeKind};
use crate::operation::{CompileResult, FormatOperation, IndexRange};
use crate::tree::{NodeId, NodeKind, Tree};

pub use buffer::{IndexTracker, IndexUnit, LinearBuffer, Mark};
pub use state::{CompileState, ListContext};
pub use style::{InlineStyle, resolve};

/// Largest accepted base index. Keeps `base + length` far from overflow.
pub const MAX_BASE_INDEX: u64 = u32::MAX as u64;

/// Settings for one compile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Target-document index of the first emitted character. At least 1.
    pub base_index: u64,
    pub index_unit: IndexUnit,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            base_index: 1,
            index_unit: IndexUnit::CodePoint,
        }
    }
}

/// Compile `tree` for insertion at `base_index`, counting code points.
pub fn compile(tree: &Tree, base_index: u64) -> Result<CompileResult, CompileError> {
    compile_with(
        tree,
        &CompileOptions {
            base_index,
            ..CompileOptions::default()
        },
    )
}

pub fn compile_with(tree: &Tree, options: &CompileOptions) -> Result<CompileResult, CompileError> {
    if options.base_index == 0 {
        return Err(CompileError::InvalidBaseIndex(0));
    }
    if options.base_index > MAX_BASE_INDEX {
        return Err(CompileError::BaseIndexTooLarge(options.base_index));
    }
    debug!(
        base_index = options.base_index,
        nodes = tree.len(),
        "compiling tree"
    );

    let mut walker = Walker {
        tree,
        state: CompileState::new(options.base_index, options.index_unit),
    };
    walker.walk(tree.root())?;
    let result = walker.state.finish()?;

    debug!(
        end_index = result.end_index,
        operations = result.operations.len(),
        notices = result.notices.len(),
        "compiled tree"
    );
    Ok(result)
}

pub(crate) struct Walker<'t> {
    tree: &'t Tree,
    state: CompileState,
}

impl<'t> Walker<'t> {
    fn walk(&mut self, id: NodeId) -> Result<(), CompileError> {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Document
            | NodeKind::Blockquote
            | NodeKind::ListItem
            | NodeKind::Emphasis { .. }
            | NodeKind::Strikethrough
            | NodeKind::Link { .. }
            | NodeKind::TableRow
            | NodeKind::TableCell
            | NodeKind::Unknown => self.walk_children(id),

            NodeKind::Heading { level } => self.heading(id, *level),
            NodeKind::Paragraph => self.paragraph(id),
            NodeKind::List { ordered } => self.list(id, *ordered),
            NodeKind::FencedCodeBlock { lines, .. } | NodeKind::CodeBlock { lines } => {
                self.code_block(lines)
            }
            NodeKind::ThematicBreak => {
                self.thematic_break();
                Ok(())
            }
            NodeKind::Table => self.table(id),
            NodeKind::Image { .. } => {
                self.image(id);
                Ok(())
            }
            NodeKind::HtmlBlock(_) | NodeKind::RawHtml(_) => {
                self.state
                    .notice(NoticeKind::HtmlDropped, tree.get(id).span.clone());
                Ok(())
            }

            NodeKind::Text(text) => {
                self.inline_leaf(id, text);
                Ok(())
            }
            NodeKind::SoftBreak => {
                self.inline_leaf(id, " ");
                Ok(())
            }
            NodeKind::HardBreak => {
                self.inline_leaf(id, "\n");
                Ok(())
            }
            NodeKind::AutoLink { url, text } => {
                self.autolink(id, url, text);
                Ok(())
            }
            NodeKind::CodeSpan(code) => {
                let start = self.state.current();
                self.state.append_unstyled(code);
                let end = self.state.current();
                self.state
                    .emit(start, end, |range| FormatOperation::Code { range })
            }
        }
    }

    fn walk_children(&mut self, id: NodeId) -> Result<(), CompileError> {
        for &child in self.tree.children(id) {
            self.walk(child)?;
        }
        Ok(())
    }

    /// Emit leaf text and one operation per resolved style over it.
    fn inline_leaf(&mut self, id: NodeId, text: &str) {
        let start = self.state.current();
        self.state.append(text);
        let end = self.state.current();
        let Some(range) = span(start, end) else {
            return;
        };
        for style in resolve(self.tree, id) {
            self.state.emit_inline(style.operation(range));
        }
    }

    /// Autolinks carry their own URL, which beats any enclosing link.
    fn autolink(&mut self, id: NodeId, url: &str, text: &str) {
        let start = self.state.current();
        self.state.append(text);
        let end = self.state.current();
        let Some(range) = span(start, end) else {
            return;
        };
        let mut styles = resolve(self.tree, id);
        styles.retain(|style| !matches!(style, InlineStyle::Link(_)));
        if !url.is_empty() {
            styles.push(InlineStyle::Link(url.to_string()));
        }
        for style in styles {
            self.state.emit_inline(style.operation(range));
        }
    }
}

/// Leaf spans come straight from appending, so the cursor cannot have moved
/// backwards; only the empty case needs handling.
fn span(start: u64, end: u64) -> Option<IndexRange> {
    (start < end).then_some(IndexRange { start, end })
}
