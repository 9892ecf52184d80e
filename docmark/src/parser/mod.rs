//! Adapter from `pulldown-cmark` events to a [`Tree`].
//!
//! Markdown syntax is entirely the external parser's business. This module
//! only maps its event stream onto the node variants the compiler walks.

use std::ops::Range;

use pulldown_cmark::{
    CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser as CmarkParser, Tag,
};

use crate::tree::{NodeId, NodeKind, Tree};

/// Parse markdown source into a tree. Never fails: anything the adapter does
/// not recognise is kept as an `Unknown` container or dropped.
pub fn parse(source: &str) -> Tree {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);

    let mut builder = TreeBuilder::new();
    for (event, range) in parser.into_offset_iter() {
        builder.process(event, range);
    }
    builder.finish()
}

// ---------------------------------------------------------------------------
// Builder state
// ---------------------------------------------------------------------------

struct TreeBuilder {
    tree: Tree,
    /// Open containers. Innermost = current parent.
    stack: Vec<OpenNode>,
    /// Raw text being collected for a code or HTML block.
    pending: Option<PendingBlock>,
}

struct OpenNode {
    id: NodeId,
    /// A paragraph the builder opened itself around inline content placed
    /// directly in a list item (tight lists).
    synthetic: bool,
    /// Leaf node whose textual children are already captured in its kind.
    absorb: bool,
}

struct PendingBlock {
    kind: PendingKind,
    text: String,
    span: Range<usize>,
}

enum PendingKind {
    Fenced(Option<String>),
    Indented,
    Html,
}

impl TreeBuilder {
    fn new() -> Self {
        let tree = Tree::new();
        let root = tree.root();
        TreeBuilder {
            tree,
            stack: vec![OpenNode {
                id: root,
                synthetic: false,
                absorb: false,
            }],
            pending: None,
        }
    }

    fn process(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.pending.is_some() {
            self.process_pending(event, range);
            return;
        }

        if self.stack.last().is_some_and(|open| open.absorb) {
            if let Event::End(_) = event {
                self.close(range.end);
            }
            return;
        }

        match event {
            Event::Start(tag) => self.open(tag, range),
            Event::End(_) => self.close(range.end),
            Event::Text(s) => self.inline_leaf(NodeKind::Text(s.into_string()), range),
            Event::Code(s) => self.inline_leaf(NodeKind::CodeSpan(s.into_string()), range),
            Event::SoftBreak => self.inline_leaf(NodeKind::SoftBreak, range),
            Event::HardBreak => self.inline_leaf(NodeKind::HardBreak, range),
            Event::InlineHtml(s) => self.inline_leaf(NodeKind::RawHtml(s.into_string()), range),
            Event::Html(s) => self.block_leaf(NodeKind::HtmlBlock(s.into_string()), range),
            Event::Rule => self.block_leaf(NodeKind::ThematicBreak, range),
            // Footnote references, task markers and math are not part of the
            // node set; drop them.
            _ => {}
        }
    }

    fn process_pending(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Text(s) | Event::Html(s) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.text.push_str(&s);
                }
            }
            Event::End(_) => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                let lines: Vec<String> = pending
                    .text
                    .split_inclusive('\n')
                    .map(str::to_string)
                    .collect();
                let kind = match pending.kind {
                    PendingKind::Fenced(info) => NodeKind::FencedCodeBlock { info, lines },
                    PendingKind::Indented => NodeKind::CodeBlock { lines },
                    PendingKind::Html => NodeKind::HtmlBlock(pending.text),
                };
                let parent = self.current();
                self.tree
                    .push(parent, kind, pending.span.start..range.end.max(pending.span.end));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let kind = match tag {
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading { level, .. } => NodeKind::Heading {
                level: heading_level_to_u8(&level),
            },
            Tag::BlockQuote(_) => NodeKind::Blockquote,
            Tag::CodeBlock(kind) => {
                let kind = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let info = info.trim().to_string();
                        PendingKind::Fenced(if info.is_empty() { None } else { Some(info) })
                    }
                    CodeBlockKind::Indented => PendingKind::Indented,
                };
                self.start_pending(kind, range);
                return;
            }
            Tag::HtmlBlock => {
                self.start_pending(PendingKind::Html, range);
                return;
            }
            Tag::List(start) => NodeKind::List {
                ordered: start.is_some(),
            },
            Tag::Item => NodeKind::ListItem,
            Tag::Table(_) => NodeKind::Table,
            Tag::TableHead | Tag::TableRow => NodeKind::TableRow,
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis { level: 1 },
            Tag::Strong => NodeKind::Emphasis { level: 2 },
            Tag::Strikethrough => NodeKind::Strikethrough,
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => match link_type {
                LinkType::Autolink => NodeKind::AutoLink {
                    url: dest_url.to_string(),
                    text: dest_url.to_string(),
                },
                LinkType::Email => NodeKind::AutoLink {
                    url: format!("mailto:{}", dest_url),
                    text: dest_url.to_string(),
                },
                _ => NodeKind::Link {
                    destination: dest_url.to_string(),
                },
            },
            Tag::Image { dest_url, .. } => NodeKind::Image {
                destination: dest_url.to_string(),
            },
            _ => NodeKind::Unknown,
        };

        let absorb = matches!(kind, NodeKind::AutoLink { .. });
        let parent = if kind.is_block() {
            self.block_parent()
        } else {
            self.inline_parent(range.start)
        };
        let id = self.tree.push(parent, kind, range);
        self.stack.push(OpenNode {
            id,
            synthetic: false,
            absorb,
        });
    }

    fn close(&mut self, end: usize) {
        self.close_synthetic();
        // Never pop the document root, even on an unbalanced stream.
        if self.stack.len() > 1 {
            if let Some(open) = self.stack.pop() {
                self.tree.extend_span(open.id, end);
            }
        }
    }

    fn start_pending(&mut self, kind: PendingKind, span: Range<usize>) {
        self.close_synthetic();
        self.pending = Some(PendingBlock {
            kind,
            text: String::new(),
            span,
        });
    }

    fn inline_leaf(&mut self, kind: NodeKind, range: Range<usize>) {
        let parent = self.inline_parent(range.start);
        self.tree.extend_span(parent, range.end);
        self.tree.push(parent, kind, range);
    }

    fn block_leaf(&mut self, kind: NodeKind, range: Range<usize>) {
        let parent = self.block_parent();
        self.tree.push(parent, kind, range);
    }

    fn current(&self) -> NodeId {
        self.stack.last().map(|open| open.id).unwrap_or(self.tree.root())
    }

    /// Parent for inline content. Inline content directly inside a list item
    /// gets wrapped in a synthetic paragraph.
    fn inline_parent(&mut self, start: usize) -> NodeId {
        let current = self.current();
        if matches!(self.tree.kind(current), NodeKind::ListItem) {
            let id = self.tree.push(current, NodeKind::Paragraph, start..start);
            self.stack.push(OpenNode {
                id,
                synthetic: true,
                absorb: false,
            });
            return id;
        }
        current
    }

    fn block_parent(&mut self) -> NodeId {
        self.close_synthetic();
        self.current()
    }

    fn close_synthetic(&mut self) {
        while self.stack.last().is_some_and(|open| open.synthetic) {
            self.stack.pop();
        }
    }

    fn finish(mut self) -> Tree {
        if let Some(pending) = self.pending.take() {
            // Unterminated block at end of input: keep what was collected.
            let end = pending.span.end;
            self.pending = Some(pending);
            self.process_pending(Event::End(pulldown_cmark::TagEnd::CodeBlock), end..end);
        }
        self.tree
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
