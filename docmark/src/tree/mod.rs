use std::fmt;
use std::ops::Range;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A parsed markdown document, stored as an arena of nodes.
///
/// Nodes never own each other: `children` and `parent` are plain indices into
/// the arena, so a leaf can walk its ancestor chain without the tree carrying
/// any shared or mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

/// A single node in the markdown tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Byte span in the markdown source. Empty for hand-built trees.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,

    // Block-level
    Heading {
        level: u8,
    },
    Paragraph,
    List {
        ordered: bool,
    },
    ListItem,
    FencedCodeBlock {
        info: Option<String>,
        lines: Vec<String>,
    },
    CodeBlock {
        lines: Vec<String>,
    },
    ThematicBreak,
    Blockquote,
    Table,
    TableRow,
    TableCell,
    HtmlBlock(String),

    // Inline
    Text(String),
    SoftBreak,
    HardBreak,
    /// Level 1 is `*em*`, level 2 and above is `**strong**`.
    Emphasis {
        level: u8,
    },
    Strikethrough,
    Link {
        destination: String,
    },
    AutoLink {
        url: String,
        text: String,
    },
    CodeSpan(String),
    Image {
        destination: String,
    },
    RawHtml(String),

    /// A container the parser adapter could not classify. Its children are
    /// still walked.
    Unknown,
}

impl NodeKind {
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Heading { .. }
                | NodeKind::Paragraph
                | NodeKind::List { .. }
                | NodeKind::ListItem
                | NodeKind::FencedCodeBlock { .. }
                | NodeKind::CodeBlock { .. }
                | NodeKind::ThematicBreak
                | NodeKind::Blockquote
                | NodeKind::Table
                | NodeKind::TableRow
                | NodeKind::TableCell
                | NodeKind::HtmlBlock(_)
        )
    }

    fn label(&self) -> String {
        match self {
            NodeKind::Document => "Document".into(),
            NodeKind::Heading { level } => format!("Heading({})", level),
            NodeKind::Paragraph => "Paragraph".into(),
            NodeKind::List { ordered: true } => "List(ordered)".into(),
            NodeKind::List { ordered: false } => "List".into(),
            NodeKind::ListItem => "ListItem".into(),
            NodeKind::FencedCodeBlock { info, lines } => match info {
                Some(info) => format!("FencedCodeBlock({}, {} lines)", info, lines.len()),
                None => format!("FencedCodeBlock({} lines)", lines.len()),
            },
            NodeKind::CodeBlock { lines } => format!("CodeBlock({} lines)", lines.len()),
            NodeKind::ThematicBreak => "ThematicBreak".into(),
            NodeKind::Blockquote => "Blockquote".into(),
            NodeKind::Table => "Table".into(),
            NodeKind::TableRow => "TableRow".into(),
            NodeKind::TableCell => "TableCell".into(),
            NodeKind::HtmlBlock(_) => "HtmlBlock".into(),
            NodeKind::Text(s) => format!("Text({:?})", s),
            NodeKind::SoftBreak => "SoftBreak".into(),
            NodeKind::HardBreak => "HardBreak".into(),
            NodeKind::Emphasis { level } => format!("Emphasis({})", level),
            NodeKind::Strikethrough => "Strikethrough".into(),
            NodeKind::Link { destination } => format!("Link({})", destination),
            NodeKind::AutoLink { url, .. } => format!("AutoLink({})", url),
            NodeKind::CodeSpan(s) => format!("CodeSpan({:?})", s),
            NodeKind::Image { destination } => format!("Image({})", destination),
            NodeKind::RawHtml(_) => "RawHtml".into(),
            NodeKind::Unknown => "Unknown".into(),
        }
    }
}

impl Tree {
    /// A tree holding only the `Document` root.
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                span: 0..0,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new node as the last child of `parent`.
    pub fn push(&mut self, parent: NodeId, kind: NodeKind, span: Range<usize>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            span,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes[id.0].parent,
        }
    }

    /// Widen a node's source span. Used by the parser adapter when a
    /// synthetic container grows with its content.
    pub(crate) fn extend_span(&mut self, id: NodeId, end: usize) {
        let span = &mut self.nodes[id.0].span;
        if end > span.end {
            span.end = end;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(depth), self.kind(id).label())?;
        for &child in self.children(id) {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (NodeId, &'a NodeKind);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id);
        self.next = node.parent;
        Some((id, &node.kind))
    }
}

/// Indented outline, one node per line.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_to_root() {
        let mut tree = Tree::new();
        let para = tree.push(tree.root(), NodeKind::Paragraph, 0..0);
        let strong = tree.push(para, NodeKind::Emphasis { level: 2 }, 0..0);
        let text = tree.push(strong, NodeKind::Text("x".into()), 0..0);

        let chain: Vec<NodeId> = tree.ancestors(text).map(|(id, _)| id).collect();
        assert_eq!(chain, vec![strong, para, tree.root()]);
        assert!(tree.ancestors(tree.root()).next().is_none());
    }

    #[test]
    fn outline_indents_children() {
        let mut tree = Tree::new();
        let heading = tree.push(tree.root(), NodeKind::Heading { level: 2 }, 0..0);
        tree.push(heading, NodeKind::Text("Title".into()), 0..0);

        assert_eq!(
            tree.to_string(),
            "Document\n  Heading(2)\n    Text(\"Title\")\n"
        );
    }
}
