//! Inline style resolution for text leaves.

use crate::operation::{FormatOperation, IndexRange};
use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Strikethrough,
    Link(String),
}

impl InlineStyle {
    pub fn operation(&self, range: IndexRange) -> FormatOperation {
        match self {
            InlineStyle::Bold => FormatOperation::Bold { range },
            InlineStyle::Italic => FormatOperation::Italic { range },
            InlineStyle::Strikethrough => FormatOperation::Strikethrough { range },
            InlineStyle::Link(url) => FormatOperation::Link {
                range,
                url: url.clone(),
            },
        }
    }
}

/// Styles that apply to `leaf`, found by walking its ancestors up to the root.
///
/// Emphasis level 1 is italic and any deeper level is bold; there is no
/// combined bold-italic. Each style appears at most once. When several links
/// enclose the leaf the closest one wins, and it is always listed last.
pub fn resolve(tree: &Tree, leaf: NodeId) -> Vec<InlineStyle> {
    let mut styles = Vec::new();
    let mut link: Option<&str> = None;

    for (_, kind) in tree.ancestors(leaf) {
        let style = match kind {
            NodeKind::Emphasis { level: 0 } => continue,
            NodeKind::Emphasis { level: 1 } => InlineStyle::Italic,
            NodeKind::Emphasis { .. } => InlineStyle::Bold,
            NodeKind::Strikethrough => InlineStyle::Strikethrough,
            NodeKind::Link { destination } => {
                if link.is_none() {
                    link = Some(destination);
                }
                continue;
            }
            _ => continue,
        };
        if !styles.contains(&style) {
            styles.push(style);
        }
    }

    if let Some(url) = link.filter(|url| !url.is_empty()) {
        styles.push(InlineStyle::Link(url.to_string()));
    }
    styles
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a chain root -> paragraph -> kinds... -> text and return the leaf.
    fn chain(kinds: Vec<NodeKind>) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let mut parent = tree.push(tree.root(), NodeKind::Paragraph, 0..0);
        for kind in kinds {
            parent = tree.push(parent, kind, 0..0);
        }
        let leaf = tree.push(parent, NodeKind::Text("x".into()), 0..0);
        (tree, leaf)
    }

    #[test]
    fn plain_text_has_no_styles() {
        let (tree, leaf) = chain(vec![]);
        assert!(resolve(&tree, leaf).is_empty());
    }

    #[test]
    fn emphasis_levels() {
        let (tree, leaf) = chain(vec![NodeKind::Emphasis { level: 1 }]);
        assert_eq!(resolve(&tree, leaf), vec![InlineStyle::Italic]);

        let (tree, leaf) = chain(vec![NodeKind::Emphasis { level: 3 }]);
        assert_eq!(resolve(&tree, leaf), vec![InlineStyle::Bold]);
    }

    #[test]
    fn nested_bold_collapses() {
        let (tree, leaf) = chain(vec![
            NodeKind::Emphasis { level: 2 },
            NodeKind::Emphasis { level: 2 },
        ]);
        assert_eq!(resolve(&tree, leaf), vec![InlineStyle::Bold]);
    }

    #[test]
    fn styles_combine_with_link_last() {
        let (tree, leaf) = chain(vec![
            NodeKind::Link {
                destination: "https://example.com".into(),
            },
            NodeKind::Strikethrough,
            NodeKind::Emphasis { level: 2 },
        ]);
        assert_eq!(
            resolve(&tree, leaf),
            vec![
                InlineStyle::Bold,
                InlineStyle::Strikethrough,
                InlineStyle::Link("https://example.com".into()),
            ]
        );
    }

    #[test]
    fn closest_link_wins() {
        let (tree, leaf) = chain(vec![
            NodeKind::Link {
                destination: "outer".into(),
            },
            NodeKind::Link {
                destination: "inner".into(),
            },
        ]);
        assert_eq!(resolve(&tree, leaf), vec![InlineStyle::Link("inner".into())]);
    }

    #[test]
    fn empty_destination_is_ignored() {
        let (tree, leaf) = chain(vec![NodeKind::Link {
            destination: String::new(),
        }]);
        assert!(resolve(&tree, leaf).is_empty());
    }
}
