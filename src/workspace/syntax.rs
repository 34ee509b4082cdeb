use super::DocumentId;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Node, TreeCursor};

/// Half-open byte range into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn of(node: Node<'_>) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    pub fn contains(&self, other: TextSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A pointer back into source: which document, which range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SyntaxRef {
    pub document: DocumentId,
    pub span: TextSpan,
}

impl SyntaxRef {
    pub fn new(document: DocumentId, node: Node<'_>) -> Self {
        Self {
            document,
            span: TextSpan::of(node),
        }
    }
}

/// Resolved source location with 1-based line and column numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub document: DocumentId,
    pub path: Arc<str>,
    pub span: TextSpan,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Location {
    pub fn from_node(document: DocumentId, path: Arc<str>, node: Node<'_>) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            document,
            path,
            span: TextSpan::of(node),
            start_line: start.row + 1,
            start_column: start.column + 1,
            end_line: end.row + 1,
            end_column: end.column + 1,
        }
    }

    pub fn file_name(&self) -> &str {
        Path::new(&*self.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.path)
    }

    /// Ordering key used to make fan-out results deterministic.
    pub fn sort_key(&self) -> (&str, usize, usize) {
        (&self.path, self.span.start, self.span.end)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name(), self.start_line)
    }
}

pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .trim()
}

/// Outermost node whose range equals the smallest node covering `span`.
pub fn find_node(root: Node<'_>, span: TextSpan) -> Option<Node<'_>> {
    let mut node = root.named_descendant_for_byte_range(span.start, span.end)?;
    while let Some(parent) = node.parent() {
        if parent.start_byte() != node.start_byte() || parent.end_byte() != node.end_byte() {
            break;
        }
        node = parent;
    }
    Some(node)
}

/// Innermost named node at a byte offset, the analogue of a token's parent.
pub fn token_at(root: Node<'_>, offset: usize) -> Option<Node<'_>> {
    root.named_descendant_for_byte_range(offset, offset)
}

pub fn ancestors_and_self(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::successors(Some(node), |current| current.parent())
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn first_child_of_kind<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()));
    found
}

pub fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

/// Modifier keywords (`public`, `static`, `partial`, ...) attached to a declaration.
pub fn modifiers(node: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == "modifier")
        .map(|child| node_text(child, source).to_string())
        .collect()
}

/// Lazy pre-order walk over the named descendants of a node, excluding the node itself.
pub struct Descendants<'tree> {
    cursor: TreeCursor<'tree>,
    started: bool,
    done: bool,
}

impl<'tree> Iterator for Descendants<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Node<'tree>> {
        loop {
            if self.done {
                return None;
            }
            if !self.started {
                self.started = true;
                if !self.cursor.goto_first_child() {
                    self.done = true;
                    return None;
                }
            } else if !self.cursor.goto_first_child() {
                loop {
                    if self.cursor.goto_next_sibling() {
                        break;
                    }
                    if !self.cursor.goto_parent() {
                        self.done = true;
                        return None;
                    }
                }
            }
            let node = self.cursor.node();
            if node.is_named() {
                return Some(node);
            }
        }
    }
}

pub fn descendants(node: Node<'_>) -> Descendants<'_> {
    Descendants {
        cursor: node.walk(),
        started: false,
        done: false,
    }
}

pub fn descendants_and_self(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::once(node).chain(descendants(node))
}
