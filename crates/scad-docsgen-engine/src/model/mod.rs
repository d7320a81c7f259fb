//! # Document Model
//!
//! Every parsed source file becomes one tree of [`Node`]s. All trees live in a
//! single arena ([`Document`]) and refer to each other through [`NodeId`]
//! indices, so parent links are plain back-references rather than owners.

mod dump;
mod node;

use std::fmt;

use serde::Serialize;

pub use dump::{NodeData, dump_tree};
pub use node::*;

/// Where a block was declared: source path plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    pub file: String,
    pub line: usize,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Arena holding the trees of every parsed file.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    files: Vec<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the root node of a new file tree.
    pub fn add_file(&mut self, node: Node) -> NodeId {
        let id = self.push(node);
        self.files.push(id);
        id
    }

    /// Appends `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// File roots in parse order.
    pub fn files(&self) -> &[NodeId] {
        &self.files
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Walks parent links up to the file root.
    pub fn file_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            cur = parent;
        }
        cur
    }

    pub fn file_info_of(&self, id: NodeId) -> Option<&FileInfo> {
        self.node(self.file_of(id)).as_file()
    }

    /// Children whose title is exactly one of `titles`.
    pub fn children_titled<'a>(
        &'a self,
        id: NodeId,
        titles: &'a [&'a str],
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| titles.contains(&self.node(*c).title.as_str()))
    }

    /// Children reordered for display: `front` groups first, then everything
    /// unmatched in insertion order, then `back` groups. Groups match by
    /// title prefix. The stored order is never changed.
    pub fn sorted_children(
        &self,
        id: NodeId,
        front: &[&[&str]],
        back: &[&[&str]],
    ) -> Vec<NodeId> {
        let children = self.children(id);
        let starts = |child: NodeId, prefix: &str| self.node(child).title.starts_with(prefix);
        let mut out = Vec::with_capacity(children.len());
        let take_groups = |groups: &[&[&str]], out: &mut Vec<NodeId>| {
            for group in groups {
                for prefix in *group {
                    out.extend(children.iter().copied().filter(|c| starts(*c, prefix)));
                }
            }
        };
        take_groups(front, &mut out);
        out.extend(children.iter().copied().filter(|c| {
            !front
                .iter()
                .chain(back.iter())
                .flat_map(|g| g.iter())
                .any(|prefix| starts(*c, prefix))
        }));
        take_groups(back, &mut out);
        out
    }

    /// Every item node, in declaration order.
    pub fn items(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.node(*id).is_item())
    }

    pub fn data(&self) -> Vec<NodeData> {
        self.files.iter().map(|f| NodeData::of(self, *f)).collect()
    }
}
