//! A small retained view tree standing in for the page's DOM.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Removed slots are
//! recycled, so a long page session does not grow the arena without bound.

use crate::aggregator::Outlook;
use crate::timeseries::ClassSeries;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Styling hint carried by a node. The renderer maps these onto colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Expense,
    Income,
    Favorable,
    Unfavorable,
    Neutral,
    Accent,
    Error,
}

impl From<Outlook> for Tone {
    fn from(outlook: Outlook) -> Self {
        match outlook {
            Outlook::Favorable => Self::Favorable,
            Outlook::Neutral => Self::Neutral,
            Outlook::Unfavorable => Self::Unfavorable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub key: Option<String>,
    pub cells: Vec<String>,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Section,
    Container,
    DisclosureButton {
        title: String,
        indicator: String,
        expanded: bool,
    },
    DisclosureContent,
    Text(String),
    Table {
        headers: Vec<String>,
        rows: Vec<TableRow>,
    },
    Chart {
        title: String,
        series: ClassSeries,
    },
    Action {
        label: String,
        href: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNode {
    pub key: Option<String>,
    pub kind: NodeKind,
    pub tone: Option<Tone>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl ViewNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            key: None,
            kind,
            tone: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn toned(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }
}

#[derive(Debug, Default)]
pub struct ViewTree {
    slots: Vec<Option<ViewNode>>,
    free: Vec<usize>,
    created: usize,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without a parent.
    pub fn insert(&mut self, node: ViewNode) -> NodeId {
        self.created += 1;
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                NodeId(idx)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, node: ViewNode) -> NodeId {
        let id = self.insert(node);
        self.append(parent, id);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&ViewNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Drops every descendant of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        let mut stack = children;
        while let Some(child) = stack.pop() {
            if let Some(node) = self.slots.get_mut(child.0).and_then(Option::take) {
                stack.extend(node.children);
                self.free.push(child.0);
            }
        }
    }

    /// Nodes currently alive in the tree.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nodes ever created, including ones since removed.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(ViewNode {
            kind: NodeKind::Text(current),
            ..
        }) = self.get_mut(id)
        {
            *current = text.into();
        }
    }

    pub fn set_indicator(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(ViewNode {
            kind: NodeKind::DisclosureButton { indicator, .. },
            ..
        }) = self.get_mut(id)
        {
            *indicator = text.into();
        }
    }

    /// Flips a disclosure button open or closed, as a user click would.
    pub fn toggle(&mut self, id: NodeId) -> Option<bool> {
        match self.get_mut(id) {
            Some(ViewNode {
                kind: NodeKind::DisclosureButton { expanded, .. },
                ..
            }) => {
                *expanded = !*expanded;
                Some(*expanded)
            }
            _ => None,
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        matches!(
            self.get(id),
            Some(ViewNode {
                kind: NodeKind::DisclosureButton { expanded: true, .. },
                ..
            })
        )
    }

    /// Depth-first search below `root` for the node carrying `key`.
    pub fn find_keyed(&self, root: NodeId, key: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if node.key.as_deref() == Some(key) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Every piece of visible text below `id`, one entry per line.
    pub fn text_lines(&self, id: NodeId) -> Vec<String> {
        let mut lines = Vec::new();
        self.collect_text(id, &mut lines);
        lines
    }

    fn collect_text(&self, id: NodeId, lines: &mut Vec<String>) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => lines.push(text.clone()),
            NodeKind::DisclosureButton {
                title, indicator, ..
            } => lines.push(format!("{} {}", title, indicator)),
            NodeKind::Table { headers, rows } => {
                lines.push(headers.join(" | "));
                lines.extend(rows.iter().map(|r| r.cells.join(" | ")));
            }
            NodeKind::Chart { title, .. } => lines.push(title.clone()),
            NodeKind::Action { label, .. } => lines.push(label.clone()),
            NodeKind::Section | NodeKind::Container | NodeKind::DisclosureContent => {}
        }
        for child in &node.children {
            self.collect_text(*child, lines);
        }
    }
}
