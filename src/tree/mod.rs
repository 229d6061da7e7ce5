//! Schema tree inferred from the sheet's header rows.
//!
//! If a message description is viewed as a tree, every spreadsheet column is
//! the path from the root to one leaf. Reading the columns left to right and
//! following their paths rebuilds the tree, including how often each group
//! repeats.
//!
//! The tree moves through three phases, each its own type:
//!
//! - [`SchemaBuilder`] ingests column declarations,
//! - [`FinalizedSchema`] has field numbers assigned and can render proto text,
//! - [`BoundSchema`] carries compiled field descriptors and transcribes rows.

mod bind;
mod finalize;
mod ingest;
pub mod type_spec;

use std::fmt;

use itertools::Itertools;
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use serde::Serialize;

use crate::error::column_letter;

pub use bind::BoundSchema;
pub use finalize::FinalizedSchema;
pub use ingest::SchemaBuilder;
pub use type_spec::{Features, TypeSpec, TypeSpecError};

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Scalar or list-of-scalar field fed by one or more columns.
    Leaf { columns: Vec<usize> },
    /// Nested message.
    Group { children: Vec<NodeId> },
}

/// How a cell is coerced before it is written into a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionKind {
    Integer,
    Float,
    Text,
    Message,
}

impl CoercionKind {
    pub fn of(kind: &Kind) -> Self {
        match kind {
            Kind::Double | Kind::Float => CoercionKind::Float,
            Kind::String | Kind::Bytes => CoercionKind::Text,
            Kind::Message(_) => CoercionKind::Message,
            _ => CoercionKind::Integer,
        }
    }
}

/// Field descriptor attached to a node, either from a previous compile, a
/// common type, or (after binding) the freshly compiled schema.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub descriptor: FieldDescriptor,
    pub coercion: CoercionKind,
}

impl FieldBinding {
    pub fn new(descriptor: FieldDescriptor) -> Self {
        let coercion = CoercionKind::of(&descriptor.kind());
        FieldBinding {
            descriptor,
            coercion,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub name: String,
    pub spec: TypeSpec,
    pub comment: String,
    pub is_common_type: bool,
    pub repeated_count: usize,
    pub is_repeated: bool,
    pub field_number: Option<u32>,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Message descriptor for groups whose layout is already known.
    pub message: Option<MessageDescriptor>,
    pub field: Option<FieldBinding>,
}

impl SchemaNode {
    fn new(name: &str, spec: TypeSpec, comment: &str, kind: NodeKind) -> Self {
        let is_repeated = spec.features.repeated;
        SchemaNode {
            name: name.to_string(),
            spec,
            comment: comment.to_string(),
            is_common_type: false,
            repeated_count: 1,
            is_repeated,
            field_number: None,
            kind,
            parent: None,
            message: None,
            field: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.spec.type_name
    }

    pub fn features(&self) -> Features {
        self.spec.features
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    pub fn columns(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Leaf { columns } => columns,
            NodeKind::Group { .. } => &[],
        }
    }

    /// Whether the generated field carries the `repeated` label.
    pub fn is_list(&self) -> bool {
        self.is_repeated || self.repeated_count > 1
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.spec.type_name.is_empty() {
            write!(f, "[{}]", self.spec.type_name)?;
        }
        if let Some(number) = self.field_number {
            write!(f, "{{order={number}}}")?;
        }
        if self.is_list() {
            write!(f, "{{repeated={}}}", self.repeated_count)?;
        }
        let columns = self.columns();
        if !columns.is_empty() {
            write!(
                f,
                "{{{}}}",
                columns.iter().map(|c| column_letter(*c)).join(" ")
            )?;
        }
        Ok(())
    }
}

/// Arena holding every node of one sheet's schema.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    nodes: Vec<SchemaNode>,
    root: NodeId,
}

impl SchemaTree {
    pub(crate) fn new(root_name: &str, root_type: &str, comment: &str) -> Self {
        let spec = TypeSpec {
            type_name: root_type.to_string(),
            ..TypeSpec::default()
        };
        let root = SchemaNode::new(
            root_name,
            spec,
            comment,
            NodeKind::Group {
                children: Vec::new(),
            },
        );
        SchemaTree {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// Number of field nodes, excluding the root.
    pub fn field_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub(crate) fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.node(*id).name == name)
    }

    /// Appends `node` under `parent`. The parent must be a group.
    pub(crate) fn push_child(&mut self, parent: NodeId, mut node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        if let NodeKind::Group { children } = &mut self.node_mut(parent).kind {
            children.push(id);
        }
        id
    }

    pub(crate) fn is_first_child(&self, id: NodeId) -> bool {
        self.node(id)
            .parent
            .is_some_and(|p| self.children(p).first() == Some(&id))
    }

    pub(crate) fn is_last_child(&self, id: NodeId) -> bool {
        self.node(id)
            .parent
            .is_some_and(|p| self.children(p).last() == Some(&id))
    }

    /// Dotted path from the root's children down to `id`.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.name.as_str());
            }
            current = node.parent;
        }
        segments.iter().rev().join(".")
    }

    /// Depth-first (pre-order) walk yielding each node with its depth.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            for child in self.children(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    /// Indented rendering, one node per line.
    pub fn dump(&self) -> String {
        self.walk()
            .into_iter()
            .map(|(id, depth)| format!("{}{}", "    ".repeat(depth), self.node(id)))
            .join("\n")
    }

    /// Flat summary of every non-root node, used by `inspect`.
    pub fn summary(&self) -> Vec<NodeSummary> {
        self.walk()
            .into_iter()
            .filter(|(id, _)| *id != self.root)
            .map(|(id, _)| {
                let node = self.node(id);
                NodeSummary {
                    path: self.path(id),
                    type_name: node.spec.type_name.clone(),
                    field_number: node.field_number,
                    label: if node.is_list() { "repeated" } else { "optional" }.to_string(),
                    repeated_count: node.repeated_count,
                    common: node.is_common_type,
                    columns: node.columns().iter().map(|c| column_letter(*c)).collect(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeSummary {
    pub path: String,
    pub type_name: String,
    pub field_number: Option<u32>,
    pub label: String,
    pub repeated_count: usize,
    pub common: bool,
    pub columns: Vec<String>,
}
