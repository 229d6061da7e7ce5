use std::collections::BTreeSet;

use log::trace;
use prost_reflect::{Kind, MessageDescriptor};

use super::{
    FieldBinding, FinalizedSchema, NodeId, NodeKind, SchemaNode, SchemaTree, TypeSpec,
};
use crate::{
    error::{ConvertError, ConvertResult},
    registry::CommonTypes,
};

/// Accumulates column declarations into a schema tree.
pub struct SchemaBuilder<'a> {
    tree: SchemaTree,
    registry: &'a CommonTypes,
    imports: BTreeSet<String>,
}

/// One column's header cells, carried down the path while ingesting.
struct Column<'c> {
    path: &'c str,
    comment: &'c str,
    index: usize,
}

impl<'a> SchemaBuilder<'a> {
    /// Starts a tree whose root message is named after `sheet`.
    ///
    /// `previous` is the sheet's message from an earlier compile; when given,
    /// fields that already existed keep their numbers.
    pub fn new(
        sheet: &str,
        previous: Option<MessageDescriptor>,
        registry: &'a CommonTypes,
    ) -> Self {
        let mut tree = SchemaTree::new(&sheet.to_lowercase(), sheet, sheet);
        let root = tree.root();
        tree.node_mut(root).message = previous;
        SchemaBuilder {
            tree,
            registry,
            imports: BTreeSet::new(),
        }
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Declares one column. `path` is dotted (`reward.item.id`) and
    /// `type_spec` carries one `|`-separated annotation per path segment,
    /// any of which may be omitted for segments already declared.
    pub fn append(
        &mut self,
        path: &str,
        type_spec: &str,
        comment: &str,
        column: usize,
    ) -> ConvertResult<()> {
        if path.is_empty() {
            return Ok(());
        }
        let header = Column {
            path,
            comment,
            index: column,
        };
        let root = self.tree.root();
        self.append_at(root, path, type_spec, &header)
    }

    pub fn finish(self) -> ConvertResult<FinalizedSchema> {
        FinalizedSchema::finalize(self.tree, self.imports)
    }

    fn append_at(
        &mut self,
        parent: NodeId,
        path: &str,
        type_spec: &str,
        column: &Column<'_>,
    ) -> ConvertResult<()> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head.trim(), Some(rest)),
            None => (path.trim(), None),
        };
        let (head_type, rest_type) = match type_spec.split_once('|') {
            Some((head_type, rest_type)) => (head_type, Some(rest_type)),
            None => (type_spec, None),
        };
        let spec = TypeSpec::parse(head_type)
            .map_err(|err| ConvertError::configuration(column.index, column.path, err.to_string()))?;

        let (node, consumed) = match self.tree.child_by_name(parent, head) {
            None => {
                if !self.tree.node(parent).is_common_type && spec.type_name.is_empty() {
                    return Err(ConvertError::configuration(
                        column.index,
                        column.path,
                        format!("'{head}' is not a common type but declares no type name"),
                    ));
                }
                let node = self.create_child(parent, head, spec, rest.is_none(), column)?;
                (node, true)
            }
            Some(existing) => {
                let consumed = self.tree.node(existing).type_name() == spec.type_name;
                self.check_kind(existing, rest.is_none(), column)?;
                if rest.is_none() && self.tree.is_first_child(existing) {
                    self.bump_repetition(existing);
                }
                (existing, consumed)
            }
        };

        let remaining = if consumed {
            rest_type.unwrap_or("")
        } else {
            type_spec
        };

        match rest {
            Some(rest) => self.append_at(node, rest, remaining, column),
            None => {
                if remaining.split('|').any(|segment| !segment.trim().is_empty()) {
                    return Err(ConvertError::configuration(
                        column.index,
                        column.path,
                        format!("'{head}' is a leaf but type spec '{remaining}' is left over"),
                    ));
                }
                if let NodeKind::Leaf { columns } = &mut self.tree.node_mut(node).kind {
                    columns.push(column.index);
                }
                Ok(())
            }
        }
    }

    fn check_kind(&self, id: NodeId, terminal: bool, column: &Column<'_>) -> ConvertResult<()> {
        let node = self.tree.node(id);
        match (terminal, node.is_group()) {
            (true, true) => Err(ConvertError::configuration(
                column.index,
                column.path,
                format!("'{}' is a message and needs a sub-field path", node.name),
            )),
            (false, false) => Err(ConvertError::configuration(
                column.index,
                column.path,
                format!("'{}' is a scalar field and cannot have sub-fields", node.name),
            )),
            _ => Ok(()),
        }
    }

    /// Re-declaring the first field of a group starts a new instance. Walk up
    /// from that field to the first node that may repeat and is the last child
    /// of its parent; that node is the repetition boundary.
    fn bump_repetition(&mut self, start: NodeId) {
        let mut boundary = start;
        while let Some(parent) = self.tree.node(boundary).parent {
            let node = self.tree.node(boundary);
            if !node.features().no_repeated && self.tree.is_last_child(boundary) {
                break;
            }
            boundary = parent;
        }
        let node = self.tree.node_mut(boundary);
        node.repeated_count += 1;
        trace!("'{}' now repeats {} time(s)", node.name, node.repeated_count);
    }

    fn create_child(
        &mut self,
        parent: NodeId,
        name: &str,
        spec: TypeSpec,
        is_leaf: bool,
        column: &Column<'_>,
    ) -> ConvertResult<NodeId> {
        let parent_node = self.tree.node(parent);
        let parent_common = parent_node.is_common_type;
        let parent_message = parent_node.message.clone();
        let parent_type = parent_node.type_name().to_string();

        let kind = if is_leaf {
            NodeKind::Leaf {
                columns: Vec::new(),
            }
        } else {
            NodeKind::Group {
                children: Vec::new(),
            }
        };
        let mut node = SchemaNode::new(name, spec, column.comment, kind);
        node.is_common_type = parent_common;

        if !parent_common && !node.type_name().is_empty() {
            if let Some(common) = self.registry.lookup(node.type_name()) {
                node.is_common_type = true;
                node.message = Some(common.descriptor);
                self.imports.insert(common.file);
            }
        } else if parent_common && !is_leaf {
            let field = parent_message
                .as_ref()
                .and_then(|message| message.get_field_by_name(name));
            match field.as_ref().map(|f| f.kind()) {
                Some(Kind::Message(message)) => node.message = Some(message),
                Some(_) => {
                    return Err(ConvertError::mismatch(
                        column.path,
                        format!("'{name}' of common type '{parent_type}' is not a message"),
                    ));
                }
                None => {
                    return Err(ConvertError::mismatch(
                        column.path,
                        format!("'{name}' is not a field of common type '{parent_type}'"),
                    ));
                }
            }
        }

        if let Some(message) = &parent_message {
            if !is_leaf && !node.is_common_type {
                node.message = message
                    .child_messages()
                    .find(|nested| nested.name() == node.type_name());
            }
            match message.get_field_by_name(name) {
                Some(field) => {
                    node.field_number = Some(field.number());
                    if parent_common && field.is_list() {
                        node.is_repeated = true;
                    }
                    node.field = Some(FieldBinding::new(field));
                }
                None if parent_common => {
                    return Err(ConvertError::mismatch(
                        column.path,
                        format!("'{name}' is not a field of common type '{parent_type}'"),
                    ));
                }
                None => {}
            }
        }

        Ok(self.tree.push_child(parent, node))
    }
}
