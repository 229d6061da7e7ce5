use prost_reflect::MessageDescriptor;

use super::{CoercionKind, FieldBinding, FinalizedSchema, NodeId, SchemaTree};
use crate::{
    data::TimeBase,
    error::{ConvertError, ConvertResult},
};

/// Tree whose nodes carry the compiled schema's field descriptors.
///
/// Never mutated after binding, so one instance can serve any number of rows
/// (and threads).
#[derive(Debug, Clone)]
pub struct BoundSchema {
    pub(crate) tree: SchemaTree,
    pub(crate) message: MessageDescriptor,
    pub(crate) timezone: TimeBase,
}

impl FinalizedSchema {
    /// Attaches field metadata from `message`, the compiled root message.
    pub fn bind(self, message: &MessageDescriptor) -> ConvertResult<BoundSchema> {
        let mut tree = self.tree;
        let root = tree.root();
        recheck_field_desc(&mut tree, root, message)?;
        tree.node_mut(root).message = Some(message.clone());
        Ok(BoundSchema {
            tree,
            message: message.clone(),
            timezone: TimeBase::default(),
        })
    }
}

impl BoundSchema {
    /// Time zone used to turn `DateTime` cells into epoch seconds.
    pub fn with_timezone(mut self, timezone: TimeBase) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn message(&self) -> &MessageDescriptor {
        &self.message
    }
}

fn recheck_field_desc(
    tree: &mut SchemaTree,
    group: NodeId,
    message: &MessageDescriptor,
) -> ConvertResult<()> {
    for child in tree.children(group).to_vec() {
        let path = tree.path(child);
        let node = tree.node(child);
        let field = message.get_field_by_name(&node.name).ok_or_else(|| {
            ConvertError::mismatch(
                &path,
                format!("field is missing from compiled message {}", message.full_name()),
            )
        })?;
        if field.is_list() != node.is_list() {
            return Err(ConvertError::mismatch(
                &path,
                format!(
                    "compiled field is {} but the sheet declares it {}",
                    if field.is_list() { "repeated" } else { "singular" },
                    if node.is_list() { "repeated" } else { "singular" },
                ),
            ));
        }
        let binding = FieldBinding::new(field.clone());

        if node.is_group() {
            let nested = field.kind().as_message().cloned().ok_or_else(|| {
                ConvertError::mismatch(&path, "compiled field is not a message")
            })?;
            if !node.is_common_type && nested.name() != node.type_name() {
                return Err(ConvertError::mismatch(
                    &path,
                    format!(
                        "nested type {} is missing from compiled message {}",
                        node.type_name(),
                        message.full_name()
                    ),
                ));
            }
            let node = tree.node_mut(child);
            node.message = Some(nested.clone());
            node.field = Some(binding);
            recheck_field_desc(tree, child, &nested)?;
        } else {
            if binding.coercion == CoercionKind::Message {
                return Err(ConvertError::mismatch(
                    &path,
                    format!(
                        "message field {} cannot be filled from a single column",
                        field.full_name()
                    ),
                ));
            }
            tree.node_mut(child).field = Some(binding);
        }
    }
    Ok(())
}
