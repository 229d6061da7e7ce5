use std::collections::BTreeSet;

use super::{NodeId, SchemaTree};
use crate::error::{ConvertError, ConvertResult};

/// Tree with every field numbered and repetition flags settled.
#[derive(Debug, Clone)]
pub struct FinalizedSchema {
    pub(super) tree: SchemaTree,
    imports: BTreeSet<String>,
}

impl FinalizedSchema {
    pub(super) fn finalize(mut tree: SchemaTree, imports: BTreeSet<String>) -> ConvertResult<Self> {
        let root = tree.root();
        if tree.children(root).is_empty() {
            return Err(ConvertError::Structural {
                sheet: tree.node(root).type_name().to_string(),
                message: "no column declares a field".to_string(),
            });
        }
        check_and_finish(&mut tree, root);
        Ok(FinalizedSchema { tree, imports })
    }

    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Proto files of the common types the sheet references.
    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Name of the root message (the sheet identifier).
    pub fn root_type(&self) -> &str {
        self.tree.node(self.tree.root()).type_name()
    }
}

fn check_and_finish(tree: &mut SchemaTree, group: NodeId) {
    let children = tree.children(group).to_vec();
    let mut next_number = children
        .iter()
        .filter_map(|child| tree.node(*child).field_number)
        .max()
        .unwrap_or(0)
        + 1;
    for child in children {
        let node = tree.node_mut(child);
        if node.field_number.is_none() {
            node.field_number = Some(next_number);
            next_number += 1;
        }
        if node.repeated_count > 1 {
            node.is_repeated = true;
        }
        if node.is_group() {
            check_and_finish(tree, child);
        }
    }
}
