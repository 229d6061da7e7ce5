//! Row transcription: writes one spreadsheet row into a record.

use prost_reflect::{DynamicMessage, FieldDescriptor, MessageDescriptor, ReflectMessage, Value};

use crate::{
    data::coerce_cell,
    error::{ConvertError, ConvertResult, column_letter},
    tree::{BoundSchema, FieldBinding, NodeId, SchemaNode},
};

/// The row being transcribed, with its 1-based spreadsheet row number.
struct RowContext<'r> {
    cells: &'r [String],
    row_number: usize,
}

impl BoundSchema {
    /// Creates an empty record of the sheet's root message.
    pub fn new_record(&self) -> DynamicMessage {
        DynamicMessage::new(self.message.clone())
    }

    /// Fills `record` from `cells`. Blank cells leave their fields unset.
    pub fn transcribe_row(
        &self,
        record: &mut DynamicMessage,
        cells: &[String],
        row_number: usize,
    ) -> ConvertResult<()> {
        let row = RowContext { cells, row_number };
        self.parse_data(self.tree.root(), record, &row, 0)
    }

    fn parse_data(
        &self,
        group: NodeId,
        item: &mut DynamicMessage,
        row: &RowContext<'_>,
        repetition: usize,
    ) -> ConvertResult<()> {
        for child in self.tree.children(group) {
            let node = self.tree.node(*child);
            let binding = self.binding(*child)?;
            let field = &binding.descriptor;

            if node.is_repeated {
                let count = node.repeated_count;
                for num in repetition * count..repetition * count + count {
                    if node.is_group() {
                        let no_key = node.features().no_key;
                        if !no_key && self.first_leaf_is_default(*child, row, num)? {
                            continue;
                        }
                        let mut entry = DynamicMessage::new(self.nested(*child)?);
                        self.parse_data(*child, &mut entry, row, num)?;
                        if no_key && is_all_default(&entry) {
                            continue;
                        }
                        push_value(item, field, Value::Message(entry));
                    } else {
                        let Some((column, raw)) = self.cell(node, row, num) else {
                            continue;
                        };
                        if count == 1 {
                            for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                                let value = self.coerce(node, binding, part, column, row)?;
                                push_value(item, field, value);
                            }
                        } else {
                            let value = self.coerce(node, binding, raw, column, row)?;
                            push_value(item, field, value);
                        }
                    }
                }
            } else if node.is_group() {
                let mut entry = DynamicMessage::new(self.nested(*child)?);
                self.parse_data(*child, &mut entry, row, repetition)?;
                if entry.fields().next().is_some() {
                    item.set_field(field, Value::Message(entry));
                }
            } else if let Some((column, raw)) = self.cell(node, row, repetition) {
                let value = self.coerce(node, binding, raw, column, row)?;
                item.set_field(field, value);
            }
        }
        Ok(())
    }

    fn binding(&self, id: NodeId) -> ConvertResult<&FieldBinding> {
        self.tree
            .node(id)
            .field
            .as_ref()
            .ok_or_else(|| ConvertError::mismatch(&self.tree.path(id), "field was never bound"))
    }

    fn nested(&self, id: NodeId) -> ConvertResult<MessageDescriptor> {
        self.tree
            .node(id)
            .message
            .clone()
            .ok_or_else(|| ConvertError::mismatch(&self.tree.path(id), "message was never bound"))
    }

    /// Cell feeding `node` at repetition `num`; `None` when blank or when the
    /// sheet has no column for that repetition.
    fn cell<'r>(
        &self,
        node: &SchemaNode,
        row: &RowContext<'r>,
        num: usize,
    ) -> Option<(usize, &'r str)> {
        let column = *node.columns().get(num)?;
        let raw = row.cells.get(column).map(String::as_str).unwrap_or("");
        if raw.trim().is_empty() {
            None
        } else {
            Some((column, raw))
        }
    }

    fn coerce(
        &self,
        node: &SchemaNode,
        binding: &FieldBinding,
        raw: &str,
        column: usize,
        row: &RowContext<'_>,
    ) -> ConvertResult<Value> {
        coerce_cell(
            raw,
            &binding.descriptor.kind(),
            node.features(),
            self.timezone,
        )
        .map_err(|message| ConvertError::DataCoercion {
            row: row.row_number,
            column: column_letter(column),
            raw: raw.to_string(),
            message,
        })
    }

    /// A repeated group instance is absent when the leaf reached by following
    /// first children is blank or holds its default value.
    fn first_leaf_is_default(
        &self,
        group: NodeId,
        row: &RowContext<'_>,
        num: usize,
    ) -> ConvertResult<bool> {
        let mut current = group;
        while let Some(first) = self.tree.children(current).first() {
            current = *first;
        }
        let leaf = self.tree.node(current);
        if leaf.is_repeated {
            return Ok(false);
        }
        let Some((column, raw)) = self.cell(leaf, row, num) else {
            return Ok(true);
        };
        let binding = self.binding(current)?;
        let value = self.coerce(leaf, binding, raw, column, row)?;
        Ok(value == Value::default_value_for_field(&binding.descriptor))
    }
}

fn push_value(item: &mut DynamicMessage, field: &FieldDescriptor, value: Value) {
    if let Some(list) = item.get_field_mut(field).as_list_mut() {
        list.push(value);
    }
}

/// True when every field of `message` equals its default (empty for lists).
pub fn is_all_default(message: &DynamicMessage) -> bool {
    message.descriptor().fields().all(|field| {
        let value = message.get_field(&field);
        if field.is_map() {
            value.as_map().is_none_or(|map| map.is_empty())
        } else if field.is_list() {
            value.as_list().is_none_or(|list| list.is_empty())
        } else if let Some(nested) = value.as_message() {
            is_all_default(nested)
        } else {
            *value == Value::default_value_for_field(&field)
        }
    })
}
