//! Renders a finalized schema tree as proto2 source text.

use std::{collections::HashSet, fmt::Write as _};

use crate::tree::{FinalizedSchema, NodeId, SchemaNode, SchemaTree};

const INDENT: &str = "    ";

/// Name of the wrapper message that holds every row of a sheet.
pub fn container_type_name(root_type: &str) -> String {
    format!("{root_type}_ARRAY")
}

/// Fully qualified message name inside `package`.
pub fn qualified_name(package: &str, type_name: &str) -> String {
    if package.is_empty() {
        type_name.to_string()
    } else {
        format!("{package}.{type_name}")
    }
}

pub fn render_proto(schema: &FinalizedSchema, file_name: &str, package: &str) -> String {
    let tree = schema.tree();
    let root_type = schema.root_type();
    let mut out = String::new();

    let _ = writeln!(out, "// {file_name}");
    let _ = writeln!(
        out,
        "// Generated by sheet-pb from sheet '{root_type}'. Do not edit by hand."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "syntax = \"proto2\";");
    let _ = writeln!(out);
    for import in schema.imports() {
        let _ = writeln!(out, "import \"{import}\";");
    }
    if !schema.imports().is_empty() {
        let _ = writeln!(out);
    }
    if !package.is_empty() {
        let _ = writeln!(out, "package {package};");
        let _ = writeln!(out);
    }

    let mut defined = HashSet::new();
    render_message(tree, tree.root(), 0, &mut defined, &mut out);

    let _ = writeln!(out);
    let _ = writeln!(out, "message {} {{", container_type_name(root_type));
    let _ = writeln!(out, "{INDENT}repeated {root_type} items = 1;");
    let _ = writeln!(out, "}}");
    out
}

fn render_message(
    tree: &SchemaTree,
    id: NodeId,
    depth: usize,
    defined: &mut HashSet<String>,
    out: &mut String,
) {
    let node = tree.node(id);
    if !node.is_group() || node.is_common_type || defined.contains(node.type_name()) {
        return;
    }
    let indent = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);
    let _ = writeln!(out, "{indent}message {} {{", node.type_name());

    for child in tree.children(id) {
        render_message(tree, *child, depth + 1, defined, out);
    }
    for child in tree.children(id) {
        let field = tree.node(*child);
        if !field.is_group() && !field.comment.is_empty() {
            render_comment(&field.comment, &inner, out);
        }
        let label = if field.is_list() { "repeated" } else { "optional" };
        let _ = writeln!(
            out,
            "{inner}{label} {} {} = {}{};",
            field_type(field),
            field.name,
            field.field_number.unwrap_or_default(),
            default_option(field),
        );
    }

    let _ = writeln!(out, "{indent}}}");
    defined.insert(node.type_name().to_string());
}

/// Common types are referenced by their fully qualified name so they resolve
/// regardless of the package they live in.
fn field_type(node: &SchemaNode) -> String {
    match &node.message {
        Some(message) if node.is_common_type => format!(".{}", message.full_name()),
        _ => node.type_name().to_string(),
    }
}

fn default_option(node: &SchemaNode) -> String {
    let Some(default) = &node.spec.default else {
        return String::new();
    };
    let quoted = matches!(node.type_name(), "string" | "bytes") && !default.starts_with('"');
    if quoted {
        format!(" [default = \"{}\"]", default.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!(" [default = {default}]")
    }
}

fn render_comment(comment: &str, indent: &str, out: &mut String) {
    let _ = writeln!(out, "{indent}/**");
    for line in comment.lines() {
        let line = line.trim_end().replace("*/", "* /");
        if line.is_empty() {
            let _ = writeln!(out, "{indent} *");
        } else {
            let _ = writeln!(out, "{indent} * {line}");
        }
    }
    let _ = writeln!(out, "{indent} */");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::CommonTypes, tree::SchemaBuilder};

    fn finalize(columns: &[(&str, &str, &str)]) -> FinalizedSchema {
        let registry = CommonTypes::empty();
        let mut builder = SchemaBuilder::new("HERO", None, &registry);
        for (idx, (path, spec, comment)) in columns.iter().enumerate() {
            builder.append(path, spec, comment, idx).expect("append");
        }
        builder.finish().expect("finish")
    }

    #[test]
    fn renders_fields_nested_messages_and_wrapper() {
        let schema = finalize(&[
            ("id", "uint32", "Hero id"),
            ("name", "string=nobody", ""),
            ("skill.id", "Skill|int32", "Skill id"),
            ("skill.level", "int32=1", ""),
            ("skill.id", "", ""),
            ("skill.level", "", ""),
            ("tags", "string[repeated]", ""),
        ]);
        let text = render_proto(&schema, "dataconfig_hero.proto", "dataconfig");
        let expected = "\
// dataconfig_hero.proto
// Generated by sheet-pb from sheet 'HERO'. Do not edit by hand.

syntax = \"proto2\";

package dataconfig;

message HERO {
    message Skill {
        /**
         * Skill id
         */
        optional int32 id = 1;
        optional int32 level = 2 [default = 1];
    }
    /**
     * Hero id
     */
    optional uint32 id = 1;
    optional string name = 2 [default = \"nobody\"];
    repeated Skill skill = 3;
    repeated string tags = 4;
}

message HERO_ARRAY {
    repeated HERO items = 1;
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn shared_nested_type_is_emitted_once() {
        let schema = finalize(&[
            ("main.id", "Item|int32", ""),
            ("main.count", "int32", ""),
            ("extra.id", "Item|int32", ""),
            ("extra.count", "int32", ""),
        ]);
        let text = render_proto(&schema, "dataconfig_hero.proto", "");
        assert_eq!(text.matches("message Item {").count(), 1);
        assert!(text.contains("optional Item main = 1;"));
        assert!(text.contains("optional Item extra = 2;"));
        assert!(!text.contains("package"));
    }

    #[test]
    fn multi_line_comments_are_indented() {
        let schema = finalize(&[("id", "int32", "first line\nsecond */ line")]);
        let text = render_proto(&schema, "x.proto", "p");
        assert!(text.contains("     * first line\n     * second * / line\n     */\n"));
    }

    #[test]
    fn names_are_qualified_with_package() {
        assert_eq!(qualified_name("dataconfig", "HERO"), "dataconfig.HERO");
        assert_eq!(qualified_name("", "HERO"), "HERO");
        assert_eq!(container_type_name("HERO"), "HERO_ARRAY");
    }
}
