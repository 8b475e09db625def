//! Rust support: capture query and behavior adapter.
//!
//! Rust peculiarities handled here: `impl` blocks attach methods to a type
//! defined elsewhere in the file, `use` declarations carry nested trees and
//! glob imports, visibility is a per-item `pub` modifier rather than an
//! export statement, and `Type::function()` calls are static dispatch.

use tree_sitter::Node;

use crate::indexing::references::CallType;
use crate::parsing::behavior::{
    CallableSignature, LanguageBehavior, RawCall, RawImport, RawReceiver, clean_annotation,
    field_text, match_known_file, node_str, signature_before_body,
};
use crate::symbol::{Definition, Initializer, Parameter};
use crate::types::Range;

pub(crate) const QUERY: &str = r#"
; Scopes
(source_file) @local.scope.module
(mod_item) @local.scope.module
(function_item) @local.scope.function
(closure_expression) @local.scope.function
(impl_item) @local.scope.impl
(trait_item) @local.scope.class
(block) @local.scope.block
(for_expression) @local.scope.for

; Definitions
(function_item) @hoist.definition.function
(closure_expression) @local.definition.function
(struct_item) @hoist.definition.struct
(enum_item) @hoist.definition.enum
(enum_variant) @local.definition.enumerator
(trait_item) @hoist.definition.trait
(type_item) @local.definition.type_alias
(const_item) @local.definition.constant
(static_item) @local.definition.constant
(field_declaration) @local.definition.field
(let_declaration) @local.definition.variable
(parameter) @local.definition.parameter

; Imports
(use_declaration) @local.import

; References
(call_expression) @reference.call
(identifier) @reference.read
"#;

/// Behavior adapter for Rust.
pub struct RustBehavior;

impl LanguageBehavior for RustBehavior {
    fn scope_name(&self, node: Node, source: &str) -> Option<String> {
        match node.kind() {
            "impl_item" => field_text(node, "type", source).map(|t| strip_generics(&t)),
            _ => field_text(node, "name", source),
        }
    }

    fn definition_name(&self, node: Node, source: &str) -> Option<(String, Range)> {
        match node.kind() {
            "parameter" | "let_declaration" => {
                let pattern = node.child_by_field_name("pattern")?;
                if pattern.kind() != "identifier" {
                    return None;
                }
                Some((node_str(pattern, source), Range::from_ts(pattern.range())))
            }
            _ => {
                let name = node.child_by_field_name("name")?;
                Some((node_str(name, source), Range::from_ts(name.range())))
            }
        }
    }

    fn is_exported_definition(&self, node: Node, _source: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .any(|child| child.kind() == "visibility_modifier")
    }

    fn is_test_definition(&self, name: &str, _file_path: &str, scope_path: &str) -> bool {
        name.starts_with("test_")
            || scope_path.split('/').any(|segment| segment == "tests")
    }

    fn callable_signature(&self, node: Node, source: &str) -> CallableSignature {
        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for child in params.named_children(&mut cursor) {
                if child.kind() != "parameter" {
                    continue;
                }
                let Some(pattern) = child.child_by_field_name("pattern") else {
                    continue;
                };
                if pattern.kind() != "identifier" {
                    continue;
                }
                parameters.push(Parameter {
                    name: node_str(pattern, source),
                    type_annotation: field_text(child, "type", source)
                        .map(|t| clean_annotation(&t)),
                });
            }
        }

        CallableSignature {
            parameters,
            return_type: field_text(node, "return_type", source).map(|t| clean_annotation(&t)),
            signature: signature_before_body(node, source),
        }
    }

    fn variable_info(&self, node: Node, source: &str) -> (Option<Initializer>, Option<String>) {
        let annotation = field_text(node, "type", source).map(|t| clean_annotation(&t));
        let init = node.child_by_field_name("value").map(|value| match value.kind() {
            "struct_expression" => value
                .child_by_field_name("name")
                .map(|n| Initializer::Constructor(strip_generics(&node_str(n, source))))
                .unwrap_or(Initializer::Other),
            "call_expression" => match value.child_by_field_name("function") {
                Some(f) if f.kind() == "identifier" => Initializer::Call(node_str(f, source)),
                Some(f) if f.kind() == "scoped_identifier" => {
                    // `Foo::new()` constructs a Foo.
                    let path = field_text(f, "path", source);
                    let name = field_text(f, "name", source);
                    match (path, name.as_deref()) {
                        (Some(path), Some("new")) => {
                            Initializer::Constructor(strip_generics(&path))
                        }
                        (Some(path), Some(name)) => {
                            Initializer::Call(format!("{path}::{name}"))
                        }
                        _ => Initializer::Other,
                    }
                }
                _ => Initializer::Other,
            },
            "identifier" => Initializer::Variable(node_str(value, source)),
            "closure_expression" => Initializer::Function,
            _ => Initializer::Other,
        });
        (init, annotation)
    }

    fn impl_info(&self, node: Node, source: &str) -> Option<(String, Option<String>)> {
        if node.kind() != "impl_item" {
            return None;
        }
        let type_name = field_text(node, "type", source).map(|t| strip_generics(&t))?;
        let trait_name = field_text(node, "trait", source).map(|t| strip_generics(&t));
        Some((type_name, trait_name))
    }

    fn collect_imports(&self, node: Node, source: &str) -> Vec<RawImport> {
        let range = Range::from_ts(node.range());
        let mut imports = Vec::new();
        if let Some(argument) = node.child_by_field_name("argument") {
            walk_use_tree(argument, source, String::new(), range, &mut imports);
        }
        imports
    }

    fn implicit_export(&self, def: &Definition) -> bool {
        def.is_exported()
    }

    fn resolve_import_target(
        &self,
        import_path: &str,
        importing_file: &str,
        known_files: &[String],
    ) -> Option<String> {
        let segments: Vec<&str> = import_path.split("::").collect();
        let (anchor, rest) = match segments.split_first() {
            Some((&"crate", rest)) => (Anchor::Root, rest),
            Some((&"self", rest)) => (Anchor::Sibling, rest),
            Some((&"super", rest)) => (Anchor::Parent, rest),
            _ => return None,
        };
        if rest.is_empty() {
            return None;
        }

        // The final segment may be the imported item; the segments before
        // it name the module file. A single segment names a module.
        let module_paths: Vec<Vec<&str>> = if rest.len() == 1 {
            vec![rest.to_vec()]
        } else {
            vec![rest[..rest.len() - 1].to_vec(), rest.to_vec()]
        };

        let dir = importing_file
            .rfind('/')
            .map(|idx| &importing_file[..idx])
            .unwrap_or("");
        let mut dir_segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        match anchor {
            Anchor::Root => {}
            Anchor::Sibling => {}
            Anchor::Parent => {
                dir_segments.pop();
            }
        }

        let mut candidates = Vec::new();
        for module in &module_paths {
            let joined = module.join("/");
            match anchor {
                Anchor::Root => {
                    candidates.push(format!("src/{joined}.rs"));
                    candidates.push(format!("src/{joined}/mod.rs"));
                    candidates.push(format!("{joined}.rs"));
                    candidates.push(format!("{joined}/mod.rs"));
                }
                Anchor::Sibling | Anchor::Parent => {
                    let base = if dir_segments.is_empty() {
                        joined.clone()
                    } else {
                        format!("{}/{joined}", dir_segments.join("/"))
                    };
                    candidates.push(format!("{base}.rs"));
                    candidates.push(format!("{base}/mod.rs"));
                }
            }
        }

        match_known_file(&candidates, known_files)
    }

    fn call_info(&self, node: Node, source: &str) -> Option<RawCall> {
        if node.kind() != "call_expression" {
            return None;
        }
        let mut function = node.child_by_field_name("function")?;
        if function.kind() == "generic_function" {
            function = function.child_by_field_name("function")?;
        }
        match function.kind() {
            "identifier" => Some(RawCall {
                call_type: CallType::Function,
                name: node_str(function, source),
                name_range: Range::from_ts(function.range()),
                receiver: None,
                anonymous_callee: false,
            }),
            "field_expression" => {
                let field = function.child_by_field_name("field")?;
                let value = function.child_by_field_name("value")?;
                Some(RawCall {
                    call_type: CallType::Method,
                    name: node_str(field, source),
                    name_range: Range::from_ts(field.range()),
                    receiver: Some(RawReceiver {
                        text: node_str(value, source),
                        range: Range::from_ts(value.range()),
                        is_static: false,
                    }),
                    anonymous_callee: false,
                })
            }
            "scoped_identifier" => {
                let name = function.child_by_field_name("name")?;
                let path = function.child_by_field_name("path")?;
                Some(RawCall {
                    call_type: CallType::Method,
                    name: node_str(name, source),
                    name_range: Range::from_ts(name.range()),
                    receiver: Some(RawReceiver {
                        text: strip_generics(&node_str(path, source)),
                        range: Range::from_ts(path.range()),
                        is_static: true,
                    }),
                    anonymous_callee: false,
                })
            }
            "closure_expression" | "parenthesized_expression" => Some(RawCall {
                call_type: CallType::Function,
                name: "<anonymous>".to_string(),
                name_range: Range::from_ts(function.range()),
                receiver: None,
                anonymous_callee: true,
            }),
            _ => None,
        }
    }

    fn is_self_receiver(&self, text: &str) -> bool {
        text == "self" || text == "Self"
    }

    fn constructor_names(&self) -> &'static [&'static str] {
        &["new"]
    }
}

enum Anchor {
    Root,
    Sibling,
    Parent,
}

fn strip_generics(type_name: &str) -> String {
    match type_name.find('<') {
        Some(idx) => type_name[..idx].trim().to_string(),
        None => type_name.trim().to_string(),
    }
}

/// Flatten a `use` tree into one import record per bound name, carrying
/// aliases and glob markers.
fn walk_use_tree(
    node: Node,
    source: &str,
    prefix: String,
    range: Range,
    imports: &mut Vec<RawImport>,
) {
    match node.kind() {
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
            let segment = node_str(node, source);
            let path = join_path(&prefix, &segment);
            let local = path.rsplit("::").next().unwrap_or(&path).to_string();
            imports.push(RawImport {
                import_path: path,
                imported_name: local.clone(),
                local_name: local,
                is_namespace: false,
                is_type_only: false,
                range,
            });
        }
        "use_as_clause" => {
            let Some(path_node) = node.child_by_field_name("path") else {
                return;
            };
            let path = join_path(&prefix, &node_str(path_node, source));
            let alias = field_text(node, "alias", source)
                .unwrap_or_else(|| path.rsplit("::").next().unwrap_or(&path).to_string());
            let imported = path.rsplit("::").next().unwrap_or(&path).to_string();
            imports.push(RawImport {
                import_path: path,
                imported_name: imported,
                local_name: alias,
                is_namespace: false,
                is_type_only: false,
                range,
            });
        }
        "use_wildcard" => {
            let mut cursor = node.walk();
            let path = node
                .named_children(&mut cursor)
                .next()
                .map(|p| join_path(&prefix, &node_str(p, source)))
                .unwrap_or(prefix);
            imports.push(RawImport {
                import_path: path,
                imported_name: "*".to_string(),
                local_name: "*".to_string(),
                is_namespace: true,
                is_type_only: false,
                range,
            });
        }
        "scoped_use_list" => {
            let new_prefix = node
                .child_by_field_name("path")
                .map(|p| join_path(&prefix, &node_str(p, source)))
                .unwrap_or(prefix);
            if let Some(list) = node.child_by_field_name("list") {
                let mut cursor = list.walk();
                for child in list.named_children(&mut cursor) {
                    walk_use_tree(child, source, new_prefix.clone(), range, imports);
                }
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                walk_use_tree(child, source, prefix.clone(), range, imports);
            }
        }
        _ => {}
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}::{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, ParsedFile};

    fn parse(source: &str) -> ParsedFile {
        ParsedFile::parse("a.rs", source, Language::Rust).unwrap()
    }

    fn find_node<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find_node(child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn query_compiles_against_rust_grammar() {
        Language::Rust.dialect("a.rs").query().unwrap();
    }

    #[test]
    fn collects_simple_use() {
        let parsed = parse("use crate::io::Reader;\n");
        let behavior = RustBehavior;
        let use_decl = find_node(parsed.tree.root_node(), "use_declaration").unwrap();
        let records = behavior.collect_imports(use_decl, &parsed.source);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].import_path, "crate::io::Reader");
        assert_eq!(records[0].local_name, "Reader");
    }

    #[test]
    fn collects_use_list_and_alias() {
        let parsed = parse("use crate::io::{Reader, Writer as W};\n");
        let behavior = RustBehavior;
        let use_decl = find_node(parsed.tree.root_node(), "use_declaration").unwrap();
        let records = behavior.collect_imports(use_decl, &parsed.source);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].import_path, "crate::io::Reader");
        assert_eq!(records[1].import_path, "crate::io::Writer");
        assert_eq!(records[1].local_name, "W");
    }

    #[test]
    fn collects_glob_import() {
        let parsed = parse("use crate::io::*;\n");
        let behavior = RustBehavior;
        let use_decl = find_node(parsed.tree.root_node(), "use_declaration").unwrap();
        let records = behavior.collect_imports(use_decl, &parsed.source);

        assert_eq!(records.len(), 1);
        assert!(records[0].is_namespace);
        assert_eq!(records[0].import_path, "crate::io");
    }

    #[test]
    fn pub_items_are_exported() {
        let parsed = parse("pub fn helper() {}\nfn private() {}\n");
        let behavior = RustBehavior;
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        let functions: Vec<Node> = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "function_item")
            .collect();

        assert!(behavior.is_exported_definition(functions[0], &parsed.source));
        assert!(!behavior.is_exported_definition(functions[1], &parsed.source));
    }

    #[test]
    fn classifies_static_and_instance_calls() {
        let parsed = parse("fn main() { let p = Point::new(); p.norm(); }\n");
        let behavior = RustBehavior;
        let root = parsed.tree.root_node();

        let mut calls = Vec::new();
        fn collect<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
            if node.kind() == "call_expression" {
                out.push(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect(child, out);
            }
        }
        collect(root, &mut calls);
        assert_eq!(calls.len(), 2);

        let static_call = behavior.call_info(calls[0], &parsed.source).unwrap();
        assert_eq!(static_call.name, "new");
        assert!(static_call.receiver.as_ref().unwrap().is_static);
        assert_eq!(static_call.receiver.as_ref().unwrap().text, "Point");

        let instance_call = behavior.call_info(calls[1], &parsed.source).unwrap();
        assert_eq!(instance_call.name, "norm");
        assert!(!instance_call.receiver.as_ref().unwrap().is_static);
    }

    #[test]
    fn impl_info_extracts_type_and_trait() {
        let parsed = parse("impl Display for Point { }\n");
        let behavior = RustBehavior;
        let impl_item = find_node(parsed.tree.root_node(), "impl_item").unwrap();
        let (type_name, trait_name) = behavior.impl_info(impl_item, &parsed.source).unwrap();
        assert_eq!(type_name, "Point");
        assert_eq!(trait_name.as_deref(), Some("Display"));
    }

    #[test]
    fn let_bindings_infer_constructor_shapes() {
        let parsed = parse("fn main() { let p = Point::new(); let q = Point { x: 1 }; }\n");
        let behavior = RustBehavior;
        let root = parsed.tree.root_node();
        let mut lets = Vec::new();
        fn collect<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
            if node.kind() == "let_declaration" {
                out.push(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect(child, out);
            }
        }
        collect(root, &mut lets);

        let (init, _) = behavior.variable_info(lets[0], &parsed.source);
        assert_eq!(init, Some(Initializer::Constructor("Point".to_string())));
        let (init, _) = behavior.variable_info(lets[1], &parsed.source);
        assert_eq!(init, Some(Initializer::Constructor("Point".to_string())));
    }

    #[test]
    fn crate_imports_resolve_to_module_files() {
        let behavior = RustBehavior;
        let known = vec!["src/io.rs".to_string(), "src/main.rs".to_string()];
        assert_eq!(
            behavior
                .resolve_import_target("crate::io::Reader", "src/main.rs", &known)
                .as_deref(),
            Some("src/io.rs")
        );
    }
}
