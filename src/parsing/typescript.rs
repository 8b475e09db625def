//! TypeScript support: capture query and behavior adapter.
//!
//! The TSX dialect shares this query; the grammars differ only in JSX
//! productions, which the query does not touch. JavaScript reuses the
//! ECMAScript walkers defined here.

use tree_sitter::Node;

use crate::indexing::references::CallType;
use crate::parsing::behavior::{
    CallableSignature, LanguageBehavior, RawCall, RawExport, RawImport, RawReceiver,
    clean_annotation, field_text, match_known_file, node_str, resolve_relative_specifier,
    signature_before_body, unquote,
};
use crate::symbol::{Initializer, Parameter};
use crate::types::Range;

pub(crate) const QUERY: &str = r#"
; Scopes
(program) @local.scope.module
(function_declaration) @local.scope.function
(generator_function_declaration) @local.scope.function
(function_expression) @local.scope.function
(arrow_function) @local.scope.function
(method_definition) @local.scope.method
(class_declaration) @local.scope.class
(interface_declaration) @local.scope.class
(statement_block) @local.scope.block
(for_statement) @local.scope.for
(for_in_statement) @local.scope.for
(catch_clause) @local.scope.catch

; Definitions
(function_declaration) @hoist.definition.function
(generator_function_declaration) @hoist.definition.function
(function_expression) @local.definition.function
(arrow_function) @local.definition.function
(class_declaration) @hoist.definition.class
(interface_declaration) @local.definition.interface
(type_alias_declaration) @local.definition.type_alias
(enum_declaration) @local.definition.enum
(enum_body (property_identifier) @local.definition.enumerator)
(enum_assignment (property_identifier) @local.definition.enumerator)
(method_definition) @local.definition.method
(method_signature) @local.definition.method
(property_signature) @local.definition.property
(public_field_definition) @local.definition.property
(variable_declarator) @local.definition.variable
(required_parameter) @local.definition.parameter
(optional_parameter) @local.definition.parameter
(arrow_function parameter: (identifier) @local.definition.parameter)

; Imports and exports
(import_statement) @local.import
(export_statement) @local.export

; References
(call_expression) @reference.call
(new_expression) @reference.call
(assignment_expression left: (identifier) @reference.write)
(type_annotation (type_identifier) @reference.type)
(identifier) @reference.read
"#;

/// Behavior adapter for TypeScript and TSX.
pub struct TypeScriptBehavior;

impl LanguageBehavior for TypeScriptBehavior {
    fn is_test_definition(&self, _name: &str, file_path: &str, _scope_path: &str) -> bool {
        ecma_test_file(file_path)
    }

    fn is_constant(&self, node: Node, source: &str) -> bool {
        ecma_is_const_declarator(node, source)
    }

    fn callable_signature(&self, node: Node, source: &str) -> CallableSignature {
        ecma_callable_signature(node, source)
    }

    fn variable_info(&self, node: Node, source: &str) -> (Option<Initializer>, Option<String>) {
        ecma_variable_info(node, source)
    }

    fn class_heritage(&self, node: Node, source: &str) -> (Vec<String>, Vec<String>) {
        ecma_class_heritage(node, source)
    }

    fn collect_imports(&self, node: Node, source: &str) -> Vec<RawImport> {
        ecma_collect_imports(node, source)
    }

    fn collect_exports(&self, node: Node, source: &str) -> Vec<RawExport> {
        ecma_collect_exports(node, source)
    }

    fn resolve_import_target(
        &self,
        import_path: &str,
        importing_file: &str,
        known_files: &[String],
    ) -> Option<String> {
        ecma_resolve_import_target(
            import_path,
            importing_file,
            known_files,
            &["ts", "tsx", "js", "jsx"],
        )
    }

    fn call_info(&self, node: Node, source: &str) -> Option<RawCall> {
        ecma_call_info(node, source)
    }

    fn is_self_receiver(&self, text: &str) -> bool {
        text == "this"
    }
}

// ---------------------------------------------------------------------------
// Shared ECMAScript walkers (used by the JavaScript behavior as well)
// ---------------------------------------------------------------------------

pub(crate) fn ecma_test_file(file_path: &str) -> bool {
    file_path.contains(".test.")
        || file_path.contains(".spec.")
        || file_path.contains("/__tests__/")
}

pub(crate) fn ecma_is_const_declarator(node: Node, source: &str) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() != "lexical_declaration" {
        return false;
    }
    parent
        .child(0)
        .map(|kw| node_str(kw, source) == "const")
        .unwrap_or(false)
}

pub(crate) fn ecma_callable_signature(node: Node, source: &str) -> CallableSignature {
    let mut parameters = Vec::new();

    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "required_parameter" | "optional_parameter" => {
                    let Some(pattern) = child.child_by_field_name("pattern") else {
                        continue;
                    };
                    if pattern.kind() != "identifier" && pattern.kind() != "this" {
                        continue;
                    }
                    parameters.push(Parameter {
                        name: node_str(pattern, source),
                        type_annotation: field_text(child, "type", source)
                            .map(|t| clean_annotation(&t)),
                    });
                }
                "identifier" => {
                    parameters.push(Parameter {
                        name: node_str(child, source),
                        type_annotation: None,
                    });
                }
                "assignment_pattern" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        if left.kind() == "identifier" {
                            parameters.push(Parameter {
                                name: node_str(left, source),
                                type_annotation: None,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    } else if let Some(single) = node.child_by_field_name("parameter") {
        if single.kind() == "identifier" {
            parameters.push(Parameter {
                name: node_str(single, source),
                type_annotation: None,
            });
        }
    }

    CallableSignature {
        parameters,
        return_type: field_text(node, "return_type", source).map(|t| clean_annotation(&t)),
        signature: signature_before_body(node, source),
    }
}

pub(crate) fn ecma_variable_info(
    node: Node,
    source: &str,
) -> (Option<Initializer>, Option<String>) {
    let annotation = field_text(node, "type", source).map(|t| clean_annotation(&t));
    let init = node.child_by_field_name("value").map(|value| match value.kind() {
        "new_expression" => value
            .child_by_field_name("constructor")
            .map(|c| Initializer::Constructor(node_str(c, source)))
            .unwrap_or(Initializer::Other),
        "call_expression" => match value.child_by_field_name("function") {
            Some(f) if f.kind() == "identifier" => Initializer::Call(node_str(f, source)),
            _ => Initializer::Other,
        },
        "identifier" => Initializer::Variable(node_str(value, source)),
        "arrow_function" | "function_expression" => Initializer::Function,
        _ => Initializer::Other,
    });
    (init, annotation)
}

pub(crate) fn ecma_class_heritage(node: Node, source: &str) -> (Vec<String>, Vec<String>) {
    let mut bases = Vec::new();
    let mut implements = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_heritage" => {
                let mut heritage_cursor = child.walk();
                for clause in child.named_children(&mut heritage_cursor) {
                    match clause.kind() {
                        "extends_clause" => {
                            let mut clause_cursor = clause.walk();
                            for value in clause.named_children(&mut clause_cursor) {
                                if let Some(name) = type_expression_name(value, source) {
                                    bases.push(name);
                                }
                            }
                        }
                        "implements_clause" => {
                            let mut clause_cursor = clause.walk();
                            for value in clause.named_children(&mut clause_cursor) {
                                if let Some(name) = type_expression_name(value, source) {
                                    implements.push(name);
                                }
                            }
                        }
                        // Plain JavaScript: `class B extends A` puts the
                        // expression directly under class_heritage.
                        _ => {
                            if let Some(name) = type_expression_name(clause, source) {
                                bases.push(name);
                            }
                        }
                    }
                }
            }
            // Interface extension lists.
            "extends_type_clause" => {
                let mut clause_cursor = child.walk();
                for value in child.named_children(&mut clause_cursor) {
                    if let Some(name) = type_expression_name(value, source) {
                        bases.push(name);
                    }
                }
            }
            _ => {}
        }
    }

    (bases, implements)
}

fn type_expression_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "type_identifier" => Some(node_str(node, source)),
        "generic_type" => node
            .child_by_field_name("name")
            .map(|n| node_str(n, source)),
        "member_expression" | "nested_type_identifier" => Some(node_str(node, source)),
        "type_arguments" | "arguments" => None,
        _ => None,
    }
}

pub(crate) fn ecma_collect_imports(node: Node, source: &str) -> Vec<RawImport> {
    let mut imports = Vec::new();
    let Some(source_node) = node.child_by_field_name("source") else {
        return imports;
    };
    let import_path = unquote(&node_str(source_node, source));
    let is_type_only = node_str(node, source).starts_with("import type");
    let range = Range::from_ts(node.range());

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for clause_child in child.named_children(&mut clause_cursor) {
            match clause_child.kind() {
                "identifier" => imports.push(RawImport {
                    import_path: import_path.clone(),
                    imported_name: "default".to_string(),
                    local_name: node_str(clause_child, source),
                    is_namespace: false,
                    is_type_only,
                    range,
                }),
                "namespace_import" => {
                    let mut ns_cursor = clause_child.walk();
                    if let Some(binding) = clause_child
                        .named_children(&mut ns_cursor)
                        .find(|n| n.kind() == "identifier")
                    {
                        imports.push(RawImport {
                            import_path: import_path.clone(),
                            imported_name: "*".to_string(),
                            local_name: node_str(binding, source),
                            is_namespace: true,
                            is_type_only,
                            range,
                        });
                    }
                }
                "named_imports" => {
                    let mut named_cursor = clause_child.walk();
                    for specifier in clause_child.named_children(&mut named_cursor) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = field_text(specifier, "name", source) else {
                            continue;
                        };
                        let name = unquote(&name);
                        let alias = field_text(specifier, "alias", source);
                        let specifier_type_only = is_type_only
                            || node_str(specifier, source).starts_with("type ");
                        imports.push(RawImport {
                            import_path: import_path.clone(),
                            imported_name: name.clone(),
                            local_name: alias.unwrap_or(name),
                            is_namespace: false,
                            is_type_only: specifier_type_only,
                            range,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    imports
}

pub(crate) fn ecma_collect_exports(node: Node, source: &str) -> Vec<RawExport> {
    let mut exports = Vec::new();
    let range = Range::from_ts(node.range());
    let text = node_str(node, source);
    let is_type_only = text.starts_with("export type");
    let source_path = node
        .child_by_field_name("source")
        .map(|s| unquote(&node_str(s, source)));
    let is_default = node
        .children(&mut node.walk())
        .any(|c| !c.is_named() && c.kind() == "default");

    if let Some(declaration) = node.child_by_field_name("declaration") {
        for name in declaration_names(declaration, source) {
            let exported_name = if is_default {
                "default".to_string()
            } else {
                name.clone()
            };
            exports.push(RawExport {
                exported_name,
                local_name: Some(name),
                source_path: None,
                source_name: None,
                is_type_only,
                range,
            });
        }
        return exports;
    }

    if let Some(value) = node.child_by_field_name("value") {
        // `export default <expression>`
        let local = (value.kind() == "identifier").then(|| node_str(value, source));
        exports.push(RawExport {
            exported_name: "default".to_string(),
            local_name: local,
            source_path: None,
            source_name: None,
            is_type_only: false,
            range,
        });
        return exports;
    }

    let mut found_clause = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "export_clause" => {
                found_clause = true;
                let mut clause_cursor = child.walk();
                for specifier in child.named_children(&mut clause_cursor) {
                    if specifier.kind() != "export_specifier" {
                        continue;
                    }
                    let Some(name) = field_text(specifier, "name", source) else {
                        continue;
                    };
                    let name = unquote(&name);
                    let alias = field_text(specifier, "alias", source).map(|a| unquote(&a));
                    let exported_name = alias.unwrap_or_else(|| name.clone());
                    let specifier_type_only =
                        is_type_only || node_str(specifier, source).starts_with("type ");
                    match &source_path {
                        Some(path) => exports.push(RawExport {
                            exported_name,
                            local_name: None,
                            source_path: Some(path.clone()),
                            source_name: Some(name),
                            is_type_only: specifier_type_only,
                            range,
                        }),
                        None => exports.push(RawExport {
                            exported_name,
                            local_name: Some(name),
                            source_path: None,
                            source_name: None,
                            is_type_only: specifier_type_only,
                            range,
                        }),
                    }
                }
            }
            "namespace_export" => {
                found_clause = true;
                let mut ns_cursor = child.walk();
                if let Some(binding) = child
                    .named_children(&mut ns_cursor)
                    .find(|n| n.kind() == "identifier")
                {
                    exports.push(RawExport {
                        exported_name: node_str(binding, source),
                        local_name: None,
                        source_path: source_path.clone(),
                        source_name: Some("*".to_string()),
                        is_type_only,
                        range,
                    });
                }
            }
            _ => {}
        }
    }

    // `export * from "./x"`: no clause, just a source.
    if !found_clause && exports.is_empty() {
        if let Some(path) = source_path {
            exports.push(RawExport {
                exported_name: "*".to_string(),
                local_name: None,
                source_path: Some(path),
                source_name: Some("*".to_string()),
                is_type_only,
                range,
            });
        }
    }

    exports
}

fn declaration_names(declaration: Node, source: &str) -> Vec<String> {
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut names = Vec::new();
            let mut cursor = declaration.walk();
            for declarator in declaration.named_children(&mut cursor) {
                if declarator.kind() == "variable_declarator" {
                    if let Some(name) = declarator.child_by_field_name("name") {
                        if name.kind() == "identifier" {
                            names.push(node_str(name, source));
                        }
                    }
                }
            }
            names
        }
        _ => field_text(declaration, "name", source)
            .into_iter()
            .collect(),
    }
}

pub(crate) fn ecma_call_info(node: Node, source: &str) -> Option<RawCall> {
    match node.kind() {
        "new_expression" => {
            let constructor = node.child_by_field_name("constructor")?;
            if constructor.kind() != "identifier" {
                return None;
            }
            Some(RawCall {
                call_type: CallType::Constructor,
                name: node_str(constructor, source),
                name_range: Range::from_ts(constructor.range()),
                receiver: None,
                anonymous_callee: false,
            })
        }
        "call_expression" => {
            let function = node.child_by_field_name("function")?;
            match function.kind() {
                "identifier" => Some(RawCall {
                    call_type: CallType::Function,
                    name: node_str(function, source),
                    name_range: Range::from_ts(function.range()),
                    receiver: None,
                    anonymous_callee: false,
                }),
                "member_expression" => {
                    let property = function.child_by_field_name("property")?;
                    let object = function.child_by_field_name("object")?;
                    Some(RawCall {
                        call_type: CallType::Method,
                        name: node_str(property, source),
                        name_range: Range::from_ts(property.range()),
                        receiver: Some(RawReceiver {
                            text: node_str(object, source),
                            range: Range::from_ts(object.range()),
                            is_static: false,
                        }),
                        anonymous_callee: false,
                    })
                }
                // `(() => {})()` and friends: an anonymous callee.
                "parenthesized_expression" | "arrow_function" | "function_expression" => {
                    Some(RawCall {
                        call_type: CallType::Function,
                        name: "<anonymous>".to_string(),
                        name_range: Range::from_ts(function.range()),
                        receiver: None,
                        anonymous_callee: true,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

pub(crate) fn ecma_resolve_import_target(
    import_path: &str,
    importing_file: &str,
    known_files: &[String],
    extensions: &[&str],
) -> Option<String> {
    let base = resolve_relative_specifier(import_path, importing_file)
        .unwrap_or_else(|| import_path.to_string());

    let mut candidates = Vec::new();
    if extensions.iter().any(|ext| base.ends_with(&format!(".{ext}"))) {
        candidates.push(base.clone());
    }
    for ext in extensions {
        candidates.push(format!("{base}.{ext}"));
    }
    for ext in extensions {
        candidates.push(format!("{base}/index.{ext}"));
    }

    match_known_file(&candidates, known_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, ParsedFile};

    fn parse(source: &str) -> ParsedFile {
        ParsedFile::parse("a.ts", source, Language::TypeScript).unwrap()
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
    fn collects_named_imports() {
        let parsed = parse("import { helper, other as renamed } from \"./lib\";");
        let import = find_node(parsed.tree.root_node(), "import_statement").unwrap();
        let records = ecma_collect_imports(import, &parsed.source);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].import_path, "./lib");
        assert_eq!(records[0].imported_name, "helper");
        assert_eq!(records[0].local_name, "helper");
        assert_eq!(records[1].imported_name, "other");
        assert_eq!(records[1].local_name, "renamed");
    }

    #[test]
    fn collects_namespace_and_default_imports() {
        let parsed = parse("import def from \"./a\";\nimport * as ns from \"./b\";");
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        let statements: Vec<Node> = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "import_statement")
            .collect();

        let default = ecma_collect_imports(statements[0], &parsed.source);
        assert_eq!(default[0].imported_name, "default");
        assert_eq!(default[0].local_name, "def");

        let namespace = ecma_collect_imports(statements[1], &parsed.source);
        assert!(namespace[0].is_namespace);
        assert_eq!(namespace[0].imported_name, "*");
        assert_eq!(namespace[0].local_name, "ns");
    }

    #[test]
    fn collects_declaration_exports() {
        let parsed = parse("export function helper() {}");
        let export = find_node(parsed.tree.root_node(), "export_statement").unwrap();
        let records = ecma_collect_exports(export, &parsed.source);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exported_name, "helper");
        assert_eq!(records[0].local_name.as_deref(), Some("helper"));
        assert!(records[0].source_path.is_none());
    }

    #[test]
    fn collects_re_exports() {
        let parsed = parse("export { helper as util } from \"./lib\";");
        let export = find_node(parsed.tree.root_node(), "export_statement").unwrap();
        let records = ecma_collect_exports(export, &parsed.source);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exported_name, "util");
        assert_eq!(records[0].source_path.as_deref(), Some("./lib"));
        assert_eq!(records[0].source_name.as_deref(), Some("helper"));
        assert!(records[0].local_name.is_none());
    }

    #[test]
    fn classifies_call_shapes() {
        let parsed = parse("f();\nobj.m();\nnew Foo();");
        let root = parsed.tree.root_node();

        let call = find_node(root, "call_expression").unwrap();
        let info = ecma_call_info(call, &parsed.source).unwrap();
        assert_eq!(info.call_type, CallType::Function);
        assert_eq!(info.name, "f");

        let new_expr = find_node(root, "new_expression").unwrap();
        let info = ecma_call_info(new_expr, &parsed.source).unwrap();
        assert_eq!(info.call_type, CallType::Constructor);
        assert_eq!(info.name, "Foo");
    }

    #[test]
    fn method_calls_carry_receiver() {
        let parsed = parse("obj.m();");
        let call = find_node(parsed.tree.root_node(), "call_expression").unwrap();
        let info = ecma_call_info(call, &parsed.source).unwrap();
        assert_eq!(info.call_type, CallType::Method);
        assert_eq!(info.name, "m");
        let receiver = info.receiver.unwrap();
        assert_eq!(receiver.text, "obj");
        assert!(!receiver.is_static);
    }

    #[test]
    fn class_heritage_extends_and_implements() {
        let parsed = parse("class B extends A implements I, J {}");
        let class = find_node(parsed.tree.root_node(), "class_declaration").unwrap();
        let (bases, implements) = ecma_class_heritage(class, &parsed.source);
        assert_eq!(bases, vec!["A".to_string()]);
        assert_eq!(implements, vec!["I".to_string(), "J".to_string()]);
    }

    #[test]
    fn resolves_relative_import_to_known_file() {
        let known = vec!["src/lib.ts".to_string(), "src/app.ts".to_string()];
        let target =
            ecma_resolve_import_target("./lib", "src/app.ts", &known, &["ts", "tsx"]);
        assert_eq!(target.as_deref(), Some("src/lib.ts"));

        let missing = ecma_resolve_import_target("react", "src/app.ts", &known, &["ts"]);
        assert_eq!(missing, None);
    }

    #[test]
    fn callable_signature_extracts_typed_parameters() {
        let parsed = parse("function run(x: A, y?: B): void {}");
        let func = find_node(parsed.tree.root_node(), "function_declaration").unwrap();
        let sig = ecma_callable_signature(func, &parsed.source);
        assert_eq!(sig.parameters.len(), 2);
        assert_eq!(sig.parameters[0].name, "x");
        assert_eq!(sig.parameters[0].type_annotation.as_deref(), Some("A"));
        assert_eq!(sig.parameters[1].name, "y");
        assert_eq!(sig.return_type.as_deref(), Some("void"));
        assert!(sig.signature.unwrap().contains("function run"));
    }

    #[test]
    fn variable_info_detects_initializer_shapes() {
        let parsed = parse(
            "const a = new Foo();\nconst b = make();\nconst c = a;\nconst d = () => {};",
        );
        let root = parsed.tree.root_node();
        let mut declarators = Vec::new();
        fn collect<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
            if node.kind() == "variable_declarator" {
                out.push(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect(child, out);
            }
        }
        collect(root, &mut declarators);

        let shapes: Vec<Option<Initializer>> = declarators
            .iter()
            .map(|d| ecma_variable_info(*d, &parsed.source).0)
            .collect();
        assert_eq!(shapes[0], Some(Initializer::Constructor("Foo".to_string())));
        assert_eq!(shapes[1], Some(Initializer::Call("make".to_string())));
        assert_eq!(shapes[2], Some(Initializer::Variable("a".to_string())));
        assert_eq!(shapes[3], Some(Initializer::Function));
    }
}
