//! Python support: capture query and behavior adapter.
//!
//! Python peculiarities handled here: the class body is a plain block (no
//! brace-delimited scope node), instantiation looks like a function call,
//! every public module-level definition is implicitly exported, and `self`
//! names the instance receiver.

use tree_sitter::Node;

use crate::indexing::references::CallType;
use crate::parsing::behavior::{
    CallableSignature, LanguageBehavior, RawCall, RawExport, RawImport, RawReceiver,
    clean_annotation, field_text, match_known_file, node_str, signature_before_body,
};
use crate::symbol::{Definition, Initializer, Parameter};
use crate::types::Range;

pub(crate) const QUERY: &str = r#"
; Scopes
(module) @local.scope.module
(function_definition) @local.scope.function
(class_definition) @local.scope.class
(lambda) @local.scope.function
(for_statement) @local.scope.for

; Definitions
(function_definition) @hoist.definition.function
(class_definition) @hoist.definition.class
(lambda) @local.definition.function
(parameters (identifier) @local.definition.parameter)
(typed_parameter (identifier) @local.definition.parameter)
(default_parameter name: (identifier) @local.definition.parameter)
(typed_default_parameter name: (identifier) @local.definition.parameter)
(lambda_parameters (identifier) @local.definition.parameter)
(assignment left: (identifier) @local.definition.variable)

; Imports
(import_statement) @local.import
(import_from_statement) @local.import

; References
(call) @reference.call
(identifier) @reference.read
"#;

/// Behavior adapter for Python.
pub struct PythonBehavior;

impl LanguageBehavior for PythonBehavior {
    fn is_test_definition(&self, name: &str, file_path: &str, _scope_path: &str) -> bool {
        let basename = file_path.rsplit('/').next().unwrap_or(file_path);
        name.starts_with("test_") || basename.starts_with("test_") || basename.ends_with("_test.py")
    }

    fn callable_signature(&self, node: Node, source: &str) -> CallableSignature {
        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for child in params.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" => parameters.push(Parameter {
                        name: node_str(child, source),
                        type_annotation: None,
                    }),
                    "typed_parameter" => {
                        let mut inner = child.walk();
                        let Some(name) = child
                            .named_children(&mut inner)
                            .find(|n| n.kind() == "identifier")
                        else {
                            continue;
                        };
                        parameters.push(Parameter {
                            name: node_str(name, source),
                            type_annotation: field_text(child, "type", source)
                                .map(|t| clean_annotation(&t)),
                        });
                    }
                    "default_parameter" | "typed_default_parameter" => {
                        let Some(name) = child.child_by_field_name("name") else {
                            continue;
                        };
                        if name.kind() != "identifier" {
                            continue;
                        }
                        parameters.push(Parameter {
                            name: node_str(name, source),
                            type_annotation: field_text(child, "type", source)
                                .map(|t| clean_annotation(&t)),
                        });
                    }
                    _ => {}
                }
            }
        }

        CallableSignature {
            parameters,
            return_type: field_text(node, "return_type", source).map(|t| clean_annotation(&t)),
            signature: signature_before_body(node, source),
        }
    }

    fn variable_info(&self, node: Node, source: &str) -> (Option<Initializer>, Option<String>) {
        // The capture lands on the left-hand identifier; the assignment
        // node is its parent.
        let Some(assignment) = node.parent().filter(|p| p.kind() == "assignment") else {
            return (None, None);
        };
        let annotation = field_text(assignment, "type", source).map(|t| clean_annotation(&t));
        let init = assignment
            .child_by_field_name("right")
            .map(|value| match value.kind() {
                "call" => match value.child_by_field_name("function") {
                    Some(f) if f.kind() == "identifier" => {
                        Initializer::Call(node_str(f, source))
                    }
                    _ => Initializer::Other,
                },
                "identifier" => Initializer::Variable(node_str(value, source)),
                "lambda" => Initializer::Function,
                _ => Initializer::Other,
            });
        (init, annotation)
    }

    fn class_heritage(&self, node: Node, source: &str) -> (Vec<String>, Vec<String>) {
        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                if base.kind() == "identifier" {
                    bases.push(node_str(base, source));
                }
            }
        }
        (bases, Vec::new())
    }

    fn collect_imports(&self, node: Node, source: &str) -> Vec<RawImport> {
        let range = Range::from_ts(node.range());
        let mut imports = Vec::new();

        match node.kind() {
            "import_from_statement" => {
                let Some(module) = node.child_by_field_name("module_name") else {
                    return imports;
                };
                let import_path = node_str(module, source);
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.id() == module.id() {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" | "identifier" => {
                            let name = node_str(child, source);
                            imports.push(RawImport {
                                import_path: import_path.clone(),
                                imported_name: name.clone(),
                                local_name: name,
                                is_namespace: false,
                                is_type_only: false,
                                range,
                            });
                        }
                        "aliased_import" => {
                            let Some(name) = field_text(child, "name", source) else {
                                continue;
                            };
                            let alias = field_text(child, "alias", source).unwrap_or(name.clone());
                            imports.push(RawImport {
                                import_path: import_path.clone(),
                                imported_name: name,
                                local_name: alias,
                                is_namespace: false,
                                is_type_only: false,
                                range,
                            });
                        }
                        "wildcard_import" => imports.push(RawImport {
                            import_path: import_path.clone(),
                            imported_name: "*".to_string(),
                            local_name: "*".to_string(),
                            is_namespace: true,
                            is_type_only: false,
                            range,
                        }),
                        _ => {}
                    }
                }
            }
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            let path = node_str(child, source);
                            let local = path.split('.').next().unwrap_or(&path).to_string();
                            imports.push(RawImport {
                                import_path: path,
                                imported_name: "*".to_string(),
                                local_name: local,
                                is_namespace: true,
                                is_type_only: false,
                                range,
                            });
                        }
                        "aliased_import" => {
                            let Some(path) = field_text(child, "name", source) else {
                                continue;
                            };
                            let alias = field_text(child, "alias", source)
                                .unwrap_or_else(|| path.clone());
                            imports.push(RawImport {
                                import_path: path,
                                imported_name: "*".to_string(),
                                local_name: alias,
                                is_namespace: true,
                                is_type_only: false,
                                range,
                            });
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        imports
    }

    fn implicit_export(&self, def: &Definition) -> bool {
        !def.name.starts_with('_')
    }

    fn resolve_import_target(
        &self,
        import_path: &str,
        importing_file: &str,
        known_files: &[String],
    ) -> Option<String> {
        let dots = import_path.len() - import_path.trim_start_matches('.').len();
        let tail = import_path.trim_start_matches('.');
        let tail_path = tail.replace('.', "/");

        let mut candidates = Vec::new();
        if dots > 0 {
            // Relative import: one dot is the importing file's package,
            // each extra dot walks one package up.
            let dir = importing_file
                .rfind('/')
                .map(|idx| &importing_file[..idx])
                .unwrap_or("");
            let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
            for _ in 1..dots {
                segments.pop();
            }
            let mut base = segments.join("/");
            if !tail_path.is_empty() {
                if !base.is_empty() {
                    base.push('/');
                }
                base.push_str(&tail_path);
            }
            candidates.push(format!("{base}.py"));
            candidates.push(format!("{base}/__init__.py"));
        } else {
            candidates.push(format!("{tail_path}.py"));
            candidates.push(format!("{tail_path}/__init__.py"));
        }

        match_known_file(&candidates, known_files)
    }

    fn call_info(&self, node: Node, source: &str) -> Option<RawCall> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => Some(RawCall {
                call_type: CallType::Function,
                name: node_str(function, source),
                name_range: Range::from_ts(function.range()),
                receiver: None,
                anonymous_callee: false,
            }),
            "attribute" => {
                let attribute = function.child_by_field_name("attribute")?;
                let object = function.child_by_field_name("object")?;
                Some(RawCall {
                    call_type: CallType::Method,
                    name: node_str(attribute, source),
                    name_range: Range::from_ts(attribute.range()),
                    receiver: Some(RawReceiver {
                        text: node_str(object, source),
                        range: Range::from_ts(object.range()),
                        is_static: false,
                    }),
                    anonymous_callee: false,
                })
            }
            "lambda" | "parenthesized_expression" => Some(RawCall {
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
        text == "self" || text == "cls"
    }

    fn constructor_names(&self) -> &'static [&'static str] {
        &["__init__"]
    }

    fn treats_class_call_as_constructor(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, ParsedFile};

    fn parse(source: &str) -> ParsedFile {
        ParsedFile::parse("a.py", source, Language::Python).unwrap()
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
    fn query_compiles_against_python_grammar() {
        Language::Python.dialect("a.py").query().unwrap();
    }

    #[test]
    fn collects_from_imports_with_aliases() {
        let parsed = parse("from .lib import helper, other as renamed\n");
        let behavior = PythonBehavior;
        let import = find_node(parsed.tree.root_node(), "import_from_statement").unwrap();
        let records = behavior.collect_imports(import, &parsed.source);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].import_path, ".lib");
        assert_eq!(records[0].imported_name, "helper");
        assert_eq!(records[1].local_name, "renamed");
    }

    #[test]
    fn module_imports_bind_namespaces() {
        let parsed = parse("import os.path\nimport json as j\n");
        let behavior = PythonBehavior;
        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        let statements: Vec<Node> = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "import_statement")
            .collect();

        let first = behavior.collect_imports(statements[0], &parsed.source);
        assert!(first[0].is_namespace);
        assert_eq!(first[0].import_path, "os.path");
        assert_eq!(first[0].local_name, "os");

        let second = behavior.collect_imports(statements[1], &parsed.source);
        assert_eq!(second[0].local_name, "j");
    }

    #[test]
    fn relative_import_resolves_to_sibling() {
        let behavior = PythonBehavior;
        let known = vec!["pkg/lib.py".to_string(), "pkg/app.py".to_string()];
        assert_eq!(
            behavior
                .resolve_import_target(".lib", "pkg/app.py", &known)
                .as_deref(),
            Some("pkg/lib.py")
        );
    }

    #[test]
    fn absolute_import_resolves_by_suffix() {
        let behavior = PythonBehavior;
        let known = vec!["proj/utils/text.py".to_string()];
        assert_eq!(
            behavior
                .resolve_import_target("utils.text", "proj/main.py", &known)
                .as_deref(),
            Some("proj/utils/text.py")
        );
    }

    #[test]
    fn classifies_calls_and_methods() {
        let parsed = parse("f()\nobj.m()\n");
        let behavior = PythonBehavior;
        let root = parsed.tree.root_node();

        let call = find_node(root, "call").unwrap();
        let info = behavior.call_info(call, &parsed.source).unwrap();
        assert_eq!(info.call_type, CallType::Function);
        assert_eq!(info.name, "f");

        assert!(behavior.treats_class_call_as_constructor());
        assert!(behavior.is_self_receiver("self"));
    }

    #[test]
    fn heritage_lists_superclasses() {
        let parsed = parse("class B(A):\n    pass\n");
        let behavior = PythonBehavior;
        let class = find_node(parsed.tree.root_node(), "class_definition").unwrap();
        let (bases, _) = behavior.class_heritage(class, &parsed.source);
        assert_eq!(bases, vec!["A".to_string()]);
    }
}
