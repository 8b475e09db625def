//! JavaScript support: capture query and behavior adapter.
//!
//! JSX parses with the same grammar, so `.jsx` needs no dialect split. The
//! AST walkers are shared with TypeScript; only the query differs (no type
//! productions, `field_definition` instead of `public_field_definition`).

use tree_sitter::Node;

use crate::parsing::behavior::{
    CallableSignature, LanguageBehavior, RawCall, RawExport, RawImport,
};
use crate::parsing::typescript::{
    ecma_call_info, ecma_callable_signature, ecma_class_heritage, ecma_collect_exports,
    ecma_collect_imports, ecma_is_const_declarator, ecma_resolve_import_target, ecma_test_file,
    ecma_variable_info,
};
use crate::symbol::Initializer;

pub(crate) const QUERY: &str = r#"
; Scopes
(program) @local.scope.module
(function_declaration) @local.scope.function
(generator_function_declaration) @local.scope.function
(function_expression) @local.scope.function
(arrow_function) @local.scope.function
(method_definition) @local.scope.method
(class_declaration) @local.scope.class
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
(method_definition) @local.definition.method
(field_definition) @local.definition.property
(variable_declarator) @local.definition.variable
(formal_parameters (identifier) @local.definition.parameter)
(formal_parameters (assignment_pattern left: (identifier) @local.definition.parameter))
(arrow_function parameter: (identifier) @local.definition.parameter)

; Imports and exports
(import_statement) @local.import
(export_statement) @local.export

; References
(call_expression) @reference.call
(new_expression) @reference.call
(assignment_expression left: (identifier) @reference.write)
(identifier) @reference.read
"#;

/// Behavior adapter for JavaScript and JSX.
pub struct JavaScriptBehavior;

impl LanguageBehavior for JavaScriptBehavior {
    fn is_test_definition(&self, _name: &str, file_path: &str, _scope_path: &str) -> bool {
        ecma_test_file(file_path)
    }

    fn definition_name(
        &self,
        node: Node,
        source: &str,
    ) -> Option<(String, crate::types::Range)> {
        // Class fields hang their name off a `property` field.
        if node.kind() == "field_definition" {
            let name = node.child_by_field_name("property")?;
            return Some((
                crate::parsing::behavior::node_str(name, source),
                crate::types::Range::from_ts(name.range()),
            ));
        }
        crate::parsing::behavior::default_definition_name(node, source)
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
            &["js", "jsx", "ts", "tsx"],
        )
    }

    fn call_info(&self, node: Node, source: &str) -> Option<RawCall> {
        ecma_call_info(node, source)
    }

    fn is_self_receiver(&self, text: &str) -> bool {
        text == "this"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{Language, ParsedFile};

    #[test]
    fn query_compiles_against_javascript_grammar() {
        Language::JavaScript.dialect("a.js").query().unwrap();
    }

    #[test]
    fn jsx_parses_with_the_same_grammar() {
        let parsed = ParsedFile::parse(
            "App.jsx",
            "const App = () => <div>hi</div>;",
            Language::JavaScript,
        )
        .unwrap();
        assert!(!parsed.tree.root_node().has_error());
    }

    #[test]
    fn behavior_resolves_sibling_imports() {
        let known = vec!["lib.js".to_string(), "app.js".to_string()];
        let behavior = JavaScriptBehavior;
        assert_eq!(
            behavior
                .resolve_import_target("./lib", "app.js", &known)
                .as_deref(),
            Some("lib.js")
        );
    }
}
