//! Resolution across Python, Rust, and TypeScript projects: imports,
//! method dispatch, namespaces, re-export chains, and indirect
//! reachability.

use semgraph::{
    CallGraph, CallableNode, Confidence, DefKind, ProjectIndex, ResolutionReason,
};

fn node_named<'g>(graph: &'g CallGraph, name: &str) -> &'g CallableNode {
    graph
        .nodes
        .values()
        .find(|n| n.name == name)
        .unwrap_or_else(|| panic!("no callable named '{name}' in graph"))
}

#[test]
fn python_imports_resolve_across_files() {
    let mut project = ProjectIndex::new();
    project.update_file("lib.py", Some("def helper():\n    pass\n"));
    project.update_file(
        "app.py",
        Some("from lib import helper\n\ndef main():\n    helper()\n"),
    );

    let graph = project.get_call_graph(None);
    let helper = node_named(&graph, "helper");
    let main = node_named(&graph, "main");

    assert!(!graph.is_entry_point(&helper.symbol_id));
    assert!(graph.is_entry_point(&main.symbol_id));

    let call = &main.enclosed_calls[0];
    assert_eq!(call.resolutions[0].symbol_id, helper.symbol_id);
    assert_eq!(call.resolutions[0].confidence, Confidence::Certain);
}

#[test]
fn python_private_names_are_not_exported() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "lib.py",
        Some("def helper():\n    pass\n\ndef _internal():\n    pass\n"),
    );

    let exports = project.get_exports("lib.py");
    let names: Vec<&str> = exports.iter().map(|e| e.exported_name.as_str()).collect();
    assert_eq!(names, vec!["helper"]);
}

#[test]
fn python_instantiation_types_the_receiver() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "app.py",
        Some(
            "class A:\n\
             \x20   def m(self):\n\
             \x20       pass\n\
             \n\
             def run():\n\
             \x20   a = A()\n\
             \x20   a.m()\n\
             \n\
             run()\n",
        ),
    );

    let graph = project.get_call_graph(None);
    let run = node_named(&graph, "run");
    let m = node_named(&graph, "m");

    // a.m() dispatches through the inferred type of `a`.
    let method_call = run
        .enclosed_calls
        .iter()
        .find(|c| c.name == "m")
        .expect("a.m() enclosed in run");
    assert_eq!(method_call.resolutions.len(), 1);
    assert_eq!(method_call.resolutions[0].symbol_id, m.symbol_id);
    assert_eq!(method_call.resolutions[0].reason, ResolutionReason::Direct);

    // run() is invoked at module level; nothing is an entry point.
    assert!(!graph.is_entry_point(&run.symbol_id));
    assert!(!graph.is_entry_point(&m.symbol_id));
}

#[test]
fn rust_use_declarations_resolve_to_module_files() {
    let mut project = ProjectIndex::new();
    project.update_file("src/util.rs", Some("pub fn helper() {}\n"));
    project.update_file(
        "src/main.rs",
        Some("use crate::util::helper;\n\nfn main() {\n    helper();\n}\n"),
    );

    let graph = project.get_call_graph(None);
    let helper = node_named(&graph, "helper");
    let main = node_named(&graph, "main");

    assert!(!graph.is_entry_point(&helper.symbol_id));
    assert!(graph.is_entry_point(&main.symbol_id));
    assert_eq!(
        main.enclosed_calls[0].resolutions[0].symbol_id,
        helper.symbol_id
    );
}

#[test]
fn rust_static_and_instance_method_dispatch() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "src/point.rs",
        Some(
            "pub struct Point {\n\
             \x20   x: i32,\n\
             }\n\
             \n\
             impl Point {\n\
             \x20   pub fn new() -> Point {\n\
             \x20       Point { x: 0 }\n\
             \x20   }\n\
             \n\
             \x20   pub fn norm(&self) -> i32 {\n\
             \x20       self.x\n\
             \x20   }\n\
             }\n\
             \n\
             fn main() {\n\
             \x20   let p = Point::new();\n\
             \x20   p.norm();\n\
             }\n",
        ),
    );

    let graph = project.get_call_graph(None);
    let main = node_named(&graph, "main");
    assert_eq!(main.enclosed_calls.len(), 2);

    // Point::new() resolves as static dispatch on the type.
    let new_call = &main.enclosed_calls[0];
    assert_eq!(new_call.name, "new");
    assert_eq!(new_call.resolutions.len(), 1);
    assert_eq!(
        new_call.resolutions[0].symbol_id.as_str(),
        "constructor:module/Point:new"
    );

    // p.norm() dispatches through the inferred type of `p`.
    let norm_call = &main.enclosed_calls[1];
    assert_eq!(norm_call.name, "norm");
    assert_eq!(
        norm_call.resolutions[0].symbol_id.as_str(),
        "method:module/Point:norm"
    );

    assert!(graph.is_entry_point(&main.symbol_id));
}

#[test]
fn namespace_imports_resolve_members() {
    let mut project = ProjectIndex::new();
    project.update_file("lib.ts", Some("export function helper() {}"));
    project.update_file(
        "app.ts",
        Some("import * as lib from \"./lib\";\nfunction main() { lib.helper(); }"),
    );

    let graph = project.get_call_graph(None);
    let helper = node_named(&graph, "helper");
    let main = node_named(&graph, "main");

    assert_eq!(main.enclosed_calls.len(), 1);
    assert_eq!(
        main.enclosed_calls[0].resolutions[0].symbol_id,
        helper.symbol_id
    );
    assert!(!graph.is_entry_point(&helper.symbol_id));
}

#[test]
fn re_export_chains_lower_confidence_to_probable() {
    let mut project = ProjectIndex::new();
    project.update_file("lib.ts", Some("export function helper() {}"));
    project.update_file("mid.ts", Some("export { helper } from \"./lib\";"));
    project.update_file(
        "app.ts",
        Some("import { helper } from \"./mid\";\nfunction main() { helper(); }"),
    );

    let graph = project.get_call_graph(None);
    let main = node_named(&graph, "main");
    let resolution = &main.enclosed_calls[0].resolutions[0];
    assert_eq!(resolution.confidence, Confidence::Probable);
    assert_eq!(resolution.reason, ResolutionReason::ReExport);

    // Changing the origin reprocesses the whole chain.
    let result = project.update_file("lib.ts", Some("export function helper() { }"));
    assert!(result.dependents_reprocessed.contains(&"mid.ts".to_string()));
    assert!(result.dependents_reprocessed.contains(&"app.ts".to_string()));
}

#[test]
fn interface_receivers_dispatch_to_implementers() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "app.ts",
        Some(
            "interface Greeter { greet(): void; }\n\
             class Console implements Greeter { greet() {} }\n\
             function run(g: Greeter) { g.greet(); }\n",
        ),
    );

    let graph = project.get_call_graph(None);
    let run = node_named(&graph, "run");
    let call = &run.enclosed_calls[0];
    assert_eq!(call.resolutions.len(), 1);
    assert_eq!(call.resolutions[0].reason, ResolutionReason::Interface);
    assert_eq!(
        call.resolutions[0].symbol_id.as_str(),
        "method:module/Console:greet"
    );
}

#[test]
fn unknown_receiver_falls_back_to_unique_method_name() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "app.ts",
        Some("class Service { process() {} }\nfunction handle(svc) { svc.process(); }\n"),
    );

    let graph = project.get_call_graph(None);
    let handle = node_named(&graph, "handle");
    let call = &handle.enclosed_calls[0];
    assert_eq!(call.resolutions.len(), 1);
    assert_eq!(call.resolutions[0].confidence, Confidence::Probable);
    assert_eq!(call.resolutions[0].reason, ResolutionReason::UniqueName);
}

#[test]
fn functions_passed_as_arguments_are_indirectly_reachable() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "app.ts",
        Some(
            "export function worker() {}\n\
             function schedule(fn) { fn(); }\n\
             function dispatchAll() { schedule(worker); }\n",
        ),
    );

    let graph = project.get_call_graph(None);
    let worker = node_named(&graph, "worker");
    let dispatch_all = node_named(&graph, "dispatchAll");

    let reachable = graph
        .indirect_reachability
        .get(&dispatch_all.symbol_id)
        .expect("dispatchAll references worker indirectly");
    assert_eq!(reachable, &vec![worker.symbol_id.clone()]);

    // worker is never called directly, but indirect reachability keeps it
    // out of the entry points; dispatchAll itself is the entry.
    assert!(!graph.is_entry_point(&worker.symbol_id));
    assert!(graph.is_entry_point(&dispatch_all.symbol_id));
}

#[test]
fn definitions_carry_kinds_and_signatures() {
    let mut project = ProjectIndex::new();
    project.update_file(
        "app.ts",
        Some("export function add(a: number, b: number): number { return a + b; }\n"),
    );

    let definitions = project.get_definitions("app.ts");
    let add = definitions.iter().find(|d| d.name == "add").unwrap();
    assert_eq!(add.kind, DefKind::Function);
    assert!(add.is_exported());
    assert_eq!(add.parameters.len(), 2);
    assert_eq!(add.parameters[0].type_annotation.as_deref(), Some("number"));
    assert_eq!(add.return_type.as_deref(), Some("number"));
    assert!(add.signature.as_deref().unwrap().contains("function add"));
}
