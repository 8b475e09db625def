//! The import graph.
//!
//! Tracks which files import which, maintained by diffing each file's
//! resolved import targets on update. `dependents_closure` yields the
//! changed file followed by its transitive importers in topological order,
//! with lexicographic tie-breaking; files on an import cycle are processed
//! once, in stable lexicographic order within the cycle.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::trace;

#[derive(Debug, Default)]
pub struct ImportGraph {
    /// file -> files it imports (resolved targets only).
    imports_of: BTreeMap<String, BTreeSet<String>>,
    /// file -> files importing it.
    imported_by: BTreeMap<String, BTreeSet<String>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `file`'s outgoing edges, diffing against the previous set so
    /// reverse edges stay consistent.
    pub fn set_imports(&mut self, file: &str, targets: BTreeSet<String>) {
        let old = self.imports_of.get(file).cloned().unwrap_or_default();
        for removed in old.difference(&targets) {
            if let Some(importers) = self.imported_by.get_mut(removed) {
                importers.remove(file);
                if importers.is_empty() {
                    self.imported_by.remove(removed);
                }
            }
        }
        for added in targets.difference(&old) {
            trace!(importer = file, target = %added, "import edge added");
            self.imported_by
                .entry(added.clone())
                .or_default()
                .insert(file.to_string());
        }
        if targets.is_empty() {
            self.imports_of.remove(file);
        } else {
            self.imports_of.insert(file.to_string(), targets);
        }
    }

    /// Drop `file` as an importer. Inbound edges survive: other files may
    /// still name it and re-resolve when it reappears.
    pub fn remove_file(&mut self, file: &str) {
        self.set_imports(file, BTreeSet::new());
    }

    pub fn importers_of(&self, file: &str) -> impl Iterator<Item = &String> {
        self.imported_by.get(file).into_iter().flatten()
    }

    pub fn imports_of(&self, file: &str) -> impl Iterator<Item = &String> {
        self.imports_of.get(file).into_iter().flatten()
    }

    /// The changed file plus every transitive importer, topologically
    /// ordered (dependencies before dependents). Within one topological
    /// level and within cycles the order is lexicographic; every file
    /// appears exactly once.
    pub fn dependents_closure(&self, file: &str) -> Vec<String> {
        // Collect the affected set by walking reverse edges.
        let mut affected: BTreeSet<String> = BTreeSet::new();
        let mut queue = VecDeque::new();
        affected.insert(file.to_string());
        queue.push_back(file.to_string());
        while let Some(current) = queue.pop_front() {
            for importer in self.importers_of(&current) {
                if affected.insert(importer.clone()) {
                    queue.push_back(importer.clone());
                }
            }
        }

        // Kahn's algorithm over the induced subgraph, edges pointing from a
        // file to its importers.
        let mut indegree: BTreeMap<String, usize> =
            affected.iter().map(|f| (f.clone(), 0)).collect();
        for member in &affected {
            for importer in self.importers_of(member) {
                if affected.contains(importer) && importer != member {
                    *indegree.get_mut(importer).unwrap() += 1;
                }
            }
        }

        let mut order = Vec::with_capacity(affected.len());
        let mut done: HashSet<String> = HashSet::new();

        // The changed file always leads.
        order.push(file.to_string());
        done.insert(file.to_string());
        self.release_importers(file, &affected, &mut indegree);

        loop {
            // BTreeMap iteration gives the lexicographic tie-break; when no
            // zero-indegree file remains we are inside a cycle and take the
            // lexicographically smallest member.
            let mut next: Option<String> = None;
            for (f, degree) in indegree.iter() {
                if *degree == 0 && !done.contains(f) {
                    next = Some(f.clone());
                    break;
                }
            }
            if next.is_none() {
                for f in indegree.keys() {
                    if !done.contains(f) {
                        next = Some(f.clone());
                        break;
                    }
                }
            }
            let Some(next) = next else {
                break;
            };
            done.insert(next.clone());
            self.release_importers(&next, &affected, &mut indegree);
            order.push(next);
        }

        order
    }

    fn release_importers(
        &self,
        current: &str,
        affected: &BTreeSet<String>,
        indegree: &mut BTreeMap<String, usize>,
    ) {
        let importers: Vec<String> = self
            .importers_of(current)
            .filter(|i| affected.contains(*i))
            .cloned()
            .collect();
        for importer in importers {
            if let Some(degree) = indegree.get_mut(&importer) {
                *degree = degree.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(files: &[&str]) -> BTreeSet<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tracks_reverse_edges() {
        let mut graph = ImportGraph::new();
        graph.set_imports("app.ts", targets(&["lib.ts"]));
        graph.set_imports("other.ts", targets(&["lib.ts"]));

        let importers: Vec<&String> = graph.importers_of("lib.ts").collect();
        assert_eq!(importers.len(), 2);

        graph.set_imports("app.ts", targets(&[]));
        let importers: Vec<&String> = graph.importers_of("lib.ts").collect();
        assert_eq!(importers, vec!["other.ts"]);
    }

    #[test]
    fn closure_orders_dependencies_first() {
        let mut graph = ImportGraph::new();
        // app -> lib -> core (app imports lib, lib imports core)
        graph.set_imports("app.ts", targets(&["lib.ts"]));
        graph.set_imports("lib.ts", targets(&["core.ts"]));

        let order = graph.dependents_closure("core.ts");
        assert_eq!(order, vec!["core.ts", "lib.ts", "app.ts"]);
    }

    #[test]
    fn closure_of_leaf_is_itself() {
        let mut graph = ImportGraph::new();
        graph.set_imports("app.ts", targets(&["lib.ts"]));
        assert_eq!(graph.dependents_closure("app.ts"), vec!["app.ts"]);
    }

    #[test]
    fn cycles_are_processed_once_in_stable_order() {
        let mut graph = ImportGraph::new();
        graph.set_imports("a.ts", targets(&["b.ts"]));
        graph.set_imports("b.ts", targets(&["a.ts"]));

        let order = graph.dependents_closure("a.ts");
        assert_eq!(order.len(), 2);
        assert_eq!(order[0], "a.ts");
        assert_eq!(order[1], "b.ts");

        // Deterministic across calls.
        assert_eq!(order, graph.dependents_closure("a.ts"));
    }

    #[test]
    fn diamond_orders_lexicographically_within_level() {
        let mut graph = ImportGraph::new();
        // b and c both import core; app imports b and c.
        graph.set_imports("b.ts", targets(&["core.ts"]));
        graph.set_imports("c.ts", targets(&["core.ts"]));
        graph.set_imports("app.ts", targets(&["b.ts", "c.ts"]));

        let order = graph.dependents_closure("core.ts");
        assert_eq!(order, vec!["core.ts", "b.ts", "c.ts", "app.ts"]);
    }

    #[test]
    fn removal_keeps_inbound_edges() {
        let mut graph = ImportGraph::new();
        graph.set_imports("app.ts", targets(&["lib.ts"]));
        graph.remove_file("lib.ts");
        // app still imports lib; a future lib revision must reprocess app.
        let order = graph.dependents_closure("lib.ts");
        assert_eq!(order, vec!["lib.ts", "app.ts"]);
    }
}
