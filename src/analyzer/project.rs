use crate::analyzer::parser;
use crate::analyzer::rules::helpers::{child_by_kind, node_text, walk_node};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Namespace and symbol data for every analysed file.
#[derive(Default)]
pub struct ProjectContext {
    file_scopes: HashMap<PathBuf, FileScope>,
    declared_functions: HashSet<String>,
}

pub struct FileMetadata {
    pub namespace: Option<String>,
    /// Lowercase alias to imported function, from `use function` declarations.
    pub function_imports: HashMap<String, String>,
    /// Fully qualified names of the functions the file declares.
    pub functions: Vec<String>,
}

/// Namespace and imports of a single file.
pub struct FileScope {
    pub namespace: Option<String>,
    function_imports: HashMap<String, String>,
}

impl FileScope {
    /// Target of a `use function` import aliased as `alias`.
    pub fn imported_function(&self, alias: &str) -> Option<&str> {
        self.function_imports
            .get(&alias.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl ProjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parsed: &parser::ParsedSource) {
        let metadata = collect_file_metadata(parsed);
        self.insert_metadata(parsed.path.clone(), metadata);
    }

    pub fn insert_metadata(&mut self, path: PathBuf, metadata: FileMetadata) {
        let FileMetadata {
            namespace,
            function_imports,
            functions,
        } = metadata;

        self.declared_functions
            .extend(functions.iter().map(|fq_name| fq_name.to_ascii_lowercase()));
        self.file_scopes.insert(
            path,
            FileScope {
                namespace,
                function_imports,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.file_scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_scopes.is_empty()
    }

    pub fn scope_for(&self, path: &Path) -> Option<&FileScope> {
        self.file_scopes.get(path)
    }

    /// `true` when some analysed file declares the fully qualified function `fq_name`.
    /// Function names are case-insensitive.
    pub fn declares_function(&self, fq_name: &str) -> bool {
        self.declared_functions
            .contains(&fq_name.trim_start_matches('\\').to_ascii_lowercase())
    }
}

fn collect_namespace(parsed: &parser::ParsedSource) -> Option<String> {
    let mut namespace = None;

    walk_node(parsed.tree.root_node(), &mut |node| {
        if namespace.is_some() {
            return;
        }

        if node.kind() == "namespace_definition" {
            if let Some(name_node) = child_by_kind(node, "namespace_name") {
                if let Some(name) = node_text(name_node, parsed) {
                    namespace = Some(name);
                }
            }
        }
    });

    namespace
}

/// `use function ...;` as opposed to class or constant imports.
fn is_function_use(declaration: Node) -> bool {
    (0..declaration.child_count())
        .filter_map(|idx| declaration.child(idx))
        .any(|child| child.kind() == "function")
}

fn collect_function_imports(parsed: &parser::ParsedSource) -> HashMap<String, String> {
    let mut imports = HashMap::new();

    walk_node(parsed.tree.root_node(), &mut |node| {
        if node.kind() != "namespace_use_declaration" || !is_function_use(node) {
            return;
        }

        for idx in 0..node.named_child_count() {
            let Some(clause) = node.named_child(idx) else {
                continue;
            };
            if clause.kind() != "namespace_use_clause" {
                continue;
            }

            let Some(target_node) =
                child_by_kind(clause, "qualified_name").or_else(|| child_by_kind(clause, "name"))
            else {
                continue;
            };
            let Some(target) = node_text(target_node, parsed) else {
                continue;
            };
            let Some(alias_node) = alias_node_from_clause(clause, target_node) else {
                continue;
            };
            let Some(alias) = node_text(alias_node, parsed) else {
                continue;
            };

            imports.insert(
                alias.to_ascii_lowercase(),
                target.trim_start_matches('\\').to_owned(),
            );
        }
    });

    imports
}

fn alias_node_from_clause<'a>(clause: Node<'a>, target: Node<'a>) -> Option<Node<'a>> {
    if let Some(alias_clause) = child_by_kind(clause, "namespace_aliasing_clause") {
        if let Some(alias_name) = child_by_kind(alias_clause, "name") {
            return Some(alias_name);
        }
    }

    // `use function foo as bar;` may expose the alias as a second `name` child.
    let names: Vec<Node> = (0..clause.named_child_count())
        .filter_map(|idx| clause.named_child(idx))
        .filter(|child| child.kind() == "name")
        .collect();
    if names.len() > 1 {
        return names.last().copied();
    }

    if target.kind() == "qualified_name" {
        return last_name_in_node(target);
    }

    Some(target)
}

fn last_name_in_node<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut last = None;
    for idx in 0..node.named_child_count() {
        if let Some(child) = node.named_child(idx) {
            if child.kind() == "name" {
                last = Some(child);
            }
        }
    }
    last
}

fn collect_declared_functions(
    parsed: &parser::ParsedSource,
    namespace: Option<&str>,
) -> Vec<String> {
    let mut functions = Vec::new();

    walk_node(parsed.tree.root_node(), &mut |node| {
        if node.kind() != "function_definition" {
            return;
        }

        if let Some(name_node) = child_by_kind(node, "name") {
            if let Some(name) = node_text(name_node, parsed) {
                functions.push(qualify_name(namespace, &name));
            }
        }
    });

    functions
}

pub fn collect_file_metadata(parsed: &parser::ParsedSource) -> FileMetadata {
    let namespace = collect_namespace(parsed);
    let function_imports = collect_function_imports(parsed);
    let functions = collect_declared_functions(parsed, namespace.as_deref());

    FileMetadata {
        namespace,
        function_imports,
        functions,
    }
}

fn qualify_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}\\{name}"),
        None => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::parse_php;

    #[test]
    fn collects_namespace_functions_and_imports() {
        let parsed = parse_php(
            r#"<?php
namespace App\Compat;

use Vendor\Thing;
use const Vendor\Math\PI;
use function Vendor\Polyfill\str_contains;
use function array_key_first as first_key;

function str_starts_with($haystack, $needle) {}
"#,
        );

        let mut project = ProjectContext::new();
        project.insert(&parsed);
        let scope = project.scope_for(&parsed.path).unwrap();

        assert_eq!(scope.namespace.as_deref(), Some("App\\Compat"));
        assert_eq!(
            scope.imported_function("Str_Contains"),
            Some("Vendor\\Polyfill\\str_contains")
        );
        assert_eq!(scope.imported_function("first_key"), Some("array_key_first"));
        assert_eq!(scope.imported_function("Thing"), None);
        assert_eq!(scope.imported_function("PI"), None);
        assert!(project.declares_function("\\app\\compat\\STR_STARTS_WITH"));
        assert!(!project.declares_function("str_starts_with"));
    }

    #[test]
    fn global_functions_are_declared_without_namespace() {
        let parsed = parse_php("<?php\nfunction helper() {}\n");
        let mut project = ProjectContext::new();
        project.insert(&parsed);
        assert!(project.declares_function("helper"));
        assert_eq!(project.len(), 1);
        assert!(!project.declares_function("other\\helper"));
    }
}
