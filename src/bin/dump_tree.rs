//! Prints the tree-sitter CST of a PHP file and marks every `name` token with
//! how the call-site matcher classifies it.

use std::path::Path;

use anyhow::{Context, Result};
use php_compat::analyzer::matcher::{Classification, MatchEngine};
use php_compat::analyzer::parser::{PhpParser, TreeSitterPhpParser};
use php_compat::analyzer::project::ProjectContext;
use tree_sitter::Node;

fn print_node(node: Node, source: &str, engine: &MatchEngine, indent: usize) {
    let text = node
        .utf8_text(source.as_bytes())
        .unwrap_or("<invalid utf8>");
    let marker = if node.kind() == "name" {
        match engine.classify(node) {
            Classification::Candidate => "  <= call".to_string(),
            Classification::Rejected(rejection) => format!("  ({rejection:?})"),
        }
    } else {
        String::new()
    };

    println!(
        "{:indent$}{} [{:?}:{:?}] {:?}{}",
        "",
        node.kind(),
        node.start_position(),
        node.end_position(),
        text.trim(),
        marker,
        indent = indent * 2
    );

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            print_node(cursor.node(), source, engine, indent + 1);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn main() -> Result<()> {
    let path = std::env::args().nth(1).context("path argument missing")?;

    let mut parser = TreeSitterPhpParser::new()?;
    let parsed = parser.parse_file(Path::new(&path))?;

    let mut project = ProjectContext::new();
    project.insert(&parsed);
    let engine = MatchEngine::new(&parsed, &project);

    print_node(parsed.tree.root_node(), &parsed.source, &engine, 0);
    Ok(())
}
