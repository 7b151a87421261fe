use crate::analyzer::compose::Composed;
use crate::analyzer::parser;
use crate::analyzer::{Diagnostic, Span};
use tree_sitter::Node;

pub fn span_for_node(node: Node) -> Span {
    Span {
        start: node.start_position(),
        end: node.end_position(),
    }
}

pub fn diagnostic_for_span(
    parsed: &parser::ParsedSource,
    span: Span,
    rule: &str,
    composed: Composed,
) -> Diagnostic {
    let snippet_before = span
        .start
        .row
        .checked_sub(1)
        .and_then(|row| line_at(parsed.source.as_str(), row));

    let snippet_line = line_at(parsed.source.as_str(), span.start.row);
    let snippet_after = line_at(parsed.source.as_str(), span.start.row + 1);
    let caret_col = Some(span.start.column);
    let caret_len = if span.start.row == span.end.row {
        span.end.column.saturating_sub(span.start.column).max(1)
    } else {
        1
    };

    let Composed {
        severity,
        code,
        message,
    } = composed;

    Diagnostic::with_span(
        parsed.path.clone(),
        severity,
        message,
        span,
        snippet_before,
        snippet_line,
        snippet_after,
        caret_col,
        caret_len,
    )
    .with_code(code)
    .with_rule(rule)
}

pub fn line_at(source: &str, row: usize) -> Option<String> {
    source.lines().nth(row).map(ToOwned::to_owned)
}

pub fn walk_node<'a, F>(node: Node<'a>, callback: &mut F)
where
    F: FnMut(Node<'a>),
{
    callback(node);
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            walk_node(cursor.node(), callback);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

pub fn child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    for idx in 0..node.named_child_count() {
        if let Some(child) = node.named_child(idx) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

pub fn node_text(node: Node, parsed: &parser::ParsedSource) -> Option<String> {
    node.utf8_text(parsed.source.as_bytes())
        .ok()
        .map(str::trim)
        .map(ToOwned::to_owned)
}
