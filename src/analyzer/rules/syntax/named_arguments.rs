use std::collections::BTreeMap;

use tree_sitter::Node;

use crate::analyzer::compose::{Subject, compose_named_argument};
use crate::analyzer::features::{FeatureRecord, LifecycleStatus, resolve_introduction};
use crate::analyzer::matcher::collect_arguments;
use crate::analyzer::parser;
use crate::analyzer::rules::helpers::{child_by_kind, diagnostic_for_span, node_text, walk_node};
use crate::analyzer::rules::{DiagnosticRule, RuleContext};
use crate::analyzer::version::Version;
use crate::analyzer::Diagnostic;

/// Flags `name: $value` arguments when the range reaches PHP 7.4 or earlier.
///
/// Applies to every kind of call, not only global functions: methods, static
/// methods and constructors accept named arguments the same way.
pub struct NamedArgumentsRule {
    record: FeatureRecord,
}

impl NamedArgumentsRule {
    pub fn new() -> Self {
        Self {
            record: FeatureRecord::new(
                "named arguments",
                vec![
                    (Version::major_minor(7, 4), LifecycleStatus::NotYetPresent),
                    (Version::major_minor(8, 0), LifecycleStatus::Present),
                ],
                BTreeMap::new(),
            ),
        }
    }
}

impl Default for NamedArgumentsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRule for NamedArgumentsRule {
    fn name(&self) -> &str {
        "syntax/named_arguments"
    }

    fn run(&self, parsed: &parser::ParsedSource, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        let Some(gap) = resolve_introduction(&self.record, context.versions) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        walk_node(parsed.tree.root_node(), &mut |node| {
            let Some((callee, arguments)) = call_parts(node, parsed) else {
                return;
            };
            let key = callee.to_ascii_lowercase();

            for argument in collect_arguments(arguments, parsed) {
                let Some(label) = argument.name.as_deref() else {
                    continue;
                };
                let subject = Subject::parameter(&callee, &key, label);
                diagnostics.push(diagnostic_for_span(
                    parsed,
                    argument.span.clone(),
                    self.name(),
                    compose_named_argument(&subject, &gap),
                ));
            }
        });

        diagnostics
    }
}

/// The callee as it should appear in a message, and the argument list.
fn call_parts<'t>(node: Node<'t>, parsed: &parser::ParsedSource) -> Option<(String, Node<'t>)> {
    let (callee, arguments) = match node.kind() {
        "function_call_expression" => {
            let function = node.child_by_field_name("function")?;
            let text = node_text(function, parsed)?;
            (text.trim_start_matches('\\').to_owned(), node.child_by_field_name("arguments")?)
        }
        "member_call_expression" | "nullsafe_member_call_expression" => {
            let name = node_text(node.child_by_field_name("name")?, parsed)?;
            (name, node.child_by_field_name("arguments")?)
        }
        "scoped_call_expression" => {
            let scope = node_text(node.child_by_field_name("scope")?, parsed)?;
            let name = node_text(node.child_by_field_name("name")?, parsed)?;
            (format!("{scope}::{name}"), node.child_by_field_name("arguments")?)
        }
        "object_creation_expression" => {
            let class = child_by_kind(node, "qualified_name")
                .or_else(|| child_by_kind(node, "name"))
                .and_then(|class| node_text(class, parsed))?;
            (class, child_by_kind(node, "arguments")?)
        }
        _ => return None,
    };

    Some((callee, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, parse_php, run_rule, run_rule_for,
    };

    #[test]
    fn named_argument_to_a_function_is_flagged() {
        let source = "<?php\n$parts = str_pad(string: $text, length: 10);\n";
        let diagnostics = run_rule_for(&NamedArgumentsRule::new(), source, "7.4-8.0");

        assert_diagnostics_exact(
            &diagnostics,
            &[
                "error: Using named arguments in function calls is not supported in PHP 7.4 or earlier. Found: \"string\" passed to str_pad()",
                "error: Using named arguments in function calls is not supported in PHP 7.4 or earlier. Found: \"length\" passed to str_pad()",
            ],
        );
        assert_eq!(diagnostics[0].code, "named_argumentsFound");
    }

    #[test]
    fn methods_and_constructors_are_covered() {
        let source = r#"<?php
$repo->find(id: 1);
Cache::remember(key: 'a');
$point = new Point(x: 1, y: 2);
"#;
        let diagnostics = run_rule_for(&NamedArgumentsRule::new(), source, "7.0");
        let callees: Vec<&str> = diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message.rsplit(" passed to ").next().unwrap_or(""))
            .collect();

        assert_eq!(callees, ["find()", "Cache::remember()", "Point()", "Point()"]);
    }

    #[test]
    fn positional_and_unpacked_arguments_are_clean() {
        let source = "<?php\nstr_pad($text, 10);\nprintf('%s', ...$values);\n$flag = $a ? $b : $c;\n";
        assert_no_diagnostics(&run_rule_for(&NamedArgumentsRule::new(), source, "5.6"));
    }

    #[test]
    fn ranges_from_php_8_are_clean() {
        let source = "<?php\nstr_pad(string: $text, length: 10);\n";
        assert_no_diagnostics(&run_rule_for(&NamedArgumentsRule::new(), source, "8.0-"));
        assert_no_diagnostics(&run_rule(&NamedArgumentsRule::new(), &parse_php(source)));
    }
}
