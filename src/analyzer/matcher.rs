//! Decides whether a `name` token is a genuine call to a global function and
//! describes the arguments passed to it.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use tree_sitter::Node;

use super::features::ParameterSet;
use super::parser::ParsedSource;
use super::project::{FileScope, ProjectContext};
use super::rules::helpers::{child_by_kind, node_text, span_for_node};
use super::Span;

static NAMED_ARGUMENT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_\x80-\xff][A-Za-z0-9_\x80-\xff]*)\s*:").unwrap());

/// Why a `name` token is not a call to a global function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `$obj->name()` or `$obj?->name()`.
    MemberAccess,
    /// `Foo::name()`.
    StaticAccess,
    /// `new name()`.
    Instantiation,
    /// The token declares something: a function, method, constant, class or import.
    Declaration,
    /// `Foo\name()` or `namespace\name()`.
    Namespaced,
    /// Resolves to a function the project declares or imports from a namespace.
    UserDefined,
    /// The token is not in callee position, e.g. a constant or an argument label.
    NotACall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Candidate,
    Rejected(Rejection),
}

/// One entry of an argument list.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Index in the argument list.
    pub position: usize,
    /// Label of a named argument (`name: $value`).
    pub name: Option<String>,
    /// `...$values`.
    pub unpacked: bool,
    pub text: String,
    pub span: Span,
}

/// A call to a global function.
#[derive(Debug, Clone)]
pub struct CallSite<'t> {
    /// Spelling at the call site, without a leading `\`.
    pub name: String,
    /// Lowercase lookup key.
    pub key: String,
    pub name_node: Node<'t>,
    pub arguments: Vec<Argument>,
    /// `name(...)`: the function is referenced, not called.
    pub first_class_callable: bool,
}

impl CallSite<'_> {
    pub fn name_span(&self) -> Span {
        span_for_node(self.name_node)
    }

    /// Number of arguments passed by position before any named or unpacked one.
    pub fn positional_count(&self) -> usize {
        self.arguments
            .iter()
            .take_while(|arg| arg.name.is_none() && !arg.unpacked)
            .count()
    }

    pub fn has_unpacking(&self) -> bool {
        self.arguments.iter().any(|arg| arg.unpacked)
    }

    /// Zero-based parameter offsets this call provably supplies. Named arguments
    /// resolve through the parameter names the table declares.
    pub fn supplied_offsets(&self, parameters: Option<&ParameterSet>) -> BTreeSet<usize> {
        let mut offsets: BTreeSet<usize> = (0..self.positional_count()).collect();

        if let Some(parameters) = parameters {
            offsets.extend(
                self.arguments
                    .iter()
                    .filter_map(|arg| arg.name.as_deref())
                    .filter_map(|name| parameters.offset_of(name)),
            );
        }

        offsets
    }

    pub fn highest_supplied_offset(&self, parameters: Option<&ParameterSet>) -> Option<usize> {
        self.supplied_offsets(parameters).last().copied()
    }

    pub fn is_supplied(&self, offset: usize, parameters: Option<&ParameterSet>) -> bool {
        self.supplied_offsets(parameters).contains(&offset)
    }

    /// The argument that supplies `offset`, if any.
    pub fn argument_for(
        &self,
        offset: usize,
        parameters: Option<&ParameterSet>,
    ) -> Option<&Argument> {
        if offset < self.positional_count() {
            return self.arguments.get(offset);
        }

        let name = parameters?.get(offset)?.parameter_name()?;
        self.arguments
            .iter()
            .find(|arg| arg.name.as_deref() == Some(name))
    }
}

/// Classifies `name` tokens of one file.
pub struct MatchEngine<'a> {
    parsed: &'a ParsedSource,
    project: &'a ProjectContext,
    scope: Option<&'a FileScope>,
}

impl<'a> MatchEngine<'a> {
    pub fn new(parsed: &'a ParsedSource, project: &'a ProjectContext) -> Self {
        Self {
            parsed,
            project,
            scope: project.scope_for(&parsed.path),
        }
    }

    pub fn classify(&self, node: Node) -> Classification {
        match self.rejection(node) {
            Some(rejection) => Classification::Rejected(rejection),
            None => Classification::Candidate,
        }
    }

    /// Returns the call site when `node` is the name of a genuine global function call.
    pub fn try_match<'t>(&self, node: Node<'t>) -> Option<CallSite<'t>> {
        if node.kind() != "name" {
            return None;
        }

        if let Some(rejection) = self.rejection(node) {
            if rejection != Rejection::NotACall {
                trace!(
                    file = %self.parsed.path.display(),
                    line = node.start_position().row + 1,
                    ?rejection,
                    "call site rejected"
                );
            }
            return None;
        }

        let name = node_text(node, self.parsed)?;
        let key = self.resolved_key(&name);
        let call = callee(node).parent()?;
        let arguments = call.child_by_field_name("arguments")?;

        Some(CallSite {
            key,
            name,
            name_node: node,
            first_class_callable: is_first_class_callable(arguments, self.parsed),
            arguments: collect_arguments(arguments, self.parsed),
        })
    }

    fn rejection(&self, node: Node) -> Option<Rejection> {
        if node.kind() != "name" {
            return Some(Rejection::NotACall);
        }

        if let Some(previous) = node.prev_sibling() {
            match previous.kind() {
                "->" | "?->" => return Some(Rejection::MemberAccess),
                "::" => return Some(Rejection::StaticAccess),
                "new" => return Some(Rejection::Instantiation),
                _ => {}
            }
        }

        let callee = callee(node);
        let Some(parent) = callee.parent() else {
            return Some(Rejection::NotACall);
        };
        match parent.kind() {
            "member_call_expression"
            | "nullsafe_member_call_expression"
            | "member_access_expression"
            | "nullsafe_member_access_expression" => return Some(Rejection::MemberAccess),
            "scoped_call_expression"
            | "class_constant_access_expression"
            | "scoped_property_access_expression" => return Some(Rejection::StaticAccess),
            "object_creation_expression" => return Some(Rejection::Instantiation),
            "function_definition"
            | "method_declaration"
            | "const_element"
            | "class_declaration"
            | "interface_declaration"
            | "trait_declaration"
            | "enum_declaration"
            | "namespace_definition"
            | "namespace_use_clause"
            | "namespace_aliasing_clause" => return Some(Rejection::Declaration),
            "function_call_expression" => {}
            _ => return Some(Rejection::NotACall),
        }

        let is_function_field = parent
            .child_by_field_name("function")
            .is_some_and(|function| function.id() == callee.id());
        if !is_function_field {
            return Some(Rejection::NotACall);
        }

        if callee.id() != node.id() {
            let qualified = node_text(callee, self.parsed).unwrap_or_default();
            let global = qualified
                .strip_prefix('\\')
                .is_some_and(|rest| !rest.contains('\\'));
            return (!global).then_some(Rejection::Namespaced);
        }

        let name = node_text(node, self.parsed).unwrap_or_default();
        self.is_user_defined(&name)
            .then_some(Rejection::UserDefined)
    }

    /// An unqualified call inside a namespace that resolves to a function the
    /// project declares in that namespace, or a `use function` import of a
    /// namespaced function.
    fn is_user_defined(&self, name: &str) -> bool {
        let Some(scope) = self.scope else {
            return false;
        };

        if let Some(target) = scope.imported_function(name) {
            return target.trim_start_matches('\\').contains('\\');
        }

        scope
            .namespace
            .as_deref()
            .is_some_and(|namespace| self.project.declares_function(&format!("{namespace}\\{name}")))
    }

    /// `use function strlen as length;` makes `length()` a call to `strlen`.
    fn resolved_key(&self, name: &str) -> String {
        self.scope
            .and_then(|scope| scope.imported_function(name))
            .map(|target| target.trim_start_matches('\\'))
            .unwrap_or(name)
            .to_ascii_lowercase()
    }
}

/// The node in callee position: the `qualified_name` wrapping `node`, or `node` itself.
fn callee(node: Node) -> Node {
    match node.parent() {
        Some(parent) if parent.kind() == "qualified_name" => parent,
        _ => node,
    }
}

fn is_first_class_callable(arguments: Node, parsed: &ParsedSource) -> bool {
    child_by_kind(arguments, "variadic_placeholder").is_some()
        || node_text(arguments, parsed)
            .is_some_and(|text| text.split_whitespace().collect::<String>() == "(...)")
}

/// Describes the entries of an `arguments` node.
pub fn collect_arguments(arguments: Node, parsed: &ParsedSource) -> Vec<Argument> {
    let mut collected = Vec::new();

    for idx in 0..arguments.named_child_count() {
        let Some(argument) = arguments.named_child(idx) else {
            continue;
        };
        if argument.kind() != "argument" {
            continue;
        }

        let text = node_text(argument, parsed).unwrap_or_default();
        let name = argument
            .child_by_field_name("name")
            .and_then(|label| node_text(label, parsed))
            .or_else(|| named_argument_label(&text));
        let unpacked =
            child_by_kind(argument, "variadic_unpacking").is_some() || text.starts_with("...");

        collected.push(Argument {
            position: collected.len(),
            name,
            unpacked,
            text,
            span: span_for_node(argument),
        });
    }

    collected
}

fn named_argument_label(text: &str) -> Option<String> {
    let captures = NAMED_ARGUMENT_LABEL.captures(text)?;
    let whole = captures.get(0)?;
    if text[whole.end()..].starts_with(':') {
        return None;
    }
    captures.get(1).map(|label| label.as_str().to_owned())
}
