use std::sync::Arc;

use super::compose::Composed;
use super::features::FeatureTables;
use super::matcher::{CallSite, MatchEngine};
use super::project::ProjectContext;
use super::version::VersionRange;
use super::{Diagnostic, Span, parser};

pub mod functions;
pub mod helpers;
pub mod parameters;
pub mod syntax;
#[cfg(test)]
pub(crate) mod test_utils;

pub use functions::{NewFunctionsRule, RemovedFunctionsRule};
pub use parameters::{
    NewParametersRule, OptionalToRequiredRule, RemovedParametersRule, RequiredToOptionalRule,
};
pub use syntax::NamedArgumentsRule;

use helpers::{diagnostic_for_span, walk_node};

/// Read-only state shared by every rule while a file is checked.
pub struct RuleContext<'a> {
    pub project: &'a ProjectContext,
    pub versions: &'a VersionRange,
}

pub trait DiagnosticRule: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, parsed: &parser::ParsedSource, context: &RuleContext<'_>) -> Vec<Diagnostic>;
}

/// A composed finding and where to report it.
#[derive(Debug, Clone)]
pub struct Finding {
    pub composed: Composed,
    pub span: Span,
}

/// What distinguishes one feature rule from another: the table it consults and
/// the check it runs on a matched call.
pub trait FeatureFamily: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the family has data for the lowercase function `key`.
    fn tracks(&self, key: &str) -> bool;

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding>;
}

/// Runs a [`FeatureFamily`] over every genuine global function call of a file.
pub struct FeatureMatchRule<F> {
    family: F,
}

impl<F: FeatureFamily> FeatureMatchRule<F> {
    pub fn from_family(family: F) -> Self {
        Self { family }
    }
}

impl<F: FeatureFamily> DiagnosticRule for FeatureMatchRule<F> {
    fn name(&self) -> &str {
        self.family.name()
    }

    fn run(&self, parsed: &parser::ParsedSource, context: &RuleContext<'_>) -> Vec<Diagnostic> {
        if context.versions.is_inert() {
            return Vec::new();
        }

        let engine = MatchEngine::new(parsed, context.project);
        let mut diagnostics = Vec::new();

        walk_node(parsed.tree.root_node(), &mut |node| {
            let Some(call) = engine.try_match(node) else {
                return;
            };
            if !self.family.tracks(&call.key) {
                return;
            }

            for finding in self.family.check(&call, context.versions) {
                diagnostics.push(diagnostic_for_span(
                    parsed,
                    finding.span,
                    self.name(),
                    finding.composed,
                ));
            }
        });

        diagnostics
    }
}

/// Every rule this crate ships, sharing one set of tables.
pub fn default_rules(tables: Arc<FeatureTables>) -> Vec<Box<dyn DiagnosticRule>> {
    vec![
        Box::new(NewFunctionsRule::new(Arc::clone(&tables))),
        Box::new(RemovedFunctionsRule::new(Arc::clone(&tables))),
        Box::new(NewParametersRule::new(Arc::clone(&tables))),
        Box::new(RemovedParametersRule::new(Arc::clone(&tables))),
        Box::new(RequiredToOptionalRule::new(Arc::clone(&tables))),
        Box::new(OptionalToRequiredRule::new(tables)),
        Box::new(NamedArgumentsRule::new()),
    ]
}
