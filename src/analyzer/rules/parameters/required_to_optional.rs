use std::sync::Arc;

use super::{missing_parameters, parameter_label};
use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_arity};
use crate::analyzer::features::{FeatureTables, resolve_required_to_optional};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Calls omitting a parameter that older versions in the range still require.
pub struct RequiredToOptional {
    tables: Arc<FeatureTables>,
}

pub type RequiredToOptionalRule = FeatureMatchRule<RequiredToOptional>;

impl RequiredToOptionalRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(RequiredToOptional { tables })
    }
}

impl FeatureFamily for RequiredToOptional {
    fn name(&self) -> &'static str {
        "parameters/required_to_optional"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.required_to_optional.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(set) = self.tables.required_to_optional.lookup(&call.key) else {
            return Vec::new();
        };

        missing_parameters(set, call)
            .into_iter()
            .filter_map(|(offset, record)| {
                let hit = resolve_required_to_optional(record, versions)?;
                let label = parameter_label(record, offset);
                let subject = Subject::parameter(&call.name, &call.key, &label);
                Some(Finding {
                    composed: compose_arity(&subject, hit, record.alternative()),
                    span: call.name_span(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, builtin_tables, run_rule_for,
    };

    fn rule() -> RequiredToOptionalRule {
        RequiredToOptionalRule::new(builtin_tables())
    }

    #[test]
    fn omitted_parameter_required_in_older_versions() {
        let source = "<?php\narray_push($stack);\n";
        let diagnostics = run_rule_for(&rule(), source, "7.1-8.0");

        assert_diagnostics_exact(
            &diagnostics,
            &["error: The \"values\" parameter for function array_push() is missing, but was required for PHP version 7.2 and lower"],
        );
        assert_eq!(diagnostics[0].code, "array_push_valuesMissing");
    }

    #[test]
    fn zero_arguments_hit_the_first_parameter() {
        let source = "<?php\n$all = getenv();\n";
        assert_diagnostics_exact(
            &run_rule_for(&rule(), source, "5.6-7.4"),
            &["error: The \"name\" parameter for function getenv() is missing, but was required for PHP version 7.0 and lower"],
        );
    }

    #[test]
    fn supplied_or_unpacked_arguments_are_clean() {
        let source = r#"<?php
array_push($stack, $value);
array_push(...$arguments);
array_merge(arrays: $lists);
"#;
        assert_no_diagnostics(&run_rule_for(&rule(), source, "7.0-8.0"));
    }

    #[test]
    fn range_after_the_change_is_clean() {
        let source = "<?php\narray_push($stack);\narray_merge();\n";
        assert_no_diagnostics(&run_rule_for(&rule(), source, "7.4-"));
    }
}
