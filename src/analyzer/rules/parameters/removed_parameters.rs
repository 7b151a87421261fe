use std::sync::Arc;

use super::parameter_label;
use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_removal};
use crate::analyzer::features::{FeatureTables, resolve_removal};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Arguments passed to parameters that are deprecated or gone within the range.
pub struct RemovedParameters {
    tables: Arc<FeatureTables>,
}

pub type RemovedParametersRule = FeatureMatchRule<RemovedParameters>;

impl RemovedParametersRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(RemovedParameters { tables })
    }
}

impl FeatureFamily for RemovedParameters {
    fn name(&self) -> &'static str {
        "parameters/removed_parameters"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.removed_parameters.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(set) = self.tables.removed_parameters.lookup(&call.key) else {
            return Vec::new();
        };
        if call.first_class_callable {
            return Vec::new();
        }

        set.parameters()
            .filter(|(offset, _)| call.is_supplied(*offset, Some(set)))
            .filter_map(|(offset, record)| {
                let hit = resolve_removal(record, versions)?;
                let label = parameter_label(record, offset);
                let subject = Subject::parameter(&call.name, &call.key, &label);
                let span = call
                    .argument_for(offset, Some(set))
                    .map(|argument| argument.span.clone())
                    .unwrap_or_else(|| call.name_span());

                Some(Finding {
                    composed: compose_removal(&subject, &hit, record.alternative()),
                    span,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Severity;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, builtin_tables, run_rule_for,
    };

    fn rule() -> RemovedParametersRule {
        RemovedParametersRule::new(builtin_tables())
    }

    #[test]
    fn removed_parameter_is_an_error() {
        let source = "<?php\n$ts = mktime(0, 0, 0, 1, 1, 2000, 1);\n";
        let diagnostics = run_rule_for(&rule(), source, "5.6-7.2");

        assert_diagnostics_exact(
            &diagnostics,
            &["error: The \"is_dst\" parameter for function mktime() is deprecated since PHP 5.1 and is removed since PHP 7.0"],
        );
        assert_eq!(diagnostics[0].code, "mktime_is_dstDeprecatedRemoved");
    }

    #[test]
    fn deprecated_parameter_is_a_warning() {
        let source = "<?php\ndefine('FOO', 1, true);\n";
        let diagnostics = run_rule_for(&rule(), source, "7.3-7.4");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].code, "define_case_insensitiveDeprecated");
    }

    #[test]
    fn patch_level_removal_is_matched_by_a_minor_level_range() {
        let source = "<?php\nldap_first_attribute($link, $entry, $ber);\n";
        assert_diagnostics_exact(
            &run_rule_for(&rule(), source, "5.2"),
            &["error: The \"ber_identifier\" parameter for function ldap_first_attribute() is removed since PHP 5.2.4"],
        );
    }

    #[test]
    fn parameters_not_passed_are_ignored() {
        let source = "<?php\n$ts = mktime(0, 0, 0, 1, 1, 2000);\ndefine('FOO', 1);\n";
        assert_no_diagnostics(&run_rule_for(&rule(), source, "8.0"));
    }

    #[test]
    fn first_parameter_removal() {
        let source = "<?php\ncurl_version(CURLVERSION_NOW);\n";
        assert_diagnostics_exact(
            &run_rule_for(&rule(), source, "7.4-8.1"),
            &["error: The \"age\" parameter for function curl_version() is removed since PHP 8.0"],
        );
    }
}
