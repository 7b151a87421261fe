use std::sync::Arc;

use super::{missing_parameters, parameter_label};
use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_arity};
use crate::analyzer::features::{FeatureTables, resolve_optional_to_required};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Calls omitting a parameter that newer versions in the range require or recommend.
pub struct OptionalToRequired {
    tables: Arc<FeatureTables>,
}

pub type OptionalToRequiredRule = FeatureMatchRule<OptionalToRequired>;

impl OptionalToRequiredRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(OptionalToRequired { tables })
    }
}

impl FeatureFamily for OptionalToRequired {
    fn name(&self) -> &'static str {
        "parameters/optional_to_required"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.optional_to_required.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(set) = self.tables.optional_to_required.lookup(&call.key) else {
            return Vec::new();
        };

        missing_parameters(set, call)
            .into_iter()
            .filter_map(|(offset, record)| {
                let hit = resolve_optional_to_required(record, versions)?;
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
    use crate::analyzer::Severity;
    use crate::analyzer::rules::test_utils::{
        assert_diagnostics_exact, assert_no_diagnostics, builtin_tables, run_rule_for,
    };

    fn rule() -> OptionalToRequiredRule {
        OptionalToRequiredRule::new(builtin_tables())
    }

    #[test]
    fn required_parameter_is_an_error() {
        let source = "<?php\nparse_str($query);\n";
        let diagnostics = run_rule_for(&rule(), source, "7.4-8.0");

        assert_diagnostics_exact(
            &diagnostics,
            &["error: The \"result\" parameter for function parse_str() is missing. Passing this parameter is no longer optional. The optional nature of the parameter is removed since PHP 8.0"],
        );
        assert_eq!(diagnostics[0].code, "parse_str_resultHardRequired");
    }

    #[test]
    fn deprecated_omission_is_a_warning() {
        let source = "<?php\nparse_str($query);\n";
        let diagnostics = run_rule_for(&rule(), source, "7.0-7.4");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].code, "parse_str_resultSoftRequired");
    }

    #[test]
    fn recommended_parameter_is_a_warning() {
        let source = "<?php\n$hash = crypt($password);\n";
        let diagnostics = run_rule_for(&rule(), source, "5.6-7.4");

        assert_diagnostics_exact(
            &diagnostics,
            &["warning: The \"salt\" parameter for function crypt() is missing. Passing this parameter is strongly recommended since PHP 5.6"],
        );
        assert_eq!(diagnostics[0].code, "crypt_saltSoftRecommended");
    }

    #[test]
    fn every_missing_parameter_is_reported() {
        let source = "<?php\n$now = mktime();\n";
        let diagnostics = run_rule_for(&rule(), source, "8.0");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "mktime_hourHardRequired");
    }

    #[test]
    fn passing_the_parameter_is_clean() {
        let source = r#"<?php
parse_str($query, $result);
mb_parse_str($query, result: $result);
crypt($password, $salt);
"#;
        assert_no_diagnostics(&run_rule_for(&rule(), source, "5.6-8.2"));
    }
}
