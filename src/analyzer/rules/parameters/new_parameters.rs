use std::sync::Arc;

use super::parameter_label;
use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_introduction};
use crate::analyzer::features::{FeatureTables, resolve_introduction};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Arguments passed to parameters that do not exist yet at the low end of the range.
pub struct NewParameters {
    tables: Arc<FeatureTables>,
}

pub type NewParametersRule = FeatureMatchRule<NewParameters>;

impl NewParametersRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(NewParameters { tables })
    }
}

impl FeatureFamily for NewParameters {
    fn name(&self) -> &'static str {
        "parameters/new_parameters"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.new_parameters.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(set) = self.tables.new_parameters.lookup(&call.key) else {
            return Vec::new();
        };
        if call.first_class_callable {
            return Vec::new();
        }

        // Offsets past the last supplied argument cannot be passed.
        let Some(highest) = call.highest_supplied_offset(Some(set)) else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        for (offset, record) in set.parameters() {
            if offset > highest || !call.is_supplied(offset, Some(set)) {
                continue;
            }
            let Some(gap) = resolve_introduction(record, versions) else {
                continue;
            };

            let label = parameter_label(record, offset);
            let subject = Subject::parameter(&call.name, &call.key, &label);
            let span = call
                .argument_for(offset, Some(set))
                .map(|argument| argument.span.clone())
                .unwrap_or_else(|| call.name_span());

            findings.push(Finding {
                composed: compose_introduction(&subject, &gap, record.alternative()),
                span,
            });
        }

        findings
    }
}
