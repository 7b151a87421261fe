use std::sync::Arc;

use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_introduction};
use crate::analyzer::features::{FeatureTables, resolve_introduction};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Functions called while the supported range reaches back to a version that lacks them.
pub struct NewFunctions {
    tables: Arc<FeatureTables>,
}

pub type NewFunctionsRule = FeatureMatchRule<NewFunctions>;

impl NewFunctionsRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(NewFunctions { tables })
    }
}

impl FeatureFamily for NewFunctions {
    fn name(&self) -> &'static str {
        "functions/new_functions"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.new_functions.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(record) = self.tables.new_functions.lookup(&call.key) else {
            return Vec::new();
        };
        let Some(gap) = resolve_introduction(record, versions) else {
            return Vec::new();
        };

        let subject = Subject::function(&call.name, &call.key);
        vec![Finding {
            composed: compose_introduction(&subject, &gap, record.alternative()),
            span: call.name_span(),
        }]
    }
}
