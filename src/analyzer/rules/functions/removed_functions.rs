use std::sync::Arc;

use crate::analyzer::rules::{FeatureFamily, FeatureMatchRule};
use crate::analyzer::compose::{Subject, compose_removal};
use crate::analyzer::features::{FeatureTables, resolve_removal};
use crate::analyzer::matcher::CallSite;
use crate::analyzer::rules::Finding;
use crate::analyzer::version::VersionRange;

/// Functions the supported range reaches past their deprecation or removal.
pub struct RemovedFunctions {
    tables: Arc<FeatureTables>,
}

pub type RemovedFunctionsRule = FeatureMatchRule<RemovedFunctions>;

impl RemovedFunctionsRule {
    pub fn new(tables: Arc<FeatureTables>) -> Self {
        Self::from_family(RemovedFunctions { tables })
    }
}

impl FeatureFamily for RemovedFunctions {
    fn name(&self) -> &'static str {
        "functions/removed_functions"
    }

    fn tracks(&self, key: &str) -> bool {
        self.tables.removed_functions.lookup(key).is_some()
    }

    fn check(&self, call: &CallSite<'_>, versions: &VersionRange) -> Vec<Finding> {
        let Some(record) = self.tables.removed_functions.lookup(&call.key) else {
            return Vec::new();
        };
        let Some(hit) = resolve_removal(record, versions) else {
            return Vec::new();
        };

        let subject = Subject::function(&call.name, &call.key);
        vec![Finding {
            composed: compose_removal(&subject, &hit, record.alternative()),
            span: call.name_span(),
        }]
    }
}
