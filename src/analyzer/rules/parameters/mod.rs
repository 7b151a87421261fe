pub mod new_parameters;
pub mod optional_to_required;
pub mod removed_parameters;
pub mod required_to_optional;

pub use new_parameters::{NewParameters, NewParametersRule};
pub use optional_to_required::{OptionalToRequired, OptionalToRequiredRule};
pub use removed_parameters::{RemovedParameters, RemovedParametersRule};
pub use required_to_optional::{RequiredToOptional, RequiredToOptionalRule};

use crate::analyzer::features::{FeatureRecord, ParameterSet};

/// Display label of the parameter at zero-based `offset`; records without a
/// `name` fall back to their one-based position.
fn parameter_label(record: &FeatureRecord, offset: usize) -> String {
    record
        .parameter_name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("#{}", offset + 1))
}

/// Parameters of `set` the call leaves out. Unpacked arguments may supply any
/// of them, so nothing is reported as missing for such calls.
fn missing_parameters<'s>(
    set: &'s ParameterSet,
    call: &crate::analyzer::matcher::CallSite<'_>,
) -> Vec<(usize, &'s FeatureRecord)> {
    if call.has_unpacking() || call.first_class_callable {
        return Vec::new();
    }

    let supplied = call.supplied_offsets(Some(set));
    set.parameters()
        .filter(|(offset, _)| !supplied.contains(offset))
        .collect()
}
