use super::{FeatureTables, TableError, load};

const NEW_FUNCTIONS: &str = include_str!("../../../data/new_functions.yaml");
const REMOVED_FUNCTIONS: &str = include_str!("../../../data/removed_functions.yaml");
const NEW_PARAMETERS: &str = include_str!("../../../data/new_function_parameters.yaml");
const REMOVED_PARAMETERS: &str = include_str!("../../../data/removed_function_parameters.yaml");
const REQUIRED_TO_OPTIONAL: &str =
    include_str!("../../../data/required_to_optional_parameters.yaml");
const OPTIONAL_TO_REQUIRED: &str =
    include_str!("../../../data/optional_to_required_parameters.yaml");

pub(super) fn fill(tables: &mut FeatureTables) -> Result<(), TableError> {
    load::merge_function_section(
        &mut tables.new_functions,
        NEW_FUNCTIONS,
        "data/new_functions.yaml",
    )?;
    load::merge_function_section(
        &mut tables.removed_functions,
        REMOVED_FUNCTIONS,
        "data/removed_functions.yaml",
    )?;
    load::merge_parameter_section(
        &mut tables.new_parameters,
        NEW_PARAMETERS,
        "data/new_function_parameters.yaml",
    )?;
    load::merge_parameter_section(
        &mut tables.removed_parameters,
        REMOVED_PARAMETERS,
        "data/removed_function_parameters.yaml",
    )?;
    load::merge_parameter_section(
        &mut tables.required_to_optional,
        REQUIRED_TO_OPTIONAL,
        "data/required_to_optional_parameters.yaml",
    )?;
    load::merge_parameter_section(
        &mut tables.optional_to_required,
        OPTIONAL_TO_REQUIRED,
        "data/optional_to_required_parameters.yaml",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::features::{FeatureTable, OffsetBasis, ParameterTable, TableKind};

    #[test]
    fn every_embedded_function_table_parses() {
        for (yaml, origin, kind) in [
            (NEW_FUNCTIONS, "data/new_functions.yaml", TableKind::Introduction),
            (REMOVED_FUNCTIONS, "data/removed_functions.yaml", TableKind::Removal),
        ] {
            let mut table = FeatureTable::new(kind);
            load::merge_function_section(&mut table, yaml, origin)
                .unwrap_or_else(|err| panic!("{origin}: {err:?}"));
            assert!(!table.is_empty(), "{origin} has no records");
        }
    }

    #[test]
    fn every_embedded_parameter_table_parses() {
        for (yaml, origin, kind, basis) in [
            (
                NEW_PARAMETERS,
                "data/new_function_parameters.yaml",
                TableKind::Introduction,
                OffsetBasis::Zero,
            ),
            (
                REMOVED_PARAMETERS,
                "data/removed_function_parameters.yaml",
                TableKind::Removal,
                OffsetBasis::Zero,
            ),
            (
                REQUIRED_TO_OPTIONAL,
                "data/required_to_optional_parameters.yaml",
                TableKind::RequiredToOptional,
                OffsetBasis::One,
            ),
            (
                OPTIONAL_TO_REQUIRED,
                "data/optional_to_required_parameters.yaml",
                TableKind::OptionalToRequired,
                OffsetBasis::One,
            ),
        ] {
            let mut table = ParameterTable::new(kind, basis);
            load::merge_parameter_section(&mut table, yaml, origin)
                .unwrap_or_else(|err| panic!("{origin}: {err:?}"));
            assert!(!table.is_empty(), "{origin} has no records");
        }
    }

    #[test]
    fn alternatives_containing_colons_survive_loading() {
        let tables = FeatureTables::builtin().unwrap();
        let record = tables.removed_functions.lookup("mysql_pconnect").unwrap();
        assert_eq!(
            record.alternative(),
            Some("mysqli_connect() with the p: host prefix")
        );
    }
}
