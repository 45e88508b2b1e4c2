use crate::utils::errors::ChartError;

/// Longest accepted dataset name, in characters
pub const MAX_NAME_LEN: usize = 128;

/// Separator used to build a chart id out of its dataset names
pub const CHART_ID_SEPARATOR: &str = "__and__";

/// Validate a dataset name before it becomes part of a table name
pub fn validate_dataset_name(name: &str) -> Result<(), ChartError> {
    if name.is_empty() {
        return Err(ChartError::InvalidDataset(
            "Dataset name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ChartError::InvalidDataset(format!(
            "Dataset name must be at most {} characters long, but got {} chars",
            MAX_NAME_LEN,
            name.chars().count()
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ChartError::InvalidDataset(format!(
            "Dataset name '{}' must not contain control characters",
            name.escape_debug()
        )));
    }

    Ok(())
}

/// Chart identity: the ordered dataset names joined by `__and__`
pub fn chart_id(names: &[String]) -> String {
    names.join(CHART_ID_SEPARATOR)
}
