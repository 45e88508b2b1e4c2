pub mod clock;
pub mod errors;
pub mod names;

pub use errors::ChartError;

/// Render a JSON scalar as the text stored in a data point
///
/// Strings are kept verbatim, everything else uses its JSON form (`10`, `true`).
pub fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
