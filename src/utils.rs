//! Naming helpers shared by the validation builder and patcher.

use convert_case::{Case, Casing};

/// Derive a validation property name from a database column name:
/// strip a trailing `_id`, then convert snake_case to camelCase.
pub fn property_name_from_column(column: &str) -> String {
    let base = column.strip_suffix("_id").unwrap_or(column);
    base.to_case(Case::Camel)
}

/// Last segment of a backslash-separated class name.
pub fn short_class_name(class_name: &str) -> &str {
    class_name.rsplit('\\').next().unwrap_or(class_name)
}
