//! Field-level diffs between a desired and an actual state.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;
use serde_json::Value;

use crate::{
    canonicalize::{is_zero_value, partial_self_link_eq, value_eq},
    object::{is_empty_object, Object},
};

/// Name of the pseudo-operation for fields that can only change by recreating the resource.
pub const RECREATE: &str = "Recreate";

/// Dotted path to a field, using the API's camelCase names (`config.x509Config.caOptions`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldName(String);

impl FieldName {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn nest(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    /// The first segment of the path, as used in update masks.
    pub fn top_level(&self) -> &str {
        self.0
            .split(['.', '['])
            .next()
            .unwrap_or(self.0.as_str())
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a change in a field requires from the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperationSelector {
    #[default]
    None,
    Recreate,
    Triggers(&'static str),
}

impl OperationSelector {
    fn operations(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Recreate => vec![RECREATE.to_string()],
            Self::Triggers(op) => vec![op.to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DiffInfo {
    /// Set by the server only, never diffed
    pub output_only: bool,
    pub ignore: bool,
    pub operation_selector: OperationSelector,
}

impl DiffInfo {
    pub fn recreate() -> Self {
        Self {
            operation_selector: OperationSelector::Recreate,
            ..Self::default()
        }
    }

    pub fn triggers(operation: &'static str) -> Self {
        Self {
            operation_selector: OperationSelector::Triggers(operation),
            ..Self::default()
        }
    }

    pub fn output_only() -> Self {
        Self {
            output_only: true,
            ..Self::default()
        }
    }

    fn skipped(&self) -> bool {
        self.output_only || self.ignore
    }
}

/// A single differing field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDiff {
    pub field_name: FieldName,
    pub desired: Value,
    pub actual: Value,
    /// Names of the operations that resolve this diff
    pub resulting_operation: Vec<String>,
}

impl FieldDiff {
    pub fn new(
        field_name: FieldName,
        desired: &impl Serialize,
        actual: &impl Serialize,
        info: &DiffInfo,
    ) -> Self {
        Self {
            field_name,
            desired: serde_json::to_value(desired).unwrap_or(Value::Null),
            actual: serde_json::to_value(actual).unwrap_or(Value::Null),
            resulting_operation: info.operation_selector.operations(),
        }
    }
}

impl Display for FieldDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: desired {}, actual {} (operations: {:?})",
            self.field_name, self.desired, self.actual, self.resulting_operation
        )
    }
}

/// Diffs a leaf field. Unset actual values compare as their zero value.
pub fn diff_value<T: Default + PartialEq + Serialize>(
    desired: &Option<T>,
    actual: &Option<T>,
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    if info.skipped() || is_zero_value(desired) || value_eq(desired, actual) {
        return Vec::new();
    }
    vec![FieldDiff::new(field_name, desired, actual, info)]
}

/// Diffs a reference field, which matches if one value is a path suffix of the other.
pub fn diff_reference(
    desired: &Option<String>,
    actual: &Option<String>,
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    match (desired.as_deref(), actual.as_deref()) {
        _ if info.skipped() || is_zero_value(desired) => Vec::new(),
        (Some(d), Some(a)) if partial_self_link_eq(d, a) => Vec::new(),
        _ => vec![FieldDiff::new(field_name, desired, actual, info)],
    }
}

/// Diffs an ordered repeated leaf field.
pub fn diff_vec<T: PartialEq + Serialize>(
    desired: &[T],
    actual: &[T],
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    if info.skipped() || desired.is_empty() || desired == actual {
        return Vec::new();
    }
    vec![FieldDiff::new(field_name, &desired, &actual, info)]
}

pub fn diff_map<V: PartialEq + Serialize>(
    desired: &BTreeMap<String, V>,
    actual: &BTreeMap<String, V>,
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    if info.skipped() || desired.is_empty() || desired == actual {
        return Vec::new();
    }
    vec![FieldDiff::new(field_name, desired, actual, info)]
}

/// Field-wise comparison of a nested object.
pub trait Compare: Object {
    /// Compares two set objects, nesting each field under `field_name`.
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff>;
}

pub fn diff_object<T: Compare>(
    desired: &Option<T>,
    actual: &Option<T>,
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    let Some(desired_object) = desired.as_ref().filter(|d| !info.skipped() && !d.is_empty())
    else {
        return Vec::new();
    };
    match actual {
        Some(actual_object) if !is_empty_object(actual) => {
            compare_nested(desired_object, actual_object, info, &field_name)
        }
        _ => vec![FieldDiff::new(field_name, desired, actual, info)],
    }
}

/// Diffs a repeated nested field, item by item when the lengths match.
pub fn diff_object_slice<T: Compare>(
    desired: &[T],
    actual: &[T],
    info: &DiffInfo,
    field_name: FieldName,
) -> Vec<FieldDiff> {
    if info.skipped() || desired.is_empty() {
        return Vec::new();
    }
    if desired.len() != actual.len() {
        return vec![FieldDiff::new(field_name, &desired, &actual, info)];
    }
    desired
        .iter()
        .zip(actual)
        .enumerate()
        .flat_map(|(i, (d, a))| compare_nested(d, a, info, &field_name.index(i)))
        .collect()
}

fn compare_nested<T: Compare>(
    desired: &T,
    actual: &T,
    info: &DiffInfo,
    field_name: &FieldName,
) -> Vec<FieldDiff> {
    let mut diffs = T::compare(desired, actual, field_name);
    for diff in &mut diffs {
        if diff.resulting_operation.is_empty() {
            diff.resulting_operation = info.operation_selector.operations();
        }
    }
    diffs
}

/// Sorted, de-duplicated top-level field names of `diffs`, joined for an `updateMask` parameter.
pub fn update_mask(diffs: &[FieldDiff]) -> String {
    let mut fields = diffs
        .iter()
        .map(|d| d.field_name.top_level())
        .collect::<Vec<_>>();
    fields.sort_unstable();
    fields.dedup();
    fields.join(",")
}
