//! Reconciles desired values with observed ones.
//!
//! The API fills in defaults and rewrites references into full paths, so a freshly read resource
//! rarely matches what the user asked for byte by byte. Canonicalization picks the observed value
//! whenever the two mean the same thing, which keeps such rewrites from showing up as diffs.

use std::collections::BTreeMap;

use crate::object::{is_empty_object, Object};

/// Whether an optional value is unset or holds its type's zero value.
pub fn is_zero_value<T: Default + PartialEq>(value: &Option<T>) -> bool {
    value.as_ref().map_or(true, |v| *v == T::default())
}

/// Compares two optional values, treating unset as the zero value.
pub fn value_eq<T: Default + PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(v), None) | (None, Some(v)) => *v == T::default(),
        (None, None) => true,
    }
}

pub fn string_canonicalize(a: &Option<String>, b: &Option<String>) -> bool {
    value_eq(a, b)
}

pub fn bool_canonicalize(a: &Option<bool>, b: &Option<bool>) -> bool {
    value_eq(a, b)
}

pub fn string_array_canonicalize(a: &[String], b: &[String]) -> bool {
    a == b
}

/// Canonical value of a leaf field in a desired state.
///
/// An unset or zero desired value, or one equal to the initial value, yields the initial value.
pub fn canonical_value<T: Clone + Default + PartialEq>(
    desired: &Option<T>,
    initial: &Option<T>,
) -> Option<T> {
    if is_zero_value(desired) || value_eq(desired, initial) {
        initial.clone()
    } else {
        desired.clone()
    }
}

/// Canonical value of a leaf field in a newly read state: the desired value if it is
/// equivalent, the new one otherwise.
pub fn canonical_new_value<T: Clone + Default + PartialEq>(
    desired: &Option<T>,
    new: Option<T>,
) -> Option<T> {
    if value_eq(desired, &new) {
        desired.clone()
    } else {
        new
    }
}

/// [`canonical_value`] for repeated leaf fields.
pub fn canonical_vec<T: Clone + PartialEq>(desired: &[T], initial: &[T]) -> Vec<T> {
    if desired.is_empty() || desired == initial {
        initial.to_vec()
    } else {
        desired.to_vec()
    }
}

/// [`canonical_value`] for map fields.
pub fn canonical_map<V: Clone + PartialEq>(
    desired: &BTreeMap<String, V>,
    initial: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    if desired.is_empty() {
        initial.clone()
    } else {
        desired.clone()
    }
}

/// Canonical value of a reference field, where `eq` decides whether two references point at the
/// same thing.
pub fn canonical_reference(
    desired: &Option<String>,
    initial: &Option<String>,
    eq: fn(&str, &str) -> bool,
) -> Option<String> {
    match (desired.as_deref(), initial.as_deref()) {
        (None | Some(""), _) => initial.clone(),
        (Some(d), Some(i)) if eq(d, i) => initial.clone(),
        _ => desired.clone(),
    }
}

/// Canonical value of a reference field in a newly read state.
pub fn canonical_new_reference(
    desired: &Option<String>,
    new: Option<String>,
    eq: fn(&str, &str) -> bool,
) -> Option<String> {
    match (desired.as_deref(), new.as_deref()) {
        (Some(d), Some(n)) if eq(d, n) => desired.clone(),
        _ => new,
    }
}

/// Last segment of a resource path (`projects/p/locations/l` becomes `l`).
pub fn self_link_to_name(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// Whether two references name the same resource, comparing only their last segment.
pub fn name_to_self_link_eq(a: &str, b: &str) -> bool {
    self_link_to_name(a) == self_link_to_name(b)
}

/// Whether one reference is a path suffix of the other.
pub fn partial_self_link_eq(a: &str, b: &str) -> bool {
    a == b || a.ends_with(&format!("/{b}")) || b.ends_with(&format!("/{a}"))
}

/// Field-wise canonicalization of a nested object, driven by the functions below.
pub trait Canonicalize: Object {
    /// Builds the canonical desired object, both sides are known to be set.
    fn canonicalize_fields(&self, initial: &Self) -> Self;

    /// Canonicalizes a newly read object against the desired one.
    fn canonicalize_new_fields(&self, new: Self) -> Self;
}

pub fn canonicalize_object<T: Canonicalize>(desired: &Option<T>, initial: &Option<T>) -> Option<T> {
    let Some(desired) = desired else {
        return initial.clone();
    };
    match initial {
        _ if desired.is_empty() => Some(desired.clone()),
        None => Some(desired.clone()),
        Some(initial) => Some(desired.canonicalize_fields(initial)),
    }
}

pub fn canonicalize_object_slice<T: Canonicalize>(desired: &[T], initial: &[T]) -> Vec<T> {
    if desired.is_empty() {
        return initial.to_vec();
    }
    if desired.len() != initial.len() {
        // Nothing to pair the items with
        return desired.to_vec();
    }
    desired
        .iter()
        .zip(initial)
        .map(|(d, i)| {
            if d.is_empty() {
                d.clone()
            } else {
                d.canonicalize_fields(i)
            }
        })
        .collect()
}

pub fn canonicalize_new_object<T: Canonicalize>(desired: &Option<T>, new: Option<T>) -> Option<T> {
    let Some(desired) = desired else {
        return new;
    };
    match new {
        None if desired.is_empty() => Some(desired.clone()),
        None => None,
        Some(new) => Some(desired.canonicalize_new_fields(new)),
    }
}

pub fn canonicalize_new_object_slice<T: Canonicalize>(desired: &[T], new: Vec<T>) -> Vec<T> {
    // Unequal lengths will show up as a diff later on, leave them alone
    if desired.is_empty() || desired.len() != new.len() {
        return new;
    }
    desired
        .iter()
        .zip(new)
        .map(|(d, n)| d.canonicalize_new_fields(n))
        .collect()
}

/// Output-only objects are never compared, so the new value is kept unless both are empty.
pub fn canonicalize_new_output_only<T: Object>(desired: &Option<T>, new: Option<T>) -> Option<T> {
    if is_empty_object(desired) && is_empty_object(&new) {
        desired.clone()
    } else {
        new
    }
}
