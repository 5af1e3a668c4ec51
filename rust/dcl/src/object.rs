//! Nested API objects and the extract passes over them.
//!
//! A nested field is modelled as `Option<T>`. `None` means the field was never set, while
//! `Some(T::default())` is an object that was explicitly set to `{}`. Comparison and expansion
//! treat the two differently, so the distinction is preserved all the way through.

use std::fmt::Debug;

use serde::Serialize;

/// A nested message of an API resource.
pub trait Object: Clone + Debug + Default + PartialEq + Serialize {
    /// Whether every field of the object is unset.
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Whether an optional object is unset or set to the empty object.
pub fn is_empty_object<T: Object>(value: &Option<T>) -> bool {
    value.as_ref().map_or(true, Object::is_empty)
}

/// Hooks that normalize an object before it is compared.
///
/// `extract_fields` runs on desired states before they are sent, `post_read_extract_fields` on
/// states read back from the API. Both default to doing nothing.
pub trait Extract: Object {
    fn extract_fields(&mut self) {}

    fn post_read_extract_fields(&mut self) {}
}

/// Runs [`Extract::extract_fields`] on a nested field.
///
/// An unset field is extracted through a default object, which is only kept if the extraction
/// filled something in.
pub fn extract_object<T: Extract>(field: &mut Option<T>) {
    run_extract(field, T::extract_fields)
}

/// Runs [`Extract::post_read_extract_fields`] on a nested field, see [`extract_object`].
pub fn post_read_extract_object<T: Extract>(field: &mut Option<T>) {
    run_extract(field, T::post_read_extract_fields)
}

/// Runs [`extract_object`] on every item of a repeated field.
pub fn extract_object_slice<T: Extract>(items: &mut [T]) {
    items.iter_mut().for_each(T::extract_fields)
}

/// Runs [`post_read_extract_object`] on every item of a repeated field.
pub fn post_read_extract_object_slice<T: Extract>(items: &mut [T]) {
    items.iter_mut().for_each(T::post_read_extract_fields)
}

fn run_extract<T: Extract>(field: &mut Option<T>, extract: fn(&mut T)) {
    match field {
        Some(value) => extract(value),
        None => {
            let mut value = T::default();
            extract(&mut value);
            if !value.is_empty() {
                *field = Some(value);
            }
        }
    }
}
