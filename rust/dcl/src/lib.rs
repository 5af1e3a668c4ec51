//! Shared plumbing for declarative Google Cloud resource clients.
//!
//! A resource crate describes its schema by implementing the traits in [`object`], [`diff`] and
//! [`codec`] for each nested message type. The generic drivers in those modules take care of the
//! `Option` handling, so the per-type code only deals with the fields themselves.

pub mod apply;
pub mod canonicalize;
pub mod codec;
pub mod config;
pub mod diff;
pub mod object;
pub mod retry;
pub mod template;
pub mod transport;
pub mod utils;
pub mod validation;

pub use apply::{ApplyOption, LifecycleParam};
pub use config::Config;
pub use diff::{DiffInfo, FieldDiff, FieldName, OperationSelector};
pub use object::Object;
pub use transport::{send_request, Method, Request, Response, Transport};
pub use validation::ValidationError;

/// Identifies a resource type for logging and tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceTypeVersion {
    pub service: &'static str,
    pub type_name: &'static str,
    pub version: &'static str,
}
