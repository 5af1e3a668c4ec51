//! Client for Google Cloud Private CA certificates.
//!
//! [`Certificate`] is the resource model, [`Client`] reads, lists, revokes and applies
//! certificates against the `privateca.googleapis.com` v1 API.

pub mod certificate;
pub mod client;

pub use certificate::Certificate;
pub use client::{CertificateList, Client, Error};
