//! Canonicalization of whole certificates.

use dcl::canonicalize::{
    canonical_map, canonical_new_reference, canonical_new_value, canonical_reference,
    canonical_value, canonicalize_new_object, canonicalize_new_output_only, canonicalize_object,
    is_zero_value, name_to_self_link_eq, partial_self_link_eq,
};
use dcl::object::is_empty_object;
use tracing::debug;

use super::{Certificate, CertificateConfig};

/// Prepares the state initially read from the API for diffing.
///
/// A certificate is issued from either a CSR or a config. Should the API report both, the CSR
/// is dropped in favour of the config.
pub fn canonicalize_initial_state(mut raw_initial: Certificate) -> Certificate {
    if !is_zero_value(&raw_initial.pem_csr) && !is_empty_object(&raw_initial.config) {
        raw_initial.pem_csr = Some(String::new());
    }
    raw_initial
}

/// Reconciles a user supplied state with the state initially read from the API.
///
/// Without an initial state there is nothing to reconcile with and the desired state is used
/// as is. Only fields a user can set are carried over, output-only fields are left unset.
pub fn canonicalize_desired_state(
    raw_desired: &Certificate,
    raw_initial: Option<&Certificate>,
) -> Certificate {
    let Some(raw_initial) = raw_initial else {
        return raw_desired.clone();
    };

    let mut desired = Certificate {
        name: canonical_reference(&raw_desired.name, &raw_initial.name, partial_self_link_eq),
        pem_csr: canonical_value(&raw_desired.pem_csr, &raw_initial.pem_csr),
        config: canonicalize_object(&raw_desired.config, &raw_initial.config),
        lifetime: canonical_value(&raw_desired.lifetime, &raw_initial.lifetime),
        certificate_template: canonical_reference(
            &raw_desired.certificate_template,
            &raw_initial.certificate_template,
            partial_self_link_eq,
        ),
        subject_mode: canonical_value(&raw_desired.subject_mode, &raw_initial.subject_mode),
        labels: canonical_map(&raw_desired.labels, &raw_initial.labels),
        project: canonical_reference(
            &raw_desired.project,
            &raw_initial.project,
            name_to_self_link_eq,
        ),
        location: canonical_reference(
            &raw_desired.location,
            &raw_initial.location,
            name_to_self_link_eq,
        ),
        ca_pool: canonical_reference(
            &raw_desired.ca_pool,
            &raw_initial.ca_pool,
            name_to_self_link_eq,
        ),
        certificate_authority: canonical_reference(
            &raw_desired.certificate_authority,
            &raw_initial.certificate_authority,
            name_to_self_link_eq,
        ),
        ..Certificate::default()
    };

    // A certificate is requested either from a CSR or from a config, whichever the user asked for
    // wins over what the initial state carries for the other one.
    if desired.pem_csr.is_some() && !is_empty_object(&raw_desired.config) {
        desired.pem_csr = Some(String::new());
    }
    if desired.config.is_some() && !is_zero_value(&raw_desired.pem_csr) {
        desired.config = Some(CertificateConfig::default());
    }

    debug!(?desired, "Canonicalized desired state");
    desired
}

/// Reconciles a state read from the API with the desired one, so that values the server merely
/// spelled differently take the desired spelling.
///
/// The addressing fields are not part of API responses and are always taken from `raw_desired`.
pub fn canonicalize_new_state(raw_new: Certificate, raw_desired: &Certificate) -> Certificate {
    let new_state = Certificate {
        name: new_reference(&raw_desired.name, raw_new.name),
        pem_csr: canonical_new_value(&raw_desired.pem_csr, raw_new.pem_csr),
        config: canonicalize_new_object(&raw_desired.config, raw_new.config),
        issuer_certificate_authority: canonical_new_value(
            &raw_desired.issuer_certificate_authority,
            raw_new.issuer_certificate_authority,
        ),
        lifetime: canonical_new_value(&raw_desired.lifetime, raw_new.lifetime),
        certificate_template: new_reference(
            &raw_desired.certificate_template,
            raw_new.certificate_template,
        ),
        subject_mode: canonical_new_value(&raw_desired.subject_mode, raw_new.subject_mode),
        revocation_details: canonicalize_new_output_only(
            &raw_desired.revocation_details,
            raw_new.revocation_details,
        ),
        pem_certificate: canonical_new_value(&raw_desired.pem_certificate, raw_new.pem_certificate),
        certificate_description: canonicalize_new_output_only(
            &raw_desired.certificate_description,
            raw_new.certificate_description,
        ),
        pem_certificate_chain: raw_new.pem_certificate_chain,
        create_time: canonical_new_value(&raw_desired.create_time, raw_new.create_time),
        update_time: canonical_new_value(&raw_desired.update_time, raw_new.update_time),
        labels: raw_new.labels,
        project: raw_desired.project.clone(),
        location: raw_desired.location.clone(),
        ca_pool: raw_desired.ca_pool.clone(),
        certificate_authority: raw_desired.certificate_authority.clone(),
    };
    debug!(?new_state, "Canonicalized new state");
    new_state
}

fn new_reference(desired: &Option<String>, new: Option<String>) -> Option<String> {
    if is_zero_value(desired) && is_zero_value(&new) {
        desired.clone()
    } else {
        canonical_new_reference(desired, new, partial_self_link_eq)
    }
}
