//! The Private CA `Certificate` resource, see
//! <https://cloud.google.com/certificate-authority-service/docs/reference/rest/v1/projects.locations.caPools.certificates>.

use std::collections::BTreeMap;

use dcl::{
    canonicalize::{is_zero_value, self_link_to_name},
    object::{extract_object, is_empty_object, post_read_extract_object, Extract, Object},
    template::{self, Params},
    validation::{at_most_one_of, required, validate_object, Validate},
    ServiceTypeVersion, ValidationError,
};
use serde::{Deserialize, Serialize};

pub mod canonicalize;
pub mod codec;
pub mod compare;
pub mod config;
pub mod description;
pub mod enums;

pub use self::{
    config::CertificateConfig,
    description::{CertificateDescription, RevocationDetails},
    enums::{PublicKeyFormat, RevocationReason, SubjectMode},
};

pub const BASE_PATH: &str = "https://privateca.googleapis.com/v1/";

const CERTIFICATES_TEMPLATE: &str =
    "projects/{{project}}/locations/{{location}}/caPools/{{ca_pool}}/certificates";
const CERTIFICATE_TEMPLATE: &str =
    "projects/{{project}}/locations/{{location}}/caPools/{{ca_pool}}/certificates/{{name}}";

/// A certificate issued by a CA pool.
///
/// `project`, `location`, `ca_pool` and `certificate_authority` only address the resource, they
/// are never part of a request body. Everything except `labels` is immutable once issued.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Certificate {
    pub name: Option<String>,
    /// A PEM encoded CSR, mutually exclusive with `config`
    pub pem_csr: Option<String>,
    pub config: Option<CertificateConfig>,
    pub issuer_certificate_authority: Option<String>,
    /// Requested validity as a duration, such as `86400s`
    pub lifetime: Option<String>,
    pub certificate_template: Option<String>,
    pub subject_mode: Option<SubjectMode>,
    pub revocation_details: Option<RevocationDetails>,
    pub pem_certificate: Option<String>,
    pub certificate_description: Option<CertificateDescription>,
    pub pem_certificate_chain: Vec<String>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub ca_pool: Option<String>,
    /// The CA in the pool that should issue the certificate, any CA in the pool if unset
    pub certificate_authority: Option<String>,
}

impl Object for Certificate {}

impl Certificate {
    /// The full resource name, `projects/*/locations/*/caPools/*/certificates/*`.
    pub fn id(&self) -> String {
        template::nprintf(CERTIFICATE_TEMPLATE, &self.url_params())
    }

    pub fn describe(&self) -> ServiceTypeVersion {
        ServiceTypeVersion {
            service: "privateca",
            type_name: "Certificate",
            version: "privateca",
        }
    }

    /// Whether both refer to the same certificate, regardless of how the references are spelled.
    pub fn matches(&self, other: &Certificate) -> bool {
        self.url_params() == other.url_params()
    }

    /// Whether the certificate has been revoked.
    pub fn is_revoked(&self) -> bool {
        !is_empty_object(&self.revocation_details)
    }

    /// Identity parameters, reduced to their last path segment.
    fn url_params(&self) -> Params<'static> {
        [
            ("project", &self.project),
            ("location", &self.location),
            ("ca_pool", &self.ca_pool),
            ("name", &self.name),
        ]
        .into_iter()
        .map(|(key, value)| (key, last_segment(value).to_string()))
        .collect()
    }

    pub(crate) fn get_url(&self, user_base_path: Option<&str>) -> Result<String, template::Error> {
        template::url(CERTIFICATE_TEMPLATE, BASE_PATH, user_base_path, &self.url_params())
    }

    pub(crate) fn list_url(&self, user_base_path: Option<&str>) -> Result<String, template::Error> {
        template::url(CERTIFICATES_TEMPLATE, BASE_PATH, user_base_path, &self.url_params())
    }

    pub(crate) fn create_url(&self, user_base_path: Option<&str>) -> Result<String, template::Error> {
        let url = self.list_url(user_base_path)?;
        template::add_query_params(
            &url,
            &[
                ("certificateId", last_segment(&self.name)),
                (
                    "issuingCertificateAuthorityId",
                    last_segment(&self.certificate_authority),
                ),
            ],
        )
    }

    pub(crate) fn revoke_url(&self, user_base_path: Option<&str>) -> Result<String, template::Error> {
        Ok(format!("{}:revoke", self.get_url(user_base_path)?))
    }
}

fn last_segment(value: &Option<String>) -> &str {
    value.as_deref().map(self_link_to_name).unwrap_or_default()
}

impl Validate for Certificate {
    fn validate(&self) -> Result<(), ValidationError> {
        at_most_one_of(&[
            ("pemCsr", !is_zero_value(&self.pem_csr)),
            ("config", !is_empty_object(&self.config)),
        ])?;
        required(&self.name, "name")?;
        required(&self.lifetime, "lifetime")?;
        required(&self.project, "project")?;
        required(&self.location, "location")?;
        required(&self.ca_pool, "caPool")?;
        if let Some(subject_mode) = &self.subject_mode {
            subject_mode.validate("subjectMode")?;
        }
        validate_object(&self.config)
    }
}

impl Extract for Certificate {
    fn extract_fields(&mut self) {
        extract_object(&mut self.config);
        extract_object(&mut self.revocation_details);
        extract_object(&mut self.certificate_description);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.config);
        post_read_extract_object(&mut self.revocation_details);
        post_read_extract_object(&mut self.certificate_description);
    }
}
