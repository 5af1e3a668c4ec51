//! The requested contents of a certificate, see
//! <https://cloud.google.com/certificate-authority-service/docs/reference/rest/v1/CertificateConfig>.
//!
//! Every field in here is immutable once the certificate is issued, so all of them are compared
//! with [`DiffInfo::recreate`].

use dcl::{
    canonicalize::{
        canonical_new_value, canonical_value, canonical_vec, canonicalize_new_object,
        canonicalize_new_object_slice, canonicalize_object, canonicalize_object_slice,
        Canonicalize,
    },
    codec::{
        flatten_bool, flatten_enum, flatten_integer, flatten_integer_array, flatten_object,
        flatten_object_slice, flatten_string, flatten_string_array, put_object, put_object_slice,
        put_value, put_vec, Codec, JsonMap,
    },
    diff::{diff_object, diff_object_slice, diff_value, diff_vec, Compare, DiffInfo, FieldDiff, FieldName},
    object::{
        extract_object, extract_object_slice, post_read_extract_object,
        post_read_extract_object_slice, Extract, Object,
    },
    validation::{
        at_most_one_of, required, required_vec, validate_object, validate_objects, Validate,
        ValidationError,
    },
};
use serde::{Deserialize, Serialize};

use super::enums::PublicKeyFormat;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateConfig {
    pub subject_config: Option<SubjectConfig>,
    pub x509_config: Option<X509Config>,
    /// The key to embed, only needed when the CA does not receive a CSR
    pub public_key: Option<PublicKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectConfig {
    pub subject: Option<Subject>,
    pub subject_alt_name: Option<SubjectAltName>,
}

/// Distinguished name fields, shared with the parsed-back [`SubjectDescription`](super::description::SubjectDescription).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Subject {
    pub common_name: Option<String>,
    pub country_code: Option<String>,
    pub organization: Option<String>,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub province: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub uris: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<String>,
}

/// X.509 extensions of the certificate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X509Config {
    pub key_usage: Option<KeyUsage>,
    pub ca_options: Option<CaOptions>,
    pub policy_ids: Vec<ObjectId>,
    pub aia_ocsp_servers: Vec<String>,
    pub additional_extensions: Vec<X509Extension>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyUsage {
    pub base_key_usage: Option<BaseKeyUsage>,
    pub extended_key_usage: Option<ExtendedKeyUsage>,
    pub unknown_extended_key_usages: Vec<ObjectId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseKeyUsage {
    pub digital_signature: Option<bool>,
    pub content_commitment: Option<bool>,
    pub key_encipherment: Option<bool>,
    pub data_encipherment: Option<bool>,
    pub key_agreement: Option<bool>,
    pub cert_sign: Option<bool>,
    pub crl_sign: Option<bool>,
    pub encipher_only: Option<bool>,
    pub decipher_only: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtendedKeyUsage {
    pub server_auth: Option<bool>,
    pub client_auth: Option<bool>,
    pub code_signing: Option<bool>,
    pub email_protection: Option<bool>,
    pub time_stamping: Option<bool>,
    pub ocsp_signing: Option<bool>,
}

/// An ASN.1 object identifier, as its list of arcs (`[1, 3, 6, 1]`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectId {
    pub object_id_path: Vec<i64>,
}

/// Basic constraints of the certificate.
///
/// The API only transmits `isCa` and `maxIssuerPathLength`, and cannot tell an explicit `false`
/// or `0` apart from an unset value. `non_ca` and `zero_max_issuer_path_length` request those
/// explicitly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaOptions {
    pub is_ca: Option<bool>,
    pub non_ca: Option<bool>,
    pub max_issuer_path_length: Option<i64>,
    pub zero_max_issuer_path_length: Option<bool>,
}

/// A custom X.509 extension, the value is base64 encoded DER.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X509Extension {
    pub object_id: Option<ObjectId>,
    pub critical: Option<bool>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PublicKey {
    /// Base64 encoded key
    pub key: Option<String>,
    pub format: Option<PublicKeyFormat>,
}

impl Object for CertificateConfig {}
impl Object for SubjectConfig {}
impl Object for Subject {}
impl Object for SubjectAltName {}
impl Object for X509Config {}
impl Object for KeyUsage {}
impl Object for BaseKeyUsage {}
impl Object for ExtendedKeyUsage {}
impl Object for ObjectId {}
impl Object for CaOptions {}
impl Object for X509Extension {}
impl Object for PublicKey {}

impl Validate for CertificateConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.subject_config, "subjectConfig")?;
        required(&self.x509_config, "x509Config")?;
        validate_object(&self.subject_config)?;
        validate_object(&self.x509_config)?;
        validate_object(&self.public_key)
    }
}

impl Validate for SubjectConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.subject, "subject")
    }
}

impl Validate for X509Config {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_object(&self.key_usage)?;
        validate_object(&self.ca_options)?;
        validate_objects(&self.policy_ids)?;
        validate_objects(&self.additional_extensions)
    }
}

impl Validate for KeyUsage {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_objects(&self.unknown_extended_key_usages)
    }
}

impl Validate for ObjectId {
    fn validate(&self) -> Result<(), ValidationError> {
        required_vec(&self.object_id_path, "objectIdPath")
    }
}

impl Validate for CaOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        at_most_one_of(&[
            ("isCa", self.is_ca == Some(true)),
            ("nonCa", self.non_ca == Some(true)),
        ])?;
        let max_issuer_path_length = self.max_issuer_path_length.unwrap_or_default();
        if max_issuer_path_length < 0 {
            return Err(ValidationError::Invalid {
                field: "maxIssuerPathLength".to_string(),
                reason: format!("{max_issuer_path_length} is negative"),
            });
        }
        at_most_one_of(&[
            ("maxIssuerPathLength", max_issuer_path_length > 0),
            (
                "zeroMaxIssuerPathLength",
                self.zero_max_issuer_path_length == Some(true),
            ),
        ])
    }
}

impl Validate for X509Extension {
    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.object_id, "objectId")?;
        required(&self.value, "value")?;
        validate_object(&self.object_id)
    }
}

impl Validate for PublicKey {
    fn validate(&self) -> Result<(), ValidationError> {
        required(&self.key, "key")?;
        required(&self.format, "format")?;
        self.format
            .as_ref()
            .map_or(Ok(()), |format| format.validate("format"))
    }
}

impl Canonicalize for CertificateConfig {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            subject_config: canonicalize_object(&self.subject_config, &initial.subject_config),
            x509_config: canonicalize_object(&self.x509_config, &initial.x509_config),
            public_key: canonicalize_object(&self.public_key, &initial.public_key),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            subject_config: canonicalize_new_object(&self.subject_config, new.subject_config),
            x509_config: canonicalize_new_object(&self.x509_config, new.x509_config),
            public_key: canonicalize_new_object(&self.public_key, new.public_key),
        }
    }
}

impl Canonicalize for SubjectConfig {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            subject: canonicalize_object(&self.subject, &initial.subject),
            subject_alt_name: canonicalize_object(&self.subject_alt_name, &initial.subject_alt_name),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            subject: canonicalize_new_object(&self.subject, new.subject),
            subject_alt_name: canonicalize_new_object(&self.subject_alt_name, new.subject_alt_name),
        }
    }
}

impl Canonicalize for Subject {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            common_name: canonical_value(&self.common_name, &initial.common_name),
            country_code: canonical_value(&self.country_code, &initial.country_code),
            organization: canonical_value(&self.organization, &initial.organization),
            organizational_unit: canonical_value(
                &self.organizational_unit,
                &initial.organizational_unit,
            ),
            locality: canonical_value(&self.locality, &initial.locality),
            province: canonical_value(&self.province, &initial.province),
            street_address: canonical_value(&self.street_address, &initial.street_address),
            postal_code: canonical_value(&self.postal_code, &initial.postal_code),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            common_name: canonical_new_value(&self.common_name, new.common_name),
            country_code: canonical_new_value(&self.country_code, new.country_code),
            organization: canonical_new_value(&self.organization, new.organization),
            organizational_unit: canonical_new_value(
                &self.organizational_unit,
                new.organizational_unit,
            ),
            locality: canonical_new_value(&self.locality, new.locality),
            province: canonical_new_value(&self.province, new.province),
            street_address: canonical_new_value(&self.street_address, new.street_address),
            postal_code: canonical_new_value(&self.postal_code, new.postal_code),
        }
    }
}

impl Canonicalize for SubjectAltName {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            dns_names: canonical_vec(&self.dns_names, &initial.dns_names),
            uris: canonical_vec(&self.uris, &initial.uris),
            email_addresses: canonical_vec(&self.email_addresses, &initial.email_addresses),
            ip_addresses: canonical_vec(&self.ip_addresses, &initial.ip_addresses),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        // Lists are only ever equal or different, there is nothing to reconcile
        new
    }
}

impl Canonicalize for X509Config {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            key_usage: canonicalize_object(&self.key_usage, &initial.key_usage),
            ca_options: canonicalize_object(&self.ca_options, &initial.ca_options),
            policy_ids: canonicalize_object_slice(&self.policy_ids, &initial.policy_ids),
            aia_ocsp_servers: canonical_vec(&self.aia_ocsp_servers, &initial.aia_ocsp_servers),
            additional_extensions: canonicalize_object_slice(
                &self.additional_extensions,
                &initial.additional_extensions,
            ),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            key_usage: canonicalize_new_object(&self.key_usage, new.key_usage),
            ca_options: canonicalize_new_object(&self.ca_options, new.ca_options),
            policy_ids: canonicalize_new_object_slice(&self.policy_ids, new.policy_ids),
            aia_ocsp_servers: new.aia_ocsp_servers,
            additional_extensions: canonicalize_new_object_slice(
                &self.additional_extensions,
                new.additional_extensions,
            ),
        }
    }
}

impl Canonicalize for KeyUsage {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            base_key_usage: canonicalize_object(&self.base_key_usage, &initial.base_key_usage),
            extended_key_usage: canonicalize_object(
                &self.extended_key_usage,
                &initial.extended_key_usage,
            ),
            unknown_extended_key_usages: canonicalize_object_slice(
                &self.unknown_extended_key_usages,
                &initial.unknown_extended_key_usages,
            ),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            base_key_usage: canonicalize_new_object(&self.base_key_usage, new.base_key_usage),
            extended_key_usage: canonicalize_new_object(
                &self.extended_key_usage,
                new.extended_key_usage,
            ),
            unknown_extended_key_usages: canonicalize_new_object_slice(
                &self.unknown_extended_key_usages,
                new.unknown_extended_key_usages,
            ),
        }
    }
}

impl Canonicalize for BaseKeyUsage {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            digital_signature: canonical_value(&self.digital_signature, &initial.digital_signature),
            content_commitment: canonical_value(
                &self.content_commitment,
                &initial.content_commitment,
            ),
            key_encipherment: canonical_value(&self.key_encipherment, &initial.key_encipherment),
            data_encipherment: canonical_value(&self.data_encipherment, &initial.data_encipherment),
            key_agreement: canonical_value(&self.key_agreement, &initial.key_agreement),
            cert_sign: canonical_value(&self.cert_sign, &initial.cert_sign),
            crl_sign: canonical_value(&self.crl_sign, &initial.crl_sign),
            encipher_only: canonical_value(&self.encipher_only, &initial.encipher_only),
            decipher_only: canonical_value(&self.decipher_only, &initial.decipher_only),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            digital_signature: canonical_new_value(&self.digital_signature, new.digital_signature),
            content_commitment: canonical_new_value(
                &self.content_commitment,
                new.content_commitment,
            ),
            key_encipherment: canonical_new_value(&self.key_encipherment, new.key_encipherment),
            data_encipherment: canonical_new_value(&self.data_encipherment, new.data_encipherment),
            key_agreement: canonical_new_value(&self.key_agreement, new.key_agreement),
            cert_sign: canonical_new_value(&self.cert_sign, new.cert_sign),
            crl_sign: canonical_new_value(&self.crl_sign, new.crl_sign),
            encipher_only: canonical_new_value(&self.encipher_only, new.encipher_only),
            decipher_only: canonical_new_value(&self.decipher_only, new.decipher_only),
        }
    }
}

impl Canonicalize for ExtendedKeyUsage {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            server_auth: canonical_value(&self.server_auth, &initial.server_auth),
            client_auth: canonical_value(&self.client_auth, &initial.client_auth),
            code_signing: canonical_value(&self.code_signing, &initial.code_signing),
            email_protection: canonical_value(&self.email_protection, &initial.email_protection),
            time_stamping: canonical_value(&self.time_stamping, &initial.time_stamping),
            ocsp_signing: canonical_value(&self.ocsp_signing, &initial.ocsp_signing),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            server_auth: canonical_new_value(&self.server_auth, new.server_auth),
            client_auth: canonical_new_value(&self.client_auth, new.client_auth),
            code_signing: canonical_new_value(&self.code_signing, new.code_signing),
            email_protection: canonical_new_value(&self.email_protection, new.email_protection),
            time_stamping: canonical_new_value(&self.time_stamping, new.time_stamping),
            ocsp_signing: canonical_new_value(&self.ocsp_signing, new.ocsp_signing),
        }
    }
}

impl Canonicalize for ObjectId {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            object_id_path: canonical_vec(&self.object_id_path, &initial.object_id_path),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        new
    }
}

impl Canonicalize for CaOptions {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            is_ca: canonical_value(&self.is_ca, &initial.is_ca),
            non_ca: canonical_value(&self.non_ca, &initial.non_ca),
            max_issuer_path_length: canonical_value(
                &self.max_issuer_path_length,
                &initial.max_issuer_path_length,
            ),
            zero_max_issuer_path_length: canonical_value(
                &self.zero_max_issuer_path_length,
                &initial.zero_max_issuer_path_length,
            ),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            is_ca: canonical_new_value(&self.is_ca, new.is_ca),
            non_ca: canonical_new_value(&self.non_ca, new.non_ca),
            max_issuer_path_length: canonical_new_value(
                &self.max_issuer_path_length,
                new.max_issuer_path_length,
            ),
            zero_max_issuer_path_length: canonical_new_value(
                &self.zero_max_issuer_path_length,
                new.zero_max_issuer_path_length,
            ),
        }
    }
}

impl Canonicalize for X509Extension {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            object_id: canonicalize_object(&self.object_id, &initial.object_id),
            critical: canonical_value(&self.critical, &initial.critical),
            value: canonical_value(&self.value, &initial.value),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            object_id: canonicalize_new_object(&self.object_id, new.object_id),
            critical: canonical_new_value(&self.critical, new.critical),
            value: canonical_new_value(&self.value, new.value),
        }
    }
}

impl Canonicalize for PublicKey {
    fn canonicalize_fields(&self, initial: &Self) -> Self {
        Self {
            key: canonical_value(&self.key, &initial.key),
            format: canonical_value(&self.format, &initial.format),
        }
    }

    fn canonicalize_new_fields(&self, new: Self) -> Self {
        Self {
            key: canonical_new_value(&self.key, new.key),
            format: new.format,
        }
    }
}

/// Diffs a leaf field of the config, which can only be changed by recreating the certificate.
fn diff_leaf<T: Default + PartialEq + Serialize>(
    desired: &Option<T>,
    actual: &Option<T>,
    field_name: &FieldName,
    name: &str,
) -> Vec<FieldDiff> {
    diff_value(desired, actual, &DiffInfo::recreate(), field_name.nest(name))
}

impl Compare for CertificateConfig {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        let info = DiffInfo::recreate();
        [
            diff_object(
                &desired.subject_config,
                &actual.subject_config,
                &info,
                field_name.nest("subjectConfig"),
            ),
            diff_object(
                &desired.x509_config,
                &actual.x509_config,
                &info,
                field_name.nest("x509Config"),
            ),
            diff_object(
                &desired.public_key,
                &actual.public_key,
                &info,
                field_name.nest("publicKey"),
            ),
        ]
        .concat()
    }
}

impl Compare for SubjectConfig {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        let info = DiffInfo::recreate();
        [
            diff_object(
                &desired.subject,
                &actual.subject,
                &info,
                field_name.nest("subject"),
            ),
            diff_object(
                &desired.subject_alt_name,
                &actual.subject_alt_name,
                &info,
                field_name.nest("subjectAltName"),
            ),
        ]
        .concat()
    }
}

impl Compare for Subject {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_leaf(&desired.common_name, &actual.common_name, field_name, "commonName"),
            diff_leaf(&desired.country_code, &actual.country_code, field_name, "countryCode"),
            diff_leaf(&desired.organization, &actual.organization, field_name, "organization"),
            diff_leaf(
                &desired.organizational_unit,
                &actual.organizational_unit,
                field_name,
                "organizationalUnit",
            ),
            diff_leaf(&desired.locality, &actual.locality, field_name, "locality"),
            diff_leaf(&desired.province, &actual.province, field_name, "province"),
            diff_leaf(&desired.street_address, &actual.street_address, field_name, "streetAddress"),
            diff_leaf(&desired.postal_code, &actual.postal_code, field_name, "postalCode"),
        ]
        .concat()
    }
}

impl Compare for SubjectAltName {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        let info = DiffInfo::recreate();
        [
            diff_vec(&desired.dns_names, &actual.dns_names, &info, field_name.nest("dnsNames")),
            diff_vec(&desired.uris, &actual.uris, &info, field_name.nest("uris")),
            diff_vec(
                &desired.email_addresses,
                &actual.email_addresses,
                &info,
                field_name.nest("emailAddresses"),
            ),
            diff_vec(
                &desired.ip_addresses,
                &actual.ip_addresses,
                &info,
                field_name.nest("ipAddresses"),
            ),
        ]
        .concat()
    }
}

impl Compare for X509Config {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        let info = DiffInfo::recreate();
        [
            diff_object(
                &desired.key_usage,
                &actual.key_usage,
                &info,
                field_name.nest("keyUsage"),
            ),
            diff_object(
                &desired.ca_options,
                &actual.ca_options,
                &info,
                field_name.nest("caOptions"),
            ),
            diff_object_slice(
                &desired.policy_ids,
                &actual.policy_ids,
                &info,
                field_name.nest("policyIds"),
            ),
            diff_vec(
                &desired.aia_ocsp_servers,
                &actual.aia_ocsp_servers,
                &info,
                field_name.nest("aiaOcspServers"),
            ),
            diff_object_slice(
                &desired.additional_extensions,
                &actual.additional_extensions,
                &info,
                field_name.nest("additionalExtensions"),
            ),
        ]
        .concat()
    }
}

impl Compare for KeyUsage {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        let info = DiffInfo::recreate();
        [
            diff_object(
                &desired.base_key_usage,
                &actual.base_key_usage,
                &info,
                field_name.nest("baseKeyUsage"),
            ),
            diff_object(
                &desired.extended_key_usage,
                &actual.extended_key_usage,
                &info,
                field_name.nest("extendedKeyUsage"),
            ),
            diff_object_slice(
                &desired.unknown_extended_key_usages,
                &actual.unknown_extended_key_usages,
                &info,
                field_name.nest("unknownExtendedKeyUsages"),
            ),
        ]
        .concat()
    }
}

impl Compare for BaseKeyUsage {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_leaf(
                &desired.digital_signature,
                &actual.digital_signature,
                field_name,
                "digitalSignature",
            ),
            diff_leaf(
                &desired.content_commitment,
                &actual.content_commitment,
                field_name,
                "contentCommitment",
            ),
            diff_leaf(
                &desired.key_encipherment,
                &actual.key_encipherment,
                field_name,
                "keyEncipherment",
            ),
            diff_leaf(
                &desired.data_encipherment,
                &actual.data_encipherment,
                field_name,
                "dataEncipherment",
            ),
            diff_leaf(&desired.key_agreement, &actual.key_agreement, field_name, "keyAgreement"),
            diff_leaf(&desired.cert_sign, &actual.cert_sign, field_name, "certSign"),
            diff_leaf(&desired.crl_sign, &actual.crl_sign, field_name, "crlSign"),
            diff_leaf(&desired.encipher_only, &actual.encipher_only, field_name, "encipherOnly"),
            diff_leaf(&desired.decipher_only, &actual.decipher_only, field_name, "decipherOnly"),
        ]
        .concat()
    }
}

impl Compare for ExtendedKeyUsage {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_leaf(&desired.server_auth, &actual.server_auth, field_name, "serverAuth"),
            diff_leaf(&desired.client_auth, &actual.client_auth, field_name, "clientAuth"),
            diff_leaf(&desired.code_signing, &actual.code_signing, field_name, "codeSigning"),
            diff_leaf(
                &desired.email_protection,
                &actual.email_protection,
                field_name,
                "emailProtection",
            ),
            diff_leaf(&desired.time_stamping, &actual.time_stamping, field_name, "timeStamping"),
            diff_leaf(&desired.ocsp_signing, &actual.ocsp_signing, field_name, "ocspSigning"),
        ]
        .concat()
    }
}

impl Compare for ObjectId {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        diff_vec(
            &desired.object_id_path,
            &actual.object_id_path,
            &DiffInfo::recreate(),
            field_name.nest("objectIdPath"),
        )
    }
}

impl Compare for CaOptions {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_leaf(&desired.is_ca, &actual.is_ca, field_name, "isCa"),
            diff_leaf(&desired.non_ca, &actual.non_ca, field_name, "nonCa"),
            diff_leaf(
                &desired.max_issuer_path_length,
                &actual.max_issuer_path_length,
                field_name,
                "maxIssuerPathLength",
            ),
            diff_leaf(
                &desired.zero_max_issuer_path_length,
                &actual.zero_max_issuer_path_length,
                field_name,
                "zeroMaxIssuerPathLength",
            ),
        ]
        .concat()
    }
}

impl Compare for X509Extension {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_object(
                &desired.object_id,
                &actual.object_id,
                &DiffInfo::recreate(),
                field_name.nest("objectId"),
            ),
            diff_leaf(&desired.critical, &actual.critical, field_name, "critical"),
            diff_leaf(&desired.value, &actual.value, field_name, "value"),
        ]
        .concat()
    }
}

impl Compare for PublicKey {
    fn compare(desired: &Self, actual: &Self, field_name: &FieldName) -> Vec<FieldDiff> {
        [
            diff_leaf(&desired.key, &actual.key, field_name, "key"),
            diff_leaf(&desired.format, &actual.format, field_name, "format"),
        ]
        .concat()
    }
}

impl Codec for CertificateConfig {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "subjectConfig", &self.subject_config);
        put_object(&mut m, "x509Config", &self.x509_config);
        put_object(&mut m, "publicKey", &self.public_key);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            subject_config: flatten_object(map.get("subjectConfig")),
            x509_config: flatten_object(map.get("x509Config")),
            public_key: flatten_object(map.get("publicKey")),
        }
    }
}

impl Codec for SubjectConfig {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "subject", &self.subject);
        put_object(&mut m, "subjectAltName", &self.subject_alt_name);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            subject: flatten_object(map.get("subject")),
            subject_alt_name: flatten_object(map.get("subjectAltName")),
        }
    }
}

impl Codec for Subject {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "commonName", &self.common_name);
        put_value(&mut m, "countryCode", &self.country_code);
        put_value(&mut m, "organization", &self.organization);
        put_value(&mut m, "organizationalUnit", &self.organizational_unit);
        put_value(&mut m, "locality", &self.locality);
        put_value(&mut m, "province", &self.province);
        put_value(&mut m, "streetAddress", &self.street_address);
        put_value(&mut m, "postalCode", &self.postal_code);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            common_name: flatten_string(map.get("commonName")),
            country_code: flatten_string(map.get("countryCode")),
            organization: flatten_string(map.get("organization")),
            organizational_unit: flatten_string(map.get("organizationalUnit")),
            locality: flatten_string(map.get("locality")),
            province: flatten_string(map.get("province")),
            street_address: flatten_string(map.get("streetAddress")),
            postal_code: flatten_string(map.get("postalCode")),
        }
    }
}

impl Codec for SubjectAltName {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_vec(&mut m, "dnsNames", &self.dns_names);
        put_vec(&mut m, "uris", &self.uris);
        put_vec(&mut m, "emailAddresses", &self.email_addresses);
        put_vec(&mut m, "ipAddresses", &self.ip_addresses);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            dns_names: flatten_string_array(map.get("dnsNames")),
            uris: flatten_string_array(map.get("uris")),
            email_addresses: flatten_string_array(map.get("emailAddresses")),
            ip_addresses: flatten_string_array(map.get("ipAddresses")),
        }
    }
}

impl Codec for X509Config {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "keyUsage", &self.key_usage);
        put_object(&mut m, "caOptions", &self.ca_options);
        put_object_slice(&mut m, "policyIds", &self.policy_ids);
        put_vec(&mut m, "aiaOcspServers", &self.aia_ocsp_servers);
        put_object_slice(&mut m, "additionalExtensions", &self.additional_extensions);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            key_usage: flatten_object(map.get("keyUsage")),
            ca_options: flatten_object(map.get("caOptions")),
            policy_ids: flatten_object_slice(map.get("policyIds")),
            aia_ocsp_servers: flatten_string_array(map.get("aiaOcspServers")),
            additional_extensions: flatten_object_slice(map.get("additionalExtensions")),
        }
    }
}

impl Codec for KeyUsage {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "baseKeyUsage", &self.base_key_usage);
        put_object(&mut m, "extendedKeyUsage", &self.extended_key_usage);
        put_object_slice(
            &mut m,
            "unknownExtendedKeyUsages",
            &self.unknown_extended_key_usages,
        );
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            base_key_usage: flatten_object(map.get("baseKeyUsage")),
            extended_key_usage: flatten_object(map.get("extendedKeyUsage")),
            unknown_extended_key_usages: flatten_object_slice(map.get("unknownExtendedKeyUsages")),
        }
    }
}

impl Codec for BaseKeyUsage {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "digitalSignature", &self.digital_signature);
        put_value(&mut m, "contentCommitment", &self.content_commitment);
        put_value(&mut m, "keyEncipherment", &self.key_encipherment);
        put_value(&mut m, "dataEncipherment", &self.data_encipherment);
        put_value(&mut m, "keyAgreement", &self.key_agreement);
        put_value(&mut m, "certSign", &self.cert_sign);
        put_value(&mut m, "crlSign", &self.crl_sign);
        put_value(&mut m, "encipherOnly", &self.encipher_only);
        put_value(&mut m, "decipherOnly", &self.decipher_only);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            digital_signature: flatten_bool(map.get("digitalSignature")),
            content_commitment: flatten_bool(map.get("contentCommitment")),
            key_encipherment: flatten_bool(map.get("keyEncipherment")),
            data_encipherment: flatten_bool(map.get("dataEncipherment")),
            key_agreement: flatten_bool(map.get("keyAgreement")),
            cert_sign: flatten_bool(map.get("certSign")),
            crl_sign: flatten_bool(map.get("crlSign")),
            encipher_only: flatten_bool(map.get("encipherOnly")),
            decipher_only: flatten_bool(map.get("decipherOnly")),
        }
    }
}

impl Codec for ExtendedKeyUsage {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "serverAuth", &self.server_auth);
        put_value(&mut m, "clientAuth", &self.client_auth);
        put_value(&mut m, "codeSigning", &self.code_signing);
        put_value(&mut m, "emailProtection", &self.email_protection);
        put_value(&mut m, "timeStamping", &self.time_stamping);
        put_value(&mut m, "ocspSigning", &self.ocsp_signing);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            server_auth: flatten_bool(map.get("serverAuth")),
            client_auth: flatten_bool(map.get("clientAuth")),
            code_signing: flatten_bool(map.get("codeSigning")),
            email_protection: flatten_bool(map.get("emailProtection")),
            time_stamping: flatten_bool(map.get("timeStamping")),
            ocsp_signing: flatten_bool(map.get("ocspSigning")),
        }
    }
}

impl Codec for ObjectId {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_vec(&mut m, "objectIdPath", &self.object_id_path);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            object_id_path: flatten_integer_array(map.get("objectIdPath")),
        }
    }
}

impl Codec for CaOptions {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        if self.is_ca == Some(true) {
            m.insert("isCa".to_string(), true.into());
        } else if self.non_ca == Some(true) {
            m.insert("isCa".to_string(), false.into());
        }
        match self.max_issuer_path_length {
            Some(length) if length != 0 => {
                m.insert("maxIssuerPathLength".to_string(), length.into());
            }
            _ if self.zero_max_issuer_path_length == Some(true) => {
                m.insert("maxIssuerPathLength".to_string(), 0.into());
            }
            _ => {}
        }
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        let is_ca = flatten_bool(map.get("isCa"));
        let max_issuer_path_length = flatten_integer(map.get("maxIssuerPathLength"));
        Self {
            is_ca,
            non_ca: (is_ca == Some(false)).then_some(true),
            max_issuer_path_length,
            zero_max_issuer_path_length: (max_issuer_path_length == Some(0)).then_some(true),
        }
    }
}

impl Codec for X509Extension {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "objectId", &self.object_id);
        put_value(&mut m, "critical", &self.critical);
        put_value(&mut m, "value", &self.value);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            object_id: flatten_object(map.get("objectId")),
            critical: flatten_bool(map.get("critical")),
            value: flatten_string(map.get("value")),
        }
    }
}

impl Codec for PublicKey {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "key", &self.key);
        put_value(&mut m, "format", &self.format);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            key: flatten_string(map.get("key")),
            format: flatten_enum(map.get("format")),
        }
    }
}

impl Extract for CertificateConfig {
    fn extract_fields(&mut self) {
        extract_object(&mut self.subject_config);
        extract_object(&mut self.x509_config);
        extract_object(&mut self.public_key);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.subject_config);
        post_read_extract_object(&mut self.x509_config);
        post_read_extract_object(&mut self.public_key);
    }
}

impl Extract for SubjectConfig {
    fn extract_fields(&mut self) {
        extract_object(&mut self.subject);
        extract_object(&mut self.subject_alt_name);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.subject);
        post_read_extract_object(&mut self.subject_alt_name);
    }
}

impl Extract for X509Config {
    fn extract_fields(&mut self) {
        extract_object(&mut self.key_usage);
        extract_object(&mut self.ca_options);
        extract_object_slice(&mut self.policy_ids);
        extract_object_slice(&mut self.additional_extensions);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.key_usage);
        post_read_extract_object(&mut self.ca_options);
        post_read_extract_object_slice(&mut self.policy_ids);
        post_read_extract_object_slice(&mut self.additional_extensions);
    }
}

impl Extract for KeyUsage {
    fn extract_fields(&mut self) {
        extract_object(&mut self.base_key_usage);
        extract_object(&mut self.extended_key_usage);
        extract_object_slice(&mut self.unknown_extended_key_usages);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.base_key_usage);
        post_read_extract_object(&mut self.extended_key_usage);
        post_read_extract_object_slice(&mut self.unknown_extended_key_usages);
    }
}

impl Extract for X509Extension {
    fn extract_fields(&mut self) {
        extract_object(&mut self.object_id);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.object_id);
    }
}

impl Extract for Subject {}
impl Extract for SubjectAltName {}
impl Extract for BaseKeyUsage {}
impl Extract for ExtendedKeyUsage {}
impl Extract for ObjectId {}
impl Extract for CaOptions {}
impl Extract for PublicKey {}

impl Validate for Subject {}
impl Validate for SubjectAltName {}
impl Validate for BaseKeyUsage {}
impl Validate for ExtendedKeyUsage {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object_id(path: &[i64]) -> ObjectId {
        ObjectId {
            object_id_path: path.to_vec(),
        }
    }

    #[test]
    fn ca_options_expand_explicit_zero_values() {
        let non_ca = CaOptions {
            non_ca: Some(true),
            zero_max_issuer_path_length: Some(true),
            ..CaOptions::default()
        };
        assert_eq!(
            serde_json::Value::Object(non_ca.expand()),
            json!({"isCa": false, "maxIssuerPathLength": 0})
        );

        let ca = CaOptions {
            is_ca: Some(true),
            max_issuer_path_length: Some(2),
            ..CaOptions::default()
        };
        assert_eq!(
            serde_json::Value::Object(ca.expand()),
            json!({"isCa": true, "maxIssuerPathLength": 2})
        );
        assert_eq!(CaOptions::default().expand(), JsonMap::new());
    }

    #[test]
    fn ca_options_flatten_sets_explicit_flags() {
        let flattened = CaOptions::flatten(
            json!({"isCa": false, "maxIssuerPathLength": 0})
                .as_object()
                .unwrap(),
        );
        assert_eq!(
            flattened,
            CaOptions {
                is_ca: Some(false),
                non_ca: Some(true),
                max_issuer_path_length: Some(0),
                zero_max_issuer_path_length: Some(true),
            }
        );

        let desired = CaOptions {
            non_ca: Some(true),
            zero_max_issuer_path_length: Some(true),
            ..CaOptions::default()
        };
        assert!(CaOptions::compare(&desired, &flattened, &FieldName::root()).is_empty());
    }

    #[test]
    fn ca_options_validation() {
        let both = CaOptions {
            is_ca: Some(true),
            non_ca: Some(true),
            ..CaOptions::default()
        };
        assert!(matches!(
            both.validate(),
            Err(ValidationError::AtMostOneOf { .. })
        ));
        let negative = CaOptions {
            max_issuer_path_length: Some(-1),
            ..CaOptions::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::Invalid { .. })
        ));
        let conflicting = CaOptions {
            max_issuer_path_length: Some(1),
            zero_max_issuer_path_length: Some(true),
            ..CaOptions::default()
        };
        assert!(conflicting.validate().is_err());
        let zero = CaOptions {
            max_issuer_path_length: Some(0),
            zero_max_issuer_path_length: Some(true),
            ..CaOptions::default()
        };
        assert_eq!(zero.validate(), Ok(()));
    }

    #[test]
    fn config_requires_subject_and_x509_config() {
        let config = CertificateConfig {
            subject_config: Some(SubjectConfig {
                subject: Some(Subject {
                    common_name: Some("example.com".to_string()),
                    ..Subject::default()
                }),
                subject_alt_name: None,
            }),
            ..CertificateConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::Required {
                field: "x509Config".to_string()
            })
        );

        let config = CertificateConfig {
            x509_config: Some(X509Config {
                additional_extensions: vec![X509Extension {
                    object_id: Some(object_id(&[1, 2, 3])),
                    critical: None,
                    value: None,
                }],
                ..X509Config::default()
            }),
            ..config
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::Required {
                field: "value".to_string()
            })
        );
    }

    #[test]
    fn public_key_requires_known_format() {
        let key = PublicKey {
            key: Some("a2V5".to_string()),
            format: Some(PublicKeyFormat::Unknown("DER".to_string())),
        };
        assert!(matches!(
            key.validate(),
            Err(ValidationError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn x509_config_round_trips_through_json() {
        let json = json!({
            "keyUsage": {
                "baseKeyUsage": {"digitalSignature": true, "keyEncipherment": true},
                "extendedKeyUsage": {"serverAuth": true},
                "unknownExtendedKeyUsages": [{"objectIdPath": [1, 3, 6, 1, 5]}]
            },
            "caOptions": {"isCa": true},
            "policyIds": [{"objectIdPath": [2, 23, 140, 1, 2, 1]}],
            "aiaOcspServers": ["http://ocsp.example.com"],
            "additionalExtensions": [{"objectId": {"objectIdPath": [1, 2]}, "critical": true, "value": "AAE="}]
        });
        let config = X509Config::flatten(json.as_object().unwrap());
        assert_eq!(config.policy_ids, vec![object_id(&[2, 23, 140, 1, 2, 1])]);
        assert_eq!(
            config
                .key_usage
                .as_ref()
                .and_then(|k| k.extended_key_usage.as_ref())
                .and_then(|e| e.server_auth),
            Some(true)
        );
        assert_eq!(serde_json::Value::Object(config.expand()), json);
    }

    #[test]
    fn canonicalize_prefers_initial_for_unset_and_equal_values() {
        let desired = Subject {
            common_name: Some("example.com".to_string()),
            organization: Some(String::new()),
            ..Subject::default()
        };
        let initial = Subject {
            common_name: Some("example.com".to_string()),
            organization: Some("Example Org".to_string()),
            locality: Some("Berlin".to_string()),
            ..Subject::default()
        };
        assert_eq!(desired.canonicalize_fields(&initial), initial);

        let desired = Subject {
            common_name: Some("other.example.com".to_string()),
            ..Subject::default()
        };
        assert_eq!(
            desired.canonicalize_fields(&initial).common_name.as_deref(),
            Some("other.example.com")
        );
    }

    #[test]
    fn compare_reports_nested_paths() {
        let desired = X509Config {
            key_usage: Some(KeyUsage {
                base_key_usage: Some(BaseKeyUsage {
                    cert_sign: Some(true),
                    ..BaseKeyUsage::default()
                }),
                ..KeyUsage::default()
            }),
            ..X509Config::default()
        };
        let actual = X509Config {
            key_usage: Some(KeyUsage {
                base_key_usage: Some(BaseKeyUsage {
                    digital_signature: Some(true),
                    ..BaseKeyUsage::default()
                }),
                ..KeyUsage::default()
            }),
            ..X509Config::default()
        };
        let diffs = X509Config::compare(&desired, &actual, &FieldName::root().nest("x509Config"));
        assert_eq!(diffs.len(), 1);
        assert_eq!(
            diffs[0].field_name.to_string(),
            "x509Config.keyUsage.baseKeyUsage.certSign"
        );
        assert_eq!(diffs[0].resulting_operation, vec!["Recreate".to_string()]);
    }
}
