//! Server reported parts of a certificate. These are never sent, only read back and kept.

use dcl::{
    codec::{
        flatten_bool, flatten_enum, flatten_integer, flatten_object, flatten_object_slice,
        flatten_string, flatten_string_array, put_object, put_object_slice, put_value, put_vec,
        Codec, JsonMap,
    },
    object::{
        extract_object, extract_object_slice, post_read_extract_object,
        post_read_extract_object_slice, Extract, Object,
    },
};
use serde::{Deserialize, Serialize};

use super::{
    config::{KeyUsage, ObjectId, PublicKey, Subject, X509Extension},
    enums::RevocationReason,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevocationDetails {
    pub revocation_state: Option<RevocationReason>,
    /// RFC 3339 timestamp
    pub revocation_time: Option<String>,
}

/// The issued certificate, parsed back by the CA. See
/// <https://cloud.google.com/certificate-authority-service/docs/reference/rest/v1/projects.locations.caPools.certificates#certificatedescription>.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateDescription {
    pub subject_description: Option<SubjectDescription>,
    pub x509_description: Option<X509Description>,
    pub public_key: Option<PublicKey>,
    pub subject_key_id: Option<KeyId>,
    pub authority_key_id: Option<KeyId>,
    pub crl_distribution_points: Vec<String>,
    pub aia_issuing_certificate_urls: Vec<String>,
    pub cert_fingerprint: Option<CertFingerprint>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectDescription {
    pub subject: Option<Subject>,
    pub subject_alt_name: Option<SubjectAltNameDescription>,
    pub hex_serial_number: Option<String>,
    pub lifetime: Option<String>,
    pub not_before_time: Option<String>,
    pub not_after_time: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectAltNameDescription {
    pub dns_names: Vec<String>,
    pub uris: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<String>,
    /// SANs that are not one of the well known types above
    pub custom_sans: Vec<X509Extension>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X509Description {
    pub key_usage: Option<KeyUsage>,
    pub ca_options: Option<CaOptionsDescription>,
    pub policy_ids: Vec<ObjectId>,
    pub aia_ocsp_servers: Vec<String>,
    pub additional_extensions: Vec<X509Extension>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaOptionsDescription {
    pub is_ca: Option<bool>,
    pub max_issuer_path_length: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyId {
    pub key_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertFingerprint {
    pub sha256_hash: Option<String>,
}

impl Object for RevocationDetails {}
impl Object for CertificateDescription {}
impl Object for SubjectDescription {}
impl Object for SubjectAltNameDescription {}
impl Object for X509Description {}
impl Object for CaOptionsDescription {}
impl Object for KeyId {}
impl Object for CertFingerprint {}

impl Codec for RevocationDetails {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "revocationState", &self.revocation_state);
        put_value(&mut m, "revocationTime", &self.revocation_time);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            revocation_state: flatten_enum(map.get("revocationState")),
            revocation_time: flatten_string(map.get("revocationTime")),
        }
    }
}

impl Codec for CertificateDescription {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "subjectDescription", &self.subject_description);
        put_object(&mut m, "x509Description", &self.x509_description);
        put_object(&mut m, "publicKey", &self.public_key);
        put_object(&mut m, "subjectKeyId", &self.subject_key_id);
        put_object(&mut m, "authorityKeyId", &self.authority_key_id);
        put_vec(&mut m, "crlDistributionPoints", &self.crl_distribution_points);
        put_vec(
            &mut m,
            "aiaIssuingCertificateUrls",
            &self.aia_issuing_certificate_urls,
        );
        put_object(&mut m, "certFingerprint", &self.cert_fingerprint);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            subject_description: flatten_object(map.get("subjectDescription")),
            x509_description: flatten_object(map.get("x509Description")),
            public_key: flatten_object(map.get("publicKey")),
            subject_key_id: flatten_object(map.get("subjectKeyId")),
            authority_key_id: flatten_object(map.get("authorityKeyId")),
            crl_distribution_points: flatten_string_array(map.get("crlDistributionPoints")),
            aia_issuing_certificate_urls: flatten_string_array(
                map.get("aiaIssuingCertificateUrls"),
            ),
            cert_fingerprint: flatten_object(map.get("certFingerprint")),
        }
    }
}

impl Codec for SubjectDescription {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_object(&mut m, "subject", &self.subject);
        put_object(&mut m, "subjectAltName", &self.subject_alt_name);
        put_value(&mut m, "hexSerialNumber", &self.hex_serial_number);
        put_value(&mut m, "lifetime", &self.lifetime);
        put_value(&mut m, "notBeforeTime", &self.not_before_time);
        put_value(&mut m, "notAfterTime", &self.not_after_time);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            subject: flatten_object(map.get("subject")),
            subject_alt_name: flatten_object(map.get("subjectAltName")),
            hex_serial_number: flatten_string(map.get("hexSerialNumber")),
            lifetime: flatten_string(map.get("lifetime")),
            not_before_time: flatten_string(map.get("notBeforeTime")),
            not_after_time: flatten_string(map.get("notAfterTime")),
        }
    }
}

impl Codec for SubjectAltNameDescription {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_vec(&mut m, "dnsNames", &self.dns_names);
        put_vec(&mut m, "uris", &self.uris);
        put_vec(&mut m, "emailAddresses", &self.email_addresses);
        put_vec(&mut m, "ipAddresses", &self.ip_addresses);
        put_object_slice(&mut m, "customSans", &self.custom_sans);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            dns_names: flatten_string_array(map.get("dnsNames")),
            uris: flatten_string_array(map.get("uris")),
            email_addresses: flatten_string_array(map.get("emailAddresses")),
            ip_addresses: flatten_string_array(map.get("ipAddresses")),
            custom_sans: flatten_object_slice(map.get("customSans")),
        }
    }
}

impl Codec for X509Description {
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

impl Codec for CaOptionsDescription {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "isCa", &self.is_ca);
        put_value(&mut m, "maxIssuerPathLength", &self.max_issuer_path_length);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            is_ca: flatten_bool(map.get("isCa")),
            max_issuer_path_length: flatten_integer(map.get("maxIssuerPathLength")),
        }
    }
}

impl Codec for KeyId {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "keyId", &self.key_id);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            key_id: flatten_string(map.get("keyId")),
        }
    }
}

impl Codec for CertFingerprint {
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        put_value(&mut m, "sha256Hash", &self.sha256_hash);
        m
    }

    fn flatten(map: &JsonMap) -> Self {
        Self {
            sha256_hash: flatten_string(map.get("sha256Hash")),
        }
    }
}

impl Extract for CertificateDescription {
    fn extract_fields(&mut self) {
        extract_object(&mut self.subject_description);
        extract_object(&mut self.x509_description);
        extract_object(&mut self.public_key);
        extract_object(&mut self.subject_key_id);
        extract_object(&mut self.authority_key_id);
        extract_object(&mut self.cert_fingerprint);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.subject_description);
        post_read_extract_object(&mut self.x509_description);
        post_read_extract_object(&mut self.public_key);
        post_read_extract_object(&mut self.subject_key_id);
        post_read_extract_object(&mut self.authority_key_id);
        post_read_extract_object(&mut self.cert_fingerprint);
    }
}

impl Extract for SubjectDescription {
    fn extract_fields(&mut self) {
        extract_object(&mut self.subject);
        extract_object(&mut self.subject_alt_name);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object(&mut self.subject);
        post_read_extract_object(&mut self.subject_alt_name);
    }
}

impl Extract for SubjectAltNameDescription {
    fn extract_fields(&mut self) {
        extract_object_slice(&mut self.custom_sans);
    }

    fn post_read_extract_fields(&mut self) {
        post_read_extract_object_slice(&mut self.custom_sans);
    }
}

impl Extract for X509Description {
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

impl Extract for RevocationDetails {}
impl Extract for CaOptionsDescription {}
impl Extract for KeyId {}
impl Extract for CertFingerprint {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flatten_description() {
        let json = json!({
            "subjectDescription": {
                "subject": {"commonName": "example.com"},
                "subjectAltName": {
                    "dnsNames": ["example.com"],
                    "customSans": [{"objectId": {"objectIdPath": [1, 2, 3]}, "value": "AA=="}]
                },
                "hexSerialNumber": "0a1b",
                "lifetime": "86400s",
                "notBeforeTime": "2026-01-01T00:00:00Z",
                "notAfterTime": "2026-01-02T00:00:00Z"
            },
            "x509Description": {"caOptions": {"isCa": false}},
            "subjectKeyId": {"keyId": "aa"},
            "authorityKeyId": {"keyId": "bb"},
            "crlDistributionPoints": ["http://crl.example.com"],
            "certFingerprint": {"sha256Hash": "ff00"}
        });
        let description = CertificateDescription::flatten(json.as_object().unwrap());
        let subject = description.subject_description.as_ref().unwrap();
        assert_eq!(subject.hex_serial_number.as_deref(), Some("0a1b"));
        assert_eq!(
            subject.subject_alt_name.as_ref().unwrap().custom_sans[0]
                .object_id
                .as_ref()
                .unwrap()
                .object_id_path,
            vec![1, 2, 3]
        );
        assert_eq!(
            description.x509_description.as_ref().unwrap().ca_options,
            Some(CaOptionsDescription {
                is_ca: Some(false),
                max_issuer_path_length: None,
            })
        );
        assert_eq!(
            description.cert_fingerprint,
            Some(CertFingerprint {
                sha256_hash: Some("ff00".to_string())
            })
        );
    }

    #[test]
    fn revocation_state_keeps_unknown_values() {
        let details = RevocationDetails::flatten(
            json!({"revocationState": "NEW_REASON", "revocationTime": "2026-01-01T00:00:00Z"})
                .as_object()
                .unwrap(),
        );
        assert_eq!(
            details.revocation_state,
            Some(RevocationReason::Unknown("NEW_REASON".to_string()))
        );
        assert!(!details.is_empty());
    }
}
