//! JSON encoding of whole certificates.

use dcl::{
    canonicalize::self_link_to_name,
    codec::{
        flatten_enum, flatten_object, flatten_string, flatten_string_array, flatten_string_map,
        put_map, put_object, put_value, Codec, JsonMap,
    },
};

use super::{last_segment, Certificate};

impl Codec for Certificate {
    /// The request body for this certificate.
    ///
    /// `name` and `certificateTemplate` are expanded to full resource paths. Addressing and
    /// output-only fields are left out.
    fn expand(&self) -> JsonMap {
        let mut m = JsonMap::new();
        if !last_segment(&self.name).is_empty() {
            put_value(&mut m, "name", &Some(self.id()));
        }
        put_value(&mut m, "pemCsr", &self.pem_csr);
        put_object(&mut m, "config", &self.config);
        put_value(&mut m, "lifetime", &self.lifetime);
        put_value(
            &mut m,
            "certificateTemplate",
            &self.certificate_template.as_deref().map(|template| self.template_path(template)),
        );
        put_value(&mut m, "subjectMode", &self.subject_mode);
        put_map(&mut m, "labels", &self.labels);
        m
    }

    /// Reads a certificate from an API response. The addressing fields are left for the caller.
    fn flatten(map: &JsonMap) -> Self {
        Self {
            name: flatten_string(map.get("name")).map(|name| self_link_to_name(&name).to_string()),
            pem_csr: flatten_string(map.get("pemCsr")),
            config: flatten_object(map.get("config")),
            issuer_certificate_authority: flatten_string(map.get("issuerCertificateAuthority")),
            lifetime: flatten_string(map.get("lifetime")),
            certificate_template: flatten_string(map.get("certificateTemplate")),
            subject_mode: flatten_enum(map.get("subjectMode")),
            revocation_details: flatten_object(map.get("revocationDetails")),
            pem_certificate: flatten_string(map.get("pemCertificate")),
            certificate_description: flatten_object(map.get("certificateDescription")),
            pem_certificate_chain: flatten_string_array(map.get("pemCertificateChain")),
            create_time: flatten_string(map.get("createTime")),
            update_time: flatten_string(map.get("updateTime")),
            labels: flatten_string_map(map.get("labels")),
            ..Self::default()
        }
    }
}

impl Certificate {
    /// Templates live next to the CA pool, a bare template name is resolved relative to it.
    fn template_path(&self, template: &str) -> String {
        if template.contains('/') {
            template.to_string()
        } else {
            format!(
                "projects/{}/locations/{}/certificateTemplates/{template}",
                last_segment(&self.project),
                last_segment(&self.location),
            )
        }
    }
}

/// Decodes an API response body into a certificate.
pub fn unmarshal_certificate(body: &[u8]) -> Result<Certificate, serde_json::Error> {
    let map: JsonMap = serde_json::from_slice(body)?;
    Ok(Certificate::flatten(&map))
}
