//! The API calls that change certificates.

use dcl::{
    codec::{Codec, JsonMap},
    diff::update_mask,
    send_request, template, FieldDiff, Method,
};
use snafu::ResultExt;
use tracing::info;

use super::{BuildUrlSnafu, Client, CreateSnafu, Error, RevokeSnafu, UpdateSnafu};
use crate::certificate::{compare::UpdateOperation, Certificate, RevocationReason};

impl Client {
    /// Issues the certificate. The response body is returned, it carries values that a
    /// subsequent read does not necessarily repeat.
    pub(super) async fn create_certificate(&self, r: &Certificate) -> Result<JsonMap, Error> {
        let id = r.id();
        let url = r.create_url(self.base_path()).context(BuildUrlSnafu)?;

        info!("Creating certificate");
        let response = send_request(&self.config, Method::Post, &url, Some(&r.expand()))
            .await
            .and_then(|response| response.json())
            .context(CreateSnafu { id })?;
        info!("Created certificate");
        Ok(response)
    }

    pub(super) async fn update_certificate(
        &self,
        r: &Certificate,
        operation: UpdateOperation,
        field_diffs: &[FieldDiff],
    ) -> Result<(), Error> {
        match operation {
            UpdateOperation::UpdateCertificate => {
                let mask = update_mask(field_diffs);
                let url = r.get_url(self.base_path()).context(BuildUrlSnafu)?;
                let url = template::add_query_params(&url, &[("updateMask", &mask)])
                    .context(BuildUrlSnafu)?;

                // Only the masked fields are sent
                let expanded = r.expand();
                let body = mask
                    .split(',')
                    .filter_map(|field| Some((field.to_string(), expanded.get(field)?.clone())))
                    .collect::<JsonMap>();

                info!(update_mask = %mask, %operation, "Updating certificate");
                send_request(&self.config, Method::Patch, &url, Some(&body))
                    .await
                    .context(UpdateSnafu { id: r.id() })?;
            }
        }
        Ok(())
    }

    pub(super) async fn revoke_certificate(&self, r: &Certificate) -> Result<(), Error> {
        let current = match self.fetch_certificate(r).await {
            Ok(current) => current,
            Err(err) if err.is_not_found() => {
                info!("Certificate does not exist, nothing to revoke");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if current.is_revoked() {
            info!(
                revocation = ?current.revocation_details,
                "Certificate is already revoked"
            );
            return Ok(());
        }

        let url = r.revoke_url(self.base_path()).context(BuildUrlSnafu)?;
        let mut body = JsonMap::new();
        body.insert(
            "reason".to_string(),
            RevocationReason::Unspecified.to_string().into(),
        );
        info!("Revoking certificate");
        send_request(&self.config, Method::Post, &url, Some(&body))
            .await
            .context(RevokeSnafu { id: r.id() })?;
        Ok(())
    }
}
