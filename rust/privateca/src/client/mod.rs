//! Client for the certificates of a CA pool.
//!
//! Every public operation runs in its own span, tagged with a fresh request id, and is bounded by
//! [`Config::timeout`].

use std::{future::Future, time::Duration};

use dcl::{
    codec::{flatten_object_slice, flatten_string},
    object::Extract,
    send_request, template, transport,
    utils::error_full_message,
    validation::ValidationError,
    Config, Method,
};
use futures::future::join_all;
use snafu::{ensure, ResultExt, Snafu};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::certificate::{
    canonicalize::canonicalize_new_state, codec::unmarshal_certificate, compare, Certificate,
};

mod apply;
#[cfg(test)]
mod fake_api;
mod operations;

/// Page size that leaves it to the server how many certificates to return per page.
pub const CERTIFICATE_MAX_PAGE: i32 = -1;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("certificate is invalid"))]
    Validate { source: ValidationError },

    #[snafu(display("failed to build request URL"))]
    BuildUrl { source: template::Error },

    #[snafu(display("failed to get certificate {id:?}"))]
    Get { source: transport::Error, id: String },

    #[snafu(display("failed to decode certificate {id:?}"))]
    Decode {
        source: serde_json::Error,
        id: String,
    },

    #[snafu(display("failed to create certificate {id:?}"))]
    Create { source: transport::Error, id: String },

    #[snafu(display("failed to update certificate {id:?}"))]
    Update { source: transport::Error, id: String },

    #[snafu(display("failed to revoke certificate {id:?}"))]
    Revoke { source: transport::Error, id: String },

    #[snafu(display("failed to list certificates in {parent:?}"))]
    List {
        source: transport::Error,
        parent: String,
    },

    #[snafu(display("there is no next page of certificates"))]
    NoNextPage,

    #[snafu(display("failed to retrieve initial state of certificate {id:?}"))]
    InitialState {
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
        id: String,
    },

    #[snafu(display("failed to plan changes"))]
    Plan { source: compare::Error },

    #[snafu(display("apply is infeasible: {message}"))]
    ApplyInfeasible { message: String },

    #[snafu(display("certificate still differs after apply: {}", diffs.join("; ")))]
    DiffAfterApply {
        diffs: Vec<String>,
        /// The state that was read back after applying
        new_state: Box<Certificate>,
    },

    #[snafu(display("failed to delete certificates:\n{errors}"))]
    DeleteAll { errors: String },

    #[snafu(display("{operation} of {id:?} did not finish within {timeout:?}"))]
    Timeout {
        source: tokio::time::error::Elapsed,
        operation: &'static str,
        id: String,
        timeout: Duration,
    },
}

impl Error {
    fn transport_error(&self) -> Option<&transport::Error> {
        match self {
            Error::Get { source, .. }
            | Error::Create { source, .. }
            | Error::Update { source, .. }
            | Error::Revoke { source, .. }
            | Error::List { source, .. } => Some(source),
            Error::InitialState { source, .. } => source.transport_error(),
            _ => None,
        }
    }

    /// Whether the API reported that the certificate (or its parent) does not exist.
    pub fn is_not_found(&self) -> bool {
        self.transport_error()
            .is_some_and(transport::Error::is_not_found)
    }

    pub fn is_conflict(&self) -> bool {
        self.transport_error()
            .is_some_and(transport::Error::is_conflict)
    }
}

pub struct Client {
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn base_path(&self) -> Option<&str> {
        self.config.base_path.as_deref()
    }

    /// Runs `action` in a request span, bounded by the configured timeout.
    async fn run<T>(
        &self,
        operation: &'static str,
        id: &str,
        action: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        let span = info_span!("certificate", operation, id, request_id = %Uuid::new_v4());
        tokio::time::timeout(self.config.timeout, action)
            .instrument(span)
            .await
            .context(TimeoutSnafu {
                operation,
                id,
                timeout: self.config.timeout,
            })?
    }

    /// Reads the certificate addressed by `r`.
    ///
    /// The result is canonicalized against `r`, and carries its addressing fields. A missing
    /// certificate is an error for which [`Error::is_not_found`] holds.
    pub async fn get_certificate(&self, r: &Certificate) -> Result<Certificate, Error> {
        self.run("get", &r.id(), self.fetch_certificate(r)).await
    }

    pub(crate) async fn fetch_certificate(&self, r: &Certificate) -> Result<Certificate, Error> {
        let mut request = r.clone();
        request.extract_fields();
        let id = request.id();
        let url = request.get_url(self.base_path()).context(BuildUrlSnafu)?;

        info!("Retrieving certificate");
        let response = send_request(&self.config, Method::Get, &url, None)
            .await
            .context(GetSnafu { id: &id })?;
        let mut raw = unmarshal_certificate(&response.body).context(DecodeSnafu { id: &id })?;
        raw.project = request.project.clone();
        raw.location = request.location.clone();
        raw.ca_pool = request.ca_pool.clone();
        raw.name = request.name.clone();
        debug!(?raw, "Retrieved raw state");

        let mut certificate = canonicalize_new_state(raw, &request);
        certificate.post_read_extract_fields();
        debug!(?certificate, "Retrieved certificate");
        Ok(certificate)
    }

    pub async fn list_certificate(
        &self,
        project: &str,
        location: &str,
        ca_pool: &str,
    ) -> Result<CertificateList, Error> {
        self.list_certificate_with_max_results(project, location, ca_pool, CERTIFICATE_MAX_PAGE)
            .await
    }

    /// Lists the certificates of a CA pool, `page_size` at a time.
    pub async fn list_certificate_with_max_results(
        &self,
        project: &str,
        location: &str,
        ca_pool: &str,
        page_size: i32,
    ) -> Result<CertificateList, Error> {
        let resource = Certificate {
            project: Some(project.to_string()),
            location: Some(location.to_string()),
            ca_pool: Some(ca_pool.to_string()),
            ..Certificate::default()
        };
        let parent = format!("projects/{project}/locations/{location}/caPools/{ca_pool}");
        let (items, next_token) = self
            .run("list", &parent, self.list_page(&resource, "", page_size))
            .await?;
        Ok(CertificateList {
            items,
            next_token,
            page_size,
            resource,
        })
    }

    async fn list_page(
        &self,
        resource: &Certificate,
        page_token: &str,
        page_size: i32,
    ) -> Result<(Vec<Certificate>, String), Error> {
        let url = resource.list_url(self.base_path()).context(BuildUrlSnafu)?;
        let page_size = if page_size == CERTIFICATE_MAX_PAGE {
            String::new()
        } else {
            page_size.to_string()
        };
        let url = template::add_query_params(
            &url,
            &[("pageToken", page_token), ("pageSize", &page_size)],
        )
        .context(BuildUrlSnafu)?;

        info!(page_token, "Listing certificates");
        let page = send_request(&self.config, Method::Get, &url, None)
            .await
            .and_then(|response| response.json())
            .context(ListSnafu { parent: &url })?;
        let items = flatten_object_slice::<Certificate>(page.get("certificates"))
            .into_iter()
            .map(|item| Certificate {
                project: resource.project.clone(),
                location: resource.location.clone(),
                ca_pool: resource.ca_pool.clone(),
                ..item
            })
            .collect::<Vec<_>>();
        let next_token = flatten_string(page.get("nextPageToken")).unwrap_or_default();
        debug!(items = items.len(), %next_token, "Listed certificates");
        Ok((items, next_token))
    }

    /// Revokes the certificate addressed by `r`, as certificates cannot be deleted.
    ///
    /// Missing and already revoked certificates count as deleted.
    pub async fn delete_certificate(&self, r: &Certificate) -> Result<(), Error> {
        self.run("delete", &r.id(), self.revoke_certificate(r)).await
    }

    /// Deletes every certificate of the pool that `filter` accepts.
    ///
    /// All certificates of a page are deleted before any failure of that page is reported.
    pub async fn delete_all_certificate(
        &self,
        project: &str,
        location: &str,
        ca_pool: &str,
        filter: impl Fn(&Certificate) -> bool,
    ) -> Result<(), Error> {
        let mut list = self.list_certificate(project, location, ca_pool).await?;
        loop {
            self.delete_matching(&filter, &list.items).await?;
            if !list.has_next() {
                return Ok(());
            }
            list.next(self).await?;
        }
    }

    async fn delete_matching(
        &self,
        filter: &impl Fn(&Certificate) -> bool,
        items: &[Certificate],
    ) -> Result<(), Error> {
        let results = join_all(
            items
                .iter()
                .filter(|item| filter(item))
                .map(|item| self.delete_certificate(item)),
        )
        .await;
        let errors = results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .map(|err| error_full_message(err))
            .collect::<Vec<_>>();
        ensure!(
            errors.is_empty(),
            DeleteAllSnafu {
                errors: errors.join("\n")
            }
        );
        Ok(())
    }
}

/// A page of certificates, see [`Client::list_certificate`].
#[derive(Debug)]
pub struct CertificateList {
    pub items: Vec<Certificate>,
    next_token: String,
    page_size: i32,
    resource: Certificate,
}

impl CertificateList {
    pub fn has_next(&self) -> bool {
        !self.next_token.is_empty()
    }

    /// Replaces the items with the next page.
    pub async fn next(&mut self, client: &Client) -> Result<(), Error> {
        ensure!(self.has_next(), NoNextPageSnafu);
        let (items, next_token) = client
            .run(
                "list",
                &self.resource.id(),
                client.list_page(&self.resource, &self.next_token, self.page_size),
            )
            .await?;
        self.items = items;
        self.next_token = next_token;
        Ok(())
    }
}
