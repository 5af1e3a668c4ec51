//! In-memory stand-in for the Private CA certificates API.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use dcl::{
    codec::JsonMap,
    retry::ImmediateRetryProvider,
    transport::TransportError,
    Config, Method, Request, Response, Transport,
};
use serde_json::{json, Value};
use url::Url;

use super::Client;

const TIMESTAMP: &str = "2026-01-01T00:00:00Z";

#[derive(Default)]
struct State {
    /// Certificates by full resource name, as the API would return them
    certificates: BTreeMap<String, JsonMap>,
    requests: Vec<(Method, String)>,
    /// Statuses to answer the next requests with, before looking at them
    failures: VecDeque<u16>,
    ignore_label_updates: bool,
}

#[derive(Default)]
pub struct FakePrivateCa {
    state: Mutex<State>,
}

impl FakePrivateCa {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn client(self: &Arc<Self>) -> Client {
        Client::new(
            Config::new(self.clone())
                .with_retry_provider(Arc::new(ImmediateRetryProvider { max_retries: 2 })),
        )
    }

    pub fn insert(&self, certificate: Value) {
        let Value::Object(certificate) = certificate else {
            panic!("certificate must be an object: {certificate}");
        };
        let name = certificate["name"]
            .as_str()
            .expect("certificate must have a name")
            .to_string();
        self.state().certificates.insert(name, certificate);
    }

    pub fn certificate(&self, name: &str) -> Option<JsonMap> {
        self.state().certificates.get(name).cloned()
    }

    pub fn fail_next(&self, status: u16) {
        self.state().failures.push_back(status);
    }

    /// Requests received so far, as method and path relative to the API version.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state().requests.clone()
    }

    /// Makes `PATCH` requests succeed without changing anything.
    pub fn ignore_label_updates(&self) {
        self.state().ignore_label_updates = true;
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn handle(&self, request: Request) -> Response {
        let url = Url::parse(&request.url).unwrap();
        let path = url.path().trim_start_matches("/v1/").to_string();
        let query = url
            .query_pairs()
            .into_owned()
            .collect::<BTreeMap<String, String>>();
        let body = request
            .body
            .map(|body| serde_json::from_slice::<JsonMap>(&body).unwrap())
            .unwrap_or_default();

        let mut state = self.state();
        state.requests.push((
            request.method,
            match url.query() {
                Some(q) => format!("{path}?{q}"),
                None => path.clone(),
            },
        ));
        if let Some(status) = state.failures.pop_front() {
            return error(status, "injected failure");
        }

        match request.method {
            Method::Post => match path.strip_suffix(":revoke") {
                Some(name) => state.revoke(name, &body),
                None => state.create(&path, &query, body),
            },
            Method::Get if path.ends_with("/certificates") => state.list(&path, &query),
            Method::Get => match state.certificates.get(&path) {
                Some(certificate) => ok(certificate),
                None => not_found(&path),
            },
            Method::Patch => state.patch(&path, &query, &body),
            Method::Delete => error(405, "certificates cannot be deleted"),
        }
    }
}

impl State {
    fn create(&mut self, parent: &str, query: &BTreeMap<String, String>, body: JsonMap) -> Response {
        let Some(id) = query.get("certificateId") else {
            return error(400, "certificateId is required");
        };
        let name = format!("{parent}/{id}");
        if self.certificates.contains_key(&name) {
            return error(409, &format!("Resource '{name}' already exists"));
        }

        let pool = parent.trim_end_matches("/certificates");
        let issuer = query
            .get("issuingCertificateAuthorityId")
            .map_or("ca-1", String::as_str);
        let mut certificate = body;
        certificate.insert("name".to_string(), name.clone().into());
        certificate
            .entry("subjectMode")
            .or_insert_with(|| "DEFAULT".into());
        let subject = certificate
            .get("config")
            .and_then(|config| config.pointer("/subjectConfig/subject"))
            .cloned()
            .unwrap_or_else(|| json!({}));
        let lifetime = certificate.get("lifetime").cloned().unwrap_or(Value::Null);
        let issued = json!({
            "issuerCertificateAuthority": format!("{pool}/certificateAuthorities/{issuer}"),
            "pemCertificate": format!("-----BEGIN CERTIFICATE-----\n{id}\n-----END CERTIFICATE-----"),
            "pemCertificateChain": ["-----BEGIN CERTIFICATE-----\nca\n-----END CERTIFICATE-----"],
            "createTime": TIMESTAMP,
            "updateTime": TIMESTAMP,
            "certificateDescription": {
                "subjectDescription": {
                    "subject": subject,
                    "hexSerialNumber": "1a2b3c",
                    "lifetime": lifetime,
                },
                "certFingerprint": {"sha256Hash": "abcdef"},
            },
        });
        if let Value::Object(issued) = issued {
            certificate.extend(issued);
        }

        let response = ok(&certificate);
        self.certificates.insert(name, certificate);
        response
    }

    fn revoke(&mut self, name: &str, body: &JsonMap) -> Response {
        let Some(certificate) = self.certificates.get_mut(name) else {
            return not_found(name);
        };
        if certificate.contains_key("revocationDetails") {
            return error(400, "Certificate is already revoked");
        }
        certificate.insert(
            "revocationDetails".to_string(),
            json!({
                "revocationState": body.get("reason").cloned().unwrap_or(Value::Null),
                "revocationTime": TIMESTAMP,
            }),
        );
        ok(certificate)
    }

    fn list(&self, parent: &str, query: &BTreeMap<String, String>) -> Response {
        let prefix = format!("{parent}/");
        let all = self
            .certificates
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(_, certificate)| Value::Object(certificate.clone()))
            .collect::<Vec<_>>();
        let start = query
            .get("pageToken")
            .map_or(0, |token| token.parse::<usize>().unwrap());
        let size = query
            .get("pageSize")
            .map_or(all.len(), |size| size.parse::<usize>().unwrap());
        let end = (start + size).min(all.len());

        let mut page = JsonMap::new();
        page.insert("certificates".to_string(), all[start..end].to_vec().into());
        if end < all.len() {
            page.insert("nextPageToken".to_string(), end.to_string().into());
        }
        ok(&page)
    }

    fn patch(&mut self, name: &str, query: &BTreeMap<String, String>, body: &JsonMap) -> Response {
        let ignore_label_updates = self.ignore_label_updates;
        let Some(certificate) = self.certificates.get_mut(name) else {
            return not_found(name);
        };
        let mask = query.get("updateMask").map_or("", String::as_str);
        for field in mask.split(',').filter(|field| !field.is_empty()) {
            if field != "labels" {
                return error(400, &format!("field {field:?} cannot be updated"));
            }
            if !ignore_label_updates {
                match body.get(field) {
                    Some(value) => certificate.insert(field.to_string(), value.clone()),
                    None => certificate.remove(field),
                };
            }
        }
        certificate.insert("updateTime".to_string(), TIMESTAMP.into());
        ok(certificate)
    }
}

#[async_trait]
impl Transport for FakePrivateCa {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        Ok(self.handle(request))
    }
}

fn ok(body: &JsonMap) -> Response {
    Response {
        status: 200,
        body: serde_json::to_vec(body).unwrap(),
    }
}

fn not_found(name: &str) -> Response {
    error(404, &format!("Resource '{name}' was not found"))
}

fn error(status: u16, message: &str) -> Response {
    Response {
        status,
        body: serde_json::to_vec(&json!({"error": {"code": status, "message": message}}))
            .unwrap(),
    }
}
