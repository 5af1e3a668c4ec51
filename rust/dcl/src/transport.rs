//! HTTP plumbing: the [`Transport`] seam, its `reqwest` implementation and [`send_request`].

use async_trait::async_trait;
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::{
    codec::JsonMap,
    config::Config,
    retry::{retry, Attempt},
    utils::Unloggable,
};

pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to send {method} request to {url}"))]
    Send {
        source: TransportError,
        method: Method,
        url: String,
    },

    #[snafu(display("{method} {url} failed with status {status}: {message}"))]
    Status {
        status: u16,
        message: String,
        method: Method,
        url: String,
    },

    #[snafu(display("failed to encode request body"))]
    EncodeBody { source: serde_json::Error },

    #[snafu(display("failed to decode response body"))]
    DecodeBody { source: serde_json::Error },

    #[snafu(display("expected a JSON object in the response body, got {body}"))]
    NotAnObject { body: Value },
}

impl Error {
    /// HTTP status of the API answer, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Send { .. } => true,
            _ => matches!(self.status(), Some(429 | 500 | 502 | 503 | 504)),
        }
    }
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as a JSON object. An empty body is an empty object.
    pub fn json(&self) -> Result<JsonMap, Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonMap::new());
        }
        match serde_json::from_slice(&self.body).context(DecodeBodySnafu)? {
            Value::Object(map) => Ok(map),
            body => NotAnObjectSnafu { body }.fail(),
        }
    }

    /// The message of a Google API error body, or the raw body if it is not one.
    fn error_message(&self) -> String {
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&self.body).into_owned())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

/// [`Transport`] over `reqwest`, authenticating with an OAuth access token.
pub struct ReqwestTransport {
    client: reqwest::Client,
    access_token: Option<Unloggable<String>>,
}

impl ReqwestTransport {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.map(Unloggable),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(Response { status, body })
    }
}

/// Sends a request through the configured transport.
///
/// Transport failures and transient statuses (429 and 5xx gateway errors) are retried through
/// the configured [`RetryProvider`](crate::retry::RetryProvider). Any other non-2xx answer is an
/// [`Error::Status`].
pub async fn send_request(
    config: &Config,
    method: Method,
    url: &str,
    body: Option<&JsonMap>,
) -> Result<Response, Error> {
    let body = body
        .map(|b| serde_json::to_vec(b).context(EncodeBodySnafu))
        .transpose()?;
    let request = Request {
        method,
        url: url.to_string(),
        headers: vec![
            ("User-Agent".to_string(), config.user_agent.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ],
        body,
    };

    info!(%method, url, "Sending request");
    retry(config.retry_provider.as_ref(), || async {
        let result = config
            .transport
            .execute(request.clone())
            .await
            .context(SendSnafu { method, url })
            .and_then(|response| {
                if response.is_success() {
                    Ok(response)
                } else {
                    StatusSnafu {
                        status: response.status,
                        message: response.error_message(),
                        method,
                        url,
                    }
                    .fail()
                }
            });
        match result {
            Ok(response) => {
                debug!(status = response.status, "Received response");
                Attempt::Done(response)
            }
            Err(err) if err.is_retryable() => Attempt::Retry(err),
            Err(err) => Attempt::Fail(err),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use serde_json::json;

    use super::*;
    use crate::retry::ImmediateRetryProvider;

    /// Answers requests from a script and records what it was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        answers: Mutex<VecDeque<Result<Response, String>>>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedTransport {
        fn new(answers: impl IntoIterator<Item = Result<Response, String>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().collect()),
                requests: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: Request) -> Result<Response, TransportError> {
            self.requests.lock().unwrap().push(request);
            let answer = self
                .answers
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted answer left");
            answer.map_err(TransportError::from)
        }
    }

    fn respond(status: u16, body: serde_json::Value) -> Result<Response, String> {
        Ok(Response {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }

    fn config(transport: Arc<ScriptedTransport>) -> Config {
        Config::new(transport).with_retry_provider(Arc::new(ImmediateRetryProvider { max_retries: 3 }))
    }

    #[tokio::test]
    async fn sends_json_with_headers() {
        let transport = ScriptedTransport::new([respond(200, json!({"name": "c"}))]);
        let config = config(transport.clone()).with_user_agent("test-agent");
        let body = json!({"lifetime": "60s"});
        let response = send_request(
            &config,
            Method::Post,
            "https://example.com/v1/certs",
            body.as_object(),
        )
        .await
        .unwrap();
        assert_eq!(response.json().unwrap(), *json!({"name": "c"}).as_object().unwrap());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert!(requests[0]
            .headers
            .contains(&("User-Agent".to_string(), "test-agent".to_string())));
        assert_eq!(
            requests[0].body.as_deref(),
            Some(br#"{"lifetime":"60s"}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let transport = ScriptedTransport::new([
            Err("connection reset".to_string()),
            respond(503, json!({"error": {"code": 503, "message": "unavailable"}})),
            respond(200, json!({})),
        ]);
        let response = send_request(&config(transport.clone()), Method::Get, "https://example.com/x", None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn maps_api_errors() {
        let transport = ScriptedTransport::new([respond(
            404,
            json!({"error": {"code": 404, "message": "Resource 'c' was not found"}}),
        )]);
        let err = send_request(&config(transport.clone()), Method::Get, "https://example.com/c", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert_eq!(
            err.to_string(),
            "GET https://example.com/c failed with status 404: Resource 'c' was not found"
        );
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_bodies_are_empty_objects() {
        let response = Response {
            status: 200,
            body: Vec::new(),
        };
        assert_eq!(response.json().unwrap(), JsonMap::new());
        let response = Response {
            status: 200,
            body: b"[1]".to_vec(),
        };
        assert!(response.json().is_err());
    }
}
