//! Minimal HTTP/1.1 client over a fresh TCP connection per request.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{HeaderMap, Method};
use http_body_util::{BodyExt, Full};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{CloudError, CloudResult};

const DEFAULT_USER_AGENT: &str = concat!("fleecy/", env!("CARGO_PKG_VERSION"));

/// A buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, uri: &Url) -> CloudResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| CloudError::Decode {
            uri: uri.to_string(),
            source,
        })
    }

    /// Fail unless the status is the expected one.
    pub fn expect_status(self, uri: &Url, expected: u16) -> CloudResult<Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(self.into_status_error(uri))
        }
    }

    /// Fail unless the status is 2xx.
    pub fn expect_success(self, uri: &Url) -> CloudResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_status_error(uri))
        }
    }

    fn into_status_error(self, uri: &Url) -> CloudError {
        CloudError::Status {
            uri: uri.to_string(),
            status: self.status,
            body: self.text(),
        }
    }
}

/// Plain-HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(&self, url: &Url, headers: &[(&str, &str)]) -> CloudResult<HttpResponse> {
        self.send(Method::GET, url, headers, None).await
    }

    pub async fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> CloudResult<HttpResponse> {
        let payload = serde_json::to_vec(body).map_err(|source| CloudError::Decode {
            uri: url.to_string(),
            source,
        })?;
        self.send(Method::POST, url, headers, Some(Bytes::from(payload))).await
    }

    /// Send one request and buffer the whole response.
    pub async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: &[(&str, &str)],
        body: Option<Bytes>,
    ) -> CloudResult<HttpResponse> {
        if url.scheme() != "http" {
            return Err(CloudError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or_else(|| CloudError::InvalidUrl {
            url: url.to_string(),
            message: "missing host".to_string(),
        })?;
        let port = url.port_or_known_default().unwrap_or(80);
        let authority = format!("{host}:{port}");

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(target)
            .header(HOST, authority.as_str())
            .header(USER_AGENT, self.user_agent.as_str());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Full::new(body.unwrap_or_default()))?;

        let uri = url.to_string();
        let exchange = async {
            let stream = tokio::net::TcpStream::connect(authority.as_str())
                .await
                .map_err(|source| CloudError::Connect {
                    addr: authority.clone(),
                    source,
                })?;

            let io = hyper_util::rt::TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|source| CloudError::Http {
                    uri: uri.clone(),
                    source,
                })?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(error = %e, "http connection closed with error");
                }
            });

            let response = sender
                .send_request(request)
                .await
                .map_err(|source| CloudError::Http {
                    uri: uri.clone(),
                    source,
                })?;

            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|source| CloudError::Http {
                    uri: uri.clone(),
                    source,
                })?
                .to_bytes();

            Ok::<_, CloudError>(HttpResponse {
                status: parts.status.as_u16(),
                headers: parts.headers,
                body,
            })
        };

        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| CloudError::Timeout {
                uri: uri.clone(),
                timeout: self.timeout,
            })??;

        debug!(%method, %uri, status = response.status, bytes = response.body.len(), "http exchange");
        Ok(response)
    }
}

/// Join a path onto a base URL given as text, keeping any base path.
pub fn endpoint_url(base: &str, path: &str) -> CloudResult<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| CloudError::InvalidUrl {
        url: joined.clone(),
        message: e.to_string(),
    })
}
