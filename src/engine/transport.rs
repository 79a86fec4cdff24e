//! The HTTP exchange seam.

use crate::error::Error;
use crate::invocation::HttpMethod;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::future::Future;
use url::Url;

/// A fully assembled request, ready to send as many times as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    /// `None` sends no body at all, which servers may treat differently from
    /// an empty one.
    pub body: Option<String>,
    pub basic_auth: Option<(String, String)>,
}

/// A received response with its body read to the end, exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// The body as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Headers flattened for logging, repeated values joined with ", ".
    #[must_use]
    pub fn flat_headers(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.join(", ")))
            .collect()
    }
}

pub trait Transport {
    /// Performs one exchange.
    fn send(&self, request: &PreparedRequest) -> impl Future<Output = Result<TransportResponse, Error>>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, Error> {
        // reqwest is built without a default crypto provider; ignore the error
        // raised when one is already installed
        #[cfg(not(windows))]
        let _ = rustls::crypto::ring::default_provider().install_default();
        #[cfg(windows)]
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = reqwest::Client::builder()
            .user_agent(concat!("rest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<TransportResponse, Error> {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let bytes = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body: bytes.to_vec(),
        })
    }
}
