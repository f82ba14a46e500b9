use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONNECTION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RastroError, Result};
use crate::models::{AsyncRegistration, ResultFilter, TrackingResult};

pub const DEFAULT_POOL_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings for a [`TrackingClient`].
#[derive(Clone)]
pub struct ClientOptions {
    /// Token used when a call does not carry its own.
    pub default_token: Option<String>,
    /// Skip TLS certificate verification. Only meant for endpoints with broken chains.
    pub accept_invalid_certs: bool,
    pub pool_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_token: None,
            accept_invalid_certs: false,
            pool_size: DEFAULT_POOL_SIZE,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ClientOptions {
    /// Transport matching the legacy tracking tools: certificate verification
    /// disabled and no client-side timeout.
    pub fn compat() -> Self {
        Self {
            accept_invalid_certs: true,
            timeout: None,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.default_token = Some(token.into());
        self
    }
}

/// Per-call overrides.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub token: Option<String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for the tracking API.
///
/// Cheap to clone; clones share the connection pool. Every request carries
/// `Connection: close`, which keeps the server from holding sockets open but
/// also means pooled connections are rarely reused.
#[derive(Clone)]
pub struct TrackingClient {
    base_url: String,
    default_token: Option<String>,
    http_client: Client,
}

fn redact(token: &Option<String>) -> Option<&'static str> {
    token.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("default_token", &redact(&self.default_token))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("pool_size", &self.pool_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("token", &redact(&self.token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for TrackingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingClient")
            .field("base_url", &self.base_url)
            .field("default_token", &redact(&self.default_token))
            .finish_non_exhaustive()
    }
}

impl TrackingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Builds the client without touching the network. The base URL is only
    /// parsed when a request is made.
    pub fn with_options(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(options.pool_size)
            .danger_accept_invalid_certs(options.accept_invalid_certs);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| RastroError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            default_token: options.default_token,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Looks up one or more objects, one `codigosObjetos` parameter per code.
    pub async fn track<I, S>(
        &self,
        codes: I,
        filter: ResultFilter,
        options: &RequestOptions,
    ) -> Result<TrackingResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.parse_url(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("resultado", filter.as_str());
            for code in codes {
                query.append_pair("codigosObjetos", code.as_ref());
            }
        }

        let response = self.send(Method::GET, url, None, options).await?;
        expect_json(response, StatusCode::OK, "tracking").await
    }

    /// Looks up a single object by appending its code to the base URL.
    pub async fn track_one(&self, code: &str, options: &RequestOptions) -> Result<TrackingResult> {
        let url = self.parse_url(&format!("{}{}?resultado=U", self.base_url, code))?;

        let response = self.send(Method::GET, url, None, options).await?;
        expect_json(response, StatusCode::OK, "tracking").await
    }

    /// Registers a batch for asynchronous processing. The returned receipt is
    /// the key for [`TrackingClient::fetch_receipt`].
    pub async fn register<S>(&self, codes: &[S], options: &RequestOptions) -> Result<AsyncRegistration>
    where
        S: AsRef<str>,
    {
        let codes: Vec<&str> = codes.iter().map(AsRef::as_ref).collect();
        let body = serde_json::to_vec(&codes)
            .map_err(|e| RastroError::Config(format!("failed to encode object codes: {e}")))?;
        let url = self.parse_url(&self.base_url)?;

        let response = self.send(Method::POST, url, Some(body), options).await?;
        expect_json(response, StatusCode::ACCEPTED, "async registration").await
    }

    /// Fetches the result of an asynchronous registration.
    ///
    /// The receipt is appended to the base URL as given; escape it first if it
    /// may contain reserved characters.
    pub async fn fetch_receipt(&self, receipt: &str, options: &RequestOptions) -> Result<TrackingResult> {
        let url = self.parse_url(&format!("{}{}", self.base_url, receipt))?;

        let response = self.send(Method::GET, url, None, options).await?;
        expect_json(response, StatusCode::OK, "receipt lookup").await
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| RastroError::Config(format!("invalid URL '{raw}': {e}")))
    }

    fn resolve_token<'a>(&'a self, options: &'a RequestOptions) -> Result<&'a str> {
        options
            .token
            .as_deref()
            .or(self.default_token.as_deref())
            .ok_or_else(|| RastroError::Config("no bearer token for request".to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        options: &RequestOptions,
    ) -> Result<reqwest::Response> {
        let token = self.resolve_token(options)?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| RastroError::Config(format!("bearer token is not a valid header value: {e}")))?;
        authorization.set_sensitive(true);

        debug!(%method, %url, "sending tracking API request");

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header(AUTHORIZATION, authorization)
            .header(CONNECTION, "close");

        if method == Method::POST {
            request = request.header(CONTENT_TYPE, "application/json");
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "tracking API responded");
        Ok(response)
    }
}

async fn expect_json<T: DeserializeOwned + Default>(
    response: reqwest::Response,
    expected: StatusCode,
    operation: &'static str,
) -> Result<T> {
    let status = response.status();
    if status != expected {
        let body = response.text().await.unwrap_or_default();
        return Err(RastroError::remote(operation, status, &body));
    }

    // A bare `null` body decodes to the empty value, as missing fields do.
    let body = response.text().await?;
    Ok(serde_json::from_str::<Option<T>>(&body)?.unwrap_or_default())
}

/// Splits a comma separated list of object codes, dropping blanks.
pub fn split_codes(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}
