//! Blocking `ParcelSource` backed by `reqwest`.
//!
//! The [`ParcelSource`] trait is synchronous. This client bridges to the
//! async HTTP stack by blocking on a Tokio runtime it owns, or on the
//! caller's multi-threaded runtime when one is active.

use std::time::Duration;

use log::debug;
use parcel_core::{FetchError, ParcelSource};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Error type for [`HttpParcelSource`] construction failures.
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for lookup requests.
pub const DEFAULT_USER_AGENT: &str = concat!("parcel-sync/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`HttpParcelSource`].
#[derive(Debug, Clone)]
pub struct HttpParcelSourceConfig {
    /// Overall request timeout. `None` waits for as long as the server takes.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpParcelSourceConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpParcelSourceConfig {
    /// Bound every request by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP GET client for the parcel lookup service.
///
/// The source owns a `current_thread` Tokio runtime reused across calls.
/// When called from inside a multi-threaded Tokio runtime it blocks on that
/// runtime through [`tokio::task::block_in_place`] instead, avoiding nested
/// runtime panics.
pub struct HttpParcelSource {
    client: Client,
    config: HttpParcelSourceConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpParcelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpParcelSource")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpParcelSource {
    /// Create a source with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, SourceBuildError> {
        Self::with_config(HttpParcelSourceConfig::default())
    }

    /// Create a source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpParcelSourceConfig) -> Result<Self, SourceBuildError> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        let client = builder.build().map_err(SourceBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Configuration the source was built with.
    #[must_use]
    pub const fn config(&self) -> &HttpParcelSourceConfig {
        &self.config
    }

    async fn fetch_async(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        decode_body(url, bytes.to_vec())
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> FetchError {
        let message = match self.config.timeout {
            Some(timeout) if error.is_timeout() => {
                format!("timed out after {}s", timeout.as_secs())
            }
            _ => error.to_string(),
        };
        FetchError::Transport {
            url: url.to_owned(),
            status: error.status().map(|status| status.as_u16()),
            message,
        }
    }
}

fn decode_body(url: &str, bytes: Vec<u8>) -> Result<String, FetchError> {
    String::from_utf8(bytes).map_err(|err| {
        let message = err.utf8_error().to_string();
        FetchError::Decode {
            url: url.to_owned(),
            bytes: err.into_bytes(),
            message,
        }
    })
}

impl ParcelSource for HttpParcelSource {
    /// Fetch `url` and return its body as text.
    ///
    /// # Runtime requirements
    ///
    /// Inside a Tokio runtime the runtime must be multi-threaded. Under a
    /// `current_thread` runtime the source falls back to its own runtime,
    /// which blocks the caller's executor for the duration of the request.
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let future = self.fetch_async(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
