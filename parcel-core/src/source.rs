//! Retrieval of raw response bodies from the parcel lookup service.

use thiserror::Error;

/// Fetch the body behind a lookup URL.
///
/// Implementations perform a single attempt with no retry.
///
/// # Examples
///
/// ```
/// use parcel_core::{FetchError, ParcelSource};
///
/// struct Offline;
///
/// impl ParcelSource for Offline {
///     fn fetch(&self, url: &str) -> Result<String, FetchError> {
///         Err(FetchError::Transport {
///             url: url.to_owned(),
///             status: None,
///             message: "offline".to_owned(),
///         })
///     }
/// }
///
/// assert!(Offline.fetch("http://lookup.test/").is_err());
/// ```
pub trait ParcelSource {
    /// Return the response body for `url` decoded as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the request fails or the
    /// service answers with a non-success HTTP status, and
    /// [`FetchError::Decode`] when the body is not valid UTF-8.
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<S: ParcelSource + ?Sized> ParcelSource for &S {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

impl<S: ParcelSource + ?Sized> ParcelSource for Box<S> {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

/// Errors from [`ParcelSource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be completed.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// URL that was requested.
        url: String,
        /// HTTP status, when the service answered with an error status.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },
    /// The body arrived but is not valid text.
    #[error("response from {url} is not valid UTF-8 ({len} bytes): {message}", len = .bytes.len())]
    Decode {
        /// URL that was requested.
        url: String,
        /// Raw body as received.
        bytes: Vec<u8>,
        /// Description of the decoding failure.
        message: String,
    },
}

impl FetchError {
    /// URL of the failed request.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Decode { url, .. } => url,
        }
    }
}
