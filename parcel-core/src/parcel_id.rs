//! Parcel identifiers and lookup URL construction.
//!
//! A parcel is addressed as `<region>-<suffix>`, for example `14-123/4`. The
//! lookup service expects the region zero-padded to four digits and prefixed
//! with the place identifier, so `14-123/4` in place `281401_1` becomes
//! `281401_1.0014.123/4`.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Lookup service used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://uldk.gugik.gov.pl/";

const REQUEST_PREFIX: &str = "?request=GetParcelById&id=";
const REQUEST_SUFFIX: &str = "&result=geom_wkt&srid=";
const SEPARATOR: char = '-';
const REGION_WIDTH: usize = 4;

/// A structurally valid parcel identifier.
///
/// Equality and ordering use the original text, so `7-1` and `0007-1` are
/// different parcels even though both resolve to the same request.
///
/// # Examples
///
/// ```
/// use parcel_core::ParcelId;
///
/// # fn main() -> Result<(), parcel_core::MalformedIdError> {
/// let id = ParcelId::parse("7-12/3")?;
/// assert_eq!(id.region(), "7");
/// assert_eq!(id.suffix(), "12/3");
/// assert_eq!(id.request_id("281401_1"), "281401_1.0007.12/3");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParcelId {
    raw: String,
    region: String,
    suffix: String,
}

/// Error returned by [`ParcelId::parse`] for text that is not `<region>-<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "parcel id {raw:?} must be two non-empty parts separated by a single '-' (found {parts} part(s))"
)]
pub struct MalformedIdError {
    /// Text that failed to parse.
    pub raw: String,
    /// Number of `-`-separated parts found in `raw`.
    pub parts: usize,
}

impl ParcelId {
    /// Parse `raw` as a parcel identifier.
    ///
    /// The text must split on `-` into exactly two non-empty parts. No other
    /// validation is applied: regions longer than four digits and non-numeric
    /// regions are passed through to the service unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedIdError`] when the separator count is wrong or one
    /// side of the separator is empty. Blank input is malformed.
    pub fn parse(raw: &str) -> Result<Self, MalformedIdError> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        match parts.as_slice() {
            [region, suffix] if !region.is_empty() && !suffix.is_empty() => Ok(Self {
                raw: raw.to_owned(),
                region: (*region).to_owned(),
                suffix: (*suffix).to_owned(),
            }),
            _ => Err(MalformedIdError {
                raw: raw.to_owned(),
                parts: parts.len(),
            }),
        }
    }

    /// Original identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Region part, as written by the user.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Everything after the separator.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Region left-padded with zeros to four characters.
    ///
    /// Longer regions are returned unchanged rather than truncated.
    #[must_use]
    pub fn padded_region(&self) -> String {
        format!("{:0>width$}", self.region, width = REGION_WIDTH)
    }

    /// Service-side identifier: `{place}.{padded_region}.{suffix}`.
    #[must_use]
    pub fn request_id(&self, place: &str) -> String {
        format!("{place}.{}.{}", self.padded_region(), self.suffix)
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ParcelId {
    type Err = MalformedIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ParcelId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

/// Fixed per-deployment parameters of the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceConfig {
    /// Service root, e.g. [`DEFAULT_BASE_URL`].
    pub base_url: String,
    /// Place (commune) identifier prepended to every parcel.
    pub place: String,
    /// EPSG code of the requested geometry, e.g. `"2180"`.
    pub crs: String,
}

impl ServiceConfig {
    /// Create a configuration for `place` and `crs` against [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new(place: impl Into<String>, crs: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            place: place.into(),
            crs: crs.into(),
        }
    }

    /// Point requests at a different service root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the `GetParcelById` URL for `id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use parcel_core::{ParcelId, ServiceConfig};
    ///
    /// let config = ServiceConfig::new("281401_1", "2180");
    /// let id: ParcelId = "14-123".parse().expect("valid id");
    /// assert_eq!(
    ///     config.request_url(&id),
    ///     "https://uldk.gugik.gov.pl/?request=GetParcelById&id=281401_1.0014.123&result=geom_wkt&srid=2180"
    /// );
    /// ```
    #[must_use]
    pub fn request_url(&self, id: &ParcelId) -> String {
        format!(
            "{}{REQUEST_PREFIX}{}{REQUEST_SUFFIX}{}",
            self.base_url,
            id.request_id(&self.place),
            self.crs
        )
    }
}
