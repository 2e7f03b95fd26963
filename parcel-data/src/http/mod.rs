//! HTTP transport for parcel lookups.
//!
//! [`HttpParcelSource`] implements the synchronous
//! [`parcel_core::ParcelSource`] trait by blocking on `reqwest` calls, so the
//! sync orchestrator stays free of async plumbing.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use parcel_core::ParcelSource;
//! use parcel_data::http::{HttpParcelSource, HttpParcelSourceConfig};
//!
//! let source = HttpParcelSource::with_config(
//!     HttpParcelSourceConfig::default().with_timeout(Duration::from_secs(20)),
//! )?;
//! let body = source.fetch("https://uldk.gugik.gov.pl/?request=GetParcelById&id=141201_1.0014.123&result=geom_wkt&srid=2180")?;
//! println!("{body}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;

pub use client::{DEFAULT_USER_AGENT, HttpParcelSource, HttpParcelSourceConfig, SourceBuildError};
