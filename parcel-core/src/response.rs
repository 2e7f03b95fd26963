//! Parser for the lookup service's line-oriented response body.
//!
//! A successful body looks like:
//!
//! ```text
//! 0
//! SRID=2180;POLYGON((...))
//! ```
//!
//! The first line carries the status code and the second an EWKT record: the
//! `SRID=` prefix, then the WKT geometry after the first `;`.

use thiserror::Error;

/// Status line value the service sends on success.
pub const SUCCESS_STATUS: &str = "0";

const LINE_SEPARATOR: char = '\n';
const FIELD_SEPARATOR: char = ';';

/// WKT geometry extracted from a successful response.
///
/// The text is not checked for well-formedness; the feature store rejects
/// geometry it cannot build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelGeometry {
    wkt: String,
}

impl ParcelGeometry {
    /// Wrap WKT text.
    #[must_use]
    pub fn new(wkt: impl Into<String>) -> Self {
        Self { wkt: wkt.into() }
    }

    /// Borrow the WKT text.
    #[must_use]
    pub fn as_wkt(&self) -> &str {
        &self.wkt
    }

    /// Take ownership of the WKT text.
    #[must_use]
    pub fn into_wkt(self) -> String {
        self.wkt
    }
}

/// The service answered, but not with a usable geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The status line was not [`SUCCESS_STATUS`] or no record line followed it.
    #[error("service returned status {status_line:?} in a {line_count}-line response")]
    Status {
        /// First line of the body, trimmed.
        status_line: String,
        /// Number of newline-separated lines in the body.
        line_count: usize,
    },
    /// The record line had no geometry field.
    #[error("record {record:?} has {field_count} field(s); the geometry is the second")]
    MissingGeometry {
        /// Second line of the body, as received.
        record: String,
        /// Number of `;`-separated fields in `record`.
        field_count: usize,
    },
}

/// Extract the WKT geometry from a response body.
///
/// # Errors
///
/// Returns [`ProtocolError::Status`] when the first line is not `0` or the
/// body has a single line, and [`ProtocolError::MissingGeometry`] when the
/// record line has fewer than two fields.
///
/// # Examples
///
/// ```
/// use parcel_core::parse_response;
///
/// let geometry = parse_response("0\nSRID=2180;POLYGON((0 0,1 0,1 1,0 0))\n")?;
/// assert_eq!(geometry.as_wkt(), "POLYGON((0 0,1 0,1 1,0 0))");
/// # Ok::<(), parcel_core::ProtocolError>(())
/// ```
pub fn parse_response(body: &str) -> Result<ParcelGeometry, ProtocolError> {
    let lines: Vec<&str> = body.split(LINE_SEPARATOR).collect();
    let [status, record, ..] = lines.as_slice() else {
        return Err(status_error(&lines));
    };
    if status.trim() != SUCCESS_STATUS {
        return Err(status_error(&lines));
    }

    let mut fields = record.split(FIELD_SEPARATOR);
    match fields.nth(1) {
        Some(wkt) => Ok(ParcelGeometry::new(wkt.trim())),
        None => Err(ProtocolError::MissingGeometry {
            record: (*record).to_owned(),
            field_count: record.split(FIELD_SEPARATOR).count(),
        }),
    }
}

fn status_error(lines: &[&str]) -> ProtocolError {
    ProtocolError::Status {
        status_line: lines.first().map(|line| line.trim()).unwrap_or_default().to_owned(),
        line_count: lines.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn extracts_geometry_from_success_body() {
        let geometry =
            parse_response("0\n1;POLYGON((0 0,1 0,1 1,0 0))\n").expect("body should parse");
        assert_eq!(geometry.as_wkt(), "POLYGON((0 0,1 0,1 1,0 0))");
    }

    #[rstest]
    fn strips_srid_prefix_from_ewkt_record() {
        let geometry = parse_response("0\nSRID=2180;POLYGON((0 0,1 0,1 1,0 0))\n")
            .expect("body should parse");
        assert_eq!(geometry.as_wkt(), "POLYGON((0 0,1 0,1 1,0 0))");
    }

    #[rstest]
    fn trims_geometry_and_status() {
        let geometry = parse_response(" 0 \r\nid; POLYGON((1 1,2 1,2 2,1 1)) \r\n")
            .expect("body should parse");
        assert_eq!(geometry.as_wkt(), "POLYGON((1 1,2 1,2 2,1 1))");
    }

    #[rstest]
    fn ignores_fields_after_geometry() {
        let geometry = parse_response("0\nid;POLYGON((0 0,1 0,1 1,0 0));extra").expect("parse");
        assert_eq!(geometry.into_wkt(), "POLYGON((0 0,1 0,1 1,0 0))");
    }

    #[rstest]
    #[case("1\n", "1", 2)]
    #[case("-1 brak wyników\n", "-1 brak wyników", 2)]
    #[case("0", "0", 1)]
    #[case("", "", 1)]
    fn reports_status_failures(#[case] body: &str, #[case] status: &str, #[case] lines: usize) {
        let err = parse_response(body).expect_err("body should be rejected");
        assert_eq!(
            err,
            ProtocolError::Status {
                status_line: status.to_owned(),
                line_count: lines,
            }
        );
    }

    #[rstest]
    #[case("0\n", "", 1)]
    #[case("0\nPOLYGON((0 0,1 0,1 1,0 0))\n", "POLYGON((0 0,1 0,1 1,0 0))", 1)]
    fn reports_records_without_geometry(
        #[case] body: &str,
        #[case] record: &str,
        #[case] fields: usize,
    ) {
        let err = parse_response(body).expect_err("body should be rejected");
        assert_eq!(
            err,
            ProtocolError::MissingGeometry {
                record: record.to_owned(),
                field_count: fields,
            }
        );
    }

    #[rstest]
    fn empty_geometry_field_is_not_validated_here() {
        let geometry = parse_response("0\nid;\n").expect("body should parse");
        assert_eq!(geometry.as_wkt(), "");
    }
}
