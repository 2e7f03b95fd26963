//! WKT validation for polygon features.

use geo::Geometry;
use thiserror::Error;
use wkt::{ToWkt, TryFromWkt};

/// Why a feature's geometry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The feature carried no geometry.
    #[error("feature has no geometry")]
    Missing,
    /// The text is not valid WKT.
    #[error("invalid WKT: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
    /// The WKT describes something other than a polygon.
    #[error("expected a Polygon or MultiPolygon, found {kind}")]
    NotPolygonal {
        /// Geometry type found.
        kind: &'static str,
    },
}

/// Parse `wkt` and re-serialise it, accepting only polygonal geometry.
pub(super) fn normalise_polygon_wkt(wkt: Option<&str>) -> Result<String, GeometryError> {
    let text = wkt
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(GeometryError::Missing)?;
    let geometry =
        Geometry::<f64>::try_from_wkt_str(text).map_err(|err| GeometryError::Parse {
            message: err.to_string(),
        })?;
    match &geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {}
        other => {
            return Err(GeometryError::NotPolygonal {
                kind: kind_name(other),
            });
        }
    }
    Ok(geometry.wkt_string())
}

const fn kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
