//! Coordinate reference systems known to the raster store, expressed as PROJ.4 strings.

use crate::common::CRS_EPSG_4326;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt;

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// A coordinate reference system: optional EPSG code plus its PROJ.4 definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    pub epsg: Option<u32>,
    pub proj4: String,
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "'{}'", self.proj4),
        }
    }
}

impl Crs {
    /// Geographic WGS 84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            epsg: Some(CRS_EPSG_4326),
            proj4: WGS84_PROJ4.to_string(),
        }
    }

    /// CRS from an explicit PROJ.4 definition.
    pub fn from_proj4(proj4: impl Into<String>) -> Self {
        Self {
            epsg: None,
            proj4: proj4.into(),
        }
    }

    /// Looks up a PROJ.4 definition for the EPSG (or ESRI) code.
    pub fn from_epsg(code: u32) -> Option<Self> {
        let proj4 = match code {
            4326 => WGS84_PROJ4.to_string(),
            4258 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string(),
            4269 => "+proj=longlat +datum=NAD83 +no_defs".to_string(),
            4322 => "+proj=longlat +ellps=WGS72 +towgs84=0,0,4.5,0,0,0.554,0.2263 +no_defs".to_string(),
            4324 => "+proj=longlat +ellps=WGS72 +towgs84=0,0,1.9,0,0,0.814,-0.38 +no_defs".to_string(),
            3035 => "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs".to_string(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string(),
            54009 => "+proj=moll +lon_0=0 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs".to_string(),
            // ETRS89 / UTM
            25828..=25838 => format!(
                "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
                code - 25800
            ),
            // WGS 84 / UTM north and south
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", code - 32600),
            32701..=32760 => format!(
                "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
                code - 32700
            ),
            _ => return None,
        };
        Some(Self {
            epsg: Some(code),
            proj4,
        })
    }

    #[inline]
    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(CRS_EPSG_4326)
    }

    /// Whether coordinates are angular (degrees) rather than projected.
    #[inline]
    pub fn is_geographic(&self) -> bool {
        self.proj4.contains("+proj=longlat") || self.proj4.contains("+proj=latlong")
    }

    fn to_proj(&self) -> Result<Proj, String> {
        Proj::from_proj_string(&self.proj4)
            .map_err(|e| format!("failed to build PROJ.4 definition for {}: {}", self, e))
    }
}

/// Point transformation between two reference systems.
///
/// Geographic coordinates are taken and returned in degrees.
pub struct CrsTransform {
    from: Proj,
    to: Proj,
    from_geographic: bool,
    to_geographic: bool,
}

impl CrsTransform {
    pub fn new(from: &Crs, to: &Crs) -> Result<Self, String> {
        Ok(Self {
            from: from.to_proj()?,
            to: to.to_proj()?,
            from_geographic: from.is_geographic(),
            to_geographic: to.is_geographic(),
        })
    }

    /// Transforms `(x, y)`, `None` if the point cannot be represented in the target CRS.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let mut point = if self.from_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).ok()?;
        let (out_x, out_y) = if self.to_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if out_x.is_finite() && out_y.is_finite() {
            Some((out_x, out_y))
        } else {
            None
        }
    }
}
