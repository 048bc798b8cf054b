//! Gridded population data read from GeoTIFF files.

use crate::crs::Crs;
use crate::error::{CentralityError, Result};
use crate::reproject::reproject_to_geographic;
use ndarray::Array2;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

// GeoTIFF and GDAL private tags.
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

// GeoKeys.
const GT_MODEL_TYPE_GEO_KEY: u32 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u32 = 3072;
const MODEL_TYPE_PROJECTED: u32 = 1;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

/// North-up affine transform from cell indices to CRS coordinates (GDAL convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            origin_y,
            pixel_height,
        }
    }

    /// From a GDAL geotransform array; rotated rasters are rejected.
    pub fn from_gdal(gt: [f64; 6]) -> Option<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return None;
        }
        Some(Self::new(gt[0], gt[1], gt[3], gt[5]))
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.origin_x, self.pixel_width, 0.0, self.origin_y, 0.0, self.pixel_height]
    }

    /// Unbounded `(col, row)` of the cell containing `(x, y)`, `None` for non-finite input.
    #[inline]
    pub fn cell_for(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((y - self.origin_y) / self.pixel_height).floor();
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some((col as i64, row as i64))
    }

    /// Coordinates of the centre of cell `(col, row)`.
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.origin_x.is_finite()
            && self.origin_y.is_finite()
            && self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.pixel_width != 0.0
            && self.pixel_height != 0.0
    }
}

/// Immutable population grid, indexed `[[row, col]]`. Missing data is `NaN`.
#[derive(Debug, Clone)]
pub struct RasterPopulationGrid {
    values: Array2<f64>,
    transform: GeoTransform,
    crs: Crs,
    source: String,
}

impl RasterPopulationGrid {
    pub fn new(values: Array2<f64>, transform: GeoTransform, crs: Crs) -> Result<Self> {
        Self::with_source(values, transform, crs, "in-memory raster")
    }

    pub(crate) fn with_source(
        values: Array2<f64>,
        transform: GeoTransform,
        crs: Crs,
        source: impl Into<String>,
    ) -> Result<Self> {
        let source = source.into();
        if !transform.is_valid() {
            return Err(CentralityError::data_access(
                &source,
                format!("invalid geotransform {:?}", transform.to_gdal()),
            ));
        }
        if values.is_empty() {
            return Err(CentralityError::data_access(&source, "raster has no cells"));
        }
        Ok(Self {
            values,
            transform,
            crs,
            source,
        })
    }

    /// Opens a GeoTIFF and guarantees the result is in EPSG:4326, reprojecting once if needed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_geotiff(path, None)?.into_geographic()
    }

    /// Like [`RasterPopulationGrid::load`] for files whose CRS is not (or wrongly) declared.
    pub fn load_with_crs(path: impl AsRef<Path>, crs: Crs) -> Result<Self> {
        Self::read_geotiff(path, Some(crs))?.into_geographic()
    }

    /// Reprojects to EPSG:4326 unless the grid already is.
    pub fn into_geographic(self) -> Result<Self> {
        if self.crs.is_wgs84() {
            return Ok(self);
        }
        log::warn!(
            "The input raster data does not have CRS 4326 ({}). Re-projecting to CRS 4326.",
            self.crs
        );
        reproject_to_geographic(&self)
    }

    /// Reads band 1 and the georeferencing of a GeoTIFF without reprojecting it.
    pub fn read_geotiff(path: impl AsRef<Path>, crs_override: Option<Crs>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            log::error!("Failed to open the raster dataset: {}", e);
            CentralityError::data_access(path, e)
        })?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| CentralityError::data_access(path, e))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| CentralityError::data_access(path, e))?;
        let pixel_scale = read_f64_tag(&mut decoder, MODEL_PIXEL_SCALE_TAG, path)?;
        let tiepoint = read_f64_tag(&mut decoder, MODEL_TIEPOINT_TAG, path)?;
        let model_transformation = read_f64_tag(&mut decoder, MODEL_TRANSFORMATION_TAG, path)?;
        let geo_keys = match decoder
            .find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY_TAG))
            .map_err(|e| CentralityError::data_access(path, e))?
        {
            Some(value) => Some(
                value
                    .into_u32_vec()
                    .map_err(|e| CentralityError::data_access(path, e))?,
            ),
            None => None,
        };
        let nodata = match decoder
            .find_tag(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))
            .map_err(|e| CentralityError::data_access(path, e))?
        {
            Some(value) => value
                .into_string()
                .ok()
                .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok()),
            None => None,
        };

        let geo_keys = geo_keys.map(|keys| parse_geo_keys(&keys)).unwrap_or_default();
        let mut transform =
            geotransform_from_tags(pixel_scale.as_deref(), tiepoint.as_deref(), model_transformation.as_deref())
                .ok_or_else(|| {
                    CentralityError::data_access(path, "raster has no usable north-up georeferencing")
                })?;
        if geo_key(&geo_keys, GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT) {
            transform.origin_x -= 0.5 * transform.pixel_width;
            transform.origin_y -= 0.5 * transform.pixel_height;
        }
        let crs = match crs_override {
            Some(crs) => crs,
            None => crs_from_geo_keys(&geo_keys).map_err(|reason| CentralityError::data_access(path, reason))?,
        };

        let decoded = decoder
            .read_image()
            .map_err(|e| CentralityError::data_access(path, e))?;
        let samples = decoded_to_f64(decoded);
        let cell_count = width as usize * height as usize;
        if cell_count == 0 || samples.len() < cell_count {
            return Err(CentralityError::data_access(
                path,
                format!("expected {} cells, decoded {}", cell_count, samples.len()),
            ));
        }
        // Interleaved bands: keep the first.
        let bands = samples.len() / cell_count;
        let band: Vec<f64> = samples
            .into_iter()
            .step_by(bands)
            .take(cell_count)
            .map(|value| match nodata {
                Some(nodata) if value == nodata => f64::NAN,
                _ => value,
            })
            .collect();
        let values = Array2::from_shape_vec((height as usize, width as usize), band)
            .map_err(|e| CentralityError::data_access(path, e))?;

        log::info!(
            "Loaded {}x{} population raster from {} ({}).",
            width,
            height,
            path.display(),
            crs
        );
        Self::with_source(values, transform, crs, path.display().to_string())
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Path the grid was read from, or a description for in-memory grids.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `(col, row)` of the cell containing `(x, y)`, `None` outside the extent.
    pub fn cell_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.cell_for(x, y)?;
        if col < 0 || row < 0 || col as usize >= self.width() || row as usize >= self.height() {
            return None;
        }
        Some((col as usize, row as usize))
    }

    #[inline]
    pub fn value_at(&self, col: usize, row: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }
}

fn read_f64_tag<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: u16,
    path: &Path,
) -> Result<Option<Vec<f64>>> {
    match decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(|e| CentralityError::data_access(path, e))?
    {
        Some(value) => Ok(Some(
            value
                .into_f64_vec()
                .map_err(|e| CentralityError::data_access(path, e))?,
        )),
        None => Ok(None),
    }
}

/// Geotransform from ModelPixelScale + ModelTiepoint, or from ModelTransformation.
fn geotransform_from_tags(
    pixel_scale: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    model_transformation: Option<&[f64]>,
) -> Option<GeoTransform> {
    match (pixel_scale, tiepoint, model_transformation) {
        (Some(scale), Some(tie), _) if scale.len() >= 2 && tie.len() >= 6 => {
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            Some(GeoTransform::new(
                x - i * scale[0],
                scale[0],
                y + j * scale[1],
                -scale[1],
            ))
        }
        (_, _, Some(m)) if m.len() >= 8 => GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]),
        _ => None,
    }
}

/// GeoKeys with inline (SHORT) values, as `(key, value)` pairs.
fn parse_geo_keys(directory: &[u32]) -> Vec<(u32, u32)> {
    if directory.len() < 4 {
        return Vec::new();
    }
    directory[4..]
        .chunks_exact(4)
        .take(directory[3] as usize)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geo_key(geo_keys: &[(u32, u32)], key: u32) -> Option<u32> {
    geo_keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn crs_from_geo_keys(geo_keys: &[(u32, u32)]) -> std::result::Result<Crs, String> {
    let projected = geo_key(geo_keys, PROJECTED_CS_TYPE_GEO_KEY);
    let geographic = geo_key(geo_keys, GEOGRAPHIC_TYPE_GEO_KEY);
    let code = match geo_key(geo_keys, GT_MODEL_TYPE_GEO_KEY) {
        Some(MODEL_TYPE_PROJECTED) => projected,
        Some(MODEL_TYPE_GEOGRAPHIC) => geographic,
        _ => projected.or(geographic),
    };
    match code {
        None => Err("raster declares no coordinate reference system".to_string()),
        Some(USER_DEFINED) => Err("raster uses a user-defined coordinate reference system; supply it explicitly".to_string()),
        Some(code) => Crs::from_epsg(code).ok_or_else(|| format!("unsupported coordinate reference system EPSG:{}", code)),
    }
}

fn decoded_to_f64(decoded: DecodingResult) -> Vec<f64> {
    match decoded {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn world_grid() -> RasterPopulationGrid {
        RasterPopulationGrid::new(
            array![[1.0, 2.0], [3.0, 4.0]],
            GeoTransform::new(-180.0, 1.0, 90.0, -1.0),
            Crs::wgs84(),
        )
        .unwrap()
    }

    #[test]
    fn cell_index_uses_floor_and_bounds() {
        let grid = world_grid();
        assert_eq!(grid.cell_index(-179.1, 88.7), Some((0, 1)));
        assert_eq!(grid.cell_index(-178.9, 88.8), Some((1, 1)));
        assert_eq!(grid.cell_index(-179.5, 89.5), Some((0, 0)));
        assert_eq!(grid.cell_index(-180.5, 89.5), None);
        assert_eq!(grid.cell_index(-179.5, 87.5), None);
        assert_eq!(grid.cell_index(f64::NAN, 89.5), None);
        assert_eq!(grid.cell_index(-179.5, f64::INFINITY), None);
        assert_eq!(grid.transform().cell_for(f64::NAN, f64::NAN), None);
        assert_eq!(grid.value_at(1, 0), Some(2.0));
    }

    #[test]
    fn geotransform_from_tiepoint_and_scale() {
        let transform =
            geotransform_from_tags(Some(&[0.5, 0.25, 0.0]), Some(&[2.0, 1.0, 0.0, 10.0, 50.0, 0.0]), None).unwrap();
        assert_eq!(transform, GeoTransform::new(9.0, 0.5, 50.25, -0.25));
        assert_eq!(transform.cell_center(0, 0), (9.25, 50.125));
    }

    #[test]
    fn rotated_model_transformation_is_rejected() {
        let north_up = [1.0, 0.0, 0.0, -180.0, 0.0, -1.0, 0.0, 90.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(
            geotransform_from_tags(None, None, Some(&north_up)),
            Some(GeoTransform::new(-180.0, 1.0, 90.0, -1.0))
        );
        let mut rotated = north_up;
        rotated[1] = 0.1;
        assert_eq!(geotransform_from_tags(None, None, Some(&rotated)), None);
    }

    #[test]
    fn geo_keys_resolve_crs() {
        let directory = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        let keys = parse_geo_keys(&directory);
        assert!(crs_from_geo_keys(&keys).unwrap().is_wgs84());
        let projected = parse_geo_keys(&[1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 3857]);
        assert_eq!(crs_from_geo_keys(&projected).unwrap().epsg, Some(3857));
        let user_defined = parse_geo_keys(&[1, 1, 0, 1, 3072, 0, 1, 32767]);
        assert!(crs_from_geo_keys(&user_defined).is_err());
        assert!(crs_from_geo_keys(&[]).is_err());
    }

    #[test]
    fn invalid_transform_is_rejected() {
        let result = RasterPopulationGrid::new(
            array![[1.0]],
            GeoTransform::new(0.0, 0.0, 0.0, -1.0),
            Crs::wgs84(),
        );
        assert!(matches!(result, Err(CentralityError::DataAccess { .. })));
    }

    #[test]
    fn missing_file_is_a_data_access_error() {
        assert!(matches!(
            RasterPopulationGrid::load("does/not/exist.tif"),
            Err(CentralityError::DataAccess { .. })
        ));
    }
}
