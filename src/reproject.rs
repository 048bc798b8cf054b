//! In-memory reprojection of population grids to geographic coordinates.

use crate::crs::{Crs, CrsTransform};
use crate::error::{CentralityError, Result};
use crate::raster::{GeoTransform, RasterPopulationGrid};
use ndarray::Array2;

/// Lattice density used to estimate the geographic extent.
const EXTENT_SAMPLES: usize = 32;

/// Returns a new grid in EPSG:4326 resampled from `grid` by nearest neighbour.
///
/// The output keeps the source cell counts and spans the lon/lat bounding box of the source
/// cells. Output cells whose centre falls outside the source are `NaN`. `grid` is not modified.
pub fn reproject_to_geographic(grid: &RasterPopulationGrid) -> Result<RasterPopulationGrid> {
    let wgs84 = Crs::wgs84();
    let fail = |reason: String| {
        log::error!("Error re-projecting raster {}: {}", grid.source(), reason);
        CentralityError::data_access(grid.source(), reason)
    };
    let to_geographic = CrsTransform::new(grid.crs(), &wgs84).map_err(fail)?;
    let from_geographic = CrsTransform::new(&wgs84, grid.crs()).map_err(fail)?;

    let (min_lon, min_lat, max_lon, max_lat) =
        geographic_extent(grid, &to_geographic).ok_or_else(|| {
            fail(format!(
                "no part of the raster extent can be expressed in {}",
                wgs84
            ))
        })?;

    let width = grid.width();
    let height = grid.height();
    let pixel_width = (max_lon - min_lon) / width as f64;
    let pixel_height = -(max_lat - min_lat) / height as f64;
    if !(pixel_width > 0.0) || !(pixel_height < 0.0) {
        return Err(fail("reprojected extent is degenerate".to_string()));
    }
    let transform = GeoTransform::new(min_lon, pixel_width, max_lat, pixel_height);

    let mut values = Array2::from_elem((height, width), f64::NAN);
    for ((row, col), value) in values.indexed_iter_mut() {
        let (lon, lat) = transform.cell_center(col, row);
        let Some((x, y)) = from_geographic.apply(lon, lat) else {
            continue;
        };
        if let Some((src_col, src_row)) = grid.cell_index(x, y) {
            if let Some(src_value) = grid.value_at(src_col, src_row) {
                *value = src_value;
            }
        }
    }

    log::info!(
        "Re-projected raster {} from {} to {} ({}x{} cells).",
        grid.source(),
        grid.crs(),
        wgs84,
        width,
        height
    );
    RasterPopulationGrid::with_source(values, transform, wgs84, grid.source())
}

/// `(min_lon, min_lat, max_lon, max_lat)` covering the source grid in geographic coordinates.
///
/// Samples a lattice of cell centres and pads it by half an output cell. Edge points are
/// avoided because a grid edge on a pole has no defined longitude.
fn geographic_extent(
    grid: &RasterPopulationGrid,
    to_geographic: &CrsTransform,
) -> Option<(f64, f64, f64, f64)> {
    let gt = grid.transform();
    let (width, height) = (grid.width(), grid.height());
    let (first_x, first_y) = gt.cell_center(0, 0);
    let span_x = gt.pixel_width * (width - 1) as f64;
    let span_y = gt.pixel_height * (height - 1) as f64;
    let mut centres: Option<(f64, f64, f64, f64)> = None;
    for i in 0..=EXTENT_SAMPLES {
        for j in 0..=EXTENT_SAMPLES {
            let x = first_x + span_x * i as f64 / EXTENT_SAMPLES as f64;
            let y = first_y + span_y * j as f64 / EXTENT_SAMPLES as f64;
            let Some((lon, lat)) = to_geographic.apply(x, y) else {
                continue;
            };
            centres = Some(match centres {
                None => (lon, lat, lon, lat),
                Some((min_lon, min_lat, max_lon, max_lat)) => (
                    min_lon.min(lon),
                    min_lat.min(lat),
                    max_lon.max(lon),
                    max_lat.max(lat),
                ),
            });
        }
    }
    let (min_lon, min_lat, max_lon, max_lat) = centres?;
    let half_x = if width > 1 {
        0.5 * (max_lon - min_lon) / (width - 1) as f64
    } else {
        half_cell_size(to_geographic, first_x, first_y, 0.5 * gt.pixel_width, 0.0)?
    };
    let half_y = if height > 1 {
        0.5 * (max_lat - min_lat) / (height - 1) as f64
    } else {
        half_cell_size(to_geographic, first_x, first_y, 0.0, 0.5 * gt.pixel_height)?
    };
    Some((min_lon - half_x, min_lat - half_y, max_lon + half_x, max_lat + half_y))
}

/// Geographic half size of a single-cell dimension, measured across the cell centre.
fn half_cell_size(to_geographic: &CrsTransform, x: f64, y: f64, dx: f64, dy: f64) -> Option<f64> {
    let (lon_a, lat_a) = to_geographic.apply(x - dx, y - dy)?;
    let (lon_b, lat_b) = to_geographic.apply(x + dx, y + dy)?;
    let size = if dx != 0.0 { lon_b - lon_a } else { lat_b - lat_a };
    Some(0.5 * size.abs())
}
