mod common;

use common::{write_wgs84_raster, GeoTiffFixture};
use road_centrality::crs::Crs;
use road_centrality::{sample_population, CentralityError, NodeCoordinateIndex, RasterPopulationGrid};
use tempfile::tempdir;

#[test]
fn reads_geographic_geotiff() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("population.tif");
    write_wgs84_raster(&path, &[&[1.0, 2.0], &[3.0, 4.0]], (-180.0, 90.0), 1.0);

    let grid = RasterPopulationGrid::load(&path).unwrap();
    assert!(grid.crs().is_wgs84());
    assert_eq!((grid.width(), grid.height()), (2, 2));
    assert_eq!(grid.transform().to_gdal(), [-180.0, 1.0, 0.0, 90.0, 0.0, -1.0]);
    assert_eq!(grid.value_at(1, 0), Some(2.0));
    assert_eq!(grid.cell_index(-179.1, 88.7), Some((0, 1)));
}

#[test]
fn reprojects_other_datums_before_sampling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("population_4324.tif");
    GeoTiffFixture {
        width: 2,
        height: 2,
        data: &[1.0, 2.0, 3.0, 4.0],
        origin: (-180.0, 90.0),
        pixel_size: (1.0, 1.0),
        epsg: 4324,
        projected: false,
        nodata: None,
    }
    .write(&path);

    let raw = RasterPopulationGrid::read_geotiff(&path, None).unwrap();
    assert_eq!(raw.crs(), &Crs::from_epsg(4324).unwrap());

    let grid = RasterPopulationGrid::load(&path).unwrap();
    assert!(grid.crs().is_wgs84());
    let coordinates = NodeCoordinateIndex::from_entries([(1, 88.7, -179.1), (2, 88.8, -178.9)]);
    let population = sample_population(&grid, &coordinates).unwrap();
    assert_eq!(population.values(), vec![3.0, 4.0]);
}

#[test]
fn projected_rasters_are_reprojected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("population_3857.tif");
    let data: Vec<f32> = (0..100).map(|i| if i % 10 < 5 { 1.0 } else { 5.0 }).collect();
    GeoTiffFixture {
        width: 10,
        height: 10,
        data: &data,
        origin: (890_555.9, 6_446_275.8),
        pixel_size: (22_263.9, 15_000.0),
        epsg: 3857,
        projected: true,
        nodata: None,
    }
    .write(&path);

    let grid = RasterPopulationGrid::load(&path).unwrap();
    assert!(grid.crs().is_wgs84());
    assert!((grid.transform().origin_x - 8.0).abs() < 1e-3);
    let coordinates = NodeCoordinateIndex::from_entries([(1, 49.5, 8.5), (2, 49.5, 9.5)]);
    let population = sample_population(&grid, &coordinates).unwrap();
    assert_eq!(population.values(), vec![1.0, 5.0]);
}

#[test]
fn nodata_cells_count_as_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("population_nodata.tif");
    GeoTiffFixture {
        width: 2,
        height: 1,
        data: &[-200.0, 7.0],
        origin: (8.0, 49.001),
        pixel_size: (0.001, 0.001),
        epsg: 4326,
        projected: false,
        nodata: Some("-200"),
    }
    .write(&path);

    let grid = RasterPopulationGrid::load(&path).unwrap();
    assert!(grid.value_at(0, 0).unwrap().is_nan());
    let coordinates = NodeCoordinateIndex::from_entries([(1, 49.0005, 8.0005), (2, 49.0005, 8.0015)]);
    let population = sample_population(&grid, &coordinates).unwrap();
    assert_eq!(population.values(), vec![0.0, 7.0]);
}

#[test]
fn unreadable_rasters_are_data_access_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.tif");
    assert!(matches!(
        RasterPopulationGrid::load(&missing),
        Err(CentralityError::DataAccess { .. })
    ));

    let not_a_tiff = dir.path().join("population.tif");
    std::fs::write(&not_a_tiff, b"not a raster").unwrap();
    assert!(matches!(
        RasterPopulationGrid::load(&not_a_tiff),
        Err(CentralityError::DataAccess { .. })
    ));
}
