#![allow(dead_code)]

use road_centrality::{NetworkGraph, NetworkMode, StaticGraphProvider};
use std::fs::File;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

pub const PLACE: &str = "Dossenheim, Germany";

/// Single band float GeoTIFF with a north-up geotransform.
pub struct GeoTiffFixture<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [f32],
    pub origin: (f64, f64),
    pub pixel_size: (f64, f64),
    pub epsg: u16,
    pub projected: bool,
    pub nodata: Option<&'a str>,
}

impl GeoTiffFixture<'_> {
    pub fn write(&self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(self.width, self.height)
            .unwrap();
        let pixel_scale = [self.pixel_size.0, self.pixel_size.1, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, self.origin.0, self.origin.1, 0.0];
        let (model_type, crs_key) = if self.projected { (1, 3072) } else { (2, 2048) };
        let geo_keys: [u16; 16] = [1, 1, 0, 3, 1024, 0, 1, model_type, 1025, 0, 1, 1, crs_key, 0, 1, self.epsg];
        let directory = image.encoder();
        directory
            .write_tag(Tag::from_u16_exhaustive(33550), &pixel_scale[..])
            .unwrap();
        directory
            .write_tag(Tag::from_u16_exhaustive(33922), &tiepoint[..])
            .unwrap();
        directory
            .write_tag(Tag::from_u16_exhaustive(34735), &geo_keys[..])
            .unwrap();
        if let Some(nodata) = self.nodata {
            directory
                .write_tag(Tag::from_u16_exhaustive(42113), nodata)
                .unwrap();
        }
        image.write_data(self.data).unwrap();
    }
}

/// Writes a geographic (EPSG:4326) raster of one row per slice in `rows`.
pub fn write_wgs84_raster(path: &Path, rows: &[&[f32]], origin: (f64, f64), pixel: f64) {
    let data: Vec<f32> = rows.iter().flat_map(|row| row.iter().copied()).collect();
    GeoTiffFixture {
        width: rows[0].len() as u32,
        height: rows.len() as u32,
        data: &data,
        origin,
        pixel_size: (pixel, pixel),
        epsg: 4326,
        projected: false,
        nodata: None,
    }
    .write(path);
}

/// Two-way street 1 - 2 - 3 along latitude 49.0005, nodes on cell centres of a
/// 0.001 degree grid whose origin is (8.0, 49.001).
pub fn line_graph() -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph.add_node(1, 8.0005, 49.0005).unwrap();
    graph.add_node(2, 8.0015, 49.0005).unwrap();
    graph.add_node(3, 8.0025, 49.0005).unwrap();
    for (start, end, osmid) in [(1, 2, "12"), (2, 1, "12"), (2, 3, "23"), (3, 2, "23")] {
        graph
            .add_edge(start, end, 0, osmid.to_string(), None, Some("residential".to_string()), None)
            .unwrap();
    }
    graph
}

pub fn provider(network_mode: NetworkMode) -> StaticGraphProvider {
    let mut provider = StaticGraphProvider::new();
    provider.insert(PLACE, network_mode, line_graph());
    provider
}
