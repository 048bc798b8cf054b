use rand::rngs::StdRng;
use rand::SeedableRng;

/// EPSG code of geographic WGS 84 (long/lat) coordinates.
pub static CRS_EPSG_4326: u32 = 4326;
/// Population raster used when no other path is configured.
pub static DEFAULT_RASTER_PATH: &str = "data/ghspop_4326.tif";
/// Kilometres per hour to metres per second.
pub static KPH_TO_M_S: f64 = 1000.0 / 3600.0;

/// Seeded generator when a seed is given, otherwise seeded from the thread generator.
#[inline]
pub fn seeded_rng(random_seed: Option<u64>) -> StdRng {
    if let Some(seed) = random_seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}
