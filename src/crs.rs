//! Coordinate transforms between the map frame of a label file and the pixel
//! frame of the raster it annotates.

/// Bidirectional mapping between map and pixel coordinates.
///
/// Implementations must be pure and the two directions must be inverses of one
/// another within floating point tolerance. Points are `(x, y)` in both frames.
pub trait CrsTransformer: Send + Sync {
    fn map_to_pixel(&self, point: (f64, f64)) -> (f64, f64);

    fn pixel_to_map(&self, point: (f64, f64)) -> (f64, f64);
}

/// Map and pixel frames coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl CrsTransformer for IdentityTransformer {
    fn map_to_pixel(&self, point: (f64, f64)) -> (f64, f64) {
        point
    }

    fn pixel_to_map(&self, point: (f64, f64)) -> (f64, f64) {
        point
    }
}

/// North-up affine transform of a georeferenced raster: the world position of
/// the top-left pixel corner plus the ground size of one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Returns `None` unless both pixel sizes are finite and strictly positive.
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Option<Self> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(pixel_width) || !positive(pixel_height) {
            return None;
        }
        if !origin_x.is_finite() || !origin_y.is_finite() {
            return None;
        }
        Some(Self {
            origin_x,
            pixel_width,
            origin_y,
            pixel_height,
        })
    }
}

impl CrsTransformer for GeoTransform {
    fn map_to_pixel(&self, (x, y): (f64, f64)) -> (f64, f64) {
        // Rows grow downwards while northing grows upwards.
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    fn pixel_to_map(&self, (col, row): (f64, f64)) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }
}
