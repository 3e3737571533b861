use std::cmp::Ordering;

use crate::error::{LabelError, Result};

/// Tolerance used when comparing coordinates that went through a CRS round trip.
pub const EPS: f64 = 1e-6;

/// Axis-aligned rectangle in pixel space, stored as (ymin, xmin, ymax, xmax).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    ymin: f64,
    xmin: f64,
    ymax: f64,
    xmax: f64,
}

impl BBox {
    /// Build a box, rejecting inverted or non-finite corners.
    pub fn new(ymin: f64, xmin: f64, ymax: f64, xmax: f64) -> Result<Self> {
        let finite = [ymin, xmin, ymax, xmax].iter().all(|v| v.is_finite());
        if !finite || ymin > ymax || xmin > xmax {
            return Err(LabelError::InvalidBox {
                ymin,
                xmin,
                ymax,
                xmax,
            });
        }
        Ok(Self {
            ymin,
            xmin,
            ymax,
            xmax,
        })
    }

    /// Square box with its top-left corner at (ymin, xmin).
    pub fn make_square(ymin: f64, xmin: f64, size: f64) -> Result<Self> {
        Self::new(ymin, xmin, ymin + size, xmin + size)
    }

    /// Smallest box containing every (x, y) point. `None` for an empty iterator
    /// or when any coordinate is not finite.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut points = points.into_iter().peekable();
        points.peek()?;
        let (mut x_min, mut y_min) = (f64::MAX, f64::MAX);
        let (mut x_max, mut y_max) = (f64::MIN, f64::MIN);
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }
        Self::new(y_min, x_min, y_max, x_max).ok()
    }

    /// Windows of `size` laid over the box every `stride` pixels, row by row.
    /// Windows on the last row or column may extend past the box.
    pub fn get_windows(&self, size: f64, stride: f64) -> Vec<BBox> {
        if !(size > 0.0 && size.is_finite() && stride > 0.0 && stride.is_finite()) {
            return Vec::new();
        }
        // Offsets are multiplied out rather than accumulated to avoid drift.
        let rows = ((self.ymax - self.ymin) / stride).ceil() as usize;
        let cols = ((self.xmax - self.xmin) / stride).ceil() as usize;
        let mut windows = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            let row = self.ymin + i as f64 * stride;
            for j in 0..cols {
                let col = self.xmin + j as f64 * stride;
                windows.push(BBox {
                    ymin: row,
                    xmin: col,
                    ymax: row + size,
                    xmax: col + size,
                });
            }
        }
        windows
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.ymin, self.xmin, self.ymax, self.xmax]
    }

    /// True when the overlap has positive area. Boxes sharing only an edge or a
    /// corner do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.ymin < other.ymax
            && other.ymin < self.ymax
            && self.xmin < other.xmax
            && other.xmin < self.xmax
    }

    pub fn contains(&self, other: &BBox) -> bool {
        self.ymin <= other.ymin
            && self.xmin <= other.xmin
            && other.ymax <= self.ymax
            && other.xmax <= self.xmax
    }

    /// Overlapping region of two boxes, or `None` if they do not intersect.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BBox {
            ymin: self.ymin.max(other.ymin),
            xmin: self.xmin.max(other.xmin),
            ymax: self.ymax.min(other.ymax),
            xmax: self.xmax.min(other.xmax),
        })
    }

    /// Closed exterior ring in (x, y) order, starting and ending at (xmin, ymin).
    pub fn geojson_coordinates(&self) -> Vec<(f64, f64)> {
        vec![
            (self.xmin, self.ymin),
            (self.xmin, self.ymax),
            (self.xmax, self.ymax),
            (self.xmax, self.ymin),
            (self.xmin, self.ymin),
        ]
    }

    pub fn almost_eq(&self, other: &BBox, eps: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Lexicographic order over (ymin, xmin, ymax, xmax).
    pub fn total_cmp(&self, other: &BBox) -> Ordering {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
