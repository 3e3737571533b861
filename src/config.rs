use clap::{Parser, ValueEnum};
use std::str::FromStr;

use crate::bbox::BBox;
use crate::crs::GeoTransform;

/// Command-line arguments for converting GeoJSON labels to pixel-space boxes.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// GeoJSON label file, or a directory searched recursively for label files
    #[arg(short = 'i', long = "input")]
    pub input: String,

    /// Directory receiving the converted label files
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: String,

    /// Output format: 'boxes' text lines or 'geojson'
    #[arg(
        long = "output_format",
        visible_alias = "format",
        value_enum,
        default_value = "boxes"
    )]
    pub output_format: Format,

    /// Pixel extent `ymin,xmin,ymax,xmax` used to drop and clip labels
    #[arg(long = "extent", value_parser = parse_extent, allow_hyphen_values = true)]
    pub extent: Option<BBox>,

    /// North-up transform `origin_x,pixel_width,origin_y,pixel_height`; identity when omitted
    #[arg(
        long = "geo_transform",
        value_parser = parse_geo_transform,
        allow_hyphen_values = true
    )]
    pub geo_transform: Option<GeoTransform>,

    /// Ordered class names; ids are assigned from 1
    #[arg(use_value_delimiter = true, required = true)]
    pub class_list: Vec<String>,
}

// Enumeration for the converted label format
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Format {
    Boxes,
    Geojson,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Boxes => "txt",
            Format::Geojson => "geojson",
        }
    }
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|part| f64::from_str(part.trim()).map_err(|e| format!("{:?}: {}", part, e)))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {} comma separated numbers, got {}", N, v.len()))
}

// Validate an ordered, finite `ymin,xmin,ymax,xmax` extent
pub(crate) fn parse_extent(s: &str) -> Result<BBox, String> {
    let [ymin, xmin, ymax, xmax] = parse_numbers::<4>(s)?;
    BBox::new(ymin, xmin, ymax, xmax).map_err(|e| e.to_string())
}

pub(crate) fn parse_geo_transform(s: &str) -> Result<GeoTransform, String> {
    let [origin_x, pixel_width, origin_y, pixel_height] = parse_numbers::<4>(s)?;
    GeoTransform::new(origin_x, pixel_width, origin_y, pixel_height)
        .ok_or_else(|| "pixel sizes must be positive and all values finite".to_string())
}
