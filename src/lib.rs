//! GeoJSON to pixel-space bounding box converter
//!
//! This library reads GeoJSON polygon annotations, projects them into the pixel
//! frame of a raster and turns them into object detection labels, optionally
//! clipped to a region of interest. Labels can be written back as GeoJSON.
//! Grid-cell classification labels are read the same way or inferred from
//! polygon overlap.

pub mod bbox;
pub mod class_map;
pub mod classification;
pub mod config;
pub mod conversion;
pub mod crs;
pub mod dataset;
pub mod error;
pub mod extent;
pub mod io;
pub mod label_store;
pub mod labels;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use bbox::BBox;
pub use class_map::{ClassItem, ClassMap};
pub use classification::{ClassificationLabels, ClassificationOptions};
pub use config::{Args, Format};
pub use crs::{CrsTransformer, GeoTransform, IdentityTransformer};
pub use dataset::process_dataset;
pub use error::{LabelError, Result};
pub use label_store::{ClassificationGeoJsonFile, ObjectDetectionGeoJsonFile};
pub use labels::{Label, ObjectDetectionLabels};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
pub use types::{Feature, FeatureCollection, ProcessingStats, Properties};
