use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FEATURE_COLLECTION: &str = "FeatureCollection";
pub const FEATURE: &str = "Feature";
pub const POLYGON: &str = "Polygon";

// Label file extensions picked up when scanning a directory
pub const LABEL_FORMATS: &[&str] = &["geojson", "json"];

/// GeoJSON feature collection holding one feature per labelled object
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: FEATURE_COLLECTION.to_string(),
            features,
        }
    }
}

fn feature_type() -> String {
    FEATURE.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    pub fn polygon(ring: Vec<(f64, f64)>, properties: Properties) -> Self {
        Self {
            kind: FEATURE.to_string(),
            geometry: Some(Geometry {
                kind: POLYGON.to_string(),
                coordinates: serde_json::json!([ring]),
            }),
            properties,
        }
    }
}

// Coordinates stay untyped until conversion so that one bad feature is
// reported with its index instead of failing the whole document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

// Struct to hold batch processing statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub total_files_processed: usize,
    pub successful_conversions: usize,
    pub failed_conversions: usize,
    pub labels_written: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, labels: usize) {
        self.total_files_processed += 1;
        self.successful_conversions += 1;
        self.labels_written += labels;
    }

    pub fn record_failure(&mut self) {
        self.total_files_processed += 1;
        self.failed_conversions += 1;
    }

    pub fn merge(mut self, other: ProcessingStats) -> Self {
        self.total_files_processed += other.total_files_processed;
        self.successful_conversions += other.successful_conversions;
        self.failed_conversions += other.failed_conversions;
        self.labels_written += other.labels_written;
        self
    }

    pub fn print_summary(&self) {
        log::info!("=== Processing Summary ===");
        log::info!("Total files processed: {}", self.total_files_processed);
        log::info!("Successful conversions: {}", self.successful_conversions);
        log::info!("Labels written: {}", self.labels_written);
        if self.failed_conversions > 0 {
            log::warn!("Failed conversions: {}", self.failed_conversions);
        } else {
            log::info!("Failed conversions: 0");
        }
    }
}
