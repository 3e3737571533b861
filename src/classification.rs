//! Grid-cell classification labels.
//!
//! A GeoJSON file either already holds one square per cell, or holds arbitrary
//! class polygons from which a class per cell is inferred by overlap.

use geo::{Area, BooleanOps, LineString, Polygon};
use log::debug;
use rayon::prelude::*;

use crate::bbox::BBox;
use crate::class_map::ClassMap;
use crate::conversion::{
    check_collection_kind, geojson_to_labels, label_to_feature, pixel_ring, resolve_class_id,
};
use crate::crs::CrsTransformer;
use crate::error::{LabelError, Result};
use crate::labels::Label;
use crate::types::FeatureCollection;

/// One class id per cell; `None` marks a cell with no usable class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationLabels {
    cells: Vec<(BBox, Option<i64>)>,
}

impl ClassificationLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Set the class of `cell`, replacing the class of an identical cell.
    pub fn set_cell(&mut self, cell: BBox, class_id: Option<i64>) {
        match self.cells.iter_mut().find(|(existing, _)| *existing == cell) {
            Some(entry) => entry.1 = class_id,
            None => self.cells.push((cell, class_id)),
        }
    }

    /// `None` if the cell is unknown, `Some(None)` if it is known but null.
    pub fn get_cell_class_id(&self, cell: &BBox) -> Option<Option<i64>> {
        self.cells
            .iter()
            .find(|(existing, _)| existing == cell)
            .map(|(_, class_id)| *class_id)
    }

    pub fn get_cells(&self) -> Vec<BBox> {
        self.cells.iter().map(|(cell, _)| *cell).collect()
    }

    pub fn get_class_ids(&self) -> Vec<Option<i64>> {
        self.cells.iter().map(|(_, class_id)| *class_id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (BBox, Option<i64>)> {
        self.cells.iter()
    }
}

/// How a classification file is turned into cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationOptions {
    /// Infer a grid over the extent instead of reading cells from the file
    pub infer_cells: bool,
    pub cell_size: f64,
    /// Minimum overlap ratio for a polygon to compete for a cell
    pub ioa_thresh: f64,
    /// Divide the overlap by the cell area instead of the polygon area
    pub use_intersection_over_cell: bool,
    /// Class of cells no polygon qualifies for. `Some(0)` is the same as `None`.
    pub background_class_id: Option<i64>,
    /// Take the smallest qualifying class id instead of the largest overlap
    pub pick_min_class_id: bool,
}

impl Default for ClassificationOptions {
    fn default() -> Self {
        Self {
            infer_cells: false,
            cell_size: 300.0,
            ioa_thresh: 0.5,
            use_intersection_over_cell: false,
            background_class_id: None,
            pick_min_class_id: false,
        }
    }
}

impl ClassificationOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(LabelError::InvalidOptions(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if !(0.0..=1.0).contains(&self.ioa_thresh) {
            return Err(LabelError::InvalidOptions(format!(
                "ioa_thresh must be within [0, 1], got {}",
                self.ioa_thresh
            )));
        }
        Ok(())
    }

    fn background(&self) -> Option<i64> {
        self.background_class_id.filter(|&id| id != 0)
    }
}

/// A labelled polygon in pixel space
#[derive(Debug, Clone)]
pub struct ClassPolygon {
    polygon: Polygon<f64>,
    bounds: BBox,
    area: f64,
    class_id: i64,
}

impl ClassPolygon {
    pub fn new(ring: Vec<(f64, f64)>, class_id: i64) -> Option<Self> {
        let bounds = BBox::from_points(ring.iter().copied())?;
        let polygon = Polygon::new(LineString::from(ring), vec![]);
        let area = polygon.unsigned_area();
        Some(Self {
            polygon,
            bounds,
            area,
            class_id,
        })
    }

    pub fn class_id(&self) -> i64 {
        self.class_id
    }

    pub fn area(&self) -> f64 {
        self.area
    }
}

/// Project every feature of `collection` into a pixel-space class polygon.
/// Polygons without area can never cover a cell and are left out.
pub fn class_polygons(
    collection: &FeatureCollection,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
) -> Result<Vec<ClassPolygon>> {
    check_collection_kind(collection)?;
    let mut polygons = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.iter().enumerate() {
        let ring = pixel_ring(feature, index, crs_transformer)?;
        let class_id = resolve_class_id(&feature.properties, class_map, index)?;
        match ClassPolygon::new(ring, class_id) {
            Some(polygon) if polygon.area > 0.0 => polygons.push(polygon),
            _ => debug!("Skipping feature {} without area", index),
        }
    }
    Ok(polygons)
}

/// Class that best describes `cell` given the overlapping polygons.
///
/// A polygon qualifies when its overlap ratio reaches `ioa_thresh`. Among the
/// qualifying polygons the one covering most of the cell wins, the first one
/// on ties, unless `pick_min_class_id` is set.
pub fn infer_cell(
    polygons: &[ClassPolygon],
    cell: &BBox,
    options: &ClassificationOptions,
) -> Option<i64> {
    let cell_area = cell.area();
    if cell_area <= 0.0 {
        return options.background();
    }
    let cell_polygon = Polygon::new(LineString::from(cell.geojson_coordinates()), vec![]);

    let mut candidates: Vec<(f64, i64)> = Vec::new();
    for polygon in polygons.iter().filter(|p| p.bounds.intersects(cell)) {
        let overlap = polygon.polygon.intersection(&cell_polygon).unsigned_area();
        let over_cell = overlap / cell_area;
        let ratio = if options.use_intersection_over_cell {
            over_cell
        } else {
            overlap / polygon.area
        };
        if ratio >= options.ioa_thresh {
            candidates.push((over_cell, polygon.class_id));
        }
    }

    if options.pick_min_class_id {
        return candidates
            .iter()
            .map(|&(_, class_id)| class_id)
            .min()
            .or_else(|| options.background());
    }
    candidates
        .iter()
        .fold(None, |best: Option<(f64, i64)>, &(over_cell, class_id)| match best {
            Some((best_over_cell, _)) if best_over_cell >= over_cell => best,
            _ => Some((over_cell, class_id)),
        })
        .map(|(_, class_id)| class_id)
        .or_else(|| options.background())
}

/// Infer a class for every cell of a grid laid over `extent`.
pub fn infer_labels(
    collection: &FeatureCollection,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
    extent: &BBox,
    options: &ClassificationOptions,
) -> Result<ClassificationLabels> {
    options.validate()?;
    let polygons = class_polygons(collection, crs_transformer, class_map)?;
    let cells = extent.get_windows(options.cell_size, options.cell_size);
    debug!(
        "Inferring {} cells from {} polygons",
        cells.len(),
        polygons.len()
    );

    let class_ids: Vec<Option<i64>> = cells
        .par_iter()
        .map(|cell| infer_cell(&polygons, cell, options))
        .collect();

    // Grid windows are distinct, so no cell needs replacing.
    Ok(ClassificationLabels {
        cells: cells.into_iter().zip(class_ids).collect(),
    })
}

/// Read a file that already holds one feature per cell.
pub fn read_labels(
    collection: &FeatureCollection,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
    extent: Option<&BBox>,
) -> Result<ClassificationLabels> {
    let detections = geojson_to_labels(collection, crs_transformer, class_map, extent)?;
    let mut labels = ClassificationLabels::new();
    for label in &detections {
        labels.set_cell(label.bbox, Some(label.class_id));
    }
    Ok(labels)
}

/// Read or infer cells depending on `options.infer_cells`.
pub fn load_classification_labels(
    collection: &FeatureCollection,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
    extent: Option<&BBox>,
    options: &ClassificationOptions,
) -> Result<ClassificationLabels> {
    if options.infer_cells {
        let extent = extent.ok_or(LabelError::MissingExtent)?;
        infer_labels(collection, crs_transformer, class_map, extent, options)
    } else {
        read_labels(collection, crs_transformer, class_map, extent)
    }
}

/// Write the grid as one square feature per classified cell. Null cells are
/// not written.
pub fn classification_to_geojson(
    labels: &ClassificationLabels,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
) -> Result<FeatureCollection> {
    let features = labels
        .iter()
        .filter_map(|&(cell, class_id)| class_id.map(|id| Label::new(cell, id, None)))
        .map(|label| label_to_feature(&label, crs_transformer, class_map))
        .collect::<Result<Vec<_>>>()?;
    Ok(FeatureCollection::new(features))
}
