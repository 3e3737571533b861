use log::debug;

use crate::bbox::BBox;
use crate::class_map::ClassMap;
use crate::classification::{
    classification_to_geojson, load_classification_labels, ClassificationLabels,
    ClassificationOptions,
};
use crate::conversion::{geojson_to_labels, labels_to_geojson};
use crate::crs::CrsTransformer;
use crate::error::{LabelError, Result};
use crate::labels::ObjectDetectionLabels;
use crate::storage::FileStorage;
use crate::types::FeatureCollection;

/// Object detection labels backed by a GeoJSON file.
///
/// A readable store checks that its uri exists when it is opened; writability
/// is only discovered when [`save`](Self::save) tries to write.
pub struct ObjectDetectionGeoJsonFile<'a> {
    uri: String,
    storage: &'a dyn FileStorage,
    crs_transformer: &'a dyn CrsTransformer,
    class_map: &'a ClassMap,
    extent: Option<BBox>,
    readable: bool,
    writable: bool,
    labels: ObjectDetectionLabels,
}

impl<'a> ObjectDetectionGeoJsonFile<'a> {
    pub fn new(
        uri: impl Into<String>,
        storage: &'a dyn FileStorage,
        crs_transformer: &'a dyn CrsTransformer,
        class_map: &'a ClassMap,
        extent: Option<BBox>,
        readable: bool,
        writable: bool,
    ) -> Result<Self> {
        let uri = uri.into();
        if readable && !storage.exists(&uri) {
            return Err(LabelError::NotFound { uri });
        }
        debug!(
            "Opened label store {} (readable={}, writable={})",
            uri, readable, writable
        );
        Ok(Self {
            uri,
            storage,
            crs_transformer,
            class_map,
            extent,
            readable,
            writable,
            labels: ObjectDetectionLabels::default(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn extent(&self) -> Option<&BBox> {
        self.extent.as_ref()
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Labels staged for the next [`save`](Self::save).
    pub fn labels(&self) -> &ObjectDetectionLabels {
        &self.labels
    }

    pub fn set_labels(&mut self, labels: ObjectDetectionLabels) {
        self.labels = labels;
    }

    /// Read the file again and convert it to pixel-space labels clipped to the
    /// store's extent. The result also becomes the staged collection.
    pub fn get_labels(&mut self) -> Result<ObjectDetectionLabels> {
        let data = self.storage.read_bytes(&self.uri)?;
        let collection: FeatureCollection = serde_json::from_slice(&data)?;
        let labels = geojson_to_labels(
            &collection,
            self.crs_transformer,
            self.class_map,
            self.extent.as_ref(),
        )?;
        debug!("Read {} labels from {}", labels.len(), self.uri);
        self.labels = labels.clone();
        Ok(labels)
    }

    /// Write the staged labels back as GeoJSON in map coordinates.
    ///
    /// Both a store opened with `writable=false` and a destination that cannot
    /// be written are reported as [`LabelError::NotWritable`].
    pub fn save(&self) -> Result<()> {
        if !self.writable {
            return Err(not_writable(&self.uri));
        }

        let collection = labels_to_geojson(&self.labels, self.crs_transformer, self.class_map)?;
        write_collection(self.storage, &self.uri, &collection)?;
        debug!("Saved {} labels to {}", self.labels.len(), self.uri);
        Ok(())
    }
}

fn not_writable(uri: &str) -> LabelError {
    LabelError::NotWritable {
        uri: uri.to_string(),
        reason: "label store was opened with writable=false".to_string(),
    }
}

fn write_collection(
    storage: &dyn FileStorage,
    uri: &str,
    collection: &FeatureCollection,
) -> Result<()> {
    let data = serde_json::to_vec(collection)?;
    storage
        .write_bytes(uri, &data)
        .map_err(|e| LabelError::NotWritable {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
}

/// Classification labels backed by a GeoJSON file, one square per cell.
///
/// With `infer_cells` set the file may instead hold free-form class polygons,
/// and the grid is inferred over the store's extent. Saving always writes the
/// grid, never the source polygons.
pub struct ClassificationGeoJsonFile<'a> {
    uri: String,
    storage: &'a dyn FileStorage,
    crs_transformer: &'a dyn CrsTransformer,
    class_map: &'a ClassMap,
    extent: Option<BBox>,
    options: ClassificationOptions,
    readable: bool,
    writable: bool,
    labels: ClassificationLabels,
}

impl<'a> ClassificationGeoJsonFile<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uri: impl Into<String>,
        storage: &'a dyn FileStorage,
        crs_transformer: &'a dyn CrsTransformer,
        class_map: &'a ClassMap,
        extent: Option<BBox>,
        options: ClassificationOptions,
        readable: bool,
        writable: bool,
    ) -> Result<Self> {
        options.validate()?;
        let uri = uri.into();
        if readable && !storage.exists(&uri) {
            return Err(LabelError::NotFound { uri });
        }
        debug!(
            "Opened classification store {} (readable={}, writable={})",
            uri, readable, writable
        );
        Ok(Self {
            uri,
            storage,
            crs_transformer,
            class_map,
            extent,
            options,
            readable,
            writable,
            labels: ClassificationLabels::default(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn labels(&self) -> &ClassificationLabels {
        &self.labels
    }

    pub fn set_labels(&mut self, labels: ClassificationLabels) {
        self.labels = labels;
    }

    /// Read the file again, reading or inferring cells per the store options.
    pub fn get_labels(&mut self) -> Result<ClassificationLabels> {
        let data = self.storage.read_bytes(&self.uri)?;
        let collection: FeatureCollection = serde_json::from_slice(&data)?;
        let labels = load_classification_labels(
            &collection,
            self.crs_transformer,
            self.class_map,
            self.extent.as_ref(),
            &self.options,
        )?;
        debug!("Read {} cells from {}", labels.len(), self.uri);
        self.labels = labels.clone();
        Ok(labels)
    }

    /// Write every classified cell as a square feature in map coordinates.
    pub fn save(&self) -> Result<()> {
        if !self.writable {
            return Err(not_writable(&self.uri));
        }
        let collection =
            classification_to_geojson(&self.labels, self.crs_transformer, self.class_map)?;
        write_collection(self.storage, &self.uri, &collection)?;
        debug!("Saved {} cells to {}", self.labels.len(), self.uri);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::IdentityTransformer;
    use crate::labels::Label;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_save_not_writable_does_not_touch_storage() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let store = ObjectDetectionGeoJsonFile::new(
            "mem://labels.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            false,
            false,
        )
        .unwrap();
        assert!(matches!(store.save(), Err(LabelError::NotWritable { .. })));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_get_labels_rereads_storage() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let mut writer = ObjectDetectionGeoJsonFile::new(
            "mem://labels.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            false,
            true,
        )
        .unwrap();
        let mut reader = ObjectDetectionGeoJsonFile::new(
            "mem://labels.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            false,
            false,
        )
        .unwrap();

        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        writer.set_labels(ObjectDetectionLabels::from_entries(vec![Label::new(bbox, 1, None)]));
        writer.save().unwrap();
        assert_eq!(reader.get_labels().unwrap().len(), 1);

        writer.set_labels(ObjectDetectionLabels::default());
        writer.save().unwrap();
        assert!(reader.get_labels().unwrap().is_empty());

        storage.remove("mem://labels.json");
        assert!(matches!(
            reader.get_labels(),
            Err(LabelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let storage = MemoryStorage::new();
        storage.write_bytes("mem://bad.json", b"not json").unwrap();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let mut store = ObjectDetectionGeoJsonFile::new(
            "mem://bad.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            true,
            false,
        )
        .unwrap();
        assert!(matches!(store.get_labels(), Err(LabelError::Json(_))));
        assert!(store.labels().is_empty());
    }

    #[test]
    fn test_documents_without_features_are_rejected() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let documents: [&[u8]; 3] = [
            br#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,1]]]},"properties":{"class_name":"car"}}"#,
            b"[]",
            br#"{"type":"FeatureCollection","feature":[]}"#,
        ];
        for document in documents {
            storage.write_bytes("mem://labels.json", document).unwrap();
            let mut store = ObjectDetectionGeoJsonFile::new(
                "mem://labels.json",
                &storage,
                &IdentityTransformer,
                &class_map,
                None,
                true,
                false,
            )
            .unwrap();
            assert!(matches!(store.get_labels(), Err(LabelError::Json(_))));
        }

        storage
            .write_bytes("mem://labels.json", br#"{"type":"Topology","features":[]}"#)
            .unwrap();
        let mut store = ObjectDetectionGeoJsonFile::new(
            "mem://labels.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            true,
            false,
        )
        .unwrap();
        assert!(matches!(
            store.get_labels(),
            Err(LabelError::NotFeatureCollection { .. })
        ));
    }

    #[test]
    fn test_save_rejects_nan_score() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let mut store = ObjectDetectionGeoJsonFile::new(
            "mem://labels.json",
            &storage,
            &IdentityTransformer,
            &class_map,
            None,
            false,
            true,
        )
        .unwrap();
        let bbox = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        store.set_labels(ObjectDetectionLabels::from_entries(vec![Label::new(
            bbox,
            1,
            Some(f64::NAN),
        )]));
        assert!(matches!(store.save(), Err(LabelError::InvalidScore(_))));
        assert!(storage.is_empty());
    }

    fn classification_store<'a>(
        storage: &'a MemoryStorage,
        class_map: &'a ClassMap,
        options: ClassificationOptions,
        readable: bool,
        writable: bool,
    ) -> Result<ClassificationGeoJsonFile<'a>> {
        ClassificationGeoJsonFile::new(
            "mem://cells.json",
            storage,
            &IdentityTransformer,
            class_map,
            Some(BBox::new(0.0, 0.0, 10.0, 20.0).unwrap()),
            options,
            readable,
            writable,
        )
    }

    #[test]
    fn test_classification_store_infers_and_saves_grid() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car", "house"]).unwrap();
        storage
            .write_bytes(
                "mem://cells.json",
                br#"{"type":"FeatureCollection","features":[{"type":"Feature",
                    "geometry":{"type":"Polygon","coordinates":[[[11,1],[11,9],[19,9],[19,1],[11,1]]]},
                    "properties":{"class_name":"house"}}]}"#,
            )
            .unwrap();
        let options = ClassificationOptions {
            infer_cells: true,
            cell_size: 10.0,
            ioa_thresh: 0.5,
            use_intersection_over_cell: true,
            background_class_id: Some(1),
            pick_min_class_id: false,
        };
        let mut store = classification_store(&storage, &class_map, options, true, true).unwrap();
        let labels = store.get_labels().unwrap();
        assert_eq!(labels.get_class_ids(), vec![Some(1), Some(2)]);
        store.save().unwrap();

        // The saved file holds the grid itself, readable without inference.
        let mut reader = classification_store(
            &storage,
            &class_map,
            ClassificationOptions::default(),
            true,
            false,
        )
        .unwrap();
        let grid = reader.get_labels().unwrap();
        assert_eq!(grid.get_class_ids(), vec![Some(1), Some(2)]);
        assert_eq!(grid.get_cells()[1].to_array(), [0.0, 10.0, 10.0, 20.0]);
        assert!(matches!(reader.save(), Err(LabelError::NotWritable { .. })));
    }

    #[test]
    fn test_classification_store_rejects_bad_options() {
        let storage = MemoryStorage::new();
        let class_map = ClassMap::from_names(["car"]).unwrap();
        let options = ClassificationOptions {
            cell_size: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            classification_store(&storage, &class_map, options, false, true),
            Err(LabelError::InvalidOptions(_))
        ));
        assert!(matches!(
            classification_store(&storage, &class_map, Default::default(), true, false),
            Err(LabelError::NotFound { .. })
        ));
    }
}
