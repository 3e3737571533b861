use log::debug;

use crate::bbox::BBox;
use crate::class_map::ClassMap;
use crate::crs::CrsTransformer;
use crate::error::{LabelError, Result};
use crate::extent::clip_to_extent;
use crate::labels::{Label, ObjectDetectionLabels};
use crate::types::{Feature, FeatureCollection, Properties, FEATURE_COLLECTION, POLYGON};

/// Exterior ring of a polygon feature in map coordinates
fn exterior_ring(feature: &Feature, index: usize) -> Result<Vec<(f64, f64)>> {
    let malformed = |message: String| LabelError::MalformedGeometry { index, message };

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| malformed("feature has no geometry".to_string()))?;
    if geometry.kind != POLYGON {
        return Err(malformed(format!(
            "expected a {} geometry, found {}",
            POLYGON, geometry.kind
        )));
    }

    let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(geometry.coordinates.clone())
        .map_err(|e| malformed(format!("invalid polygon coordinates: {}", e)))?;
    let exterior = rings
        .into_iter()
        .next()
        .filter(|ring| !ring.is_empty())
        .ok_or_else(|| malformed("polygon has no exterior ring".to_string()))?;

    exterior
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(malformed(format!(
                "position {:?} has fewer than two coordinates",
                position
            ))),
        })
        .collect()
}

/// Exterior ring of a polygon feature projected into pixel space.
/// Vertices the transformer cannot map to finite pixels are rejected.
pub(crate) fn pixel_ring(
    feature: &Feature,
    index: usize,
    crs_transformer: &dyn CrsTransformer,
) -> Result<Vec<(f64, f64)>> {
    exterior_ring(feature, index)?
        .into_iter()
        .map(|p| {
            let (x, y) = crs_transformer.map_to_pixel(p);
            if x.is_finite() && y.is_finite() {
                Ok((x, y))
            } else {
                Err(LabelError::MalformedGeometry {
                    index,
                    message: format!("vertex {:?} projects to non-finite pixel ({}, {})", p, x, y),
                })
            }
        })
        .collect()
}

pub(crate) fn check_collection_kind(collection: &FeatureCollection) -> Result<()> {
    if collection.kind != FEATURE_COLLECTION {
        return Err(LabelError::NotFeatureCollection {
            found: collection.kind.clone(),
        });
    }
    Ok(())
}

/// Class id of a feature, preferring `class_name` over a raw `class_id`
pub(crate) fn resolve_class_id(
    properties: &Properties,
    class_map: &ClassMap,
    index: usize,
) -> Result<i64> {
    match (&properties.class_name, properties.class_id) {
        (Some(name), _) => class_map.name_to_id(name),
        (None, Some(id)) => class_map.id_to_name(id).map(|_| id),
        (None, None) => Err(LabelError::MissingClass { index }),
    }
}

/// Convert one polygon feature into a pixel-space label.
///
/// The polygon is reduced to the axis-aligned bounding box of its projected
/// exterior ring.
pub fn feature_to_label(
    feature: &Feature,
    index: usize,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
) -> Result<Label> {
    let ring = pixel_ring(feature, index, crs_transformer)?;
    let bbox = BBox::from_points(ring).ok_or_else(|| LabelError::MalformedGeometry {
        index,
        message: "polygon does not project to a finite box".to_string(),
    })?;
    let class_id = resolve_class_id(&feature.properties, class_map, index)?;
    Ok(Label::new(bbox, class_id, feature.properties.score))
}

/// Convert every feature of a collection, then restrict the result to `extent`.
pub fn geojson_to_labels(
    collection: &FeatureCollection,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
    extent: Option<&BBox>,
) -> Result<ObjectDetectionLabels> {
    check_collection_kind(collection)?;
    let labels = collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| feature_to_label(feature, index, crs_transformer, class_map))
        .collect::<Result<ObjectDetectionLabels>>()?;
    debug!("Converted {} features to pixel boxes", labels.len());
    Ok(clip_to_extent(&labels, extent))
}

/// Inverse of [`feature_to_label`]: box corners go back to map coordinates.
pub fn label_to_feature(
    label: &Label,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
) -> Result<Feature> {
    if let Some(score) = label.score.filter(|score| !score.is_finite()) {
        return Err(LabelError::InvalidScore(score));
    }
    let class_name = class_map.id_to_name(label.class_id)?;
    let ring = label
        .bbox
        .geojson_coordinates()
        .into_iter()
        .map(|p| crs_transformer.pixel_to_map(p))
        .collect();
    let properties = Properties {
        class_id: Some(label.class_id),
        class_name: Some(class_name.to_string()),
        score: label.score,
    };
    Ok(Feature::polygon(ring, properties))
}

pub fn labels_to_geojson(
    labels: &ObjectDetectionLabels,
    crs_transformer: &dyn CrsTransformer,
    class_map: &ClassMap,
) -> Result<FeatureCollection> {
    let features = labels
        .iter()
        .map(|label| label_to_feature(label, crs_transformer, class_map))
        .collect::<Result<Vec<_>>>()?;
    Ok(FeatureCollection::new(features))
}

/// Render labels as text lines `class_id ymin xmin ymax xmax [score]`
pub fn labels_to_box_lines(labels: &ObjectDetectionLabels) -> String {
    let mut data = String::with_capacity(labels.len() * 64);
    for label in labels {
        let [ymin, xmin, ymax, xmax] = label.bbox.to_array();
        data.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            label.class_id, ymin, xmin, ymax, xmax
        ));
        if let Some(score) = label.score {
            data.push_str(&format!(" {:.6}", score));
        }
        data.push('\n');
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::IdentityTransformer;
    use serde_json::json;

    fn class_map() -> ClassMap {
        ClassMap::from_names(["car", "house"]).unwrap()
    }

    fn parse(value: serde_json::Value) -> FeatureCollection {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_non_rectangular_polygon_becomes_bounding_box() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[1.0, 0.0], [3.0, 2.0], [1.0, 5.0], [0.0, 2.0], [1.0, 0.0]]]
                },
                "properties": {"class_name": "house"}
            }]
        }));
        let labels =
            geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None).unwrap();
        assert_eq!(labels.boxes()[0].to_array(), [0.0, 0.0, 5.0, 3.0]);
        assert_eq!(labels.class_ids(), vec![2]);
        assert_eq!(labels.scores(), vec![None]);
    }

    #[test]
    fn test_unknown_class_fails() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [{
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]},
                "properties": {"class_name": "tree"}
            }]
        }));
        let err = geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None)
            .unwrap_err();
        assert!(matches!(err, LabelError::UnknownClass(name) if name == "tree"));
    }

    #[test]
    fn test_class_id_fallback() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]},
                    "properties": {"class_id": 2}
                },
                {
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]},
                    "properties": {"class_id": 7}
                }
            ]
        }));
        let feature = &collection.features[0];
        let label = feature_to_label(feature, 0, &IdentityTransformer, &class_map()).unwrap();
        assert_eq!(label.class_id, 2);

        let err = geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None)
            .unwrap_err();
        assert!(matches!(err, LabelError::UnknownClassId(7)));
    }

    #[test]
    fn test_malformed_geometry_reports_index() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]},
                    "properties": {"class_name": "car"}
                },
                {
                    "geometry": {"type": "Point", "coordinates": [0, 0]},
                    "properties": {"class_name": "car"}
                }
            ]
        }));
        let err = geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None)
            .unwrap_err();
        assert!(matches!(err, LabelError::MalformedGeometry { index: 1, .. }));

        let missing = parse(json!({
            "type": "FeatureCollection",
            "features": [{"geometry": null, "properties": {}}]
        }));
        let err =
            geojson_to_labels(&missing, &IdentityTransformer, &class_map(), None).unwrap_err();
        assert!(matches!(err, LabelError::MalformedGeometry { index: 0, .. }));
    }

    #[test]
    fn test_missing_class_properties() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [{
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]}
            }]
        }));
        let err = geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None)
            .unwrap_err();
        assert!(matches!(err, LabelError::MissingClass { index: 0 }));
    }

    #[test]
    fn test_label_to_feature_writes_both_class_properties() {
        let label = Label::new(BBox::new(1.0, 2.0, 3.0, 4.0).unwrap(), 1, Some(0.5));
        let feature = label_to_feature(&label, &IdentityTransformer, &class_map()).unwrap();
        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Polygon");
        assert_eq!(value["geometry"]["coordinates"][0][0], json!([2.0, 1.0]));
        assert_eq!(value["properties"], json!({"class_id": 1, "class_name": "car", "score": 0.5}));

        let unscored = Label::new(label.bbox, 2, None);
        let feature = label_to_feature(&unscored, &IdentityTransformer, &class_map()).unwrap();
        let value = serde_json::to_value(&feature).unwrap();
        assert!(value["properties"].get("score").is_none());
    }

    /// Sends every map point to NaN, like a projection outside its domain.
    struct NanTransformer;

    impl CrsTransformer for NanTransformer {
        fn map_to_pixel(&self, _: (f64, f64)) -> (f64, f64) {
            (f64::NAN, f64::NAN)
        }

        fn pixel_to_map(&self, _: (f64, f64)) -> (f64, f64) {
            (f64::NAN, f64::NAN)
        }
    }

    #[test]
    fn test_non_finite_projection_is_malformed() {
        let collection = parse(json!({
            "type": "FeatureCollection",
            "features": [{
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1], [1, 0]]]},
                "properties": {"class_name": "car"}
            }]
        }));
        let err = geojson_to_labels(&collection, &NanTransformer, &class_map(), None).unwrap_err();
        assert!(matches!(err, LabelError::MalformedGeometry { index: 0, .. }));
    }

    #[test]
    fn test_other_document_types_are_rejected() {
        let collection = parse(json!({"type": "Feature", "features": []}));
        let err =
            geojson_to_labels(&collection, &IdentityTransformer, &class_map(), None).unwrap_err();
        assert!(matches!(err, LabelError::NotFeatureCollection { found } if found == "Feature"));
    }

    #[test]
    fn test_non_finite_score_is_not_written() {
        let bbox = BBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        for score in [f64::NAN, f64::INFINITY] {
            let label = Label::new(bbox, 1, Some(score));
            let err = label_to_feature(&label, &IdentityTransformer, &class_map()).unwrap_err();
            assert!(matches!(err, LabelError::InvalidScore(_)));
        }
    }

    #[test]
    fn test_box_lines() {
        let labels = ObjectDetectionLabels::from_entries(vec![
            Label::new(BBox::new(0.0, 0.0, 2.0, 2.0).unwrap(), 1, Some(0.9)),
            Label::new(BBox::new(2.0, 2.0, 4.0, 4.0).unwrap(), 2, None),
        ]);
        assert_eq!(
            labels_to_box_lines(&labels),
            "1 0.000000 0.000000 2.000000 2.000000 0.900000\n2 2.000000 2.000000 4.000000 4.000000\n"
        );
    }
}
