use log::debug;

use crate::bbox::BBox;
use crate::labels::{Label, ObjectDetectionLabels};

/// Restrict labels to a pixel-space extent.
///
/// Labels that do not overlap the extent with positive area are dropped,
/// straddling ones are clipped to the intersection. Survivors keep their
/// relative order, class id and score. Without an extent the labels are
/// returned unchanged.
pub fn clip_to_extent(labels: &ObjectDetectionLabels, extent: Option<&BBox>) -> ObjectDetectionLabels {
    let Some(extent) = extent else {
        return labels.clone();
    };

    let clipped: ObjectDetectionLabels = labels
        .iter()
        .filter_map(|label| {
            label
                .bbox
                .intersection(extent)
                .map(|bbox| Label::new(bbox, label.class_id, label.score))
        })
        .collect();

    if clipped.len() != labels.len() {
        debug!(
            "Extent {:?} dropped {} of {} labels",
            extent.to_array(),
            labels.len() - clipped.len(),
            labels.len()
        );
    }
    clipped
}
