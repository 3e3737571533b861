//! In-memory object detection labels.

use std::cmp::Ordering;

use crate::bbox::{BBox, EPS};

/// One detected object: pixel box, class id and optional confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
    pub bbox: BBox,
    pub class_id: i64,
    pub score: Option<f64>,
}

impl Label {
    pub fn new(bbox: BBox, class_id: i64, score: Option<f64>) -> Self {
        Self {
            bbox,
            class_id,
            score,
        }
    }

    fn canonical_cmp(&self, other: &Label) -> Ordering {
        self.bbox
            .total_cmp(&other.bbox)
            .then(self.class_id.cmp(&other.class_id))
            .then_with(|| match (self.score, other.score) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }

    fn almost_eq(&self, other: &Label, eps: f64) -> bool {
        let scores_match = match (self.score, other.score) {
            (Some(a), Some(b)) => (a - b).abs() <= eps,
            (None, None) => true,
            _ => false,
        };
        self.class_id == other.class_id && scores_match && self.bbox.almost_eq(&other.bbox, eps)
    }
}

/// Ordered collection of labels. Order mirrors the source features; equality
/// ignores it.
#[derive(Debug, Clone, Default)]
pub struct ObjectDetectionLabels {
    labels: Vec<Label>,
}

impl ObjectDetectionLabels {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Label>,
    {
        Self {
            labels: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    pub fn entries(&self) -> &[Label] {
        &self.labels
    }

    pub fn boxes(&self) -> Vec<BBox> {
        self.labels.iter().map(|l| l.bbox).collect()
    }

    pub fn class_ids(&self) -> Vec<i64> {
        self.labels.iter().map(|l| l.class_id).collect()
    }

    pub fn scores(&self) -> Vec<Option<f64>> {
        self.labels.iter().map(|l| l.score).collect()
    }

    fn canonical(&self) -> Vec<Label> {
        let mut sorted = self.labels.clone();
        sorted.sort_by(Label::canonical_cmp);
        sorted
    }

    /// Multiset equality with coordinates and scores compared within `eps`.
    ///
    /// Every label must be paired with a distinct label of `other` that it is
    /// within `eps` of. Pairs are found by augmenting paths, so labels whose
    /// sort order flips under the tolerance still match.
    pub fn equals_within(&self, other: &ObjectDetectionLabels, eps: f64) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let candidates: Vec<Vec<usize>> = self
            .labels
            .iter()
            .map(|a| {
                other
                    .labels
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| a.almost_eq(b, eps))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        let mut owner = vec![None; other.len()];
        (0..self.len()).all(|i| {
            let mut visited = vec![false; other.len()];
            augment(i, &candidates, &mut owner, &mut visited)
        })
    }

    pub fn equals(&self, other: &ObjectDetectionLabels) -> bool {
        self.equals_within(other, EPS)
    }

    /// Panics with both collections in canonical order when they differ.
    pub fn assert_equal(&self, other: &ObjectDetectionLabels) {
        if !self.equals(other) {
            panic!(
                "label collections differ:\n  left:  {:?}\n  right: {:?}",
                self.canonical(),
                other.canonical()
            );
        }
    }
}

// Try to give left label `i` a partner, re-seating earlier pairings if needed.
fn augment(
    i: usize,
    candidates: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &j in &candidates[i] {
        if visited[j] {
            continue;
        }
        visited[j] = true;
        let free = match owner[j] {
            None => true,
            Some(k) => augment(k, candidates, owner, visited),
        };
        if free {
            owner[j] = Some(i);
            return true;
        }
    }
    false
}

impl PartialEq for ObjectDetectionLabels {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl FromIterator<Label> for ObjectDetectionLabels {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self::from_entries(iter)
    }
}

impl<'a> IntoIterator for &'a ObjectDetectionLabels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}
