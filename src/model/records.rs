//! Normalized store records.
//!
//! These are the plain value records the repository traits hand out. They
//! carry no persistence behaviour; the pipelines read them, decide, and write
//! changes back through the repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ids::{AnnotationId, CategoryId, DatasetId, ExportId, ImageId};

/// A single polygon as a flat `[x0, y0, x1, y1, ...]` coordinate list.
pub type Polygon = Vec<f64>;

/// Free-form metadata attached to categories, images and annotations.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A dataset: a storage directory plus the set of categories it uses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,

    pub name: String,

    /// Root storage directory holding the dataset's images.
    pub directory: PathBuf,

    /// Categories attached to this dataset. Kept duplicate-free.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,

    #[serde(default)]
    pub deleted: bool,
}

impl Dataset {
    pub fn new(id: impl Into<DatasetId>, name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            directory: directory.into(),
            category_ids: Vec::new(),
            deleted: false,
        }
    }

    /// Adds categories to the dataset with set semantics.
    ///
    /// Returns the number of ids that were not already present.
    pub fn attach_categories(&mut self, ids: &[CategoryId]) -> usize {
        let mut added = 0;
        for id in ids {
            if !self.category_ids.contains(id) {
                self.category_ids.push(*id);
                added += 1;
            }
        }
        added
    }
}

/// A category (class label).
///
/// `keypoint_labels` and `keypoint_edges` form the keypoint schema; a
/// category either has both populated or neither.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    /// Names of the keypoints, in keypoint order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keypoint_labels: Vec<String>,

    /// Skeleton edges as 1-based pairs of keypoint indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keypoint_edges: Vec<[u32; 2]>,

    #[serde(default)]
    pub deleted: bool,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            color: None,
            metadata: Metadata::new(),
            keypoint_labels: Vec::new(),
            keypoint_edges: Vec::new(),
            deleted: false,
        }
    }

    /// Sets the keypoint schema.
    pub fn with_keypoints(mut self, labels: Vec<String>, edges: Vec<[u32; 2]>) -> Self {
        self.keypoint_labels = labels;
        self.keypoint_edges = edges;
        self
    }

    /// True when the category defines a keypoint schema.
    pub fn has_keypoints(&self) -> bool {
        !self.keypoint_labels.is_empty()
    }

    /// Case-insensitive name comparison used when resolving imported categories.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Fields for a category that has not been stored yet.
#[derive(Clone, Debug, Default)]
pub struct NewCategory {
    pub name: String,
    pub supercategory: Option<String>,
    pub color: Option<String>,
    pub metadata: Metadata,
    pub keypoint_labels: Vec<String>,
    pub keypoint_edges: Vec<[u32; 2]>,
}

/// An image stored in a dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    pub dataset_id: DatasetId,

    /// Full storage path of the image file.
    pub path: PathBuf,

    pub file_name: String,

    #[serde(default)]
    pub width: u32,

    #[serde(default)]
    pub height: u32,

    /// Set once the image has at least been through an annotation import or edit.
    #[serde(default)]
    pub annotated: bool,

    /// Categories present on this image.
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,

    /// Count of live annotations with a positive area.
    #[serde(default)]
    pub num_annotations: usize,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    #[serde(default)]
    pub deleted: bool,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        dataset_id: impl Into<DatasetId>,
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            dataset_id: dataset_id.into(),
            path: path.into(),
            file_name: file_name.into(),
            width: 0,
            height: 0,
            annotated: false,
            category_ids: Vec::new(),
            num_annotations: 0,
            metadata: Metadata::new(),
            deleted: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_annotated(mut self, annotated: bool) -> Self {
        self.annotated = annotated;
        self
    }
}

/// An annotation on an image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    /// Polygons outlining the region. The first one doubles as the
    /// redaction rectangle for bbox annotations.
    #[serde(default)]
    pub segmentation: Vec<Polygon>,

    /// Flat `(x, y, visibility)` triples.
    #[serde(default)]
    pub keypoints: Vec<f64>,

    /// `[x, y, width, height]`.
    #[serde(default)]
    pub bbox: [f64; 4],

    #[serde(default)]
    pub area: f64,

    #[serde(default)]
    pub iscrowd: bool,

    #[serde(default)]
    pub isbbox: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    #[serde(default)]
    pub deleted: bool,
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            segmentation: Vec::new(),
            keypoints: Vec::new(),
            bbox: [0.0; 4],
            area: 0.0,
            iscrowd: false,
            isbbox: false,
            color: None,
            metadata: Metadata::new(),
            deleted: false,
        }
    }

    pub fn with_segmentation(mut self, segmentation: Vec<Polygon>) -> Self {
        self.segmentation = segmentation;
        self
    }

    pub fn with_keypoints(mut self, keypoints: Vec<f64>) -> Self {
        self.keypoints = keypoints;
        self
    }

    pub fn with_bbox(mut self, bbox: [f64; 4], area: f64) -> Self {
        self.bbox = bbox;
        self.area = area;
        self
    }

    pub fn with_isbbox(mut self, isbbox: bool) -> Self {
        self.isbbox = isbbox;
        self
    }

    pub fn has_segmentation(&self) -> bool {
        !self.segmentation.is_empty()
    }

    pub fn has_keypoints(&self) -> bool {
        !self.keypoints.is_empty()
    }

    /// The first polygon of the segmentation, if any.
    pub fn first_polygon(&self) -> Option<&[f64]> {
        self.segmentation.first().map(Vec::as_slice)
    }

    /// The identity used to detect an already imported annotation.
    pub fn merge_key(&self) -> MergeKey {
        MergeKey {
            image_id: self.image_id,
            category_id: self.category_id,
            segmentation: self.segmentation.clone(),
            keypoints: self.keypoints.clone(),
        }
    }
}

/// Fields for an annotation that has not been stored yet.
#[derive(Clone, Debug)]
pub struct NewAnnotation {
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub segmentation: Vec<Polygon>,
    pub keypoints: Vec<f64>,
    pub bbox: [f64; 4],
    pub area: f64,
    pub iscrowd: bool,
    pub isbbox: bool,
    pub color: Option<String>,
    pub metadata: Metadata,
}

/// Two annotations with equal merge keys are the same logical annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeKey {
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub segmentation: Vec<Polygon>,
    pub keypoints: Vec<f64>,
}

impl MergeKey {
    /// True if `annotation` carries exactly this key.
    pub fn matches(&self, annotation: &Annotation) -> bool {
        annotation.image_id == self.image_id
            && annotation.category_id == self.category_id
            && annotation.segmentation == self.segmentation
            && annotation.keypoints == self.keypoints
    }
}

/// The record left behind by a successful export.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub id: ExportId,

    pub dataset_id: DatasetId,

    /// Path of the exchange document written by the export.
    pub path: PathBuf,

    /// Format tag first, then the exported category names.
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
}

/// Fields for an export artifact that has not been stored yet.
#[derive(Clone, Debug)]
pub struct NewExport {
    pub dataset_id: DatasetId,
    pub path: PathBuf,
    pub tags: Vec<String>,
}

/// Counts keypoints whose visibility flag (every third value) is positive.
pub fn count_visible_keypoints(keypoints: &[f64]) -> usize {
    keypoints
        .iter()
        .skip(2)
        .step_by(3)
        .filter(|visibility| **visibility > 0.0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_categories_is_a_set() {
        let mut dataset = Dataset::new(1u64, "streets", "/datasets/streets");
        assert_eq!(dataset.attach_categories(&[CategoryId(1), CategoryId(2)]), 2);
        assert_eq!(dataset.attach_categories(&[CategoryId(2), CategoryId(3)]), 1);
        assert_eq!(
            dataset.category_ids,
            vec![CategoryId(1), CategoryId(2), CategoryId(3)]
        );
    }

    #[test]
    fn test_category_name_matching_ignores_case() {
        let category = Category::new(1u64, "person");
        assert!(category.name_matches("Person"));
        assert!(category.name_matches("PERSON"));
        assert!(!category.name_matches("persons"));
    }

    #[test]
    fn test_count_visible_keypoints() {
        // visibility values: 2, 0, 1
        let keypoints = [10.0, 10.0, 2.0, 0.0, 0.0, 0.0, 5.0, 6.0, 1.0];
        assert_eq!(count_visible_keypoints(&keypoints), 2);
        assert_eq!(count_visible_keypoints(&[]), 0);
    }

    #[test]
    fn test_merge_key_matches_exact_geometry() {
        let ann = Annotation::new(1u64, 2u64, 3u64)
            .with_segmentation(vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]]);
        let key = ann.merge_key();
        assert!(key.matches(&ann));

        let moved = ann
            .clone()
            .with_segmentation(vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 11.0]]);
        assert!(!key.matches(&moved));

        let mut other_image = ann.clone();
        other_image.image_id = ImageId(9);
        assert!(!key.matches(&other_image));
    }

    #[test]
    fn test_first_polygon() {
        let ann = Annotation::new(1u64, 1u64, 1u64)
            .with_segmentation(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(ann.first_polygon(), Some(&[1.0, 2.0][..]));
        assert_eq!(Annotation::new(2u64, 1u64, 1u64).first_polygon(), None);
    }
}
