//! Exchange document schema types and record conversions.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{
    count_visible_keypoints, Annotation, Category, CategoryId, Image, ImageId, Metadata,
    NewAnnotation, NewCategory, Polygon,
};

/// Top-level exchange document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExchangeDocument {
    /// Free-form info block, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,

    #[serde(default)]
    pub images: Vec<ExchangeImage>,

    #[serde(default)]
    pub categories: Vec<ExchangeCategory>,

    #[serde(default)]
    pub annotations: Vec<ExchangeAnnotation>,
}

impl ExchangeDocument {
    /// Sorts every section by its document id for reproducible output.
    pub fn sort_by_id(&mut self) {
        self.images.sort_by_key(|i| i.id);
        self.categories.sort_by_key(|c| c.id);
        self.annotations.sort_by_key(|a| a.id);
    }
}

/// Category entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeCategory {
    pub id: u64,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub metadata: Metadata,

    /// Keypoint labels.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub keypoints: Vec<String>,

    /// Keypoint edges.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub skeleton: Vec<[u32; 2]>,
}

impl ExchangeCategory {
    /// Builds the exchange entry for a stored category.
    ///
    /// The keypoint schema is only carried when the category has keypoint
    /// labels; edges without labels are dropped.
    pub fn from_category(category: &Category) -> Self {
        let (keypoints, skeleton) = if category.has_keypoints() {
            (
                category.keypoint_labels.clone(),
                category.keypoint_edges.clone(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            id: category.id.as_u64(),
            name: category.name.clone(),
            supercategory: category.supercategory.clone(),
            color: category.color.clone(),
            metadata: category.metadata.clone(),
            keypoints,
            skeleton,
        }
    }

    /// Fields for creating this category in a store.
    pub fn to_new_category(&self) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            supercategory: self.supercategory.clone(),
            color: self.color.clone(),
            metadata: self.metadata.clone(),
            keypoint_labels: self.keypoints.clone(),
            keypoint_edges: self.skeleton.clone(),
        }
    }
}

const RESERVED_IMAGE_KEYS: [&str; 5] = ["id", "file_name", "width", "height", "path"];

/// Image entry. Unknown fields are kept in `extra`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeImage {
    pub id: u64,

    pub file_name: String,

    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub width: u32,

    #[serde(default, deserialize_with = "deserialize_dimension")]
    pub height: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ExchangeImage {
    /// Builds the exchange entry for a stored image. Image metadata is
    /// flattened into the entry, minus keys that collide with the entry's
    /// own fields.
    pub fn from_image(image: &Image) -> Self {
        let extra = image
            .metadata
            .iter()
            .filter(|(key, _)| !RESERVED_IMAGE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id: image.id.as_u64(),
            file_name: image.file_name.clone(),
            width: image.width,
            height: image.height,
            path: Some(image.path.to_string_lossy().into_owned()),
            extra,
        }
    }
}

/// The kind of spatial content an annotation carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Geometry {
    Polygon,
    Keypoints,
    PolygonWithKeypoints,
}

/// Annotation entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeAnnotation {
    #[serde(default)]
    pub id: u64,

    /// `None` when missing or not an id; such annotations are skipped on import.
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_id: Option<u64>,

    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<u64>,

    #[serde(default, deserialize_with = "deserialize_polygons")]
    pub segmentation: Vec<Polygon>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub keypoints: Vec<f64>,

    /// Number of visible keypoints. Written on export, ignored on import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_keypoints: Option<usize>,

    #[serde(default, deserialize_with = "deserialize_bbox")]
    pub bbox: [f64; 4],

    #[serde(default, deserialize_with = "deserialize_number")]
    pub area: f64,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub iscrowd: bool,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub isbbox: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub metadata: Metadata,
}

impl ExchangeAnnotation {
    /// Builds the exchange entry for a stored annotation.
    ///
    /// Returns `None` when the annotation has neither segmentation nor
    /// keypoints, since it carries no spatial information.
    pub fn from_annotation(annotation: &Annotation) -> Option<Self> {
        if !annotation.has_segmentation() && !annotation.has_keypoints() {
            return None;
        }

        let num_keypoints = annotation
            .has_keypoints()
            .then(|| count_visible_keypoints(&annotation.keypoints));

        Some(Self {
            id: annotation.id.as_u64(),
            image_id: Some(annotation.image_id.as_u64()),
            category_id: Some(annotation.category_id.as_u64()),
            segmentation: annotation.segmentation.clone(),
            keypoints: annotation.keypoints.clone(),
            num_keypoints,
            bbox: annotation.bbox,
            area: annotation.area,
            iscrowd: annotation.iscrowd,
            isbbox: annotation.isbbox,
            color: annotation.color.clone(),
            metadata: annotation.metadata.clone(),
        })
    }

    /// The spatial content carried, or `None` if there is none.
    pub fn geometry(&self) -> Option<Geometry> {
        match (self.segmentation.is_empty(), self.keypoints.is_empty()) {
            (false, true) => Some(Geometry::Polygon),
            (true, false) => Some(Geometry::Keypoints),
            (false, false) => Some(Geometry::PolygonWithKeypoints),
            (true, true) => None,
        }
    }

    /// Fields for creating this annotation in a store under resolved ids.
    pub fn to_new_annotation(&self, image_id: ImageId, category_id: CategoryId) -> NewAnnotation {
        NewAnnotation {
            image_id,
            category_id,
            segmentation: self.segmentation.clone(),
            keypoints: self.keypoints.clone(),
            bbox: self.bbox,
            area: self.area,
            iscrowd: self.iscrowd,
            isbbox: self.isbbox,
            color: self.color.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `true`/`false`, `0`/`1` or `null`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Number(value)) => value != 0.0,
        None => false,
    })
}

/// Accepts a non-negative integer id; anything else reads as `None`.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?.as_u64())
}

/// Image dimensions; missing, null or out-of-range values read as 0.
fn deserialize_dimension<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or_default())
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_f64()
        .unwrap_or_default())
}

/// Reads `[x, y, w, h]`; any other shape reads as all zeros.
fn deserialize_bbox<'de, D>(deserializer: D) -> Result<[f64; 4], D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let coords: Option<Vec<f64>> = value
        .as_array()
        .and_then(|items| items.iter().map(serde_json::Value::as_f64).collect());

    Ok(coords
        .and_then(|coords| <[f64; 4]>::try_from(coords).ok())
        .unwrap_or_default())
}

/// Reads polygon lists; anything else (RLE objects, null) becomes empty.
fn deserialize_polygons<'de, D>(deserializer: D) -> Result<Vec<Polygon>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(polygons) = value else {
        return Ok(Vec::new());
    };

    let parsed: Option<Vec<Polygon>> = polygons
        .iter()
        .map(|polygon| {
            polygon
                .as_array()
                .and_then(|coords| coords.iter().map(serde_json::Value::as_f64).collect())
        })
        .collect();

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_without_labels_drops_edges() {
        let category = Category::new(3u64, "plate").with_keypoints(vec![], vec![[1, 2]]);
        let entry = ExchangeCategory::from_category(&category);
        assert!(entry.keypoints.is_empty());
        assert!(entry.skeleton.is_empty());
    }

    #[test]
    fn test_category_keypoints_are_renamed() {
        let category = Category::new(1u64, "person")
            .with_keypoints(vec!["nose".into(), "eye".into()], vec![[1, 2]]);
        let json = serde_json::to_value(ExchangeCategory::from_category(&category)).unwrap();
        assert_eq!(json["keypoints"], serde_json::json!(["nose", "eye"]));
        assert_eq!(json["skeleton"], serde_json::json!([[1, 2]]));
        assert!(json.get("keypoint_labels").is_none());
    }

    #[test]
    fn test_annotation_without_spatial_content_is_excluded() {
        let bare = Annotation::new(1u64, 1u64, 1u64).with_bbox([0.0, 0.0, 4.0, 4.0], 16.0);
        assert!(ExchangeAnnotation::from_annotation(&bare).is_none());
    }

    #[test]
    fn test_annotation_counts_visible_keypoints() {
        let ann = Annotation::new(1u64, 1u64, 1u64)
            .with_keypoints(vec![1.0, 1.0, 2.0, 3.0, 3.0, 0.0, 4.0, 4.0, 1.0]);
        let entry = ExchangeAnnotation::from_annotation(&ann).unwrap();
        assert_eq!(entry.num_keypoints, Some(2));
        assert_eq!(entry.geometry(), Some(Geometry::Keypoints));
    }

    #[test]
    fn test_polygon_annotation_has_no_keypoint_fields() {
        let ann = Annotation::new(1u64, 1u64, 1u64)
            .with_segmentation(vec![vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]]);
        let json = serde_json::to_value(ExchangeAnnotation::from_annotation(&ann).unwrap()).unwrap();
        assert!(json.get("keypoints").is_none());
        assert!(json.get("num_keypoints").is_none());
    }

    #[test]
    fn test_image_metadata_is_flattened() {
        let mut image = Image::new(4u64, 1u64, "/datasets/streets/a.jpg", "a.jpg").with_size(64, 48);
        image
            .metadata
            .insert("camera".into(), serde_json::json!("front"));
        let json = serde_json::to_value(ExchangeImage::from_image(&image)).unwrap();
        assert_eq!(json["camera"], "front");
        assert_eq!(json["path"], "/datasets/streets/a.jpg");
        assert_eq!(json["width"], 64);
    }

    #[test]
    fn test_image_metadata_does_not_shadow_entry_fields() {
        let mut image = Image::new(4u64, 1u64, "/datasets/streets/a.jpg", "a.jpg");
        for key in ["id", "file_name", "path", "width"] {
            image.metadata.insert(key.into(), serde_json::json!("stale"));
        }
        image.metadata.insert("camera".into(), serde_json::json!("front"));

        let json = serde_json::to_string(&ExchangeImage::from_image(&image)).unwrap();
        let restored: ExchangeImage = serde_json::from_str(&json).expect("reparse image");

        assert_eq!(restored.id, 4);
        assert_eq!(restored.file_name, "a.jpg");
        assert_eq!(restored.path.as_deref(), Some("/datasets/streets/a.jpg"));
        assert_eq!(restored.extra.len(), 1);
        assert_eq!(restored.extra["camera"], "front");
    }

    #[test]
    fn test_malformed_annotation_fields_read_leniently() {
        let ann: ExchangeAnnotation = serde_json::from_str(
            r#"{"id": 3, "category_id": "x", "bbox": null, "area": null, "segmentation": [[0, 0, 1, 0, 1, 1]]}"#,
        )
        .unwrap();
        assert_eq!(ann.image_id, None);
        assert_eq!(ann.category_id, None);
        assert_eq!(ann.bbox, [0.0; 4]);
        assert_eq!(ann.area, 0.0);

        let short: ExchangeAnnotation =
            serde_json::from_str(r#"{"image_id": 1, "category_id": 2, "bbox": []}"#).unwrap();
        assert_eq!(short.image_id, Some(1));
        assert_eq!(short.bbox, [0.0; 4]);
    }

    #[test]
    fn test_null_image_dimensions_read_as_zero() {
        let image: ExchangeImage =
            serde_json::from_str(r#"{"id": 1, "file_name": "a.jpg", "width": null, "height": -3}"#)
                .unwrap();
        assert_eq!((image.width, image.height), (0, 0));
        assert!(image.extra.is_empty());
    }

    #[test]
    fn test_flag_accepts_numbers_and_null() {
        let ann: ExchangeAnnotation = serde_json::from_str(
            r#"{"image_id": 1, "category_id": 1, "iscrowd": 1, "isbbox": null}"#,
        )
        .unwrap();
        assert!(ann.iscrowd);
        assert!(!ann.isbbox);
    }
}
