//! Normalized annotation store model.
//!
//! Datasets own images, images own annotations, and annotations reference a
//! category. Categories live store-wide and are attached to datasets by id.
//!
//! # Example
//!
//! ```
//! use labelport::model::{Annotation, Category, Dataset, Image};
//!
//! let mut dataset = Dataset::new(1u64, "streets", "/datasets/streets");
//! let person = Category::new(1u64, "person");
//! dataset.attach_categories(&[person.id]);
//!
//! let image = Image::new(1u64, dataset.id, "/datasets/streets/a.jpg", "a.jpg");
//! let face = Annotation::new(1u64, image.id, person.id)
//!     .with_segmentation(vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]])
//!     .with_isbbox(true);
//! assert!(face.has_segmentation());
//! ```

mod ids;
mod records;

pub use ids::{AnnotationId, CategoryId, DatasetId, ExportId, ImageId, JobId};
pub use records::{
    count_visible_keypoints, Annotation, Category, Dataset, ExportArtifact, Image, MergeKey,
    Metadata, NewAnnotation, NewCategory, NewExport, Polygon,
};
