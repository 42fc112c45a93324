//! Repository interfaces for the annotation store.
//!
//! The pipelines never touch persistence directly. Each record kind has a
//! narrow repository trait returning plain value records, and [`Store`] ties
//! them together. [`MemoryStore`] is the bundled implementation; anything
//! else (a database-backed store, say) only has to implement the five traits.

mod io_json;
mod memory;

pub use io_json::{from_store_str, read_store_json, to_store_string, write_store_json};
pub use memory::MemoryStore;

use crate::error::LabelportError;
use crate::model::{
    Annotation, AnnotationId, Category, CategoryId, Dataset, DatasetId, ExportArtifact, Image,
    ImageId, MergeKey, NewAnnotation, NewCategory, NewExport,
};

/// Dataset lookups and category attachment.
pub trait DatasetRepository {
    fn find_dataset(&self, id: DatasetId) -> Result<Option<Dataset>, LabelportError>;

    /// Attaches categories to a dataset without introducing duplicates.
    fn attach_categories(
        &mut self,
        id: DatasetId,
        category_ids: &[CategoryId],
    ) -> Result<(), LabelportError>;
}

pub trait CategoryRepository {
    /// Returns the categories with the given ids, deleted ones included.
    fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, LabelportError>;

    /// Finds a category anywhere in the store whose name matches ignoring case.
    fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, LabelportError>;

    fn create_category(&mut self, category: NewCategory) -> Result<Category, LabelportError>;
}

pub trait ImageRepository {
    /// Non-deleted images of a dataset with the given annotated flag.
    fn find_images(
        &self,
        dataset_id: DatasetId,
        annotated: bool,
    ) -> Result<Vec<Image>, LabelportError>;

    /// Non-deleted images of a dataset whose file name is exactly `file_name`.
    fn find_images_by_filename(
        &self,
        dataset_id: DatasetId,
        file_name: &str,
    ) -> Result<Vec<Image>, LabelportError>;

    fn update_image_summary(
        &mut self,
        id: ImageId,
        annotated: bool,
        category_ids: Vec<CategoryId>,
        num_annotations: usize,
    ) -> Result<(), LabelportError>;
}

pub trait AnnotationRepository {
    /// Non-deleted annotations on the dataset's images whose category is in `category_ids`.
    fn find_annotations_in_dataset(
        &self,
        dataset_id: DatasetId,
        category_ids: &[CategoryId],
    ) -> Result<Vec<Annotation>, LabelportError>;

    /// Looks up an annotation by merge key. Deleted annotations are included.
    fn find_annotation_by_key(&self, key: &MergeKey)
        -> Result<Option<Annotation>, LabelportError>;

    fn create_annotation(&mut self, annotation: NewAnnotation)
        -> Result<Annotation, LabelportError>;

    /// Clears the deleted flag and sets `isbbox` on an existing annotation.
    /// Unknown ids are an error.
    fn reconcile_annotation(&mut self, id: AnnotationId, isbbox: bool)
        -> Result<(), LabelportError>;

    /// Counts non-deleted annotations on an image with a strictly positive area.
    fn count_annotations_with_area(&self, image_id: ImageId) -> Result<usize, LabelportError>;
}

pub trait ExportRepository {
    fn create_export(&mut self, export: NewExport) -> Result<ExportArtifact, LabelportError>;
}

/// Everything the export and import pipelines need from a store.
pub trait Store:
    DatasetRepository + CategoryRepository + ImageRepository + AnnotationRepository + ExportRepository
{
}

impl<T> Store for T where
    T: DatasetRepository
        + CategoryRepository
        + ImageRepository
        + AnnotationRepository
        + ExportRepository
{
}
