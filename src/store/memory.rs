//! In-memory store.
//!
//! Records live in plain vectors; ids are allocated as one past the largest
//! id of that kind, so a store loaded from JSON keeps allocating correctly.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{
    AnnotationRepository, CategoryRepository, DatasetRepository, ExportRepository, ImageRepository,
};
use crate::error::LabelportError;
use crate::model::{
    Annotation, AnnotationId, Category, CategoryId, Dataset, DatasetId, ExportArtifact, ExportId,
    Image, ImageId, MergeKey, NewAnnotation, NewCategory, NewExport,
};

/// A complete store held in memory and serializable as JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    datasets: Vec<Dataset>,

    #[serde(default)]
    categories: Vec<Category>,

    #[serde(default)]
    images: Vec<Image>,

    #[serde(default)]
    annotations: Vec<Annotation>,

    #[serde(default)]
    exports: Vec<ExportArtifact>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a dataset.
    pub fn insert_dataset(&mut self, dataset: Dataset) {
        self.datasets.retain(|d| d.id != dataset.id);
        self.datasets.push(dataset);
    }

    /// Inserts or replaces a category.
    pub fn insert_category(&mut self, category: Category) {
        self.categories.retain(|c| c.id != category.id);
        self.categories.push(category);
    }

    /// Inserts or replaces an image.
    pub fn insert_image(&mut self, image: Image) {
        self.images.retain(|i| i.id != image.id);
        self.images.push(image);
    }

    /// Inserts or replaces an annotation.
    pub fn insert_annotation(&mut self, annotation: Annotation) {
        self.annotations.retain(|a| a.id != annotation.id);
        self.annotations.push(annotation);
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn exports(&self) -> &[ExportArtifact] {
        &self.exports
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Live annotations on one image.
    pub fn annotations_for_image(&self, image_id: ImageId) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.image_id == image_id && !a.deleted)
            .collect()
    }

    fn next_category_id(&self) -> CategoryId {
        CategoryId::new(self.categories.iter().map(|c| c.id.as_u64()).max().unwrap_or(0) + 1)
    }

    fn next_annotation_id(&self) -> AnnotationId {
        AnnotationId::new(self.annotations.iter().map(|a| a.id.as_u64()).max().unwrap_or(0) + 1)
    }

    fn next_export_id(&self) -> ExportId {
        ExportId::new(self.exports.iter().map(|e| e.id.as_u64()).max().unwrap_or(0) + 1)
    }
}

impl DatasetRepository for MemoryStore {
    fn find_dataset(&self, id: DatasetId) -> Result<Option<Dataset>, LabelportError> {
        Ok(self.datasets.iter().find(|d| d.id == id && !d.deleted).cloned())
    }

    fn attach_categories(
        &mut self,
        id: DatasetId,
        category_ids: &[CategoryId],
    ) -> Result<(), LabelportError> {
        let dataset = self
            .datasets
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(LabelportError::DatasetNotFound(id))?;
        dataset.attach_categories(category_ids);
        Ok(())
    }
}

impl CategoryRepository for MemoryStore {
    fn find_categories_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, LabelportError> {
        Ok(self
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, LabelportError> {
        Ok(self.categories.iter().find(|c| c.name_matches(name)).cloned())
    }

    fn create_category(&mut self, category: NewCategory) -> Result<Category, LabelportError> {
        let created = Category {
            id: self.next_category_id(),
            name: category.name,
            supercategory: category.supercategory,
            color: category.color,
            metadata: category.metadata,
            keypoint_labels: category.keypoint_labels,
            keypoint_edges: category.keypoint_edges,
            deleted: false,
        };
        self.categories.push(created.clone());
        Ok(created)
    }
}

impl ImageRepository for MemoryStore {
    fn find_images(
        &self,
        dataset_id: DatasetId,
        annotated: bool,
    ) -> Result<Vec<Image>, LabelportError> {
        Ok(self
            .images
            .iter()
            .filter(|i| i.dataset_id == dataset_id && i.annotated == annotated && !i.deleted)
            .cloned()
            .collect())
    }

    fn find_images_by_filename(
        &self,
        dataset_id: DatasetId,
        file_name: &str,
    ) -> Result<Vec<Image>, LabelportError> {
        Ok(self
            .images
            .iter()
            .filter(|i| i.dataset_id == dataset_id && i.file_name == file_name && !i.deleted)
            .cloned()
            .collect())
    }

    fn update_image_summary(
        &mut self,
        id: ImageId,
        annotated: bool,
        category_ids: Vec<CategoryId>,
        num_annotations: usize,
    ) -> Result<(), LabelportError> {
        let image = self
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(LabelportError::ImageNotFound(id))?;
        image.annotated = annotated;
        image.category_ids = category_ids;
        image.num_annotations = num_annotations;
        Ok(())
    }
}

impl AnnotationRepository for MemoryStore {
    fn find_annotations_in_dataset(
        &self,
        dataset_id: DatasetId,
        category_ids: &[CategoryId],
    ) -> Result<Vec<Annotation>, LabelportError> {
        let image_ids: HashSet<ImageId> = self
            .images
            .iter()
            .filter(|i| i.dataset_id == dataset_id)
            .map(|i| i.id)
            .collect();

        Ok(self
            .annotations
            .iter()
            .filter(|a| {
                !a.deleted && image_ids.contains(&a.image_id) && category_ids.contains(&a.category_id)
            })
            .cloned()
            .collect())
    }

    fn find_annotation_by_key(
        &self,
        key: &MergeKey,
    ) -> Result<Option<Annotation>, LabelportError> {
        Ok(self.annotations.iter().find(|a| key.matches(a)).cloned())
    }

    fn create_annotation(
        &mut self,
        annotation: NewAnnotation,
    ) -> Result<Annotation, LabelportError> {
        let created = Annotation {
            id: self.next_annotation_id(),
            image_id: annotation.image_id,
            category_id: annotation.category_id,
            segmentation: annotation.segmentation,
            keypoints: annotation.keypoints,
            bbox: annotation.bbox,
            area: annotation.area,
            iscrowd: annotation.iscrowd,
            isbbox: annotation.isbbox,
            color: annotation.color,
            metadata: annotation.metadata,
            deleted: false,
        };
        self.annotations.push(created.clone());
        Ok(created)
    }

    fn reconcile_annotation(
        &mut self,
        id: AnnotationId,
        isbbox: bool,
    ) -> Result<(), LabelportError> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(LabelportError::AnnotationNotFound(id))?;
        annotation.deleted = false;
        annotation.isbbox = isbbox;
        Ok(())
    }

    fn count_annotations_with_area(&self, image_id: ImageId) -> Result<usize, LabelportError> {
        Ok(self
            .annotations
            .iter()
            .filter(|a| a.image_id == image_id && !a.deleted && a.area > 0.0)
            .count())
    }
}

impl ExportRepository for MemoryStore {
    fn create_export(&mut self, export: NewExport) -> Result<ExportArtifact, LabelportError> {
        let created = ExportArtifact {
            id: self.next_export_id(),
            dataset_id: export.dataset_id,
            path: export.path,
            tags: export.tags,
            created_at: Utc::now(),
        };
        self.exports.push(created.clone());
        Ok(created)
    }
}
