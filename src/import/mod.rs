//! Import pipeline: merging an exchange document into a dataset.
//!
//! Entities in the document are resolved against the store by name:
//! categories by case-insensitive name anywhere in the store, images by
//! exact file name within the target dataset. Annotations are merged by
//! merge key (image, category, segmentation, keypoints), so importing the
//! same document again reconciles existing records instead of duplicating
//! them.
//!
//! Problems with individual entries are logged through the reporter and
//! skipped; they never undo earlier work in the same run. Only a missing
//! dataset or a store failure aborts the import.

mod report;

pub use report::ImportSummary;

use std::collections::{BTreeMap, HashMap};

use crate::error::LabelportError;
use crate::exchange::ExchangeDocument;
use crate::model::{CategoryId, DatasetId, Image, ImageId, MergeKey};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::store::Store;

/// A matched image and the categories added to it during this run.
struct ResolvedImage {
    image: Image,
    added_categories: Vec<CategoryId>,
}

/// Runs imports against a store, reporting to one reporter.
pub struct ImportPipeline<'a> {
    reporter: &'a dyn ProgressReporter,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self { reporter }
    }

    /// Merges `document` into the dataset.
    ///
    /// # Errors
    /// Fails if the dataset does not exist or the store rejects a write.
    pub fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
        dataset_id: DatasetId,
        document: &ExchangeDocument,
    ) -> Result<ImportSummary, LabelportError> {
        let reporter = self.reporter;

        let dataset = store
            .find_dataset(dataset_id)?
            .ok_or(LabelportError::DatasetNotFound(dataset_id))?;

        reporter.info("Beginning import");
        reporter.info(&format!(
            "Importing {} categories, {} images, and {} annotations",
            document.categories.len(),
            document.images.len(),
            document.annotations.len()
        ));

        let mut summary = ImportSummary::default();
        let mut tracker = ProgressTracker::new(
            document.categories.len() + document.images.len() + document.annotations.len(),
        );

        // Document category id -> store category id.
        let mut category_ids: HashMap<u64, CategoryId> = HashMap::new();
        let mut created_categories = Vec::new();

        reporter.info("===== Importing Categories =====");
        for category in &document.categories {
            let resolved = match store.find_category_by_name(&category.name)? {
                Some(existing) => {
                    summary.categories_matched += 1;
                    existing
                }
                None => {
                    reporter.warning(&format!(
                        "{} category not found (creating a new one)",
                        category.name
                    ));
                    let created = store.create_category(category.to_new_category())?;
                    created_categories.push(created.id);
                    summary.categories_created += 1;
                    created
                }
            };

            reporter.info(&format!("{} category found", category.name));
            category_ids.insert(category.id, resolved.id);
            tracker.advance(1, reporter);
        }

        if !created_categories.is_empty() {
            store.attach_categories(dataset.id, &created_categories)?;
        }

        // Document image id -> store image id.
        let mut image_ids: HashMap<u64, ImageId> = HashMap::new();
        let mut resolved_images: BTreeMap<ImageId, ResolvedImage> = BTreeMap::new();

        reporter.info("===== Loading Images =====");
        for image in &document.images {
            tracker.advance(1, reporter);

            let mut matches = store.find_images_by_filename(dataset.id, &image.file_name)?;
            match matches.len() {
                0 => {
                    reporter.warning(&format!("Could not find image {}", image.file_name));
                    summary.images_missing += 1;
                }
                1 => {
                    reporter.info(&format!("Image {} found", image.file_name));
                    let found = matches.remove(0);
                    image_ids.insert(image.id, found.id);
                    resolved_images.entry(found.id).or_insert(ResolvedImage {
                        image: found,
                        added_categories: Vec::new(),
                    });
                    summary.images_matched += 1;
                }
                _ => {
                    reporter.error(&format!(
                        "Too many images found with the same file name: {}",
                        image.file_name
                    ));
                    summary.images_ambiguous += 1;
                }
            }
        }

        reporter.info("===== Importing Annotations =====");
        for annotation in &document.annotations {
            tracker.advance(1, reporter);

            if annotation.geometry().is_none() {
                reporter.warning(&format!(
                    "Annotation {} has no segmentation or keypoints",
                    annotation.id
                ));
                summary.annotations_skipped += 1;
                continue;
            }

            let (Some(&image_id), Some(&category_id)) = (
                annotation.image_id.and_then(|id| image_ids.get(&id)),
                annotation.category_id.and_then(|id| category_ids.get(&id)),
            ) else {
                reporter.warning(&format!(
                    "Could not find image or category associated with annotation {}",
                    annotation.id
                ));
                summary.annotations_skipped += 1;
                continue;
            };

            let key = MergeKey {
                image_id,
                category_id,
                segmentation: annotation.segmentation.clone(),
                keypoints: annotation.keypoints.clone(),
            };

            match store.find_annotation_by_key(&key)? {
                None => {
                    reporter.info(&format!(
                        "Creating annotation data ({}, {})",
                        image_id, category_id
                    ));
                    store.create_annotation(annotation.to_new_annotation(image_id, category_id))?;
                    if let Some(resolved) = resolved_images.get_mut(&image_id) {
                        if !resolved.added_categories.contains(&category_id) {
                            resolved.added_categories.push(category_id);
                        }
                    }
                    summary.annotations_created += 1;
                }
                Some(existing) => {
                    store.reconcile_annotation(existing.id, annotation.isbbox)?;
                    reporter.info(&format!(
                        "Annotation already exists (i:{}, c:{})",
                        image_id, category_id
                    ));
                    summary.annotations_reconciled += 1;
                }
            }
        }

        reporter.info("===== Finalizing Images =====");
        for (image_id, resolved) in resolved_images {
            let mut categories = resolved.image.category_ids;
            for category_id in resolved.added_categories {
                if !categories.contains(&category_id) {
                    categories.push(category_id);
                }
            }

            let count = store.count_annotations_with_area(image_id)?;
            store.update_image_summary(image_id, true, categories, count)?;
        }

        tracker.finish(reporter);
        reporter.info(&format!(
            "Import complete: {} annotations created, {} already present, {} skipped",
            summary.annotations_created, summary.annotations_reconciled, summary.annotations_skipped
        ));

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::from_exchange_str;
    use crate::model::{Category, Dataset};
    use crate::progress::{JobReporter, LogLevel};
    use crate::store::MemoryStore;

    fn store_with_images(files: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_dataset(Dataset::new(1u64, "streets", "/datasets/streets"));
        for (idx, file) in files.iter().enumerate() {
            store.insert_image(Image::new(
                idx as u64 + 1,
                1u64,
                format!("/datasets/streets/{file}"),
                *file,
            ));
        }
        store
    }

    #[test]
    fn test_missing_dataset_is_fatal() {
        let mut store = MemoryStore::new();
        let reporter = JobReporter::new(1u64);
        let document = ExchangeDocument::default();

        let err = ImportPipeline::new(&reporter)
            .run(&mut store, DatasetId(5), &document)
            .unwrap_err();
        assert!(matches!(err, LabelportError::DatasetNotFound(DatasetId(5))));
    }

    #[test]
    fn test_ambiguous_image_is_skipped_with_error() {
        let mut store = store_with_images(&["a.jpg"]);
        store.insert_image(Image::new(2u64, 1u64, "/datasets/streets/night/a.jpg", "a.jpg"));
        let reporter = JobReporter::new(1u64);
        let document = from_exchange_str(
            r#"{
                "images": [{"id": 1, "file_name": "a.jpg"}],
                "categories": [{"id": 1, "name": "person"}],
                "annotations": [
                    {"id": 1, "image_id": 1, "category_id": 1, "segmentation": [[0, 0, 1, 0, 1, 1]], "area": 1}
                ]
            }"#,
        )
        .unwrap();

        let summary = ImportPipeline::new(&reporter)
            .run(&mut store, DatasetId(1), &document)
            .expect("import");

        assert_eq!(summary.images_ambiguous, 1);
        assert_eq!(summary.annotations_skipped, 1);
        assert!(store.annotations().is_empty());
        assert_eq!(reporter.messages(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_existing_category_matches_ignoring_case() {
        let mut store = store_with_images(&["a.jpg"]);
        store.insert_category(Category::new(4u64, "person"));
        let reporter = JobReporter::new(1u64);
        let document = from_exchange_str(
            r#"{
                "images": [{"id": 10, "file_name": "a.jpg"}],
                "categories": [{"id": 77, "name": "Person"}],
                "annotations": [
                    {"id": 1, "image_id": 10, "category_id": 77, "keypoints": [1, 1, 2]}
                ]
            }"#,
        )
        .unwrap();

        let summary = ImportPipeline::new(&reporter)
            .run(&mut store, DatasetId(1), &document)
            .expect("import");

        assert_eq!(summary.categories_matched, 1);
        assert_eq!(summary.categories_created, 0);
        assert_eq!(store.categories().len(), 1);
        assert_eq!(store.annotations()[0].category_id, CategoryId(4));
        assert!(reporter.messages(LogLevel::Warning).is_empty());
    }

    #[test]
    fn test_reimport_restores_deleted_annotation() {
        let mut store = store_with_images(&["a.jpg"]);
        let reporter = JobReporter::new(1u64);
        let document = from_exchange_str(
            r#"{
                "images": [{"id": 1, "file_name": "a.jpg"}],
                "categories": [{"id": 1, "name": "plate"}],
                "annotations": [
                    {"id": 1, "image_id": 1, "category_id": 1, "segmentation": [[0, 0, 4, 0, 4, 4, 0, 4]], "area": 16, "isbbox": false}
                ]
            }"#,
        )
        .unwrap();
        let pipeline = ImportPipeline::new(&reporter);
        pipeline.run(&mut store, DatasetId(1), &document).expect("first import");

        let mut deleted = store.annotations()[0].clone();
        deleted.deleted = true;
        store.insert_annotation(deleted);
        assert_eq!(store.image(ImageId(1)).unwrap().num_annotations, 1);

        let mut document = document;
        document.annotations[0].isbbox = true;
        let summary = pipeline.run(&mut store, DatasetId(1), &document).expect("second import");

        assert_eq!(summary.annotations_reconciled, 1);
        assert_eq!(store.annotations().len(), 1);
        assert!(!store.annotations()[0].deleted);
        assert!(store.annotations()[0].isbbox);
        assert_eq!(store.image(ImageId(1)).unwrap().num_annotations, 1);
    }
}
