//! Export pipeline: store records to a redacted exchange package.
//!
//! An export produces two files in the dataset's exports directory:
//!
//! - `<prefix>-<millis>.json`: the exchange document, recorded as the
//!   export artifact's path.
//! - `<prefix>-<millis>.tar.gz`: every image of the dataset. Annotated
//!   images have the regions of bbox annotations from the blur categories
//!   blurred; the others are copied through as RGB.
//!
//! Work runs strictly sequentially with one decoded image in memory at a
//! time. A missing or unreadable source image fails the whole export.

mod options;

pub use options::ExportOptions;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use image::RgbImage;

use crate::archive::archive;
use crate::error::LabelportError;
use crate::exchange::{
    write_exchange_json, ExchangeAnnotation, ExchangeCategory, ExchangeDocument, ExchangeImage,
};
use crate::model::{
    Annotation, Category, CategoryId, DatasetId, ExportArtifact, Image, ImageId, NewExport,
};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::redaction;
use crate::store::Store;

/// What an export run produced.
#[derive(Clone, Debug)]
pub struct ExportSummary {
    /// The stored artifact record. Its path is the exchange document.
    pub artifact: ExportArtifact,

    /// The image tarball.
    pub archive_path: PathBuf,

    pub categories: usize,

    /// Annotated images listed in the document.
    pub images: usize,

    pub annotations: usize,

    /// Annotated images that had at least one redaction mask.
    pub redacted_images: usize,

    /// Non-annotated images copied into the archive.
    pub copied_images: usize,
}

/// Runs exports against a store, reporting to one reporter.
pub struct ExportPipeline<'a> {
    reporter: &'a dyn ProgressReporter,
    options: ExportOptions,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, options: ExportOptions) -> Self {
        Self { reporter, options }
    }

    /// Exports `category_ids` of a dataset, blurring bbox annotations of
    /// `blur_category_ids`, and returns the summary of the stored artifact.
    ///
    /// # Errors
    /// Fails if the dataset or any listed category does not exist, or on any
    /// image, document or archive I/O failure.
    pub fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
        dataset_id: DatasetId,
        category_ids: &[CategoryId],
        blur_category_ids: &[CategoryId],
    ) -> Result<ExportSummary, LabelportError> {
        let reporter = self.reporter;
        let options = &self.options;

        let dataset = store
            .find_dataset(dataset_id)?
            .ok_or(LabelportError::DatasetNotFound(dataset_id))?;

        reporter.info(&format!(
            "Beginning export ({} format) of dataset {} with image redaction",
            options.format_tag, dataset.name
        ));

        let categories = resolve_categories(store, category_ids)?;
        resolve_categories(store, blur_category_ids)?;

        let annotated_images = store.find_images(dataset.id, true)?;
        let plain_images = store.find_images(dataset.id, false)?;
        let annotations = group_by_image(store.find_annotations_in_dataset(dataset.id, category_ids)?);
        let blur_annotations = store.find_annotations_in_dataset(dataset.id, blur_category_ids)?;
        let blur_total = blur_annotations.len();
        let blur_annotations = group_by_image(blur_annotations);

        let mut tracker = ProgressTracker::new(
            categories.len() + annotated_images.len() + blur_total + options.archive_overhead_units,
        );

        let exports_dir = dataset.directory.join(&options.exports_dir_name);
        let stem = format!(
            "{}-{}",
            options.file_prefix(),
            chrono::Utc::now().timestamp_millis()
        );
        let export_root = exports_dir.join(&stem);
        let document_path = exports_dir.join(format!("{stem}.json"));
        fs::create_dir_all(&export_root)?;

        let mut document = ExchangeDocument::default();
        let mut category_names = Vec::with_capacity(categories.len());

        for category in &categories {
            reporter.info(&format!("Adding category: {}", category.name));
            document
                .categories
                .push(ExchangeCategory::from_category(category));
            category_names.push(category.name.clone());
            tracker.advance(1, reporter);
        }

        let mut annotation_total = 0;
        let mut redacted_images = 0;

        for image in &annotated_images {
            let image_annotations = annotations.get(&image.id).map(Vec::as_slice).unwrap_or(&[]);
            let exported: Vec<ExchangeAnnotation> = image_annotations
                .iter()
                .filter_map(ExchangeAnnotation::from_annotation)
                .collect();

            let image_blur = blur_annotations.get(&image.id).map(Vec::as_slice).unwrap_or(&[]);
            let masks: Vec<Annotation> = image_blur.iter().filter(|a| a.isbbox).cloned().collect();

            reporter.info(&format!("Blurring image: {}", image.file_name));
            let redacted = redaction::blur(&image.path, &masks, options.blur_sigma)?;
            save_image(
                &redacted,
                &mirrored_path(image, &export_root, options.storage_prefix_segments),
            )?;
            if !masks.is_empty() {
                redacted_images += 1;
            }
            tracker.advance(1 + image_blur.len(), reporter);

            reporter.info(&format!(
                "Exporting {} annotations for image {}",
                exported.len(),
                image.id
            ));
            annotation_total += exported.len();
            document.annotations.extend(exported);
            document.images.push(ExchangeImage::from_image(image));
        }

        for image in &plain_images {
            let copy = redaction::load_rgb(&image.path)?;
            save_image(
                &copy,
                &mirrored_path(image, &export_root, options.storage_prefix_segments),
            )?;
        }

        let archive_path = archive(&export_root)?;
        tracker.advance(options.archive_overhead_units, reporter);

        reporter.info(&format!(
            "Done export {} annotations and {} images from {}",
            annotation_total,
            annotated_images.len(),
            dataset.name
        ));

        reporter.info(&format!("Writing export to file {}", document_path.display()));
        document.sort_by_id();
        write_exchange_json(&document_path, &document)?;

        reporter.info("Creating export object");
        let mut tags = Vec::with_capacity(category_names.len() + 1);
        tags.push(options.format_tag.clone());
        tags.extend(category_names);
        let artifact = store.create_export(NewExport {
            dataset_id: dataset.id,
            path: document_path,
            tags,
        })?;

        tracker.finish(reporter);

        Ok(ExportSummary {
            artifact,
            archive_path,
            categories: categories.len(),
            images: annotated_images.len(),
            annotations: annotation_total,
            redacted_images,
            copied_images: plain_images.len(),
        })
    }
}

/// Where an image lands inside the export root.
///
/// The image's directory components are mirrored after dropping the first
/// `strip` components of its storage path (the root counts as one), so
/// `/datasets/streets/day/a.jpg` with `strip = 2` maps to
/// `<export_root>/streets/day/a.jpg`.
pub fn mirrored_path(image: &Image, export_root: &Path, strip: usize) -> PathBuf {
    let components: Vec<Component<'_>> = image.path.components().collect();
    let dir_len = components.len().saturating_sub(1);

    let mut target = export_root.to_path_buf();
    for component in components.iter().take(dir_len).skip(strip) {
        if let Component::Normal(segment) = component {
            target.push(segment);
        }
    }
    target.join(&image.file_name)
}

fn resolve_categories<S: Store + ?Sized>(
    store: &S,
    ids: &[CategoryId],
) -> Result<Vec<Category>, LabelportError> {
    let found = store.find_categories_by_ids(ids)?;
    let found_ids: HashSet<CategoryId> = found.iter().map(|c| c.id).collect();
    if let Some(missing) = ids.iter().find(|id| !found_ids.contains(id)) {
        return Err(LabelportError::CategoryNotFound(*missing));
    }

    let mut live: Vec<Category> = found.into_iter().filter(|c| !c.deleted).collect();
    live.sort_by_key(|c| c.id);
    Ok(live)
}

fn group_by_image(annotations: Vec<Annotation>) -> BTreeMap<ImageId, Vec<Annotation>> {
    let mut grouped: BTreeMap<ImageId, Vec<Annotation>> = BTreeMap::new();
    for annotation in annotations {
        grouped.entry(annotation.image_id).or_default().push(annotation);
    }
    grouped
}

fn save_image(image: &RgbImage, path: &Path) -> Result<(), LabelportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image.save(path).map_err(|source| LabelportError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}
