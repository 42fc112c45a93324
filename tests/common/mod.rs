#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use image::{Rgb, RgbImage};

use labelport::export::ExportOptions;
use labelport::model::{Annotation, Category, Dataset, Image};
use labelport::store::MemoryStore;

pub const PERSON: u64 = 1;
pub const PLATE: u64 = 2;
pub const CAR: u64 = 3;

pub fn checkerboard(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([250, 250, 250])
        } else {
            Rgb([5, 5, 5])
        }
    })
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    checkerboard(width, height).save(path).expect("write png file");
}

/// Export options whose storage prefix covers `root` plus the `datasets`
/// segment, so archive paths start at the dataset directory name.
pub fn options_for(root: &Path) -> ExportOptions {
    ExportOptions {
        storage_prefix_segments: root.components().count() + 1,
        ..Default::default()
    }
}

/// A dataset under `root/datasets/streets` with two annotated images and
/// one plain image.
///
/// Exporting categories [PERSON, PLATE] yields three annotations: the
/// bare person annotation has no spatial content, the car is not
/// exported and the deleted plate is gone.
pub fn source_store(root: &Path) -> MemoryStore {
    let dataset_dir = root.join("datasets/streets");
    let a = dataset_dir.join("day/a.png");
    let b = dataset_dir.join("b.png");
    let c = dataset_dir.join("c.png");
    write_png(&a, 40, 40);
    write_png(&b, 24, 24);
    write_png(&c, 16, 16);

    let mut store = MemoryStore::new();
    let mut dataset = Dataset::new(1u64, "streets", &dataset_dir);
    dataset.attach_categories(&[PERSON.into(), PLATE.into(), CAR.into()]);
    store.insert_dataset(dataset);

    store.insert_category(
        Category::new(PERSON, "person")
            .with_keypoints(vec!["nose".into(), "left_eye".into()], vec![[1, 2]]),
    );
    store.insert_category(Category::new(PLATE, "plate"));
    store.insert_category(Category::new(CAR, "car"));

    store.insert_image(Image::new(1u64, 1u64, &a, "a.png").with_size(40, 40).with_annotated(true));
    store.insert_image(Image::new(2u64, 1u64, &b, "b.png").with_size(24, 24).with_annotated(true));
    store.insert_image(Image::new(3u64, 1u64, &c, "c.png").with_size(16, 16));

    store.insert_annotation(
        Annotation::new(1u64, 1u64, PLATE)
            .with_segmentation(vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]])
            .with_bbox([0.0, 0.0, 10.0, 10.0], 100.0)
            .with_isbbox(true),
    );
    store.insert_annotation(
        Annotation::new(2u64, 1u64, PERSON)
            .with_segmentation(vec![vec![20.0, 20.0, 30.0, 20.0, 30.0, 30.0]])
            .with_bbox([20.0, 20.0, 10.0, 10.0], 50.0),
    );
    store.insert_annotation(
        Annotation::new(3u64, 2u64, PERSON).with_keypoints(vec![5.0, 5.0, 2.0, 6.0, 6.0, 0.0]),
    );
    store.insert_annotation(
        Annotation::new(4u64, 2u64, PERSON).with_bbox([1.0, 1.0, 2.0, 2.0], 4.0),
    );
    store.insert_annotation(
        Annotation::new(5u64, 1u64, CAR)
            .with_segmentation(vec![vec![1.0, 1.0, 5.0, 1.0, 5.0, 5.0]])
            .with_bbox([1.0, 1.0, 4.0, 4.0], 8.0),
    );
    let mut deleted = Annotation::new(6u64, 2u64, PLATE)
        .with_segmentation(vec![vec![0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]])
        .with_bbox([0.0, 0.0, 4.0, 4.0], 16.0)
        .with_isbbox(true);
    deleted.deleted = true;
    store.insert_annotation(deleted);

    store
}

/// An empty dataset (id 7) holding images with the same file names but
/// no annotations or categories.
pub fn target_store(root: &Path) -> MemoryStore {
    let dataset_dir = root.join("datasets/copy");
    let mut store = MemoryStore::new();
    store.insert_dataset(Dataset::new(7u64, "copy", &dataset_dir));
    for (id, name) in [(11u64, "a.png"), (12, "b.png"), (13, "c.png")] {
        store.insert_image(Image::new(id, 7u64, dataset_dir.join(name), name));
    }
    store
}

/// Unpacks a gzip tarball into `dest` and returns `dest`.
pub fn unpack(archive_path: &Path, dest: &Path) -> PathBuf {
    let file = File::open(archive_path).expect("open archive");
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .expect("unpack archive");
    dest.to_path_buf()
}
