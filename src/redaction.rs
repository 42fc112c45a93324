//! Privacy redaction: blurring rectangular regions of an image.
//!
//! Each mask annotation contributes one axis-aligned rectangle taken from
//! its first polygon. Coordinates 0,1 are one corner and coordinates 4,5 the
//! opposite corner, which is how a bbox annotation stores its four-point
//! outline. Any other polygon shape yields the rectangle spanned by those
//! two points, not the polygon itself.

use std::path::Path;

use image::{GrayImage, Luma, RgbImage};

use crate::error::LabelportError;
use crate::model::Annotation;

/// Gaussian sigma used when no other value is configured.
pub const DEFAULT_BLUR_SIGMA: f32 = 10.0;

const MASK_OPAQUE: u8 = 255;

/// An inclusive pixel rectangle inside an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl MaskRect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

/// Loads an image, converts it to RGB and blurs the regions named by `masks`.
///
/// The file on disk is not modified.
///
/// # Errors
/// Returns an error if the image cannot be opened or decoded.
pub fn blur(image_path: &Path, masks: &[Annotation], sigma: f32) -> Result<RgbImage, LabelportError> {
    let source = load_rgb(image_path)?;
    Ok(blur_image(&source, masks, sigma))
}

/// Loads an image and normalizes it to 8-bit RGB.
pub fn load_rgb(image_path: &Path) -> Result<RgbImage, LabelportError> {
    image::open(image_path)
        .map(|decoded| decoded.to_rgb8())
        .map_err(|source| LabelportError::ImageRead {
            path: image_path.to_path_buf(),
            source,
        })
}

/// Returns a copy of `source` with the mask regions replaced by blurred pixels.
///
/// Pixels outside every mask rectangle are copied unchanged.
pub fn blur_image(source: &RgbImage, masks: &[Annotation], sigma: f32) -> RgbImage {
    let (width, height) = source.dimensions();
    let mask = build_mask(masks, width, height);

    if !mask.pixels().any(|p| p[0] == MASK_OPAQUE) {
        return source.clone();
    }

    let blurred = image::imageops::blur(source, sigma);
    let mut output = source.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == MASK_OPAQUE {
            *pixel = *blurred.get_pixel(x, y);
        }
    }
    output
}

/// Builds the single-channel mask for `masks`: opaque inside any rectangle,
/// transparent elsewhere.
pub fn build_mask(masks: &[Annotation], width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    for annotation in masks {
        let Some(polygon) = annotation.first_polygon() else {
            continue;
        };
        let Some(rect) = mask_rect(polygon, width, height) else {
            tracing::warn!(
                annotation_id = %annotation.id,
                "mask polygon does not describe a rectangle inside the image, skipping"
            );
            continue;
        };

        for y in rect.y0..=rect.y1 {
            for x in rect.x0..=rect.x1 {
                mask.put_pixel(x, y, Luma([MASK_OPAQUE]));
            }
        }
    }

    mask
}

/// Derives the mask rectangle for one polygon, clipped to the image.
///
/// Returns `None` for polygons with fewer than three points, non-finite
/// coordinates, or rectangles lying entirely outside the image.
pub fn mask_rect(polygon: &[f64], width: u32, height: u32) -> Option<MaskRect> {
    if polygon.len() < 6 || width == 0 || height == 0 {
        return None;
    }

    let (ax, ay, bx, by) = (polygon[0], polygon[1], polygon[4], polygon[5]);
    if ![ax, ay, bx, by].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (left, right) = (ax.min(bx).round(), ax.max(bx).round());
    let (top, bottom) = (ay.min(by).round(), ay.max(by).round());

    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    if right < 0.0 || bottom < 0.0 || left > max_x || top > max_y {
        return None;
    }

    Some(MaskRect {
        x0: left.max(0.0) as u32,
        y0: top.max(0.0) as u32,
        x1: right.min(max_x) as u32,
        y1: bottom.min(max_y) as u32,
    })
}
