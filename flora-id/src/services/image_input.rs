//! Submitted image decoding and classifier preprocessing
//!
//! Request side: strip an optional data-URL header, base64-decode, decode the
//! image. Any failure here is a client error.
//!
//! Classifier side: center square crop, resize to 256×256, center-crop
//! 224×224, ImageNet normalization, CHW layout. Cropping to a square first
//! keeps the resize bounded for any aspect ratio.
//!
//! Line-wrapped (MIME style) base64 is accepted: ASCII whitespace is dropped
//! before decoding.

use base64::Engine as _;
use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;

use super::inference::InferenceError;

/// Edge length after the resize
pub const RESIZE_EDGE: u32 = 256;

/// Classifier input edge length
pub const CROP_SIZE: u32 = 224;

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Image input errors (reported to the caller as 400)
#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A decoded request image
///
/// Keeps the base64 text (header stripped) for the remote provider.
#[derive(Debug, Clone)]
pub struct SubmittedImage {
    base64: String,
    image: DynamicImage,
}

impl SubmittedImage {
    /// Decode a request payload
    ///
    /// `data:image/png;base64,AAAA` and bare `AAAA` are both accepted; the
    /// header is everything up to the first comma.
    pub fn decode(payload: &str) -> Result<Self, ImageInputError> {
        let data = match payload.split_once(',') {
            Some((_header, data)) => data,
            None => payload,
        };
        let encoded: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

        if encoded.is_empty() {
            return Err(ImageInputError::Empty);
        }

        let bytes = base64::engine::general_purpose::STANDARD.decode(&encoded)?;
        let image = image::load_from_memory(&bytes)?;

        Ok(Self {
            base64: encoded,
            image,
        })
    }

    /// Base64 text without the data-URL header
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Preprocessed classifier input, shape `[1, 3, CROP_SIZE, CROP_SIZE]`
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn shape(&self) -> [usize; 4] {
        [1, 3, CROP_SIZE as usize, CROP_SIZE as usize]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Fixed classifier transform: center square → resize(256) → center-crop(224) → normalize
///
/// Same region as resizing the shortest side to 256 and center-cropping, but
/// the square crop comes first so the resize target is always 256×256 no
/// matter the aspect ratio.
pub fn preprocess(image: &DynamicImage) -> Result<ImageTensor, InferenceError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(InferenceError::Failed(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    let square = center_crop(image, width.min(height));
    let resized = square.resize_exact(RESIZE_EDGE, RESIZE_EDGE, FilterType::Triangle);
    let cropped = center_crop(&resized, CROP_SIZE);
    Ok(ImageTensor {
        data: normalize_chw(&cropped),
    })
}

fn center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let x = image.width().saturating_sub(size) / 2;
    let y = image.height().saturating_sub(size) / 2;
    image.crop_imm(x, y, size, size)
}

/// Flatten to CHW: all R values, then all G values, then all B values
fn normalize_chw(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let num_pixels = (rgb.width() * rgb.height()) as usize;
    let mut normalized = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            normalized[channel * num_pixels + i] =
                (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel];
        }
    }

    normalized
}
