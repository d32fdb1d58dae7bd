use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, Ix4};
use thiserror::Error;

pub const IMG_SIZE: u32 = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Error reading image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decodes the uploaded bytes and resizes them to a fixed `IMG_SIZE` square,
/// ignoring the source aspect ratio.
fn decode_and_resize(image_data: &[u8]) -> Result<RgbImage, PreprocessError> {
    let image_reader =
        image::ImageReader::new(std::io::Cursor::new(image_data)).with_guessed_format()?;
    let original_img = image_reader.decode()?.to_rgb8();

    Ok(image::imageops::resize(
        &original_img,
        IMG_SIZE,
        IMG_SIZE,
        FilterType::CatmullRom,
    ))
}

/// Channel-last `[1, 224, 224, 3]` tensor scaled to [0, 1], as the ensemble
/// CNNs expect.
pub fn preprocess_for_ensemble(image_data: &[u8]) -> Result<Array<f32, Ix4>, PreprocessError> {
    let img = decode_and_resize(image_data)?;

    let size = IMG_SIZE as usize;
    let mut input = Array::zeros((1, size, size, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            input[[0, y, x, c]] = (*value as f32) / 255.;
        }
    }

    Ok(input)
}

/// Channel-first `[1, 3, 224, 224]` tensor standardized with the ImageNet
/// statistics the transfer backbone was trained on.
pub fn preprocess_for_transfer(image_data: &[u8]) -> Result<Array<f32, Ix4>, PreprocessError> {
    let img = decode_and_resize(image_data)?;

    let size = IMG_SIZE as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            input[[0, c, y, x]] = ((*value as f32) / 255. - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok(input)
}
