// ============================================================
// Layer 4 — Feature Encoding
// ============================================================
// Turns raw record content into fixed-width f32 vectors:
//   - fit_width:   pad with zeros or truncate to the model width
//   - hashed_bag_of_words: FNV-1a hashed word counts, L1 normalised
//   - image_pixels: grayscale, resized square, scaled to [0, 1]
//
// Reference: image crate documentation

use std::path::Path;

use image::imageops::FilterType;

use crate::domain::error::DataError;

/// Pad with zeros or truncate to exactly `width` values.
pub fn fit_width(mut values: Vec<f32>, width: usize) -> Vec<f32> {
    values.resize(width, 0.0);
    values
}

/// Word counts hashed into `width` buckets, normalised to sum to 1.
/// An empty text yields an all-zero vector.
pub fn hashed_bag_of_words(text: &str, width: usize) -> Vec<f32> {
    let mut buckets = vec![0.0f32; width];
    if width == 0 {
        return buckets;
    }

    let mut total = 0.0f32;
    for word in text.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() {
            continue;
        }
        buckets[(fnv1a(word.as_bytes()) % width as u64) as usize] += 1.0;
        total += 1.0;
    }

    if total > 0.0 {
        buckets.iter_mut().for_each(|b| *b /= total);
    }
    buckets
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME:  u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Decode an image, convert to grayscale, resize to `side × side`
/// and scale pixels into [0, 1], row-major.
pub fn image_pixels(path: &Path, side: usize) -> Result<Vec<f32>, DataError> {
    if !path.exists() {
        return Err(DataError::Missing(path.to_path_buf()));
    }
    let decoded = image::open(path).map_err(|e| DataError::Corrupt {
        path:    path.to_path_buf(),
        message: e.to_string(),
    })?;

    let side = side as u32;
    let gray = image::imageops::resize(&decoded.to_luma8(), side, side, FilterType::Triangle);
    Ok(gray.into_raw().into_iter().map(|p| f32::from(p) / 255.0).collect())
}
