//! 画像の知覚ハッシュ計算
//!
//! 1. グレースケール化
//! 2. 一定サイズ（既定100x100）に Lanczos3 で縮小（解像度・チャンネル差の正規化）
//! 3. pHash: 32x32 に縮小 → 2次元DCT → 左上8x8の低周波成分 → 中央値より大きいビットを1

use image::error::{LimitError, LimitErrorKind};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageError, ImageResult};
use order_enricher_common::PerceptualHash;

const DCT_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

/// 既定の正規化サイズ
pub const DEFAULT_IMAGE_SIZE: u32 = 100;

/// バイト列をデコードしてハッシュを計算。幅か高さが0の画像はデコード失敗扱い
pub fn hash_bytes(bytes: &[u8], size: u32) -> ImageResult<PerceptualHash> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)));
    }
    Ok(hash_image(&img, size))
}

/// デコード済み画像のハッシュを計算
pub fn hash_image(img: &DynamicImage, size: u32) -> PerceptualHash {
    let normalized = preprocess(img, size);
    phash(&normalized)
}

/// グレースケール化 + 正方形へのリサイズ
pub fn preprocess(img: &DynamicImage, size: u32) -> GrayImage {
    let gray = img.to_luma8();
    imageops::resize(&gray, size, size, FilterType::Lanczos3)
}

fn phash(gray: &GrayImage) -> PerceptualHash {
    let small = imageops::resize(gray, DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Lanczos3);

    let mut pixels = [[0.0_f64; DCT_SIZE]; DCT_SIZE];
    for (x, y, p) in small.enumerate_pixels() {
        pixels[y as usize][x as usize] = f64::from(p.0[0]);
    }

    let cos = cos_table();

    // 行方向DCT（低周波8成分のみ）
    let mut rows = [[0.0_f64; HASH_SIZE]; DCT_SIZE];
    for (y, row) in pixels.iter().enumerate() {
        for k in 0..HASH_SIZE {
            rows[y][k] = row.iter().zip(cos[k].iter()).map(|(p, c)| p * c).sum();
        }
    }

    // 列方向DCT
    let mut low = [0.0_f64; HASH_SIZE * HASH_SIZE];
    for k in 0..HASH_SIZE {
        for x in 0..HASH_SIZE {
            low[k * HASH_SIZE + x] = (0..DCT_SIZE).map(|y| rows[y][x] * cos[k][y]).sum();
        }
    }

    let median = median(&low);
    PerceptualHash::from_bools(low.iter().map(|&v| v > median))
}

/// cos(π k (2n + 1) / 2N)
fn cos_table() -> [[f64; DCT_SIZE]; HASH_SIZE] {
    let mut table = [[0.0_f64; DCT_SIZE]; HASH_SIZE];
    for (k, row) in table.iter_mut().enumerate() {
        for (n, v) in row.iter_mut().enumerate() {
            *v = (std::f64::consts::PI * k as f64 * (2 * n + 1) as f64 / (2 * DCT_SIZE) as f64).cos();
        }
    }
    table
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}


#[cfg(test)]
mod tests {
    use super::test_images::{encode, pattern, png};
    use super::*;
    use image::ImageFormat;

    #[test]
    fn test_identical_bytes_hash_identically() {
        let bytes = png(64, 64, 3);
        let a = hash_bytes(&bytes, DEFAULT_IMAGE_SIZE).unwrap();
        let b = hash_bytes(&bytes.clone(), DEFAULT_IMAGE_SIZE).unwrap();
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_different_images_hash_apart() {
        let a = hash_image(&pattern(128, 128, 1), DEFAULT_IMAGE_SIZE);
        let b = hash_image(&pattern(128, 128, 4), DEFAULT_IMAGE_SIZE);
        assert!(a.distance(&b) > 0);
    }

    #[test]
    fn test_format_does_not_matter_for_lossless() {
        let img = pattern(64, 64, 5);
        let from_png = hash_bytes(&encode(&img, ImageFormat::Png), DEFAULT_IMAGE_SIZE).unwrap();
        let from_bmp = hash_bytes(&encode(&img, ImageFormat::Bmp), DEFAULT_IMAGE_SIZE).unwrap();
        assert_eq!(from_png, from_bmp);
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        assert!(hash_bytes(b"definitely not an image", DEFAULT_IMAGE_SIZE).is_err());
    }

    #[test]
    fn test_zero_sized_image_fails_to_decode() {
        for bytes in [&b"P5 0 0 255\n"[..], &b"P5 0 5 255\n"[..], &b"P5 5 0 255\n"[..]] {
            assert!(hash_bytes(bytes, DEFAULT_IMAGE_SIZE).is_err());
        }
    }

    #[test]
    fn test_preprocess_is_square_gray() {
        let gray = preprocess(&pattern(40, 20, 1), 100);
        assert_eq!(gray.dimensions(), (100, 100));
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[1.0, 4.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
    }
}
