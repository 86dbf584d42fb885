use crate::error::ScanError;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageReader, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::edges::canny;
use imageproc::filter::{box_filter, gaussian_blur_f32, median_filter};
use std::io::Cursor;
use tracing::debug;

/// Decode image bytes, applying the EXIF orientation tag when asked.
/// Undecodable or zero-sized images are rejected.
pub fn decode_image(bytes: &[u8], apply_exif_orientation: bool) -> Result<DynamicImage, ScanError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    let mut decoder = reader.into_decoder()?;

    let orientation = if apply_exif_orientation {
        match decoder.orientation() {
            Ok(orientation) => Some(orientation),
            Err(e) => {
                debug!("EXIF orientation unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut img = DynamicImage::from_decoder(decoder)?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }

    if img.width() == 0 || img.height() == 0 {
        return Err(ScanError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }

    Ok(img)
}

/// Downscale images wider than `target_width`, keeping the aspect ratio.
/// Narrower images are returned untouched.
pub fn normalize_width(img: DynamicImage, target_width: u32) -> DynamicImage {
    if target_width == 0 || img.width() <= target_width {
        return img;
    }
    let ratio = target_width as f64 / img.width() as f64;
    let new_height = ((img.height() as f64 * ratio) as u32).max(1);
    img.resize_exact(target_width, new_height, FilterType::Lanczos3)
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Gaussian sigma matching a square kernel of `ksize` pixels
pub fn kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Global threshold at Otsu's level: pixels strictly above it become white
pub fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    threshold(img, level, ThresholdType::Binary)
}

/// Median blur with a square `ksize` window
pub fn median_blur(img: &GrayImage, ksize: u32) -> GrayImage {
    let radius = ksize / 2;
    median_filter(img, radius, radius)
}

/// How the local threshold is computed in [`adaptive_threshold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMethod {
    /// Plain mean of the block
    Mean,
    /// Gaussian-weighted mean of the block
    Gaussian,
}

/// Binarize against a per-pixel threshold: the local mean of a
/// `block_size` neighbourhood minus `c`.
pub fn adaptive_threshold(img: &GrayImage, method: AdaptiveMethod, block_size: u32, c: i16) -> GrayImage {
    let local = match method {
        AdaptiveMethod::Mean => box_filter(img, block_size / 2, block_size / 2),
        AdaptiveMethod::Gaussian => gaussian_blur_f32(img, kernel_sigma(block_size)),
    };

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let value = i16::from(img.get_pixel(x, y)[0]);
        let threshold = i16::from(local.get_pixel(x, y)[0]) - c;
        if value > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Gradient magnitude (Sobel), rescaled so the strongest edge is 255
pub fn sobel_magnitude(img: &GrayImage) -> GrayImage {
    let gradients = imageproc::gradients::sobel_gradients(img);
    let max = gradients.pixels().map(|p| p[0]).max().unwrap_or(0);
    if max == 0 {
        return GrayImage::new(img.width(), img.height());
    }

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let magnitude = u32::from(gradients.get_pixel(x, y)[0]);
        Luma([(magnitude * 255 / u32::from(max)) as u8])
    })
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid` x `grid` set of tiles, each tile gets its
/// own clipped equalization table, and pixels blend the tables of the four
/// nearest tile centres.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];

    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            let area = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            // Clip and spread the excess evenly over all bins
            let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            let residual = excess % 256;
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += bonus + u32::from((i as u32) < residual);
            }

            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let mut cdf = 0u32;
            for (value, &count) in hist.iter().enumerate() {
                cdf += count;
                lut[value] = (cdf as f32 * 255.0 / area as f32).round().min(255.0) as u8;
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, ax) = tile_neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = tile_neighbours(y, tile_h, tiles_y);
        let mapped = |tx: u32, ty: u32| f32::from(luts[(ty * tiles_x + tx) as usize][value]);

        let top = mapped(tx0, ty0) * (1.0 - ax) + mapped(tx1, ty0) * ax;
        let bottom = mapped(tx0, ty1) * (1.0 - ax) + mapped(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

// The two tiles whose centres bracket `pos`, and the blend weight of the second
fn tile_neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let base = f.floor();
    let last = i64::from(tiles) - 1;
    let first = (base as i64).clamp(0, last) as u32;
    let second = (base as i64 + 1).clamp(0, last) as u32;
    (first, second, f - base)
}

/// Non-local means denoising.
///
/// Each pixel becomes a weighted average of the pixels in a 7x7 search
/// window, weighted by how similar their 3x3 neighbourhoods are. `h`
/// controls how quickly the weight falls off with patch distance.
pub fn denoise(img: &GrayImage, h: f32) -> GrayImage {
    const PATCH_RADIUS: i64 = 1;
    const SEARCH_RADIUS: i64 = 3;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || h <= 0.0 {
        return img.clone();
    }

    let (w, hgt) = (i64::from(width), i64::from(height));
    let n = (width * height) as usize;
    let pixel = |x: i64, y: i64| -> f32 { f32::from(img.get_pixel(x.clamp(0, w - 1) as u32, y.clamp(0, hgt - 1) as u32)[0]) };
    let patch_len = ((2 * PATCH_RADIUS + 1) * (2 * PATCH_RADIUS + 1)) as f32;
    let h2 = h * h;

    let mut weight_sum = vec![0f32; n];
    let mut value_sum = vec![0f32; n];
    let mut diff = vec![0f32; n];

    for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
        for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
            for y in 0..hgt {
                for x in 0..w {
                    let d = pixel(x, y) - pixel(x + dx, y + dy);
                    diff[(y * w + x) as usize] = d * d;
                }
            }

            for y in 0..hgt {
                for x in 0..w {
                    let mut distance = 0.0;
                    for py in -PATCH_RADIUS..=PATCH_RADIUS {
                        for px in -PATCH_RADIUS..=PATCH_RADIUS {
                            let xx = (x + px).clamp(0, w - 1);
                            let yy = (y + py).clamp(0, hgt - 1);
                            distance += diff[(yy * w + xx) as usize];
                        }
                    }
                    let weight = (-(distance / patch_len) / h2).exp();
                    let i = (y * w + x) as usize;
                    weight_sum[i] += weight;
                    value_sum[i] += weight * pixel(x + dx, y + dy);
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        // The zero offset always contributes weight 1, so the sum is never 0
        Luma([(value_sum[i] / weight_sum[i]).round().clamp(0.0, 255.0) as u8])
    })
}
