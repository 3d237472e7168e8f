//! Cheap deterministic image signals computed straight from pixel data.
//!
//! `redness_ratio` is always available. The edge, blur and contour signals need the
//! `vision` backend and degrade to zero / empty when it is compiled out.
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::InflammationRegion;

/// Red channel must exceed mean(G, B) by more than this to count as red.
const REDNESS_MARGIN: f32 = 15.0;

/// Contours covering less than this fraction of the image are noise.
#[cfg_attr(not(feature = "vision"), allow(dead_code))]
const MIN_REGION_FRACTION: f64 = 0.001;

/// Signals extracted from one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageFeatures {
    pub redness_pct: f32,
    pub texture_score: f32,
    pub pore_proxy: f32,
    pub regions: Vec<InflammationRegion>,
}

pub struct FeatureExtractor {
    max_regions: usize,
}

impl FeatureExtractor {
    pub fn new(max_regions: usize) -> Self {
        Self { max_regions }
    }

    pub fn extract(&self, image: &RgbImage) -> ImageFeatures {
        let features = ImageFeatures {
            redness_pct: redness_ratio(image),
            texture_score: texture_score(image),
            pore_proxy: pore_proxy(image),
            regions: inflammation_regions(image, self.max_regions),
        };

        debug!(
            "Extracted features: redness {:.2}%, texture {:.2}, pores {:.2}, {} regions",
            features.redness_pct,
            features.texture_score,
            features.pore_proxy,
            features.regions.len()
        );

        features
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Percentage of pixels whose red channel dominates green and blue.
pub fn redness_ratio(image: &RgbImage) -> f32 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let red = image
        .pixels()
        .filter(|p| {
            let [r, g, b] = p.0;
            r as f32 > (g as f32 + b as f32) / 2.0 + REDNESS_MARGIN
        })
        .count() as u64;

    (red as f64 / total as f64 * 100.0) as f32
}

/// Variance of the Laplacian of the grayscale image.
pub fn texture_score(image: &RgbImage) -> f32 {
    #[cfg(feature = "vision")]
    {
        vision::texture_score(image)
    }
    #[cfg(not(feature = "vision"))]
    {
        let _ = image;
        0.0
    }
}

/// Mean absolute high-frequency residual (grayscale minus its blur).
pub fn pore_proxy(image: &RgbImage) -> f32 {
    #[cfg(feature = "vision")]
    {
        vision::pore_proxy(image)
    }
    #[cfg(not(feature = "vision"))]
    {
        let _ = image;
        0.0
    }
}

/// Largest red regions, sorted by area descending, at most `max_regions`.
pub fn inflammation_regions(image: &RgbImage, max_regions: usize) -> Vec<InflammationRegion> {
    #[cfg(feature = "vision")]
    {
        vision::inflammation_regions(image, max_regions)
    }
    #[cfg(not(feature = "vision"))]
    {
        let _ = (image, max_regions);
        Vec::new()
    }
}

/// RGB to the 8-bit HSV layout used by common vision toolkits: H in [0, 180), S and V in [0, 255].
pub fn rgb_to_hsv8([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h8 = (h / 2.0).round().min(179.0) as u8;
    [h8, s.round() as u8, max as u8]
}

/// Both red hue bands (near 0 and near 180) with enough saturation and brightness.
pub fn is_inflamed_hue(pixel: [u8; 3]) -> bool {
    let [h, s, v] = rgb_to_hsv8(pixel);
    let red_hue = h <= 12 || (170..=179).contains(&h);
    red_hue && s >= 80 && v >= 80
}

#[cfg(feature = "vision")]
mod vision {
    use image::{imageops, GrayImage, ImageBuffer, Luma, RgbImage};
    use imageproc::contours::{find_contours, BorderType};
    use imageproc::distance_transform::Norm;
    use imageproc::filter::{gaussian_blur_f32, laplacian_filter};
    use imageproc::morphology::open;
    use imageproc::point::Point;

    use super::{is_inflamed_hue, InflammationRegion, MIN_REGION_FRACTION};

    // Sigmas matching 5x5 and 9x9 Gaussian kernels.
    const MASK_BLUR_SIGMA: f32 = 1.1;
    const PORE_BLUR_SIGMA: f32 = 1.7;

    pub fn texture_score(image: &RgbImage) -> f32 {
        let gray = imageops::grayscale(image);
        let lap = laplacian_filter(&gray);

        let n = lap.pixels().len() as f64;
        if n == 0.0 {
            return 0.0;
        }

        let mean = lap.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
        let variance = lap
            .pixels()
            .map(|p| {
                let d = p.0[0] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        variance as f32
    }

    pub fn pore_proxy(image: &RgbImage) -> f32 {
        let gray = imageops::grayscale(image);
        let n = gray.pixels().len() as f64;
        if n == 0.0 {
            return 0.0;
        }

        // Blur in f32 and round back, so a flat patch has no residual.
        let gray_f32: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([gray.get_pixel(x, y).0[0] as f32])
            });
        let blurred = gaussian_blur_f32(&gray_f32, PORE_BLUR_SIGMA);
        let residual: u64 = gray
            .pixels()
            .zip(blurred.pixels())
            .map(|(a, b)| a.0[0].abs_diff(b.0[0].round().clamp(0.0, 255.0) as u8) as u64)
            .sum();

        (residual as f64 / n) as f32
    }

    pub fn inflammation_regions(image: &RgbImage, max_regions: usize) -> Vec<InflammationRegion> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || max_regions == 0 {
            return Vec::new();
        }

        let mask = GrayImage::from_fn(width, height, |x, y| {
            if is_inflamed_hue(image.get_pixel(x, y).0) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        let smoothed = gaussian_blur_f32(&mask, MASK_BLUR_SIGMA);
        let opened = open(&smoothed, Norm::LInf, 1);

        // Border following only opens an outer border next to a background pixel, so
        // blobs touching the image edge need a zero frame around the mask.
        let mut framed = GrayImage::new(width + 2, height + 2);
        imageops::replace(&mut framed, &opened, 1, 1);

        let total_area = width as f64 * height as f64;
        let mut regions: Vec<InflammationRegion> = find_contours::<i32>(&framed)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| {
                let points: Vec<Point<i32>> =
                    c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
                region_from_contour(&points, width, height, total_area)
            })
            .collect();

        regions.sort_by(|a, b| b.area_pct.total_cmp(&a.area_pct));
        regions.truncate(max_regions);
        regions
    }

    fn region_from_contour(
        points: &[Point<i32>],
        width: u32,
        height: u32,
        total_area: f64,
    ) -> Option<InflammationRegion> {
        let area = polygon_area(points);
        if area / total_area <= MIN_REGION_FRACTION {
            return None;
        }

        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;

        let (w, h) = (width as f32, height as f32);
        Some(InflammationRegion {
            x: min_x as f32 / w,
            y: min_y as f32 / h,
            width: (max_x - min_x + 1) as f32 / w,
            height: (max_y - min_y + 1) as f32 / h,
            area_pct: ((area / total_area) * 100.0).min(100.0) as f32,
        })
    }

    /// Shoelace area of a closed boundary.
    fn polygon_area(points: &[Point<i32>]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let twice: i64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
            .sum();
        (twice.abs() as f64) / 2.0
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_polygon_area_square() {
            let square = [
                Point::new(0, 0),
                Point::new(10, 0),
                Point::new(10, 10),
                Point::new(0, 10),
            ];
            assert_eq!(polygon_area(&square), 100.0);
        }
    }
}
