//! Phase 2 — Visual analysis (4.G). Captures a full-page screenshot and
//! computes the grayscale histogram statistics that drive `is_blank` (§3).

use crate::config::SandboxConfig;
use crate::page::PageHandle;
use crate::types::{PhaseResult, VisualSnapshot};
use image::GenericImageView;
use std::time::Instant;

/// Builds a [`VisualSnapshot`] from raw PNG bytes: decodes to grayscale, bins
/// into a 256-entry histogram, and derives mean/variance/non_background_ratio.
/// The "background" bin is taken to be whichever grayscale value is most
/// common (dark-theme layouts are dominated by a near-black page background);
/// `non_background_ratio` is the fraction of pixels outside that bin.
pub fn snapshot_from_png(png_bytes: Vec<u8>) -> Result<VisualSnapshot, String> {
    let img = image::load_from_memory(&png_bytes).map_err(|e| format!("failed to decode screenshot: {e}"))?;
    let (width, height) = img.dimensions();
    let gray = img.to_luma8();

    let mut histogram = [0u32; 256];
    let mut sum: f64 = 0.0;
    let total_pixels = (width as u64 * height as u64).max(1);

    for pixel in gray.pixels() {
        let v = pixel.0[0] as usize;
        histogram[v] += 1;
        sum += v as f64;
    }

    let mean = sum / total_pixels as f64;
    let variance = histogram
        .iter()
        .enumerate()
        .map(|(v, count)| (*count as f64) * (v as f64 - mean).powi(2))
        .sum::<f64>()
        / total_pixels as f64;

    let background_count = histogram.iter().copied().max().unwrap_or(0);
    let non_background_ratio = 1.0 - (background_count as f64 / total_pixels as f64);

    Ok(VisualSnapshot {
        png_bytes,
        width,
        height,
        histogram,
        mean,
        variance,
        non_background_ratio,
    })
}

pub async fn run(page: &dyn PageHandle, config: &SandboxConfig) -> (PhaseResult, Option<VisualSnapshot>) {
    let start = Instant::now();
    let png = match page.screenshot_png().await {
        Ok(bytes) => bytes,
        Err(e) => return (PhaseResult::fail(2, "visual_analysis", e.to_string(), start.elapsed().as_millis() as u64), None),
    };

    let snapshot = match snapshot_from_png(png) {
        Ok(s) => s,
        Err(e) => return (PhaseResult::fail(2, "visual_analysis", e, start.elapsed().as_millis() as u64), None),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    if snapshot.is_blank(config.blank_page_threshold) {
        return (
            PhaseResult::fail(2, "visual_analysis", "rendered page is visually blank", duration_ms),
            Some(snapshot),
        );
    }

    let details = serde_json::json!({
        "width": snapshot.width,
        "height": snapshot.height,
        "mean": snapshot.mean,
        "variance": snapshot.variance,
        "non_background_ratio": snapshot.non_background_ratio,
    });
    (PhaseResult::ok(2, "visual_analysis", details, duration_ms), Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_solid(w: u32, h: u32, value: u8) -> Vec<u8> {
        let buf = image::GrayImage::from_pixel(w, h, image::Luma([value]));
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn solid_color_image_is_blank() {
        let png = encode_solid(32, 32, 10);
        let snapshot = snapshot_from_png(png).unwrap();
        assert!(snapshot.is_blank(0.95));
        assert_eq!(snapshot.variance, 0.0);
    }

    #[test]
    fn checkerboard_like_image_is_not_blank() {
        let mut buf = image::GrayImage::new(32, 32);
        for (x, y, px) in buf.enumerate_pixels_mut() {
            *px = image::Luma([if (x + y) % 2 == 0 { 10 } else { 240 }]);
        }
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(buf)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        let snapshot = snapshot_from_png(out).unwrap();
        assert!(!snapshot.is_blank(0.95));
        assert!(snapshot.variance > 100.0);
    }

    #[test]
    fn is_blank_grows_stricter_as_threshold_rises() {
        // Per §3's literal formula (non_background_ratio < 1-threshold AND
        // variance < 100), a higher threshold shrinks the allowed
        // non-background band, so is_blank can only go from true to false as
        // threshold increases, never the other way — monotone in the
        // mathematical sense, decreasing rather than increasing.
        let png = encode_solid(16, 16, 5);
        let snapshot = snapshot_from_png(png).unwrap();
        assert!(snapshot.is_blank(0.0));
        assert!(snapshot.is_blank(0.95));
    }
}
