use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;

use crate::error::DocsGenError;

use super::request::is_gif;

/// Largest RMS pixel difference still treated as "unchanged".
pub const MAX_RMS: f64 = 2.0;

/// Whether `candidate` may be dropped in favour of the already committed `existing`.
///
/// Animations, GIF or animated PNG, must match byte for byte. Everything
/// else is decoded and compared by RMS pixel difference; differing
/// dimensions or channel layouts never match.
pub fn artifacts_match(existing: &Path, candidate: &Path, max_rms: f64) -> Result<bool, DocsGenError> {
    let animated = |p: &Path| is_gif(p) || is_animated_png(p);
    if animated(existing) && animated(candidate) {
        return Ok(std::fs::read(existing)? == std::fs::read(candidate)?);
    }
    let (Ok(a), Ok(b)) = (image::open(existing), image::open(candidate)) else {
        log::debug!(
            "Could not decode {} or {}, treating as changed",
            existing.display(),
            candidate.display()
        );
        return Ok(false);
    };
    Ok(rms_difference(&a, &b).is_some_and(|rms| rms <= max_rms))
}

/// Whether `path` is a PNG carrying an animation control chunk.
pub fn is_animated_png(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    png::Decoder::new(BufReader::new(file))
        .read_info()
        .is_ok_and(|reader| reader.info().animation_control.is_some())
}

/// Root of the summed squared channel differences per pixel, or `None` when
/// the images are not comparable.
pub fn rms_difference(a: &DynamicImage, b: &DynamicImage) -> Option<f64> {
    if a.width() != b.width() || a.height() != b.height() || a.color() != b.color() {
        return None;
    }
    let pixels = a.width() as f64 * a.height() as f64;
    if pixels == 0.0 {
        return Some(0.0);
    }
    let sum_squares: f64 = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(x, y)| {
            let d = x.abs_diff(*y) as f64;
            d * d
        })
        .sum();
    Some((sum_squares / pixels).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn identical_images_match() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        assert_eq!(rms_difference(&img, &img.clone()), Some(0.0));
    }

    #[test]
    fn one_slightly_different_pixel_is_within_tolerance() {
        let a = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let mut b = a.clone();
        b.put_pixel(0, 0, Rgb([110, 100, 100]));

        let rms = rms_difference(&DynamicImage::ImageRgb8(a), &DynamicImage::ImageRgb8(b)).unwrap();

        assert!((rms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn large_difference_exceeds_tolerance() {
        let a = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([0])));
        let b = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([50])));
        assert!(rms_difference(&a, &b).unwrap() > MAX_RMS);
    }

    #[test]
    fn size_or_layout_mismatch_never_matches() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let bigger = DynamicImage::ImageRgb8(RgbImage::new(5, 4));
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));

        assert_eq!(rms_difference(&rgb, &bigger), None);
        assert_eq!(rms_difference(&rgb, &gray), None);
    }

    #[test]
    fn png_files_compare_by_pixels() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::from_pixel(6, 6, Rgb([1, 2, 3])).save(&a).unwrap();
        RgbImage::from_pixel(6, 6, Rgb([1, 2, 3])).save(&b).unwrap();

        assert!(artifacts_match(&a, &b, MAX_RMS).unwrap());
    }

    #[test]
    fn gif_files_compare_by_bytes() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.gif");
        let b = dir.path().join("b.gif");
        std::fs::write(&a, b"GIF89a-one").unwrap();
        std::fs::write(&b, b"GIF89a-two").unwrap();

        assert!(!artifacts_match(&a, &b, MAX_RMS).unwrap());
        std::fs::write(&b, b"GIF89a-one").unwrap();
        assert!(artifacts_match(&a, &b, MAX_RMS).unwrap());
    }

    #[test]
    fn animated_pngs_compare_by_bytes() {
        let dir = TempDir::new().unwrap();
        let frames: Vec<_> = [10u8, 200]
            .iter()
            .map(|v| {
                let path = dir.path().join(format!("frame{v}.png"));
                RgbImage::from_pixel(6, 6, Rgb([*v, *v, *v])).save(&path).unwrap();
                path
            })
            .collect();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        crate::build::assemble_apng(&frames, &a, 100).unwrap();
        crate::build::assemble_apng(&frames, &b, 250).unwrap();

        assert!(is_animated_png(&a));
        assert!(!is_animated_png(&frames[0]));
        // Same first frame, different timing.
        assert!(!artifacts_match(&a, &b, MAX_RMS).unwrap());
        std::fs::copy(&a, &b).unwrap();
        assert!(artifacts_match(&a, &b, MAX_RMS).unwrap());
    }

    #[test]
    fn undecodable_existing_file_counts_as_changed() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"not an image").unwrap();
        RgbImage::new(2, 2).save(&b).unwrap();

        assert!(!artifacts_match(&a, &b, MAX_RMS).unwrap());
    }
}
