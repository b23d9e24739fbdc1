//! Shared cover-image decoding, downscaling, and cache-file helpers.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

const PIPELINE_VERSION: &str = "osd-img-v1";
pub const DEFAULT_NOTIFICATION_IMAGE_MAX_EDGE_PX: u32 = 256;

fn osd_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|path| path.join("roqtune-osd"))
}

pub fn notification_images_dir() -> Option<PathBuf> {
    osd_cache_root().map(|path| path.join("notification"))
}

fn ensure_parent_dir(path: &Path) -> Option<()> {
    let parent = path.parent()?;
    if !parent.exists() {
        fs::create_dir_all(parent).ok()?;
    }
    Some(())
}

pub fn hash_string(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

fn save_png_atomic(image: &DynamicImage, temp_path: &Path, target_path: &Path) -> Option<()> {
    if temp_path.exists() {
        let _ = fs::remove_file(temp_path);
    }
    image.save_with_format(temp_path, ImageFormat::Png).ok()?;
    fs::rename(temp_path, target_path).ok()?;
    Some(())
}

/// Writes `image` as a PNG in `dir` and returns its path.
/// Notification daemons take images by path, not by pixels.
pub fn write_notification_image(
    dir: &Path,
    slot_key: &str,
    image: &DynamicImage,
) -> Option<PathBuf> {
    let stem = hash_string(&format!("{PIPELINE_VERSION}|notification|{slot_key}"));
    let target_path = dir.join(format!("{stem}.png"));
    ensure_parent_dir(&target_path)?;
    let temp_path = target_path.with_extension("png.tmp");
    save_png_atomic(image, &temp_path, &target_path)?;
    Some(target_path)
}

fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xff && bytes[1] == 0xd8
}

fn decode_jpeg_non_strict(bytes: &[u8]) -> Option<DynamicImage> {
    if !looks_like_jpeg(bytes) {
        return None;
    }

    let options = DecoderOptions::new_cmd()
        .set_strict_mode(false)
        .jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);
    let pixels = decoder.decode().ok()?;
    let (width, height) = decoder.dimensions()?;
    let image = image::RgbaImage::from_raw(width as u32, height as u32, pixels)?;
    Some(DynamicImage::ImageRgba8(image))
}

pub fn decode_image_from_memory_with_fallback(bytes: &[u8]) -> Option<DynamicImage> {
    // Embedded tag art is frequently truncated or padded; only fall back
    // to the lenient JPEG decoder when the primary path fails.
    image::load_from_memory(bytes)
        .ok()
        .or_else(|| decode_jpeg_non_strict(bytes))
}

pub fn decode_image_from_path_with_fallback(path: &Path) -> Option<DynamicImage> {
    image::open(path).ok().or_else(|| {
        let bytes = fs::read(path).ok()?;
        decode_image_from_memory_with_fallback(&bytes)
    })
}

fn fit_to_max_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }
    let clamped = max_edge.max(1);
    if width.max(height) <= clamped {
        return (width, height);
    }
    if width >= height {
        let scaled_height =
            ((u64::from(height) * u64::from(clamped)) + (u64::from(width) / 2)) / u64::from(width);
        (clamped, scaled_height.max(1) as u32)
    } else {
        let scaled_width =
            ((u64::from(width) * u64::from(clamped)) + (u64::from(height) / 2)) / u64::from(height);
        (scaled_width.max(1) as u32, clamped)
    }
}

/// Shrinks `image` so its long edge is at most `max_edge_px`.
pub fn downscale_to_max_edge(image: DynamicImage, max_edge_px: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = fit_to_max_edge(width, height, max_edge_px);
    if (target_width, target_height) == (width, height) {
        return image;
    }
    image.resize_exact(target_width, target_height, FilterType::CatmullRom)
}

/// Stand-in cover for songs without art: a grey record on a dark tile.
pub fn placeholder_cover_image(edge_px: u32) -> DynamicImage {
    const BACKGROUND: Rgba<u8> = Rgba([38, 38, 42, 255]);
    const GROOVES: Rgba<u8> = Rgba([72, 72, 78, 255]);
    const LABEL: Rgba<u8> = Rgba([182, 182, 190, 255]);

    let edge = edge_px.max(1);
    let size = edge as f32;
    let center = (size - 1.0) / 2.0;
    let image = RgbaImage::from_fn(edge, edge, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance <= size * 0.03 {
            BACKGROUND
        } else if distance <= size * 0.14 {
            LABEL
        } else if distance <= size * 0.42 {
            GROOVES
        } else {
            BACKGROUND
        }
    });
    DynamicImage::ImageRgba8(image)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_image_from_memory_with_fallback, downscale_to_max_edge, fit_to_max_edge,
        hash_string, placeholder_cover_image, write_notification_image,
    };
    use image::{
        codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb,
        RgbImage, Rgba,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_hash_string_is_deterministic() {
        assert_eq!(hash_string("abc"), hash_string("abc"));
        assert_ne!(hash_string("abc"), hash_string("abcd"));
    }

    #[test]
    fn test_fit_to_max_edge_preserves_aspect_ratio() {
        assert_eq!(fit_to_max_edge(2000, 1000, 320), (320, 160));
        assert_eq!(fit_to_max_edge(1000, 2000, 320), (160, 320));
        assert_eq!(fit_to_max_edge(128, 64, 320), (128, 64));
    }

    #[test]
    fn test_downscale_to_max_edge_only_shrinks() {
        let large = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(600, 300, Rgba([1, 2, 3, 255])));
        assert_eq!(downscale_to_max_edge(large, 256).dimensions(), (256, 128));

        let small = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(40, 20, Rgba([1, 2, 3, 255])));
        assert_eq!(downscale_to_max_edge(small, 256).dimensions(), (40, 20));
    }

    #[test]
    fn test_placeholder_cover_image_draws_record_on_tile() {
        let placeholder = placeholder_cover_image(64);
        assert_eq!(placeholder.dimensions(), (64, 64));

        let corner = placeholder.get_pixel(0, 0);
        let label = placeholder.get_pixel(32, 36);
        let grooves = placeholder.get_pixel(32, 50);
        assert_ne!(corner, label);
        assert_ne!(label, grooves);
        assert_ne!(corner, grooves);

        assert_eq!(placeholder_cover_image(0).dimensions(), (1, 1));
    }

    #[test]
    fn test_decode_image_from_memory_with_fallback_decodes_jpeg_bytes() {
        let rgb = RgbImage::from_pixel(12, 9, Rgb([90, 140, 210]));
        let mut encoded = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, 85);
            encoder
                .encode_image(&DynamicImage::ImageRgb8(rgb))
                .expect("jpeg encoding should succeed");
        }
        // Trailing garbage as seen in badly tagged files.
        encoded.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let decoded = decode_image_from_memory_with_fallback(&encoded)
            .expect("fallback decoder should decode jpeg bytes");
        assert_eq!(decoded.dimensions(), (12, 9));
    }

    #[test]
    fn test_decode_image_from_memory_with_fallback_rejects_non_image_bytes() {
        let decoded = decode_image_from_memory_with_fallback(b"definitely-not-an-image");
        assert!(decoded.is_none());
    }

    #[test]
    fn test_write_notification_image_round_trips_dimensions() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("roqtune_osd_notification_{nonce}"));
        let source =
            DynamicImage::ImageRgba8(ImageBuffer::from_pixel(7, 5, Rgba([8, 16, 24, 255])));

        let path = write_notification_image(&dir, "slot-a", &source)
            .expect("notification image should be written");
        let bytes = std::fs::read(&path).expect("written image should be readable");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .expect("written image should be a png");
        assert_eq!(decoded.dimensions(), (7, 5));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
