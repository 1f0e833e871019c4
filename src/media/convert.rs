use crate::url::random_filename;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default width SVG images are rasterized to
pub const DEFAULT_SVG_WIDTH: u32 = 1920;

/// Default height SVG images are rasterized to
pub const DEFAULT_SVG_HEIGHT: u32 = 1080;

/// Re-encodes an image file as JPEG next to the original
///
/// HEIC files (detected by extension, case-insensitive) go through the HEIC
/// decoder; everything else goes through the generic decoder. The output is
/// written to the same base name with a `.jpeg` extension, or to a random
/// name in the same directory if that file already exists.
///
/// Returns the path actually written, or None if decoding or encoding
/// failed. Existing files are never overwritten or removed.
pub fn convert_to_raster(path: &Path) -> Option<PathBuf> {
    let decoded = if is_heic(path) {
        decode_heic(path)
    } else {
        decode_generic(path)
    };

    let Some(image) = decoded else {
        tracing::debug!("Could not decode {} for JPEG conversion", path.display());
        return None;
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    write_new(&path.with_extension("jpeg"), &rgb, ImageFormat::Jpeg)
}

/// Rasterizes an SVG file to a PNG of exactly `width` x `height` pixels
///
/// The drawing is stretched to fill the target size. `out_path` is the
/// preferred destination; if it already exists a random name in the same
/// directory is used instead. Returns the path actually written, or None on
/// any failure, in which case no new file is left behind.
pub fn convert_svg_to_raster(
    svg_path: &Path,
    out_path: &Path,
    width: u32,
    height: u32,
) -> Option<PathBuf> {
    let image = match rasterize_svg(svg_path, width, height) {
        Ok(image) => image,
        Err(reason) => {
            tracing::debug!("SVG conversion of {} failed: {}", svg_path.display(), reason);
            return None;
        }
    };

    write_new(out_path, &DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

fn rasterize_svg(svg_path: &Path, width: u32, height: u32) -> Result<RgbaImage, String> {
    let data = std::fs::read(svg_path).map_err(|e| e.to_string())?;

    let mut options = usvg::Options::default();
    options.resources_dir = svg_path.parent().map(Path::to_path_buf);

    let tree = usvg::Tree::from_data(&data, &options).map_err(|e| e.to_string())?;

    let size = tree.size();
    if size.width() <= 0.0 || size.height() <= 0.0 {
        return Err("SVG has an empty canvas".to_string());
    }

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| format!("cannot allocate {}x{} canvas", width, height))?;

    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    RgbaImage::from_raw(width, height, rgba).ok_or_else(|| "pixel buffer size mismatch".to_string())
}

/// Encodes `image` into a file created by this call
///
/// The preferred path is opened create-new; on failure a random stem with
/// the same extension is tried once. If encoding fails the created file is
/// removed again.
fn write_new(preferred: &Path, image: &DynamicImage, format: ImageFormat) -> Option<PathBuf> {
    let (file, path) = match create_new(preferred) {
        Ok(file) => (file, preferred.to_path_buf()),
        Err(_) => {
            let fallback = fallback_path(preferred);
            match create_new(&fallback) {
                Ok(file) => (file, fallback),
                Err(e) => {
                    tracing::debug!("Cannot create {}: {}", fallback.display(), e);
                    return None;
                }
            }
        }
    };

    let mut writer = BufWriter::new(file);
    let written = image
        .write_to(&mut writer, format)
        .map_err(|e| e.to_string())
        .and_then(|_| writer.flush().map_err(|e| e.to_string()));

    match written {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::debug!("Failed to write {}: {}", path.display(), e);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove partial file {}: {}", path.display(), e);
            }
            None
        }
    }
}

fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn fallback_path(preferred: &Path) -> PathBuf {
    let name = match preferred.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}.{}", random_filename(), ext),
        None => random_filename(),
    };
    preferred.with_file_name(name)
}

fn is_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("heic"))
        .unwrap_or(false)
}

fn decode_generic(path: &Path) -> Option<DynamicImage> {
    ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()
}

#[cfg(feature = "heic")]
fn decode_heic(path: &Path) -> Option<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path.to_str()?).ok()?;
    let handle = ctx.primary_image_handle().ok()?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .ok()?;

    let plane = decoded.planes().interleaved?;
    let width = plane.width as usize;
    let height = plane.height as usize;

    // Rows are padded to the plane stride
    let mut pixels = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let start = row * plane.stride;
        pixels.extend_from_slice(plane.data.get(start..start + width * 3)?);
    }

    image::RgbImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgb8)
}

#[cfg(not(feature = "heic"))]
fn decode_heic(path: &Path) -> Option<DynamicImage> {
    tracing::debug!(
        "HEIC support not compiled, cannot decode {} (rebuild with --features heic)",
        path.display()
    );
    None
}
