use super::Dimensions;
use image::ImageReader;
use std::io::Cursor;
use std::path::Path;

/// Reads the pixel dimensions of an image file
///
/// Only the image header is decoded. Returns None if the file is missing or
/// is not a decodable raster image.
pub fn probe_dimensions(path: &Path) -> Option<Dimensions> {
    let reader = ImageReader::open(path).ok()?.with_guessed_format().ok()?;
    match reader.into_dimensions() {
        Ok(dims) => Some(dims.into()),
        Err(e) => {
            tracing::trace!("Could not probe {}: {}", path.display(), e);
            None
        }
    }
}

/// Reads the pixel dimensions of an in-memory image
///
/// Used to size-check a response body before it is written to disk.
pub fn probe_dimensions_from_bytes(bytes: &[u8]) -> Option<Dimensions> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok().map(Dimensions::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_probe_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.png");
        RgbImage::new(40, 30).save(&path).unwrap();

        assert_eq!(probe_dimensions(&path), Some(Dimensions::new(40, 30)));
    }

    #[test]
    fn test_probe_file_ignores_misleading_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actually_png.jpeg");
        std::fs::write(&path, png_bytes(12, 7)).unwrap();

        assert_eq!(probe_dimensions(&path), Some(Dimensions::new(12, 7)));
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(probe_dimensions(&dir.path().join("nope.png")), None);
    }

    #[test]
    fn test_probe_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.heic");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert_eq!(probe_dimensions(&path), None);
    }

    #[test]
    fn test_probe_bytes() {
        assert_eq!(
            probe_dimensions_from_bytes(&png_bytes(1024, 768)),
            Some(Dimensions::new(1024, 768))
        );
    }

    #[test]
    fn test_probe_bytes_garbage() {
        assert_eq!(probe_dimensions_from_bytes(b"<html>not found</html>"), None);
        assert_eq!(probe_dimensions_from_bytes(&[]), None);
    }
}
