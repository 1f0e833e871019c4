//! URL handling module for Sumi-Harvest
//!
//! This module provides link resolution, same-domain scoping, image format
//! detection and output filename derivation.

mod filename;
mod scope;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use filename::{output_filename, random_filename, sanitize_segment};
pub use scope::{is_same_domain, normalize_base_url, resolve_url};

/// File extensions treated as images, both when naming downloads and when
/// deciding whether an anchor points straight at an image
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "heic", "webp"];

/// How a discovered image has to be fetched and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Common raster format, downloaded as-is after a size check
    Raster,
    /// HEIC photo, converted to JPEG after download
    Heic,
    /// Vector image, rasterized to PNG after download
    Svg,
}

impl ImageKind {
    /// Determines the image kind from the extension of the URL path
    ///
    /// Query strings and fragments are ignored and the comparison is
    /// case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_harvest::url::ImageKind;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://example.com/photo.HEIC").unwrap();
    /// assert_eq!(ImageKind::from_url(&url), ImageKind::Heic);
    ///
    /// let url = Url::parse("https://example.com/logo.svg?v=2").unwrap();
    /// assert_eq!(ImageKind::from_url(&url), ImageKind::Svg);
    ///
    /// let url = Url::parse("https://example.com/a.png").unwrap();
    /// assert_eq!(ImageKind::from_url(&url), ImageKind::Raster);
    /// ```
    pub fn from_url(url: &Url) -> Self {
        match path_extension(url).as_deref() {
            Some("heic") => Self::Heic,
            Some("svg") => Self::Svg,
            _ => Self::Raster,
        }
    }

    /// Returns true if the downloaded file has to be converted before use
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::Raster)
    }
}

/// Returns true if the URL path ends in a known image extension
pub fn looks_like_image(url: &Url) -> bool {
    path_extension(url)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Returns true if a file name ends in a known image extension
pub fn has_image_extension(name: &str) -> bool {
    extension_of(name)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Parses an absolute HTTP(S) URL
///
/// # Errors
///
/// * `UrlError::Parse` - The string is not a URL
/// * `UrlError::InvalidScheme` - The scheme is neither http nor https
/// * `UrlError::MissingHost` - The URL has no host
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Lowercased extension of the last path segment
fn path_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    extension_of(last)
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
