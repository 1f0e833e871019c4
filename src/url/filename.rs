use super::has_image_extension;
use rand::Rng;
use url::Url;

/// Characters that cannot appear in an output file name
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Length of generated fallback file names
const RANDOM_NAME_LEN: usize = 10;

/// Strips directory-unsafe characters from the last path segment of a URL
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::sanitize_segment;
/// use url::Url;
///
/// let url = Url::parse("https://site.test/img/a%22b.png?x=1").unwrap();
/// assert_eq!(sanitize_segment(&url), "a%22b.png");
/// ```
pub fn sanitize_segment(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    last.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect()
}

/// Derives the output file name for an image URL
///
/// The sanitized last path segment is used, with `.jpeg` appended when it
/// has no recognized image extension. A URL without a usable segment gets a
/// random name instead.
pub fn output_filename(url: &Url) -> String {
    let name = sanitize_segment(url);

    if name.is_empty() || name == "." || name == ".." {
        return format!("{}.jpeg", random_filename());
    }

    if has_image_extension(&name) {
        name
    } else {
        format!("{}.jpeg", name)
    }
}

/// Generates a random 10-letter lowercase file name
pub fn random_filename() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_NAME_LEN)
        .map(|_| rng.gen_range('a'..='z'))
        .collect()
}
