use url::Url;

/// Resolves a raw `href`/`src` attribute value against the page it was found on
///
/// Returns None if the reference should be ignored:
/// - empty values
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - fragment-only references (same page anchors)
/// - anything that does not resolve to an HTTP(S) URL
///
/// The fragment of the resolved URL is dropped since it never changes the
/// fetched resource.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::resolve_url;
/// use url::Url;
///
/// let page = Url::parse("https://site.test/").unwrap();
/// let image = resolve_url(&page, "/a.png").unwrap();
/// assert_eq!(image.as_str(), "https://site.test/a.png");
/// ```
pub fn resolve_url(page_url: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let lowered = raw.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut resolved = page_url.join(raw).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);

    Some(resolved)
}

/// Checks whether a link stays within the crawl scope of a page
///
/// A link is in scope when its origin (scheme, host and port) equals the
/// page's origin and, if `base_url` is non-empty, the link starts with
/// `base_url`.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::is_same_domain;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/blog").unwrap();
/// let post = Url::parse("https://example.com/blog/post2").unwrap();
/// let shop = Url::parse("https://example.com/shop/item").unwrap();
///
/// assert!(is_same_domain(&page, &post, "https://example.com/blog"));
/// assert!(!is_same_domain(&page, &shop, "https://example.com/blog"));
/// ```
pub fn is_same_domain(page_url: &Url, link: &Url, base_url: &str) -> bool {
    let same_origin = page_url.origin() == link.origin();
    let within_base = base_url.is_empty() || link.as_str().starts_with(base_url);
    same_origin && within_base
}

/// Puts a configured base URL into the form links are serialized in
///
/// Scheme and host are lowercased and default ports dropped, so the prefix
/// comparison in [`is_same_domain`] is not defeated by how the value was
/// typed. Values that do not parse are only trimmed.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://Example.com:443/blog"), "https://example.com/blog");
/// assert_eq!(normalize_base_url(""), "");
/// ```
pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match Url::parse(raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}
