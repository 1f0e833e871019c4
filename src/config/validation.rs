use crate::config::types::{BrowserConfig, Config, CrawlerConfig, ImageConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for concurrent image fetches per page
const MAX_IMAGE_CONCURRENCY: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seeds(&config.seeds)?;
    validate_crawler_config(&config.crawler)?;
    validate_image_config(&config.images)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates seed URLs: at least one, all absolute HTTP(S)
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        validate_http_url(seed, "seed URL")?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.image_concurrency < 1 || config.image_concurrency > MAX_IMAGE_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "image_concurrency must be between 1 and {}, got {}",
            MAX_IMAGE_CONCURRENCY, config.image_concurrency
        )));
    }

    if !config.base_url.is_empty() {
        validate_http_url(&config.base_url, "base_url")?;
    }

    Ok(())
}

/// Validates image configuration
fn validate_image_config(config: &ImageConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    match (config.min_width, config.min_height) {
        (None, None) => {}
        (Some(w), Some(h)) if w > 0 && h > 0 => {}
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation(
                "min_width and min_height must be greater than zero".to_string(),
            ));
        }
        _ => {
            return Err(ConfigError::Validation(
                "min_width and min_height must be set together".to_string(),
            ));
        }
    }

    if config.svg_width == 0 || config.svg_height == 0 {
        return Err(ConfigError::Validation(format!(
            "svg dimensions must be non-zero, got {}x{}",
            config.svg_width, config.svg_height
        )));
    }

    Ok(())
}

/// Validates render session configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.width == 0 || config.height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport dimensions must be non-zero, got {}x{}",
            config.width, config.height
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.manifest_path.is_empty() {
        return Err(ConfigError::Validation(
            "manifest_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a string is an absolute HTTP(S) URL
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            what, value
        )));
    }

    Ok(())
}
