#![forbid(unsafe_code)]

//! Image URL enumeration for the image signal.
//!
//! Discovery runs once at activation. The result is deterministic
//! (first occurrence wins, input order preserved) and never contains
//! inline `data:` URIs, which need no network round-trip.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::host::LoadHost;

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

/// Whether `url` is an inline data URI.
#[must_use]
pub fn is_data_url(url: &str) -> bool {
    url.trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Every `url(...)` argument in a computed `background-image` value, in
/// order. Handles double, single and no quotes; `none` yields nothing.
#[must_use]
pub fn background_image_urls(value: &str) -> Vec<&str> {
    static CSS_URL: OnceLock<Regex> = OnceLock::new();
    let re = CSS_URL.get_or_init(|| {
        regex(
            r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^\s"')]*))\s*\)"#,
            "css url()",
        )
    });

    re.captures_iter(value)
        .filter_map(|caps| {
            [1, 2, 3]
                .iter()
                .find_map(|idx| caps.get(*idx).map(|m| m.as_str()))
        })
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect()
}

/// Insertion-ordered, de-duplicated set of image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ImageSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `url` unless it is empty, a data URI, or already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() || is_data_url(url) || self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_owned());
        self.urls.push(url.to_owned());
        true
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Collect the image URLs to preload: rendered image sources first, then
/// (when `include_background_images`) computed background images.
#[must_use]
pub fn enumerate_images(host: &dyn LoadHost, include_background_images: bool) -> ImageSet {
    let mut set = ImageSet::new();
    for src in host.image_sources() {
        set.insert(&src);
    }
    if include_background_images {
        for value in host.background_images() {
            if value.trim().eq_ignore_ascii_case("none") {
                continue;
            }
            for url in background_image_urls(&value) {
                set.insert(url);
            }
        }
    }
    set
}
