//! Locating the obfuscation font referenced by a page.
//!
//! Only string processing happens here; fetching the page and the font is
//! left to the caller.

use lazy_static::lazy_static;
use regex::Regex;

/// Base URL fonts are served from when only the family is known.
pub const FONT_CDN_BASE: &str = "https://lf6-awef.bytetos.com/obj/awesome-font/c";

lazy_static! {
    /// `url("https://....otf")` inside inline CSS
    static ref RE_FONT_URL: Regex = Regex::new(r#"url\("(https?://[^"]+?\.otf)"\)"#).unwrap();

    /// `class="... font-<family> ..."`
    static ref RE_FONT_CLASS: Regex = Regex::new(r#"class="[^"]*?font-([a-zA-Z0-9]+)[^"]*?""#).unwrap();
}

/// Find the OpenType font URL used by `html`.
///
/// The first explicit `.otf` URL wins. Failing that, a `font-<family>` class
/// name is turned into a CDN URL. Returns `None` when neither is present.
///
/// # Examples
///
/// ```
/// use glyph_oxide::locator::extract_font_url;
///
/// let html = r#"<style>@font-face { src: url("https://cdn.example/f/a1b2.otf") }</style>"#;
/// assert_eq!(extract_font_url(html).as_deref(), Some("https://cdn.example/f/a1b2.otf"));
/// ```
pub fn extract_font_url(html: &str) -> Option<String> {
    if let Some(caps) = RE_FONT_URL.captures(html) {
        let url = caps[1].to_string();
        log::info!("Font URL found in page: {}", url);
        return Some(url);
    }

    if let Some(caps) = RE_FONT_CLASS.captures(html) {
        let url = font_url_for_family(&caps[1]);
        log::warn!("No font URL in page, derived {} from class name", url);
        return Some(url);
    }

    log::warn!("No font URL found in page");
    None
}

/// CDN URL of the font for `family`.
pub fn font_url_for_family(family: &str) -> String {
    format!("{}/{}.otf", FONT_CDN_BASE, family)
}

/// Source locator for a font read from a local file.
pub fn local_locator(file_name: &str) -> String {
    format!("local://{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_otf_url_wins() {
        let html = r#"url("https://a.example/one.otf") url("https://a.example/two.otf")"#;
        assert_eq!(extract_font_url(html).as_deref(), Some("https://a.example/one.otf"));
    }

    #[test]
    fn test_other_formats_ignored() {
        let html = r#"url("https://a.example/one.woff2") <span class="x font-abc123">"#;
        assert_eq!(
            extract_font_url(html).as_deref(),
            Some("https://lf6-awef.bytetos.com/obj/awesome-font/c/abc123.otf")
        );
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(extract_font_url("<p>plain</p>"), None);
        assert_eq!(extract_font_url(""), None);
    }

    #[test]
    fn test_local_locator() {
        assert_eq!(local_locator("a.otf"), "local://a.otf");
    }
}
