//! Image reference extraction from rendered documents

use log::debug;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::crawl_engine::crawl_types::ImageReference;
use crate::page_source::PageState;
use crate::utils::{CAPTION_ATTRIBUTE, DEFAULT_IMAGE_SELECTOR, DEFAULT_LOCATOR_ATTRIBUTES};

/// Extracts [`ImageReference`]s from serialized HTML
///
/// Holds the compiled element selector and the ordered list of attributes
/// consulted for each element's locator.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    selector: Selector,
    locator_attributes: Vec<String>,
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self {
            selector: Selector::parse(DEFAULT_IMAGE_SELECTOR)
                .expect("BUG: hardcoded CSS selector 'img' is invalid"),
            locator_attributes: DEFAULT_LOCATOR_ATTRIBUTES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl ImageExtractor {
    /// Build an extractor for a custom selector and locator attribute order
    pub fn new(selector: &str, locator_attributes: &[String]) -> anyhow::Result<Self> {
        let selector = Selector::parse(selector)
            .map_err(|e| anyhow::anyhow!("Invalid image selector '{selector}': {e}"))?;
        let locator_attributes: Vec<String> = locator_attributes
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if locator_attributes.is_empty() {
            anyhow::bail!("at least one locator attribute is required");
        }
        Ok(Self {
            selector,
            locator_attributes,
        })
    }

    #[must_use]
    pub fn locator_attributes(&self) -> &[String] {
        &self.locator_attributes
    }

    /// All images in `html`, in document order
    ///
    /// Relative locators are resolved against `base_url`. Elements with no
    /// locator, and locators that do not resolve, are skipped.
    #[must_use]
    pub fn extract(&self, html: &str, base_url: &str) -> Vec<ImageReference> {
        let base = match Url::parse(base_url) {
            Ok(base) => Some(base),
            Err(e) => {
                debug!("Page URL '{base_url}' is not absolute ({e}); only absolute locators will be kept");
                None
            }
        };

        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .filter_map(|element| self.reference_for(element, base.as_ref()))
            .collect()
    }

    /// Extract from a rendered page, using its URL as the base
    #[must_use]
    pub fn extract_page(&self, page: &PageState) -> Vec<ImageReference> {
        self.extract(&page.html, &page.url)
    }

    fn reference_for(&self, element: ElementRef<'_>, base: Option<&Url>) -> Option<ImageReference> {
        let value = element.value();
        let locator = self
            .locator_attributes
            .iter()
            .filter_map(|attr| value.attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())?;

        let url = match resolve_locator(locator, base) {
            Some(url) => url,
            None => {
                debug!("Skipping image with unresolvable locator '{locator}'");
                return None;
            }
        };

        let caption = value
            .attr(CAPTION_ATTRIBUTE)
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(ToString::to_string);

        Some(ImageReference::new(url, caption))
    }
}

fn resolve_locator(locator: &str, base: Option<&Url>) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(locator).ok()?,
        None => Url::parse(locator).ok()?,
    };
    Some(resolved.to_string())
}

/// Extract with the default selector (`img`) and locator attributes
#[must_use]
pub fn extract_images(html: &str, base_url: &str) -> Vec<ImageReference> {
    ImageExtractor::default().extract(html, base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_locator_resolves_against_page_url() {
        let html = r#"<html><body><img src="/a.jpg" alt="A"></body></html>"#;
        let refs = extract_images(html, "https://example.test/gallery/");
        assert_eq!(
            refs,
            vec![ImageReference::new("https://example.test/a.jpg", Some("A".to_string()))]
        );
    }

    #[test]
    fn test_document_order_and_captions() {
        let html = r#"
            <img src="one.png" alt="  first ">
            <div><img src="https://cdn.test/two.webp"></div>
            <img src="three.gif" alt="">
        "#;
        let refs = extract_images(html, "https://example.test/p/index.html");
        let urls: Vec<&str> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.test/p/one.png",
                "https://cdn.test/two.webp",
                "https://example.test/p/three.gif",
            ]
        );
        assert_eq!(refs[0].caption.as_deref(), Some("first"));
        assert_eq!(refs[1].caption, None);
        assert_eq!(refs[2].caption, None);
    }

    #[test]
    fn test_lazy_load_attribute_used_when_src_missing() {
        let html = r#"<img data-src="/lazy.jpg"><img src="" data-original="/orig.png">"#;
        let refs = extract_images(html, "https://example.test/");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].url, "https://example.test/lazy.jpg");
        assert_eq!(refs[1].url, "https://example.test/orig.png");
    }

    #[test]
    fn test_elements_without_locator_are_skipped() {
        let html = r#"<img alt="nothing"><img src="   "><img src="ok.jpg">"#;
        let refs = extract_images(html, "https://example.test/");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://example.test/ok.jpg");
    }

    #[test]
    fn test_data_url_is_kept_verbatim() {
        let html = r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#;
        let refs = extract_images(html, "https://example.test/");
        assert_eq!(refs.len(), 1);
        assert!(refs[0].url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_invalid_base_keeps_only_absolute_locators() {
        let html = r#"<img src="/rel.jpg"><img src="https://cdn.test/abs.jpg">"#;
        let refs = extract_images(html, "not a url");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://cdn.test/abs.jpg");
    }

    #[test]
    fn test_custom_selector_and_attributes() {
        let extractor =
            ImageExtractor::new("img.photo", &["data-full".to_string(), "src".to_string()])
                .unwrap();
        let html = r#"
            <img class="thumb" src="t.jpg">
            <img class="photo" src="small.jpg" data-full="big.jpg">
        "#;
        let refs = extractor.extract(html, "https://example.test/");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://example.test/big.jpg");
    }

    #[test]
    fn test_new_rejects_empty_attribute_list() {
        assert!(ImageExtractor::new("img", &[" ".to_string()]).is_err());
        assert!(ImageExtractor::new("img[", &["src".to_string()]).is_err());
    }
}
