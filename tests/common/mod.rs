//! Test utilities and helper functions for the imagegrab test suite

#![allow(dead_code)]

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use kodegen_tools_imagegrab::{
    Advance, CrawlError, ImageReference, PageSource, PageState, SettleStatus,
};
use mockito::{Mock, ServerGuard};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Creates a temporary directory for test output
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test HTML document with specified content
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
</head>
<body>
    {}
</body>
</html>"#,
        html_escape::encode_text(title),
        body
    )
}

/// Markup for a gallery page: one `<img>` per `(src, alt)` pair, plus a
/// `span.next > a` control when `next_href` is set
pub fn gallery_html(images: &[(&str, Option<&str>)], next_href: Option<&str>) -> String {
    let mut body = String::new();
    for (src, alt) in images {
        match alt {
            Some(alt) => body.push_str(&format!(
                r#"<img src="{}" alt="{}">"#,
                html_escape::encode_double_quoted_attribute(src),
                html_escape::encode_double_quoted_attribute(alt)
            )),
            None => body.push_str(&format!(
                r#"<img src="{}">"#,
                html_escape::encode_double_quoted_attribute(src)
            )),
        }
    }
    if let Some(href) = next_href {
        body.push_str(&format!(r#"<span class="next"><a href="{href}">Next</a></span>"#));
    }
    create_test_html("Gallery", &body)
}

/// A settled rendered page
pub fn gallery_page(url: &str, images: &[(&str, Option<&str>)]) -> PageState {
    PageState {
        url: url.to_string(),
        html: gallery_html(images, None),
        next_page: None,
        settle: SettleStatus::Settled,
    }
}

/// Encoded PNG of a solid color
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode test PNG");
    cursor.into_inner()
}

/// Serve `body` at `path` with the given status
pub async fn mock_image(server: &mut ServerGuard, path: &str, status: usize, body: Vec<u8>) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_header("content-type", "image/png")
        .with_body(body)
        .create_async()
        .await
}

/// References to `count` images at `/img/N.png` on `server`
pub fn server_references(server: &ServerGuard, count: usize) -> Vec<ImageReference> {
    (1..=count)
        .map(|n| ImageReference::new(format!("{}/img/{n}.png", server.url()), Some(format!("image {n}"))))
        .collect()
}

/// Call counters shared between a [`FakePageSource`] and the test body
#[derive(Debug, Clone, Default)]
pub struct SourceCalls {
    pub renders: Arc<AtomicUsize>,
    pub advances: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl SourceCalls {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Canned page chain standing in for a browser session
///
/// `render` serves the first page, each `advance` the next one, and
/// `Advance::NotFound` once the chain is exhausted.
pub struct FakePageSource {
    pages: VecDeque<PageState>,
    pub calls: SourceCalls,
    /// 1-based advance call that fails with a browser error
    pub fail_on_advance: Option<usize>,
    pub fail_on_render: bool,
}

impl FakePageSource {
    pub fn new(pages: Vec<PageState>) -> Self {
        Self {
            pages: pages.into(),
            calls: SourceCalls::default(),
            fail_on_advance: None,
            fail_on_render: false,
        }
    }

    /// A chain of `count` pages with `per_page` distinct images each
    pub fn chain(count: usize, per_page: usize) -> Self {
        let pages = (1..=count)
            .map(|page| {
                let srcs: Vec<String> = (1..=per_page).map(|i| format!("/p{page}/{i}.jpg")).collect();
                let images: Vec<(&str, Option<&str>)> = srcs.iter().map(|s| (s.as_str(), None)).collect();
                gallery_page(&format!("https://example.test/gallery?page={page}"), &images)
            })
            .collect();
        Self::new(pages)
    }
}

impl PageSource for FakePageSource {
    async fn render(&mut self, url: &str) -> Result<PageState, CrawlError> {
        self.calls.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_render {
            return Err(CrawlError::Browser(format!("Navigation to {url} failed")));
        }
        self.pages
            .pop_front()
            .ok_or_else(|| CrawlError::Browser("no page to render".to_string()))
    }

    async fn advance(&mut self, _current: &PageState) -> Result<Advance, CrawlError> {
        let n = self.calls.advances.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_advance == Some(n) {
            return Err(CrawlError::Browser("page crashed".to_string()));
        }
        Ok(self.pages.pop_front().map_or(Advance::NotFound, Advance::Next))
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
