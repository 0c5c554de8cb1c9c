//! End-to-end harvest over a canned page source and a mock image server

use kodegen_tools_imagegrab::{
    CrawlError, HarvestConfig, HarvestStatus, NoOpProgress, StatusReporter, Termination,
    harvest_with_source,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;

mod common;
use common::{FakePageSource, create_test_dir, gallery_page, mock_image, png_bytes};

fn config_for(start_url: &str, work: &Path) -> HarvestConfig {
    HarvestConfig::builder()
        .output_dir(work.join("downloaded_images"))
        .start_url(start_url)
        .concurrency_limit(3)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_two_page_gallery_is_materialized_and_archived() {
    let mut server = mockito::Server::new_async().await;
    let _a = mock_image(&mut server, "/a.jpg", 200, png_bytes(4, 4, [200, 0, 0])).await;
    let _b = mock_image(&mut server, "/b.jpg", 200, png_bytes(4, 4, [0, 200, 0])).await;
    let _c = mock_image(&mut server, "/c.jpg", 404, Vec::new()).await;

    let gallery = format!("{}/gallery", server.url());
    let mut source = FakePageSource::new(vec![
        gallery_page(&gallery, &[("/a.jpg", Some("A")), ("/b.jpg", Some("B"))]),
        gallery_page(&format!("{gallery}?page=2"), &[("/c.jpg", None)]),
    ]);
    let work = create_test_dir().unwrap();
    let config = config_for(&gallery, work.path());
    let (reporter, status) = StatusReporter::new();

    let result = harvest_with_source(&config, &mut source, &reporter, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.references.len(), 3);
    assert_eq!(result.materialized.len(), 3);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.termination, Termination::NoNextPage);
    assert_eq!(result.success_count(), 2);
    assert_eq!(result.failure_count(), 1);
    assert!(!result.is_empty());
    assert!(result.finished_at >= result.started_at);

    let archive = result.archive.expect("archive written");
    assert_eq!(archive.path, work.path().join("downloaded_images.zip"));
    assert_eq!(archive.entries, vec!["image_1.jpg", "image_2.jpg"]);
    assert!(work.path().join("downloaded_images/image_1.jpg").exists());

    assert_eq!(source.calls.closes(), 1);
    assert_eq!(status.current(), HarvestStatus::Done);
}

#[tokio::test]
async fn test_no_images_found_skips_archive() {
    let mut source = FakePageSource::new(vec![gallery_page("https://example.test/empty", &[])]);
    let work = create_test_dir().unwrap();
    let config = config_for("https://example.test/empty", work.path());

    let result = harvest_with_source(&config, &mut source, &NoOpProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(result.archive.is_none());
    assert!(!work.path().join("downloaded_images.zip").exists());
    assert_eq!(source.calls.closes(), 1);
}

#[tokio::test]
async fn test_all_downloads_failing_still_writes_empty_archive() {
    let mut server = mockito::Server::new_async().await;
    let _a = mock_image(&mut server, "/a.jpg", 404, Vec::new()).await;
    let _b = mock_image(&mut server, "/b.jpg", 404, Vec::new()).await;
    let _c = mock_image(&mut server, "/c.jpg", 404, Vec::new()).await;

    let gallery = format!("{}/gallery", server.url());
    let mut source = FakePageSource::new(vec![gallery_page(
        &gallery,
        &[("/a.jpg", None), ("/b.jpg", None), ("/c.jpg", None)],
    )]);
    let work = create_test_dir().unwrap();
    let config = config_for(&gallery, work.path());

    let result = harvest_with_source(&config, &mut source, &NoOpProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.is_empty());
    assert_eq!(result.success_count(), 0);
    assert_eq!(result.failure_count(), 3);
    let archive = result.archive.expect("empty archive still written");
    assert!(archive.entries.is_empty());
    assert!(archive.path.exists());
}

#[tokio::test]
async fn test_crawl_failure_still_closes_source() {
    let mut source = FakePageSource::chain(3, 1);
    source.fail_on_advance = Some(2);
    let work = create_test_dir().unwrap();
    let config = config_for("https://example.test/gallery?page=1", work.path());
    let (reporter, status) = StatusReporter::new();

    let err = harvest_with_source(&config, &mut source, &reporter, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::CrawlFailed { ref partial, .. } if partial.len() == 2));
    assert_eq!(source.calls.closes(), 1);
    assert!(matches!(status.current(), HarvestStatus::Failed(_)));
}

#[tokio::test]
async fn test_navigation_failure_is_fatal() {
    let mut source = FakePageSource::chain(1, 1);
    source.fail_on_render = true;
    let work = create_test_dir().unwrap();
    let config = config_for("https://example.test/", work.path());

    let err = harvest_with_source(&config, &mut source, &NoOpProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::CrawlFailed { ref partial, .. } if partial.is_empty()));
    assert_eq!(source.calls.closes(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut source = FakePageSource::chain(2, 1);
    let work = create_test_dir().unwrap();
    let config = config_for("https://example.test/", work.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harvest_with_source(&config, &mut source, &NoOpProgress, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled));
    assert_eq!(source.calls.renders(), 0);
    assert_eq!(source.calls.closes(), 1);
}

#[tokio::test]
async fn test_archive_failure_keeps_materialized_files() {
    let mut server = mockito::Server::new_async().await;
    let _a = mock_image(&mut server, "/a.jpg", 200, png_bytes(2, 2, [1, 2, 3])).await;

    let gallery = format!("{}/gallery", server.url());
    let mut source = FakePageSource::new(vec![gallery_page(&gallery, &[("/a.jpg", None)])]);
    let work = create_test_dir().unwrap();
    let blocker = work.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let config = HarvestConfig::builder()
        .output_dir(work.path().join("downloaded_images"))
        .start_url(&gallery)
        .archive_path(blocker.join("out.zip"))
        .build()
        .unwrap();

    let err = harvest_with_source(&config, &mut source, &NoOpProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    let materialized = match err {
        CrawlError::Archive { materialized, .. } => materialized,
        other => panic!("expected archive error, got {other:?}"),
    };
    assert_eq!(materialized.len(), 1);
    assert!(materialized[0].is_success());
    assert!(work.path().join("downloaded_images/image_1.jpg").exists());
}
