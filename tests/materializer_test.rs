//! Concurrent download and normalization against a mock HTTP server

use kodegen_tools_imagegrab::content_saver::MaterializeOptions;
use kodegen_tools_imagegrab::{
    ImageReference, MaterializeError, Materializer, OutputFormat, ProgressReporter,
    archive,
};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod common;
use common::{create_test_dir, mock_image, png_bytes, server_references};

fn options(dir: &Path, concurrency: usize) -> MaterializeOptions {
    MaterializeOptions {
        output_dir: dir.to_path_buf(),
        target_format: OutputFormat::Png,
        concurrency_limit: concurrency,
        fetch_timeout: Duration::from_secs(10),
        max_image_bytes: 1024 * 1024,
        resize: None,
        keep_source_extension: false,
    }
}

#[tokio::test]
async fn test_failed_fetch_is_recorded_and_skipped_by_archive() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for n in 1..=5 {
        let path = format!("/img/{n}.png");
        mocks.push(if n == 3 {
            mock_image(&mut server, &path, 500, Vec::new()).await
        } else {
            mock_image(&mut server, &path, 200, png_bytes(4, 4, [n as u8 * 40, 0, 0])).await
        });
    }

    let work = create_test_dir().unwrap();
    let out_dir = work.path().join("downloaded_images");
    let refs = server_references(&server, 5);

    let files = Materializer::new(options(&out_dir, 4))
        .unwrap()
        .materialize(&refs)
        .await;

    assert_eq!(files.len(), 5);
    for (i, file) in files.iter().enumerate() {
        assert_eq!(file.index, i);
        assert_eq!(file.reference, refs[i]);
    }
    assert!(matches!(files[2].error, Some(MaterializeError::FetchFailed(_))));
    assert!(files[2].local_path.is_none());
    assert_eq!(files.iter().filter(|f| f.is_success()).count(), 4);
    assert!(!out_dir.join("image_3.png").exists());

    let summary = archive(&files, &work.path().join("downloaded_images.zip"))
        .await
        .unwrap();
    assert_eq!(
        summary.entries,
        vec!["image_1.png", "image_2.png", "image_4.png", "image_5.png"]
    );

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_names_do_not_depend_on_concurrency() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for n in 1..=6 {
        mocks.push(
            mock_image(&mut server, &format!("/img/{n}.png"), 200, png_bytes(2, 2, [0, n as u8, 0]))
                .await,
        );
    }
    let refs = server_references(&server, 6);

    let mut runs = Vec::new();
    for concurrency in [1, 4] {
        let dir = create_test_dir().unwrap();
        let files = Materializer::new(options(dir.path(), concurrency))
            .unwrap()
            .materialize(&refs)
            .await;
        let names: Vec<String> = files
            .iter()
            .map(|f| {
                f.local_path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();
        runs.push(names);
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0][0], "image_1.png");
    assert_eq!(runs[0][5], "image_6.png");
    drop(mocks);
}

/// Records the order in which images finish
#[derive(Default)]
struct CompletionOrder(Mutex<Vec<usize>>);

impl ProgressReporter for CompletionOrder {
    fn report_initializing(&self) {}
    fn report_browser_launched(&self) {}
    fn report_page_rendered(&self, _page_number: usize, _url: &str, _image_count: usize, _settled: bool) {}
    fn report_crawl_finished(&self, _pages_visited: usize, _references: usize) {}
    fn report_image_materialized(&self, index: usize, _total: usize, _success: bool) {
        self.0.lock().unwrap().push(index);
    }
    fn report_archived(&self, _path: &Path, _entries: usize) {}
    fn report_completed(&self) {}
    fn report_error(&self, _error: &str) {}
}

#[tokio::test]
async fn test_slow_first_image_keeps_input_order() {
    use base64::Engine;

    let mut server = mockito::Server::new_async().await;
    let slow_body = png_bytes(4, 4, [10, 20, 30]);
    let _slow = server
        .mock("GET", "/img/1.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_chunked_body(move |w| {
            std::thread::sleep(Duration::from_millis(400));
            w.write_all(&slow_body)
        })
        .create_async()
        .await;

    let inline = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 2, [200, 0, 0]));
    let refs = vec![
        ImageReference::new(format!("{}/img/1.png", server.url()), None),
        ImageReference::new(format!("data:image/png;base64,{inline}"), None),
    ];
    let work = create_test_dir().unwrap();
    let order = CompletionOrder::default();

    let files = Materializer::new(options(&work.path().join("out"), 2))
        .unwrap()
        .materialize_with_progress(&refs, &CancellationToken::new(), &order)
        .await;

    assert_eq!(*order.0.lock().unwrap(), vec![1, 0]);
    let layout: Vec<(usize, bool, String)> = files
        .iter()
        .map(|f| {
            let name = f
                .local_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (f.index, f.is_success(), name)
        })
        .collect();
    assert_eq!(
        layout,
        vec![
            (0, true, "image_1.png".to_string()),
            (1, true, "image_2.png".to_string()),
        ]
    );
    assert_eq!(files[0].reference, refs[0]);
    assert_eq!(files[1].reference, refs[1]);

    let summary = archive(&files, &work.path().join("out.zip")).await.unwrap();
    assert_eq!(summary.entries, vec!["image_1.png", "image_2.png"]);
}

#[tokio::test]
async fn test_non_image_body_is_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_image(&mut server, "/img/1.png", 200, b"<html>not found</html>".to_vec()).await;
    let dir = create_test_dir().unwrap();

    let files = Materializer::new(options(dir.path(), 2))
        .unwrap()
        .materialize(&server_references(&server, 1))
        .await;

    assert!(matches!(files[0].error, Some(MaterializeError::DecodeFailed(_))));
}

#[tokio::test]
async fn test_empty_success_body_is_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_image(&mut server, "/img/1.png", 200, Vec::new()).await;
    let dir = create_test_dir().unwrap();

    let files = Materializer::new(options(dir.path(), 1))
        .unwrap()
        .materialize(&server_references(&server, 1))
        .await;

    assert!(matches!(files[0].error, Some(MaterializeError::DecodeFailed(_))));
    assert!(files[0].local_path.is_none());
}

#[tokio::test]
async fn test_oversized_body_is_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_image(&mut server, "/img/1.png", 200, vec![0u8; 4096]).await;
    let dir = create_test_dir().unwrap();

    let mut opts = options(dir.path(), 1);
    opts.max_image_bytes = 1024;
    let files = Materializer::new(opts)
        .unwrap()
        .materialize(&server_references(&server, 1))
        .await;

    assert!(matches!(files[0].error, Some(MaterializeError::FetchFailed(_))));
}

#[tokio::test]
async fn test_inline_data_url_and_format_conversion() {
    use base64::Engine;

    let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 5, [9, 9, 9]));
    let refs = vec![ImageReference::new(format!("data:image/png;base64,{encoded}"), None)];
    let dir = create_test_dir().unwrap();

    let mut opts = options(dir.path(), 1);
    opts.target_format = OutputFormat::Jpeg;
    opts.resize = Some((6, 6));
    let files = Materializer::new(opts).unwrap().materialize(&refs).await;

    let path = files[0].local_path.clone().unwrap();
    assert_eq!(path.file_name().unwrap(), "image_1.jpg");
    let written = image::open(&path).unwrap();
    assert_eq!((written.width(), written.height()), (6, 6));
    assert_eq!(written.color(), image::ColorType::Rgb8);
}

#[tokio::test]
async fn test_cancelled_batch_records_every_reference() {
    let refs = vec![
        ImageReference::new("https://unreachable.invalid/1.png", None),
        ImageReference::new("https://unreachable.invalid/2.png", None),
    ];
    let dir = create_test_dir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let files = Materializer::new(options(dir.path(), 1))
        .unwrap()
        .materialize_with_cancel(&refs, &cancel)
        .await;

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.error == Some(MaterializeError::Cancelled)));
}

#[tokio::test]
async fn test_rerun_overwrites_previous_files() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/img/1.png")
        .with_status(200)
        .with_body(png_bytes(2, 2, [1, 2, 3]))
        .expect(2)
        .create_async()
        .await;
    let dir = create_test_dir().unwrap();
    let refs = server_references(&server, 1);
    let materializer = Materializer::new(options(dir.path(), 1)).unwrap();

    let first = materializer.materialize(&refs).await;
    let second = materializer.materialize(&refs).await;

    assert_eq!(first[0].local_path, second[0].local_path);
    assert!(second[0].is_success());
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    mock.assert_async().await;
}
