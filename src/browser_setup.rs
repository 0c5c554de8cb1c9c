use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::Handler;
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// Environment variable naming an explicit Chrome/Chromium binary
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// Flags passed to every launched browser
const CHROME_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-breakpad",
    "--disable-features=TranslateUI",
    "--disable-setuid-sandbox",
    "--no-sandbox",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--use-mock-keychain",
    "--mute-audio",
    "--hide-scrollbars",
];

/// A launched browser plus the task pumping its CDP event stream
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    /// Profile directory owned by this session; removed on close
    pub user_data_dir: PathBuf,
}

/// Removes a session profile directory unless the launch that owns it completes
///
/// Also covers the launch future being dropped on cancellation.
struct ProfileDirGuard {
    path: PathBuf,
    armed: bool,
}

impl ProfileDirGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ProfileDirGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove profile directory {}: {e}", self.path.display());
        }
    }
}

fn platform_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .flat_map(|base| {
                [
                    PathBuf::from(&base).join(r"Google\Chrome\Application\chrome.exe"),
                    PathBuf::from(&base).join(r"Chromium\Application\chrome.exe"),
                ]
            })
            .collect()
    } else if cfg!(target_os = "macos") {
        let bundles = [
            "Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        let mut paths: Vec<PathBuf> = bundles.iter().map(|b| PathBuf::from("/").join(b)).collect();
        if let Some(home) = dirs::home_dir() {
            paths.extend(bundles.iter().map(|b| home.join(b)));
        }
        paths.push(PathBuf::from("/opt/homebrew/bin/chromium"));
        paths
    } else {
        [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/local/bin/chromium",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

fn which(binary: &str) -> Option<PathBuf> {
    let output = Command::new("which").arg(binary).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Locate a local Chrome/Chromium binary
///
/// Order: `CHROMIUM_PATH`, well-known install locations for the platform,
/// then `which` on Unix.
pub async fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from {CHROMIUM_PATH_ENV}: {}", path.display());
            return Ok(path);
        }
        warn!("{CHROMIUM_PATH_ENV} points to a missing file: {}", path.display());
    }

    if let Some(path) = platform_candidates().into_iter().find(|p| p.exists()) {
        info!("Found browser at: {}", path.display());
        return Ok(path);
    }

    if !cfg!(target_os = "windows")
        && let Some(path) = ["chromium", "chromium-browser", "google-chrome", "chrome"]
            .iter()
            .find_map(|bin| which(bin))
    {
        info!("Found browser on PATH: {}", path.display());
        return Ok(path);
    }

    warn!("No Chrome/Chromium executable found locally");
    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache and return its executable
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!("No user cache directory; caching Chromium under {}", fallback.display());
            fallback
        })
        .join("kodegen")
        .join("chromium");

    info!("Downloading managed Chromium into {}", cache_dir.display());
    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Failed to build fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to fetch browser")?;

    info!("Managed Chromium ready at {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Drain the CDP event stream until the browser goes away
fn spawn_event_pump(mut handler: Handler) -> JoinHandle<()> {
    task::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();

            // Chrome emits CDP messages chromiumoxide cannot deserialize; they are harmless
            // Reference: https://github.com/mattsse/chromiumoxide/issues/167
            if message.contains("data did not match any variant of untagged enum Message")
                || message.contains("Failed to deserialize WS response")
            {
                trace!("Suppressed benign CDP serialization error: {message}");
            } else {
                error!("Browser handler error: {e:?}");
            }
        }
        info!("Browser handler task completed");
    })
}

/// Find or download Chrome/Chromium and launch it for one crawl session
///
/// Without `chrome_data_dir` a unique profile directory under the system
/// temp dir is used, so concurrent harvests never share a profile lock.
pub async fn launch_browser(headless: bool, chrome_data_dir: Option<PathBuf>) -> Result<LaunchedBrowser> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let user_data_dir = chrome_data_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("kodegen_imagegrab_{}", uuid::Uuid::new_v4()))
    });
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;
    let profile_guard = ProfileDirGuard::new(user_data_dir.clone());

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path)
        .arg(format!("--user-agent={CHROME_USER_AGENT}"));
    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    for arg in CHROME_ARGS {
        builder = builder.arg(*arg);
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    info!("Launching browser (headless: {headless}) with profile {}", user_data_dir.display());
    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    Ok(LaunchedBrowser {
        browser,
        handler: spawn_event_pump(handler),
        user_data_dir: profile_guard.disarm(),
    })
}
