//! IR library integration: find and download the yearly hotel performance workbooks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{info, warn};
use url::Url;

use crate::error::AppError;
use crate::io::workbook::{source_path, workbook_file_name};

pub const DEFAULT_LIBRARY_URL: &str = "https://www.jhrth.co.jp/ja/ir/library.html";
const LIBRARY_URL_ENV: &str = "KPI_LIBRARY_URL";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const MAX_ATTEMPTS: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Characters of page text inspected on each side of a workbook link.
const CONTEXT_CHARS: usize = 500;
const HOTEL_KEYWORDS: [&str; 6] = ["ホテル", "運営", "実績", "Hotel", "Performance", "XLS"];
/// The REIT's fiscal period `N` ends in December of `N + 1998`.
const FISCAL_PERIOD_OFFSET: i32 = 1998;

/// A year whose workbook could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadFailure {
    pub year: i32,
    pub message: String,
    /// Local file kept in place of the failed download, if one exists.
    pub reused_local: Option<PathBuf>,
}

impl std::fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.year, self.message)?;
        match &self.reused_local {
            Some(path) => write!(f, " (reusing '{}')", path.display()),
            None => write!(f, " (no local copy)"),
        }
    }
}

impl std::error::Error for DownloadFailure {}

/// Result of a successful `download_year`.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: usize },
    /// The file was already present and `force` was not set.
    Existing(PathBuf),
}

pub struct LibraryClient {
    client: Client,
    library_url: Url,
    retry_delay: Duration,
}

impl LibraryClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let raw = std::env::var(LIBRARY_URL_ENV).unwrap_or_else(|_| DEFAULT_LIBRARY_URL.to_string());
        let library_url = Url::parse(&raw)
            .map_err(|e| AppError::new(2, format!("Invalid {LIBRARY_URL_ENV} '{raw}': {e}")))?;
        Self::new(library_url)
    }

    pub fn new(library_url: Url) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            library_url,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Pause between retries (defaults to `RETRY_DELAY`).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn library_url(&self) -> &Url {
        &self.library_url
    }

    /// Fetch the IR library page HTML.
    pub fn fetch_library_page(&self) -> Result<String, AppError> {
        let url = self.library_url.clone();
        with_retry("library page", self.retry_delay, || {
            let resp = self.client.get(url.clone()).send().map_err(|e| e.to_string())?;
            if !resp.status().is_success() {
                return Err(format!("status {}", resp.status()));
            }
            resp.text().map_err(|e| e.to_string())
        })
        .map_err(|e| AppError::new(4, format!("IR library request failed ({url}): {e}")))
    }

    /// Download one year's workbook into `data_dir`.
    ///
    /// An existing file is kept unless `force` is set. On failure the error
    /// names the local file that remains usable, if any.
    pub fn download_year(
        &self,
        year: i32,
        url: &Url,
        data_dir: &Path,
        force: bool,
    ) -> Result<DownloadOutcome, DownloadFailure> {
        let existing = source_path(data_dir, year);
        if let (Some(path), false) = (&existing, force) {
            info!(year, path = %path.display(), "workbook already present");
            return Ok(DownloadOutcome::Existing(path.clone()));
        }

        let failure = |message: String| DownloadFailure {
            year,
            message,
            reused_local: existing.clone(),
        };

        fs::create_dir_all(data_dir)
            .map_err(|e| failure(format!("cannot create '{}': {e}", data_dir.display())))?;

        info!(year, %url, "downloading workbook");
        let body = with_retry(&format!("{year} workbook"), self.retry_delay, || {
            let resp = self.client.get(url.clone()).send().map_err(|e| e.to_string())?;
            if !resp.status().is_success() {
                return Err(format!("status {}", resp.status()));
            }
            resp.bytes().map_err(|e| e.to_string())
        })
        .map_err(&failure)?;

        let path = data_dir.join(workbook_file_name(year, extension_of(url)));
        let partial = path.with_extension("part");
        fs::write(&partial, &body)
            .and_then(|_| fs::rename(&partial, &path))
            .map_err(|e| failure(format!("cannot write '{}': {e}", path.display())))?;

        info!(year, path = %path.display(), bytes = body.len(), "workbook saved");
        Ok(DownloadOutcome::Downloaded {
            path,
            bytes: body.len(),
        })
    }
}

/// Run `attempt` up to `MAX_ATTEMPTS` times, sleeping `delay` between tries.
fn with_retry<T>(
    what: &str,
    delay: Duration,
    mut attempt: impl FnMut() -> Result<T, String>,
) -> Result<T, String> {
    let mut last = String::new();
    for n in 1..=MAX_ATTEMPTS {
        match attempt() {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(what, attempt = n, error = %e, "request failed");
                last = e;
                if n < MAX_ATTEMPTS {
                    thread::sleep(delay);
                }
            }
        }
    }
    Err(format!("{last} (after {MAX_ATTEMPTS} attempts)"))
}

fn extension_of(url: &Url) -> &'static str {
    if url.path().to_ascii_lowercase().ends_with(".xls") {
        "xls"
    } else {
        "xlsx"
    }
}

/// Workbook links in page order, each with its byte offset.
fn workbook_links(html: &str) -> Vec<(usize, String)> {
    let patterns = [
        r#"(?i)(?:href|src)\s*=\s*["']([^"']+\.xlsx?)["']"#,
        r#"(?i)(/(?:file|download)/[^"'\s<>]+\.xlsx?)"#,
    ];

    let mut links: Vec<(usize, String)> = Vec::new();
    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(html) {
            let Some(m) = caps.get(1) else {
                continue;
            };
            if !links.iter().any(|(_, l)| l == m.as_str()) {
                links.push((m.start(), m.as_str().to_string()));
            }
        }
    }
    links.sort_by_key(|(at, _)| *at);
    links
}

/// Text within `radius` characters of `html[at..at + len]`.
fn context_around(html: &str, at: usize, len: usize, radius: usize) -> &str {
    let start = html[..at]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(at);
    let tail = at + len;
    let end = html[tail..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| tail + i)
        .unwrap_or(html.len());
    &html[start..end]
}

fn year_indicators(year: i32) -> Vec<String> {
    vec![
        format!("{year}年12月期"),
        format!("第{}期", year - FISCAL_PERIOD_OFFSET),
        format!("{year}年"),
        year.to_string(),
    ]
}

/// Map each requested year onto the first workbook link whose surrounding
/// text names that year and looks like hotel performance data.
pub fn discover_workbook_urls(html: &str, base: &Url, years: &[i32]) -> BTreeMap<i32, Url> {
    let links = workbook_links(html);
    info!(links = links.len(), "workbook links found on library page");

    let mut found = BTreeMap::new();
    for &year in years {
        let indicators = year_indicators(year);
        let hit = links.iter().find(|(at, link)| {
            let context = context_around(html, *at, link.len(), CONTEXT_CHARS);
            indicators.iter().any(|i| context.contains(i.as_str()))
                && HOTEL_KEYWORDS.iter().any(|k| context.contains(k))
        });
        match hit.and_then(|(_, link)| base.join(link).ok()) {
            Some(url) => {
                info!(year, %url, "workbook URL found");
                found.insert(year, url);
            }
            None => warn!(year, "no workbook URL found"),
        }
    }
    found
}
