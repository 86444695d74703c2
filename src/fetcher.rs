use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, WINDOWS_1252};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use scraper::Html;
use tracing::info;

use crate::model::{Quarter, QUARTERS};

pub const DEFAULT_BASE_URL: &str = "https://www.washington.edu";

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub saved: usize,
    pub missing: usize,
}

pub fn term_url(base: &str, quarter: Quarter, year: i32) -> String {
    format!(
        "{}/students/timeschd/{}{}/info.html",
        base.trim_end_matches('/'),
        quarter,
        year
    )
}

pub fn term_path(dir: &Path, year: i32, quarter: Quarter) -> PathBuf {
    dir.join(format!("INFO_{}_{}.html", year, quarter))
}

fn declared_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches('"').as_bytes())
    })
}

/// Decode a page body: the declared charset if any, else UTF-8, else windows-1252.
///
/// Older archived schedules are Latin-1 and are served without a charset.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type.and_then(declared_charset) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// GET one term's schedule; `Ok(None)` when the term has no schedule.
async fn fetch_term(client: &Client, url: &str) -> Result<Option<String>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?;
    let status = response.status();
    if status != StatusCode::OK {
        info!("Failure: {} ({})", url, status.as_u16());
        return Ok(None);
    }
    info!("Success: {}", url);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?;
    let body = decode_body(&bytes, content_type.as_deref());
    Ok(Some(Html::parse_document(&body).html()))
}

/// Download every (year, quarter) schedule in range into `out_dir`.
pub async fn fetch_terms(
    base: &str,
    years: RangeInclusive<i32>,
    out_dir: &Path,
) -> Result<FetchStats> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {:?}", out_dir))?;

    let client = Client::new();
    let terms: Vec<(i32, Quarter)> = years
        .flat_map(|y| QUARTERS.into_iter().map(move |q| (y, q)))
        .collect();

    let pb = ProgressBar::new(terms.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut saved = 0usize;
    let mut missing = 0usize;
    for &(year, quarter) in &terms {
        let url = term_url(base, quarter, year);
        match fetch_term(&client, &url).await? {
            Some(html) => {
                let path = term_path(out_dir, year, quarter);
                std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                saved += 1;
            }
            None => missing += 1,
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} terms ({} saved, {} missing)", terms.len(), saved, missing);

    Ok(FetchStats {
        total: terms.len(),
        saved,
        missing,
    })
}
