use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::{debug, info};

use super::html::{collapse_nbsp, joined_text, split_course_heading};

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr td[width='50%'] b").unwrap());

/// A course heading exactly as scraped; no case folding, number kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogEntry {
    pub department: String,
    pub number: String,
    pub name: String,
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.department, self.number, self.name)
    }
}

pub fn extract_document(html: &str) -> Vec<CatalogEntry> {
    let doc = Html::parse_document(html);
    doc.select(&HEADING_SEL)
        .filter_map(|b| {
            let text = collapse_nbsp(&joined_text(b));
            let Some((department, number, name)) = split_course_heading(&text) else {
                debug!("Skipping heading without three fields: {:?}", text);
                return None;
            };
            Some(CatalogEntry {
                department: department.to_string(),
                number: number.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

/// Unique course headings across every saved term document in `dir`.
pub fn extract_dir(dir: &Path) -> Result<BTreeSet<CatalogEntry>> {
    let mut entries = BTreeSet::new();
    let files = super::list_term_files(dir)?;
    for path in &files {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        entries.extend(extract_document(&html));
    }
    info!("Extracted {} unique courses from {} documents", entries.len(), files.len());
    Ok(entries)
}

pub fn write_courses(path: &Path, entries: &BTreeSet<CatalogEntry>) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = std::io::BufWriter::new(file);
    for entry in entries {
        writeln!(out, "{}", entry)?;
    }
    out.flush()?;
    Ok(())
}
