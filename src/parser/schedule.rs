use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::html::{collapse_nbsp, joined_text, split_course_heading};
use crate::model::{Course, Professor, Quarter};
use crate::normalize::canonical_course_name;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static HEADER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr td[width='50%'] b").unwrap());
static PRE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("pre").unwrap());

// "200 a  1": course number, section letter, start of the SLN column
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+ [a-z]  [0-9]").unwrap());
static WITH_MIDDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  [a-z.\-]+,[a-z.\-]+ [a-z.\-]+  ").unwrap());
static NO_MIDDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  [a-z.\-]+,[a-z.\-]+  ").unwrap());

/// Instructor name as printed in a section row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorName {
    pub last: String,
    pub first: String,
    pub middle: Option<char>,
}

#[derive(Debug, PartialEq, Eq)]
enum TableKind {
    CourseHeader,
    SectionListing,
    Other,
}

fn classify(table: ElementRef) -> TableKind {
    match table.value().attrs().next().map(|(name, _)| name) {
        Some("bgcolor") => TableKind::CourseHeader,
        Some("width") if table.select(&PRE_SEL).next().is_some() => TableKind::SectionListing,
        _ => TableKind::Other,
    }
}

/// Course named by a header table, with its title mapped to the catalog spelling.
fn parse_course_header(table: ElementRef) -> Option<Course> {
    let bold = table.select(&HEADER_SEL).next()?;
    let text = collapse_nbsp(&joined_text(bold));
    let (department, number, name) = split_course_heading(&text)?;
    let Ok(number) = number.trim().parse::<i32>() else {
        debug!("Course header with non-numeric number: {:?}", text);
        return None;
    };
    let name = name.trim().to_lowercase();
    Some(Course::new(department, number, canonical_course_name(&name), ""))
}

/// Pull the instructor out of one lowercased section row.
///
/// Rows without a section marker are not section rows. The `last,first middle`
/// form is tried before `last,first`, and single-letter first names are noise.
pub fn parse_instructor(text: &str) -> Option<InstructorName> {
    SECTION_RE.find(text)?;

    let name = if let Some(m) = WITH_MIDDLE_RE.find(text) {
        let mut parts = m.as_str().trim().split([',', ' ']);
        let last = parts.next()?;
        let first = parts.next()?;
        let middle = parts.next()?.chars().next();
        InstructorName {
            last: last.trim().to_string(),
            first: first.trim().to_string(),
            middle,
        }
    } else {
        let m = NO_MIDDLE_RE.find(text)?;
        let (last, first) = m.as_str().trim().split_once(',')?;
        InstructorName {
            last: last.trim().to_string(),
            first: first.trim().to_string(),
            middle: None,
        }
    };

    if name.first.chars().count() <= 1 {
        debug!("Discarding single-letter first name: {:?}", name);
        return None;
    }
    Some(name)
}

/// Every instructor appearance in one term's schedule, in document order.
pub fn parse_schedule(html: &str, year: i32, quarter: Quarter) -> Vec<Professor> {
    let doc = Html::parse_document(html);
    let mut professors = Vec::new();
    let mut current: Option<Course> = None;

    for table in doc.select(&TABLE_SEL) {
        match classify(table) {
            TableKind::CourseHeader => {
                if let Some(course) = parse_course_header(table) {
                    current = Some(course);
                }
            }
            TableKind::SectionListing => {
                let Some(pre) = table.select(&PRE_SEL).next() else {
                    continue;
                };
                let text = joined_text(pre).to_lowercase();
                let Some(name) = parse_instructor(&text) else {
                    continue;
                };
                let Some(course) = &current else {
                    debug!("Section row before any course header: {:?}", text);
                    continue;
                };
                professors.push(Professor {
                    first_name: name.first,
                    last_name: name.last,
                    middle_name: name.middle,
                    quarter,
                    year,
                    course: course.clone(),
                });
            }
            TableKind::Other => {}
        }
    }

    professors
}

/// Parse every `INFO_{YEAR}_{QUARTER}.html` in `dir` and concatenate the results.
pub fn parse_schedule_dir(dir: &Path) -> Result<Vec<Professor>> {
    let mut professors = Vec::new();
    for path in super::list_term_files(dir)? {
        let Some((year, quarter)) = super::parse_term_filename(&path) else {
            warn!("Skipping {:?}: file name does not encode a term", path);
            continue;
        };
        let html = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let found = parse_schedule(&html, year, quarter);
        debug!("{} {}: {} instructor rows", quarter, year, found.len());
        professors.extend(found);
    }
    info!("{} professors found.", professors.len());
    Ok(professors)
}
