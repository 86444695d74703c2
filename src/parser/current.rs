use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::html::{is_tag, split_course_heading, text_excluding};
use crate::model::{Course, CourseSet};

static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static B_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("b").unwrap());
static CREDITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.+").unwrap());

fn inside_anchor(el: ElementRef, root: ElementRef) -> bool {
    el.ancestors()
        .take_while(|a| a.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|a| is_tag(&a, "a"))
}

/// "Intellectual Foundations of Informatics (5) I&S" → "intellectual foundations of informatics"
fn strip_credits(name: &str) -> String {
    let name = match CREDITS_RE.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    };
    name.trim().to_lowercase()
}

fn parse_paragraph(p: ElementRef) -> Option<Course> {
    let bold = p.select(&B_SEL).find(|b| !inside_anchor(*b, p))?;
    let heading = text_excluding(bold, |el| is_tag(el, "a"));
    let Some((department, number, rest)) = split_course_heading(&heading) else {
        debug!("Catalog paragraph heading without three fields: {:?}", heading);
        return None;
    };
    let Ok(number) = number.trim().parse::<i32>() else {
        debug!("Catalog paragraph with non-numeric course number: {:?}", heading);
        return None;
    };
    let description = text_excluding(p, |el| is_tag(el, "a") || el.id() == bold.id());
    Some(Course::new(department, number, &strip_credits(rest), &description))
}

/// Courses listed in the current catalog page, one per paragraph.
///
/// The page's first paragraph is an introduction and links are navigation,
/// so neither contributes text.
pub fn parse_current_catalog(html: &str) -> CourseSet {
    let doc = Html::parse_document(html);
    let mut courses = CourseSet::new();
    for p in doc.select(&P_SEL).skip(1) {
        if let Some(course) = parse_paragraph(p) {
            courses.insert(course);
        }
    }
    info!("{} courses found.", courses.len());
    courses
}
