use scraper::ElementRef;

/// Text nodes under `root`, each trimmed, blanks dropped, joined by one space.
pub fn joined_text(root: ElementRef) -> String {
    text_excluding(root, |_| false)
}

/// Like [`joined_text`], but text inside any element matching `hidden` is left out.
pub fn text_excluding(root: ElementRef, hidden: impl Fn(&ElementRef) -> bool) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let is_hidden = node
            .ancestors()
            .take_while(|a| a.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|el| hidden(&el));
        if is_hidden {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    parts.join(" ")
}

/// Split a bold course heading ("INFO 200 Intellectual Foundations") into
/// department, number and name. Old pages pad the number with `&nbsp;&nbsp; `.
pub fn split_course_heading(text: &str) -> Option<(&str, &str, &str)> {
    let mut parts = text.splitn(3, ' ');
    let department = parts.next()?;
    let number = parts.next()?;
    let name = parts.next()?;
    Some((department, number, name))
}

/// Collapse the `"\u{a0}\u{a0} "` run that separates department and number.
pub fn collapse_nbsp(text: &str) -> String {
    text.replace("\u{a0}\u{a0} ", " ")
}

pub fn is_tag(el: &ElementRef, name: &str) -> bool {
    el.value().name() == name
}
