use scraper::{ElementRef, Html};

use crate::types::EventRecord;

/// Class-attribute keywords marking an element as an event container.
///
/// Deliberately loose: over-inclusive extraction is fine because the
/// engine narrows results by the configured target keyword.
const CONTAINER_CLASS_KEYWORDS: &[&str] = &["match", "event", "competition"];

/// Extract candidate event records from listing markup, in document order.
///
/// Lazy and restartable; call again on the same document for a fresh pass.
/// An element qualifies when its own class attribute, or the nearest
/// ancestor's when it has none, contains a container keyword.
pub fn extract_records(document: &Html) -> impl Iterator<Item = EventRecord> + '_ {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "a" | "div"))
        .filter(|el| qualifies(*el))
        .filter_map(to_record)
}

fn qualifies(el: ElementRef<'_>) -> bool {
    let class = el.value().attr("class").or_else(|| {
        el.ancestors()
            .filter_map(ElementRef::wrap)
            .find_map(|ancestor| ancestor.value().attr("class"))
    });
    match class {
        Some(class) => {
            let class = class.to_lowercase();
            CONTAINER_CLASS_KEYWORDS
                .iter()
                .any(|keyword| class.contains(keyword))
        }
        None => false,
    }
}

fn to_record(el: ElementRef<'_>) -> Option<EventRecord> {
    let title = normalize_whitespace(el.text().collect::<String>().as_str());
    if title.is_empty() {
        return None;
    }
    Some(EventRecord::new(title, detail_url(el)))
}

/// The element's own href, else the first descendant anchor's, else the
/// nearest ancestor anchor's. Container divs without any link yield an
/// empty URL; the engine treats those as unresolvable.
fn detail_url(el: ElementRef<'_>) -> String {
    if let Some(href) = el.value().attr("href") {
        return href.to_string();
    }
    let descendant = el
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|node| node.value().attr("href"));
    if let Some(href) = descendant {
        return href.to_string();
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|node| node.value().attr("href"))
        .unwrap_or_default()
        .to_string()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchors_with_matching_class() {
        let html = Html::parse_document(
            r#"<html><body>
                <a class="match-link" href="/register/1">NSPS Run & Gun 07/28/25</a>
                <a class="nav-link" href="/about">About the club</a>
            </body></html>"#,
        );
        let records: Vec<_> = extract_records(&html).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "NSPS Run & Gun 07/28/25");
        assert_eq!(records[0].detail_url, "/register/1");
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let html = Html::parse_document(
            r#"<div class="UpcomingEvents"><a href="/register/2">Steel Night</a></div>"#,
        );
        let records: Vec<_> = extract_records(&html).collect();
        assert!(records.iter().any(|r| r.title == "Steel Night"));
    }

    #[test]
    fn classless_element_inherits_nearest_ancestor_class() {
        let html = Html::parse_document(
            r#"<div class="competition-list"><div><a href="/register/3">Club Match</a></div></div>"#,
        );
        let records: Vec<_> = extract_records(&html).collect();
        // Outer div, inner div, and anchor all qualify; every record
        // resolves to the same title and URL.
        assert!(!records.is_empty());
        for record in &records {
            assert_eq!(record.title, "Club Match");
            assert_eq!(record.detail_url, "/register/3");
        }
    }

    #[test]
    fn container_div_takes_descendant_anchor_href() {
        let html = Html::parse_document(
            r#"<div class="match-card">
                <span>NSPS Run & Gun</span>
                <a href="/register/4">Register</a>
            </div>"#,
        );
        let records: Vec<_> = extract_records(&html).collect();
        let card = records
            .iter()
            .find(|r| r.title.starts_with("NSPS"))
            .expect("card record");
        assert_eq!(card.detail_url, "/register/4");
    }

    #[test]
    fn document_order_is_preserved() {
        let html = Html::parse_document(
            r#"<body>
                <a class="event" href="/a">First</a>
                <a class="event" href="/b">Second</a>
                <a class="event" href="/c">Third</a>
            </body>"#,
        );
        let titles: Vec<_> = extract_records(&html).map(|r| r.title).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn non_matching_markup_yields_nothing() {
        let html = Html::parse_document(
            r#"<div class="footer"><a href="/privacy">Privacy</a></div>"#,
        );
        assert_eq!(extract_records(&html).count(), 0);
    }

    #[test]
    fn titles_are_whitespace_normalized() {
        let html = Html::parse_document(
            "<a class=\"match\" href=\"/r\">  NSPS\n   Run &amp; Gun  </a>",
        );
        let records: Vec<_> = extract_records(&html).collect();
        assert_eq!(records[0].title, "NSPS Run & Gun");
    }
}
