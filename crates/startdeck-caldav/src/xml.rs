//! WebDAV/CalDAV XML handling.
//!
//! Two halves:
//!
//! - Request-body generation for `PROPFIND` and `calendar-query` `REPORT`
//!   (quick-xml `Writer`).
//! - Multistatus extraction: [`extract_all`] returns the raw inner content
//!   of every element with a given local name, in document order. Inner
//!   content may itself contain nested elements; callers re-extract
//!   recursively (e.g. pulling `href` out of a `calendar-home-set` block).
//!
//! Extraction is namespace-agnostic (prefixes are ignored) and tolerant of
//! attributes on the opening tag. Malformed XML is reported as an explicit
//! [`XmlError`] so callers can tell "the host returned garbage" apart from
//! "the host returned XML with zero matches".

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

use startdeck_core::TimeWindow;

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// The upstream response was not well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed XML near byte {position}: {message}")]
pub struct XmlError {
    /// Byte offset of the parse failure.
    pub position: u64,
    /// Parser description of the failure.
    pub message: String,
}

/// Extracts the raw inner content of every element whose local name matches
/// `local`, in document order.
///
/// Self-closing matches (`<c:calendar-data/>`) contribute an empty string.
/// Nested elements of the same local name are kept inside their outermost
/// match rather than reported separately.
pub fn extract_all(xml: &str, local: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    // Depth of nesting within elements matching `local`; content is sliced
    // out of the input between the outermost open and close tags.
    let mut depth = 0usize;
    let mut capture_start = 0usize;

    loop {
        let pos_before = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if matches_local(e.name().as_ref(), local) {
                    if depth == 0 {
                        capture_start = reader.buffer_position() as usize;
                    }
                    depth += 1;
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 && matches_local(e.name().as_ref(), local) {
                    out.push(String::new());
                }
            }
            Ok(Event::End(e)) => {
                if depth > 0 && matches_local(e.name().as_ref(), local) {
                    depth -= 1;
                    if depth == 0 {
                        out.push(xml[capture_start..pos_before as usize].to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(XmlError {
                    position: reader.error_position(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(out)
}

/// Extracts the first matching element's inner content, if any.
pub fn extract_first(xml: &str, local: &str) -> Result<Option<String>, XmlError> {
    Ok(extract_all(xml, local)?.into_iter().next())
}

/// Normalizes an extracted fragment to plain text: trims surrounding
/// whitespace, unwraps a CDATA section and resolves XML entity escapes.
///
/// Used for leaf payloads (`href`, `displayname`, `calendar-data`); blocks
/// that still contain markup go back through [`extract_all`] instead.
pub fn text_content(fragment: &str) -> String {
    let trimmed = fragment.trim();
    let inner = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed);
    match quick_xml::escape::unescape(inner) {
        Ok(text) => text.into_owned(),
        Err(_) => inner.to_string(),
    }
}

/// Compares a possibly prefixed element name against a local name.
fn matches_local(name: &[u8], local: &str) -> bool {
    let without_prefix = name.rsplit(|b| *b == b':').next().unwrap_or(name);
    without_prefix == local.as_bytes()
}

/// Generates the PROPFIND body used by calendar discovery.
///
/// Requests the properties needed to locate and identify calendars:
/// `current-user-principal`, `calendar-home-set`, `displayname`,
/// `resourcetype`.
pub fn propfind_body() -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut propfind = BytesStart::new("d:propfind");
    propfind.push_attribute(("xmlns:d", DAV_NS));
    propfind.push_attribute(("xmlns:c", CALDAV_NS));
    writer.write_event(Event::Start(propfind)).unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("d:prop")))
        .unwrap();
    write_empty_element(&mut writer, "d:current-user-principal");
    write_empty_element(&mut writer, "c:calendar-home-set");
    write_empty_element(&mut writer, "d:displayname");
    write_empty_element(&mut writer, "d:resourcetype");
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("d:prop")))
        .unwrap();

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("d:propfind")))
        .unwrap();

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).unwrap()
}

/// Generates a `calendar-query` REPORT body with a VEVENT time-range filter.
pub fn calendar_query_body(window: &TimeWindow) -> String {
    let (start, end) = window.to_caldav_range();
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut query = BytesStart::new("c:calendar-query");
    query.push_attribute(("xmlns:d", DAV_NS));
    query.push_attribute(("xmlns:c", CALDAV_NS));
    writer.write_event(Event::Start(query)).unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("d:prop")))
        .unwrap();
    write_empty_element(&mut writer, "d:getetag");
    write_empty_element(&mut writer, "c:calendar-data");
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("d:prop")))
        .unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("c:filter")))
        .unwrap();

    let mut vcal_filter = BytesStart::new("c:comp-filter");
    vcal_filter.push_attribute(("name", "VCALENDAR"));
    writer.write_event(Event::Start(vcal_filter)).unwrap();

    let mut vevent_filter = BytesStart::new("c:comp-filter");
    vevent_filter.push_attribute(("name", "VEVENT"));
    writer.write_event(Event::Start(vevent_filter)).unwrap();

    let mut time_range = BytesStart::new("c:time-range");
    time_range.push_attribute(("start", start.as_str()));
    time_range.push_attribute(("end", end.as_str()));
    writer.write_event(Event::Empty(time_range)).unwrap();

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("c:comp-filter")))
        .unwrap();
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("c:comp-filter")))
        .unwrap();
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("c:filter")))
        .unwrap();
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("c:calendar-query")))
        .unwrap();

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).unwrap()
}

fn write_empty_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str) {
    writer
        .write_event(Event::Empty(BytesStart::new(name)))
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn extract_ignores_namespace_prefixes() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:href>/cal/a/</d:href><href>/cal/b/</href></d:multistatus>"#;
        let hrefs = extract_all(xml, "href").unwrap();
        assert_eq!(hrefs, vec!["/cal/a/", "/cal/b/"]);
    }

    #[test]
    fn extract_tolerates_attributes_on_opening_tag() {
        let xml = r#"<root><data xmlns:x="urn:x" version="2">payload</data></root>"#;
        assert_eq!(extract_all(xml, "data").unwrap(), vec!["payload"]);
    }

    #[test]
    fn extract_preserves_nested_markup_for_re_extraction() {
        let xml = r#"<propstat><prop><c:calendar-home-set xmlns:c="urn:c"><href>/cal/home/</href></c:calendar-home-set></prop></propstat>"#;
        let homes = extract_all(xml, "calendar-home-set").unwrap();
        assert_eq!(homes.len(), 1);
        assert!(homes[0].contains("<href>"));

        let href = extract_first(&homes[0], "href").unwrap();
        assert_eq!(href.as_deref(), Some("/cal/home/"));
    }

    #[test]
    fn extract_handles_nested_same_name_elements() {
        let xml = "<r><box>outer <box>inner</box> tail</box><box>second</box></r>";
        let boxes = extract_all(xml, "box").unwrap();
        assert_eq!(boxes, vec!["outer <box>inner</box> tail", "second"]);
    }

    #[test]
    fn self_closing_match_yields_empty_content() {
        let xml = r#"<prop><c:calendar-data xmlns:c="urn:c"/></prop>"#;
        assert_eq!(extract_all(xml, "calendar-data").unwrap(), vec![String::new()]);
    }

    #[test]
    fn zero_matches_is_not_an_error() {
        let xml = "<multistatus></multistatus>";
        assert!(extract_all(xml, "calendar-data").unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_an_explicit_error() {
        let xml = "<multistatus><response></multistatus>";
        let err = extract_all(xml, "response").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn text_content_unwraps_cdata_and_entities() {
        assert_eq!(text_content("<![CDATA[BEGIN:VCALENDAR]]>"), "BEGIN:VCALENDAR");
        assert_eq!(text_content(" Work &amp; Life "), "Work & Life");
        assert_eq!(text_content("plain"), "plain");
    }

    #[test]
    fn propfind_body_requests_discovery_properties() {
        let body = propfind_body();
        assert!(body.contains("propfind"));
        assert!(body.contains("current-user-principal"));
        assert!(body.contains("calendar-home-set"));
        assert!(body.contains("displayname"));
        assert!(body.contains("resourcetype"));
        assert!(body.contains(DAV_NS));
        assert!(body.contains(CALDAV_NS));
    }

    #[test]
    fn calendar_query_body_carries_time_range() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        );
        let body = calendar_query_body(&window);

        assert!(body.contains("calendar-query"));
        assert!(body.contains("VCALENDAR"));
        assert!(body.contains("VEVENT"));
        assert!(body.contains(r#"start="20240101T000000Z""#));
        assert!(body.contains(r#"end="20240201T000000Z""#));
    }

    #[test]
    fn extractor_matches_body_builder_output() {
        // The generated bodies go through the same extractor in tests
        // elsewhere; sanity check they are well-formed.
        let body = propfind_body();
        assert!(extract_all(&body, "prop").is_ok());
    }
}
