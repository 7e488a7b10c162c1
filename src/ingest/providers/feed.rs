// src/ingest/providers/feed.rs
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use feed_rs::model::{Entry, Link};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::bytes::{Captures, Regex};
use std::borrow::Cow;

use crate::config::Source;
use crate::ingest::normalize_text;
use crate::ingest::types::{CandidateItem, Extract, NO_TITLE};

/// Extractor for syndication feeds (RSS 0.9x/2.0, RDF, Atom).
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedExtractor;

impl Extract for FeedExtractor {
    fn extract(&self, _source: &Source, raw: &[u8]) -> Result<Vec<CandidateItem>> {
        parse_feed(raw)
    }
}

/// Parse a feed document into candidates, in document order.
///
/// Takes raw bytes so the document's own `encoding` declaration is honoured.
pub fn parse_feed(raw: &[u8]) -> Result<Vec<CandidateItem>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(raw);

    let feed = feed_rs::parser::parse(&xml[..]).context("parsing feed document")?;

    // Dates as written in the document; feed-rs only keeps parsed values.
    let raw_dates = raw_entry_dates(&xml).filter(|d| d.len() == feed.entries.len());
    if raw_dates.is_none() {
        tracing::debug!("raw entry dates unavailable, using parsed timestamps");
    }

    let out: Vec<CandidateItem> = feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let raw = raw_dates.as_ref().map(|d| d[i].as_str());
            into_candidate(entry, raw)
        })
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("monitor_parse_ms").record(ms);
    counter!("monitor_items_fetched_total").increment(out.len() as u64);
    Ok(out)
}

fn into_candidate(entry: Entry, raw_date: Option<&str>) -> CandidateItem {
    let link = permalink(&entry.links).or_else(|| {
        // RSS permalink guids end up as the entry id.
        let id = entry.id.trim();
        (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
    });

    let summary = entry
        .summary
        .map(|t| t.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body));

    let published = match raw_date {
        Some(d) => d.to_string(),
        None => entry
            .published
            .or(entry.updated)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
    };

    let title = normalize_text(entry.title.as_ref().map_or("", |t| t.content.as_str()));
    CandidateItem {
        title: if title.is_empty() {
            NO_TITLE.to_string()
        } else {
            title
        },
        summary: normalize_text(summary.as_deref().unwrap_or_default()),
        link: link.unwrap_or_default(),
        published,
    }
}

/// The alternate link (or one with no `rel`), else the first link.
fn permalink(links: &[Link]) -> Option<String> {
    links
        .iter()
        .filter(|l| !l.href.trim().is_empty())
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.iter().find(|l| !l.href.trim().is_empty()))
        .map(|l| l.href.trim().to_string())
}

/// Direct-child date elements of an item/entry, in preference order.
const DATE_TAGS: [&[u8]; 4] = [b"pubDate", b"date", b"published", b"updated"];

/// Verbatim published-or-updated string of every `<item>`/`<entry>`, in
/// document order. `None` if the document cannot be scanned.
fn raw_entry_dates(xml: &[u8]) -> Option<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    let mut depth = 0usize;
    let mut entry_at: Option<usize> = None;
    let mut slots: [Option<String>; 4] = Default::default();
    let mut capture: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                match entry_at {
                    None if matches!(name.as_ref(), b"item" | b"entry") => {
                        entry_at = Some(depth);
                        slots = Default::default();
                    }
                    Some(at) if depth == at + 1 => {
                        capture = DATE_TAGS.iter().position(|t| *t == name.as_ref());
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if entry_at.is_none() && matches!(e.local_name().as_ref(), b"item" | b"entry") {
                    out.push(String::new());
                }
            }
            Event::Text(t) => {
                if let Some(i) = capture {
                    let text = t
                        .unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    slots[i].get_or_insert_with(String::new).push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(i) = capture {
                    slots[i]
                        .get_or_insert_with(String::new)
                        .push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                capture = None;
                if entry_at == Some(depth) {
                    let date = slots
                        .iter()
                        .flatten()
                        .map(|s| s.trim())
                        .find(|s| !s.is_empty())
                        .unwrap_or_default();
                    out.push(date.to_string());
                    entry_at = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Some(out)
}

/// Rewrite HTML named entities (undefined in XML) to numeric references.
/// Names that html-escape does not know are escaped so they survive as text.
///
/// Works on bytes: `&`, `;` and ASCII names never occur inside a multi-byte
/// character of the encodings feeds are served in, so any declared encoding
/// is left intact.
fn scrub_html_entities_for_xml(s: &[u8]) -> Cow<'_, [u8]> {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{0,31});").expect("entity regex"));

    re.replace_all(s, |caps: &Captures<'_>| {
        let whole = String::from_utf8_lossy(&caps[0]);
        if matches!(&caps[1], b"amp" | b"lt" | b"gt" | b"quot" | b"apos") {
            return whole.into_owned().into_bytes();
        }
        let decoded = html_escape::decode_html_entities(&whole);
        if decoded == whole {
            return format!("&amp;{}", &whole[1..]).into_bytes();
        }
        decoded
            .chars()
            .map(|c| format!("&#{};", c as u32))
            .collect::<String>()
            .into_bytes()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrub(s: &str) -> String {
        String::from_utf8(scrub_html_entities_for_xml(s.as_bytes()).into_owned()).unwrap()
    }

    #[test]
    fn scrub_maps_named_entities_to_numeric() {
        assert_eq!(scrub("a&nbsp;b"), "a&#160;b");
        assert_eq!(scrub("x &amp; y &lt;"), "x &amp; y &lt;");
        assert_eq!(scrub("&bogus;"), "&amp;bogus;");
        assert_eq!(scrub("&#38; plain"), "&#38; plain");
    }

    #[test]
    fn raw_dates_follow_entries_and_skip_feed_level() {
        let xml = br#"<feed xmlns="http://www.w3.org/2005/Atom">
            <updated>2025-01-01T00:00:00Z</updated>
            <entry><updated>2025-09-06T12:00:00Z</updated>
              <source><updated>1999-01-01T00:00:00Z</updated></source></entry>
            <entry><published>Sun, 07 Sep 2025</published><updated>x</updated></entry>
            <entry><title>no date</title></entry>
        </feed>"#;
        assert_eq!(
            raw_entry_dates(xml).unwrap(),
            vec!["2025-09-06T12:00:00Z", "Sun, 07 Sep 2025", ""]
        );
    }

    #[test]
    fn rss_guid_permalink_fills_missing_link() {
        let xml = br#"<rss version="2.0"><channel><title>t</title>
            <item><title>A</title><guid>https://a.test/1</guid></item>
            <item><title>B</title><guid isPermaLink="false">tag:b</guid></item>
        </channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0].link, "https://a.test/1");
        assert_eq!(items[1].link, "");
    }

    #[test]
    fn repeated_link_keeps_earlier_items() {
        let xml = br#"<rss version="2.0"><channel><title>t</title>
            <item><title>Good</title><link>https://x.test/1</link></item>
            <item><title>Twice</title><link>https://x.test/2</link><link>https://x.test/2b</link></item>
        </channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Good");
        assert_eq!(items[1].link, "https://x.test/2");
    }

    #[test]
    fn unknown_root_is_an_error() {
        assert!(parse_feed(b"<html><body>nope</body></html>").is_err());
    }
}
