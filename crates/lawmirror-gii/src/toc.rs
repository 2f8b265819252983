//! Table-of-contents feed parsing
//!
//! Parses `gii-toc.xml` (`<items><item><title/><link/></item>...</items>`)
//! into catalog entries, one per law archive.

use std::collections::HashSet;

use anyhow::{Context, Result};
use lawmirror_core::Fetcher;
use quick_xml::Reader;
use quick_xml::events::Event;

/// One law archive listed in the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Lower-case slug, e.g. `bgb`
    pub code: String,
    pub link: String,
    pub title: Option<String>,
}

/// Fetch and parse the table of contents. Any failure here is fatal to the run.
pub fn fetch_catalog(
    fetcher: &Fetcher,
    toc_url: &str,
    archive_suffix: &str,
) -> Result<Vec<CatalogEntry>> {
    let xml = fetcher
        .fetch(toc_url)
        .context("failed to fetch table of contents")?;
    parse_toc(&xml, archive_suffix).context("failed to parse table of contents")
}

/// Parse the feed, keeping links that end with `archive_suffix`.
///
/// Entries whose code cannot be derived are skipped; a code listed twice
/// keeps its first entry.
pub fn parse_toc(xml: &[u8], archive_suffix: &str) -> Result<Vec<CatalogEntry>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("XML parse error")? {
            Event::Start(e) if e.name().as_ref() == b"item" => {
                let (title, link) = parse_item(&mut reader)?;
                if let Some(entry) = catalog_entry(title, link, archive_suffix, &mut seen) {
                    entries.push(entry);
                }
            }
            Event::Start(_) | Event::Empty(_) => saw_root = true,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    anyhow::ensure!(saw_root || !entries.is_empty(), "no root element");
    Ok(entries)
}

fn catalog_entry(
    title: Option<String>,
    link: Option<String>,
    archive_suffix: &str,
    seen: &mut HashSet<String>,
) -> Option<CatalogEntry> {
    let link = link.filter(|l| l.ends_with(archive_suffix))?;
    let Some(code) = code_from_link(&link) else {
        log::warn!("cannot derive code from {link}, skipping");
        return None;
    };
    if !seen.insert(code.clone()) {
        log::warn!("{code}: listed more than once, keeping first ({link} ignored)");
        return None;
    }
    Some(CatalogEntry { code, link, title })
}

/// Parse an `<item>` block: returns (title, link)
fn parse_item(reader: &mut Reader<&[u8]>) -> Result<(Option<String>, Option<String>)> {
    let mut title = None;
    let mut link = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"title" => title = Some(read_text(reader)?),
                b"link" => link = Some(read_text(reader)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"item" => break,
            Event::Eof => anyhow::bail!("unterminated <item>"),
            _ => {}
        }
        buf.clear();
    }

    Ok((title, link.filter(|l| !l.is_empty())))
}

/// Read text content up to the matching end tag, flattening nested markup
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::Start(_) => text.push_str(&read_text(reader)?),
            Event::End(_) => break,
            Event::Eof => anyhow::bail!("unexpected end of feed"),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

/// Derive the short code from an archive link: the path segment before
/// the archive file name, lower-cased.
///
/// `https://www.gesetze-im-internet.de/bgb/xml.zip` → `bgb`
pub fn code_from_link(link: &str) -> Option<String> {
    let without_query = link.split(['?', '#']).next()?;
    let rest = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    // Drop the host
    let path = rest.split_once('/')?.1;

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }

    let code = segments[segments.len() - 2].to_lowercase();
    let valid = code != "."
        && code != ".."
        && !code.contains(['\\', ':'])
        && !code.chars().any(char::is_control);
    valid.then_some(code)
}
