//! Catalog of persisted documents (`index.json`)
//!
//! Reads only what the store wrote; titles are found heuristically by
//! searching the document tree for well-known title keys.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::Store;
use crate::writer::{WriteOutcome, write_if_changed};

/// Title keys in priority order, compared case-insensitively.
///
/// The first key with a match anywhere in the document wins; for a single
/// key, the first match in document order wins.
pub const TITLE_KEYS: &[&str] = &[
    "langue",
    "kurzue",
    "official_long_title",
    "langtitel",
    "langtitle",
    "langbezeichnung",
    "kurztitel",
    "kurztitle",
    "kurzbezeichnung",
    "titel",
    "title",
];

/// One row of `index.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub code: String,
    pub title: String,
    pub link: String,
}

/// Find a human-readable title in a converted document.
pub fn find_title(doc: &Value) -> Option<String> {
    TITLE_KEYS.iter().find_map(|key| find_key(doc, key))
}

fn find_key(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            if k.to_lowercase() == key {
                if let Some(title) = title_text(v) {
                    return Some(title);
                }
            }
            find_key(v, key)
        }),
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key)),
        _ => None,
    }
}

/// Scalar text of a title field: a string, or an element with attributes
/// whose text sits under `#text`.
fn title_text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("#text")?.as_str()?,
        _ => return None,
    };
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn index_entry(path: &Path, base_url: &str) -> Option<IndexEntry> {
    let code = path.file_stem()?.to_string_lossy().to_lowercase();

    let title = match read_title(path) {
        Ok(Some(title)) => title,
        Ok(None) => code.to_uppercase(),
        Err(e) => {
            log::warn!("{}: {e:#}", path.display());
            code.to_uppercase()
        }
    };

    Some(IndexEntry {
        link: format!("{}/{code}.json", base_url.trim_end_matches('/')),
        code,
        title,
    })
}

fn read_title(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path).context("failed to read document")?;
    let doc: Value = serde_json::from_slice(&bytes).context("failed to parse document")?;
    Ok(find_title(&doc))
}

/// Build catalog rows for every persisted document, sorted by code.
pub fn build_index(store: &Store, base_url: &str) -> Result<Vec<IndexEntry>> {
    let mut entries: Vec<IndexEntry> = store
        .document_files()?
        .iter()
        .filter_map(|path| index_entry(path, base_url))
        .collect();
    entries.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(entries)
}

/// Build the catalog and persist it as pretty JSON if it changed.
///
/// Returns the number of entries and the write outcome.
pub fn write_index(store: &Store, base_url: &str) -> Result<(usize, WriteOutcome)> {
    let entries = build_index(store, base_url)?;
    let json = serde_json::to_vec_pretty(&entries).context("failed to serialize index")?;
    let outcome = write_if_changed(&store.index_path(), &json)?;
    log::info!(
        "index.json: {} entries ({})",
        entries.len(),
        if outcome.written { "updated" } else { "unchanged" }
    );
    Ok((entries.len(), outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://example.org/law-data/data";

    #[test]
    fn title_from_first_priority_key() {
        let doc = json!({
            "dokumente": {
                "norm": [
                    {"metadaten": {
                        "jurabk": "BGB",
                        "titel": "Inhalt",
                        "langue": "Bürgerliches   Gesetzbuch"
                    }},
                    {"metadaten": {"enbez": "§ 1", "titel": "Beginn der Rechtsfähigkeit"}}
                ]
            }
        });
        assert_eq!(find_title(&doc).as_deref(), Some("Bürgerliches Gesetzbuch"));
    }

    #[test]
    fn title_key_match_is_case_insensitive() {
        let doc = json!({"Law": {"Title": "Grundgesetz"}});
        assert_eq!(find_title(&doc).as_deref(), Some("Grundgesetz"));
    }

    #[test]
    fn title_from_text_of_attributed_element() {
        let doc = json!({
            "norm": {"metadaten": {"titel": {"@format": "parat", "#text": "Zweck\n  des Gesetzes"}}}
        });
        assert_eq!(find_title(&doc).as_deref(), Some("Zweck des Gesetzes"));
    }

    #[test]
    fn no_title_key() {
        let doc = json!({"dokumente": {"norm": {"metadaten": {"jurabk": "X"}}}});
        assert_eq!(find_title(&doc), None);
    }

    #[test]
    fn empty_title_is_skipped() {
        let doc = json!({"a": {"titel": "  "}, "b": {"titel": "Echt"}});
        assert_eq!(find_title(&doc).as_deref(), Some("Echt"));
    }

    #[test]
    fn index_sorted_with_fallback_titles() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        let stgb = br#"{"dokumente":{"norm":{"metadaten":{"langue":"Strafgesetzbuch"}}}}"#;
        store.write_document("stgb", stgb).unwrap();
        store.write_document("aeg", br#"{"dokumente":null}"#).unwrap();
        store.write_document("broken", b"{not json").unwrap();

        let entries = build_index(&store, BASE).unwrap();

        assert_eq!(
            entries,
            vec![
                IndexEntry {
                    code: "aeg".into(),
                    title: "AEG".into(),
                    link: format!("{BASE}/aeg.json"),
                },
                IndexEntry {
                    code: "broken".into(),
                    title: "BROKEN".into(),
                    link: format!("{BASE}/broken.json"),
                },
                IndexEntry {
                    code: "stgb".into(),
                    title: "Strafgesetzbuch".into(),
                    link: format!("{BASE}/stgb.json"),
                },
            ]
        );
    }

    #[test]
    fn write_index_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.write_document("gg", br#"{"titel":"Grundgesetz"}"#).unwrap();

        let (count, first) = write_index(&store, &format!("{BASE}/")).unwrap();
        let (_, second) = write_index(&store, BASE).unwrap();

        assert_eq!(count, 1);
        assert!(first.written);
        assert!(!second.written);

        let written: Vec<IndexEntry> =
            serde_json::from_slice(&fs::read(store.index_path()).unwrap()).unwrap();
        assert_eq!(written[0].link, format!("{BASE}/gg.json"));
        assert_eq!(written[0].title, "Grundgesetz");
    }
}
