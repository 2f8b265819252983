//! Blake3 content fingerprints for change detection

/// Fingerprint of a serialized output.
pub fn fingerprint(data: &[u8]) -> blake3::Hash {
    blake3::hash(data)
}

/// Whether `candidate` differs from what is currently persisted.
///
/// `existing` is `None` when nothing has been persisted yet. Pure: the caller
/// reads the bytes.
pub fn has_changed(candidate: &[u8], existing: Option<&[u8]>) -> bool {
    match existing {
        None => true,
        Some(existing) => fingerprint(candidate) != fingerprint(existing),
    }
}

/// Return the first 8 hex characters of a blake3 hash.
pub fn short_hash(hash: &blake3::Hash) -> String {
    hash.to_hex()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_deterministic() {
        assert_eq!(fingerprint(b"{\"id\":\"1\"}"), fingerprint(b"{\"id\":\"1\"}"));
    }

    #[test]
    fn absent_output_counts_as_changed() {
        assert!(has_changed(b"{}", None));
        assert!(has_changed(b"", None));
    }

    #[test]
    fn identical_bytes_unchanged() {
        let doc = br#"{"dokumente":{"norm":null}}"#;
        assert!(!has_changed(doc, Some(doc)));
    }

    #[test]
    fn single_character_difference_detected() {
        let old = br#"{"id":"242","heading":"Leistung nach Treu und Glauben","text":"a"}"#;
        let new = br#"{"id":"242","heading":"Leistung nach Treu und Glauben","text":"b"}"#;
        assert_ne!(fingerprint(old), fingerprint(new));
        assert!(has_changed(new, Some(old)));
    }

    #[test]
    fn short_hash_length() {
        assert_eq!(short_hash(&fingerprint(b"bgb")).len(), 8);
    }
}
