//! Parse cache for documents open in the editor.
//!
//! Parsing is a pure function of the text, so a result can be reused until
//! the document changes. Entries are keyed by URI and checked against both
//! the editor-reported version and a SHA-256 hash of the content.

use std::collections::HashMap;
use std::sync::Arc;

use drools_core::{parse_with_options, ParseOptions, ParseResult};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Caches the latest parse of each open document.
pub struct DocumentCache {
    options: ParseOptions,
    documents: HashMap<String, CachedParse>,
}

/// The parse of one document version.
struct CachedParse {
    version: i32,
    hash: [u8; 32],
    result: Arc<ParseResult>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl DocumentCache {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            documents: HashMap::new(),
        }
    }

    /// Return the parse of `text`, reusing the cached result when both the
    /// version and the content hash match what was parsed last time.
    pub fn get_or_parse(&mut self, uri: &str, version: i32, text: &str) -> Arc<ParseResult> {
        let hash = content_hash(text);
        if let Some(cached) = self.documents.get(uri) {
            if cached.version == version && cached.hash == hash {
                debug!(uri, version, "parse cache hit");
                return Arc::clone(&cached.result);
            }
        }

        debug!(uri, version, bytes = text.len(), "parse cache miss");
        let result = Arc::new(parse_with_options(text, &self.options));
        self.documents.insert(
            uri.to_owned(),
            CachedParse {
                version,
                hash,
                result: Arc::clone(&result),
            },
        );
        result
    }

    /// The last parse of `uri`, if any.
    pub fn get(&self, uri: &str) -> Option<Arc<ParseResult>> {
        self.documents.get(uri).map(|c| Arc::clone(&c.result))
    }

    /// Drop the cached parse of a changed or closed document.
    pub fn invalidate(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn content_hash(text: &str) -> [u8; 32] {
    let digest = Sha256::digest(text.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "file:///rules/a.drl";
    const TEXT: &str = "rule r\nwhen\n  Person()\nthen\nend\n";

    #[test]
    fn same_version_and_text_reuses_result() {
        let mut cache = DocumentCache::default();
        let first = cache.get_or_parse(URI, 1, TEXT);
        let second = cache.get_or_parse(URI, 1, TEXT);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn new_version_reparses() {
        let mut cache = DocumentCache::default();
        let first = cache.get_or_parse(URI, 1, TEXT);
        let second = cache.get_or_parse(URI, 2, TEXT);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn changed_text_under_same_version_reparses() {
        let mut cache = DocumentCache::default();
        let first = cache.get_or_parse(URI, 1, TEXT);
        let second = cache.get_or_parse(URI, 1, "rule s\nwhen\nthen\nend\n");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.ast.rules[0].name, "s");
    }

    #[test]
    fn invalidate_drops_entry() {
        let mut cache = DocumentCache::default();
        cache.get_or_parse(URI, 1, TEXT);
        cache.invalidate(URI);
        assert!(cache.is_empty());
        assert!(cache.get(URI).is_none());
    }

    #[test]
    fn options_are_applied() {
        let mut cache = DocumentCache::new(ParseOptions {
            max_errors: 1,
            ..ParseOptions::default()
        });
        let result = cache.get_or_parse(URI, 1, &"rule r\n".repeat(5));
        assert_eq!(result.errors.len(), 1);
    }
}
