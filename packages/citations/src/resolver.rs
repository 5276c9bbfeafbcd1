// ABOUTME: Locates [Source: ...] markers and rewrites them into references
// ABOUTME: Resolution ladder: UUID metadata map, source id, title, positional index, title scan

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use url::Url;

use ragline_core::keys::{is_uuid_key, normalize_citation_key, unbraced_citation_key};
use ragline_core::{DocumentCitationMetadata, RagDocument, SourceKind};

use crate::reference::{document_url, SourceReference};

lazy_static! {
    // [Source 6], [Source: ML21049A274], [Source: 7, 26, 38]
    static ref SOURCE_MARKER: Regex = Regex::new(r"(?i)\[Source:?\s*([^\]]+)\]").unwrap();
    // "; Source " re-occurring inside a bracket acts as another separator
    static ref SOURCE_REPEAT: Regex = Regex::new(r"(?i);\s*Source\s+").unwrap();
}

/// Titles that mean the backend had nothing useful for the document.
const PLACEHOLDER_TITLES: [&str; 3] = ["unknown", "untitled", "n/a"];

/// What one citation token resolved to.
enum Resolution {
    /// A document reference worth emitting
    Reference(SourceReference),
    /// Resolved to a document but gated out: neither referenced nor kept as text
    Gated,
    /// Nothing matched; the token is dropped, the bracket may survive verbatim
    Unmatched,
}

/// Rewrites inline citation markers in finalized response text.
///
/// When an API base URL is configured, references resolved through the
/// metadata map carry a direct `/get_document` retrieval URL; everything else
/// falls back to an embedded preview payload.
#[derive(Debug, Clone, Default)]
pub struct CitationResolver {
    api_base: Option<Url>,
}

impl CitationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(api_base: Url) -> Self {
        Self {
            api_base: Some(api_base),
        }
    }

    /// Replace every recognized citation marker in `text` with reference
    /// markup. Unresolvable brackets are left untouched; this never fails.
    pub fn resolve(
        &self,
        text: &str,
        documents: &[RagDocument],
        metadata: Option<&HashMap<String, DocumentCitationMetadata>>,
    ) -> String {
        if documents.is_empty() && metadata.map_or(true, |m| m.is_empty()) {
            return text.to_string();
        }

        let by_source_id: HashMap<&str, &RagDocument> = documents
            .iter()
            .map(|doc| (doc.source.id.as_str(), doc))
            .collect();
        let by_title: HashMap<&str, &RagDocument> = documents
            .iter()
            .filter(|doc| !doc.title.is_empty())
            .map(|doc| (doc.title.as_str(), doc))
            .collect();

        SOURCE_MARKER
            .replace_all(text, |caps: &Captures| {
                self.resolve_bracket(&caps[0], &caps[1], documents, &by_source_id, &by_title, metadata)
            })
            .into_owned()
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_bracket(
        &self,
        original: &str,
        body: &str,
        documents: &[RagDocument],
        by_source_id: &HashMap<&str, &RagDocument>,
        by_title: &HashMap<&str, &RagDocument>,
        metadata: Option<&HashMap<String, DocumentCitationMetadata>>,
    ) -> String {
        // Normalize "; Source " separators to commas, then split
        let normalized = SOURCE_REPEAT.replace_all(body, ", ");
        let mut seen_tokens = HashSet::new();
        let tokens: Vec<&str> = normalized
            .split([',', ';'])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter(|token| seen_tokens.insert(token.to_string()))
            .collect();

        let mut references: Vec<SourceReference> = Vec::new();
        let mut seen_titles = HashSet::new();
        let mut any_gated = false;

        for token in tokens {
            match self.resolve_token(token, documents, by_source_id, by_title, metadata) {
                Resolution::Reference(reference) => {
                    // Collapse duplicates by resolved title; first occurrence wins
                    if seen_titles.insert(reference.title.clone()) {
                        references.push(reference);
                    }
                }
                Resolution::Gated => any_gated = true,
                Resolution::Unmatched => {
                    debug!(token, "no document found for citation token");
                }
            }
        }

        if !references.is_empty() {
            references
                .iter()
                .map(SourceReference::to_markup)
                .collect::<Vec<_>>()
                .join(" ")
        } else if any_gated {
            // A gated document is dropped entirely, not left as raw text
            String::new()
        } else {
            // Nothing resolved at all: keep the original marker verbatim
            original.to_string()
        }
    }

    fn resolve_token(
        &self,
        token: &str,
        documents: &[RagDocument],
        by_source_id: &HashMap<&str, &RagDocument>,
        by_title: &HashMap<&str, &RagDocument>,
        metadata: Option<&HashMap<String, DocumentCitationMetadata>>,
    ) -> Resolution {
        // 1. UUID tokens resolve through the metadata map only
        if is_uuid_key(token) {
            let Some(map) = metadata else {
                return Resolution::Unmatched;
            };
            let braced = normalize_citation_key(token).unwrap_or_else(|| token.to_string());
            let entry = map.get(&braced).or_else(|| {
                unbraced_citation_key(token).and_then(|unbraced| map.get(&unbraced))
            });
            return match entry {
                Some(meta) => Resolution::Reference(self.metadata_reference(&braced, token, meta)),
                None => Resolution::Unmatched,
            };
        }

        // 2./3. Exact source-identifier match, then exact title match
        if let Some(doc) = by_source_id.get(token).or_else(|| by_title.get(token)) {
            return self.document_reference(doc, token);
        }

        // 4. Bare integers index into the document list, 1-based first.
        // Digits only: parse::<usize> would also accept a leading '+'.
        if token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = token.parse::<usize>() {
                let doc = index
                    .checked_sub(1)
                    .and_then(|i| documents.get(i))
                    .or_else(|| documents.get(index));
                if let Some(doc) = doc {
                    return self.document_reference(doc, token);
                }
            }
        }

        // 5. Last resort: scan metadata entries for a verbatim title match
        if let Some(map) = metadata {
            if let Some((key, meta)) = map
                .iter()
                .find(|(_, meta)| meta.document_title == token)
            {
                return Resolution::Reference(self.metadata_reference(key, token, meta));
            }
        }

        Resolution::Unmatched
    }

    fn metadata_reference(
        &self,
        key: &str,
        token: &str,
        meta: &DocumentCitationMetadata,
    ) -> SourceReference {
        let url = self.api_base.as_ref().and_then(|base| {
            document_url(base, &meta.path_name, &meta.file_name).map(|url| url.to_string())
        });
        SourceReference {
            id: key.to_string(),
            title: meta.document_title.clone(),
            source_id: token.to_string(),
            url,
        }
    }

    /// Missing-metadata gating for documents resolved out of the RAG list: a
    /// reference needs a usable title, and a document that also lacks its
    /// category-required identifier is dropped outright.
    fn document_reference(&self, doc: &RagDocument, token: &str) -> Resolution {
        let required_id = match doc.source.kind {
            SourceKind::External => doc.accession_number.as_deref(),
            SourceKind::Internal => doc.edoc_id.as_deref(),
        };
        let has_required_id = required_id.is_some_and(|id| !id.is_empty());

        if !has_usable_title(&doc.title) {
            if !has_required_id {
                warn!(
                    document_id = %doc.id,
                    "document has neither title nor identifier, dropping citation"
                );
            }
            return Resolution::Gated;
        }

        Resolution::Reference(SourceReference {
            id: required_id
                .filter(|id| !id.is_empty())
                .unwrap_or(doc.id.as_str())
                .to_string(),
            title: doc.title.clone(),
            source_id: token.to_string(),
            url: None,
        })
    }
}

fn has_usable_title(title: &str) -> bool {
    let trimmed = title.trim();
    !trimmed.is_empty()
        && !PLACEHOLDER_TITLES
            .iter()
            .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
}
