// ABOUTME: Self-describing clickable reference markup for resolved citations
// ABOUTME: Embeds enough data for later navigation or preview without re-resolving

use serde::Serialize;
use url::form_urlencoded::byte_serialize;
use url::Url;

use ragline_core::constants::GET_DOCUMENT_PATH;

/// One resolved citation, carrying everything a click handler needs: the
/// document title, a stable identifier, the original source token, and a
/// direct retrieval URL when one can be derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub id: String,
    pub title: String,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SourceReference {
    /// Render the reference as inline markup. References without a direct URL
    /// are still clickable: `data-preview` tells the renderer to open a
    /// contextual preview from the embedded payload instead of navigating.
    pub fn to_markup(&self) -> String {
        let payload = serde_json::to_string(self).unwrap_or_default();
        let encoded: String = byte_serialize(payload.as_bytes()).collect();
        let preview = if self.url.is_none() {
            " data-preview=\"true\""
        } else {
            ""
        };
        format!(
            "<span class=\"inline-source-citation\" data-doc=\"{}\"{}>[{}]</span>",
            encoded,
            preview,
            escape_html(&self.title)
        )
    }
}

/// Build the direct retrieval URL for a document stored behind the
/// `/get_document` endpoint.
pub fn document_url(api_base: &Url, filepath: &str, filename: &str) -> Option<Url> {
    if filepath.is_empty() || filename.is_empty() {
        return None;
    }
    let mut url = api_base
        .join(GET_DOCUMENT_PATH.trim_start_matches('/'))
        .ok()?;
    url.query_pairs_mut()
        .append_pair("filepath", filepath)
        .append_pair("filename", filename);
    Some(url)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markup_embeds_payload_and_title() {
        let reference = SourceReference {
            id: "doc-1".to_string(),
            title: "Doc A".to_string(),
            source_id: "1".to_string(),
            url: None,
        };
        let markup = reference.to_markup();
        assert!(markup.starts_with("<span class=\"inline-source-citation\""));
        assert!(markup.contains("data-preview=\"true\""));
        assert!(markup.ends_with("[Doc A]</span>"));
        assert!(markup.contains("data-doc=\""));
    }

    #[test]
    fn test_markup_with_url_is_not_preview() {
        let reference = SourceReference {
            id: "{AAAA1111-2222-3333-4444-555566667777}".to_string(),
            title: "Procedure".to_string(),
            source_id: "{AAAA1111-2222-3333-4444-555566667777}".to_string(),
            url: Some("https://api.example/get_document?filepath=p&filename=f".to_string()),
        };
        assert!(!reference.to_markup().contains("data-preview"));
    }

    #[test]
    fn test_title_html_escaped() {
        let reference = SourceReference {
            id: "x".to_string(),
            title: "A <B> & \"C\"".to_string(),
            source_id: "x".to_string(),
            url: None,
        };
        assert!(reference
            .to_markup()
            .contains("[A &lt;B&gt; &amp; &quot;C&quot;]"));
    }

    #[test]
    fn test_document_url() {
        let base = Url::parse("https://api.example/").unwrap();
        let url = document_url(&base, "/docs/procedures", "pump.pdf").unwrap();
        assert_eq!(url.path(), "/get_document");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("filepath".to_string(), "/docs/procedures".to_string()),
                ("filename".to_string(), "pump.pdf".to_string()),
            ]
        );
    }

    #[test]
    fn test_document_url_requires_both_fields() {
        let base = Url::parse("https://api.example/").unwrap();
        assert_eq!(document_url(&base, "", "pump.pdf"), None);
        assert_eq!(document_url(&base, "/docs", ""), None);
    }
}
