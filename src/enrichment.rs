//! Filling citation gaps from a Scopus abstract-retrieval response.
//!
//! [`SCOPUS_FIELD_MAP`] is the single place that knows where Scopus keeps
//! each bibliographic value and which citation field it feeds. Only empty
//! citation fields are filled; values extracted from the article always win.

use crate::models::CitationMetadata;
use serde_json::Value;
use tracing::debug;

/// One row of the field map
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    /// JSON pointer into the Scopus response
    pub pointer: &'static str,
    /// Citation field path reported when the row fills a value
    pub field: &'static str,
    /// Writes the value if the target is still empty; true when it did
    apply: fn(&mut CitationMetadata, &Value) -> bool,
}

const fn row(
    pointer: &'static str,
    field: &'static str,
    apply: fn(&mut CitationMetadata, &Value) -> bool,
) -> FieldMapping {
    FieldMapping { pointer, field, apply }
}

/// Scopus location → citation field. Adding a target field is one row here.
pub const SCOPUS_FIELD_MAP: &[FieldMapping] = &[
    row(
        "/abstracts-retrieval-response/coredata/dc:description",
        "abstract",
        |c, v| fill(&mut c.abstract_text, v),
    ),
    row("/abstracts-retrieval-response/coredata/prism:doi", "doi", |c, v| {
        fill(&mut c.doi, v)
    }),
    row("/abstracts-retrieval-response/coredata/pubmed-id", "pubmed_id", |c, v| {
        fill(&mut c.pubmed_id, v)
    }),
    row("/abstracts-retrieval-response/coredata/prism:issn", "journal.issn", |c, v| {
        fill(&mut c.journal.issn, v)
    }),
    row(
        "/abstracts-retrieval-response/coredata/dc:publisher",
        "journal.publisher",
        |c, v| fill(&mut c.journal.publisher, v),
    ),
    row("/abstracts-retrieval-response/coredata/prism:volume", "volume", |c, v| {
        fill(&mut c.volume, v)
    }),
    row(
        "/abstracts-retrieval-response/coredata/prism:issueIdentifier",
        "issue",
        |c, v| fill(&mut c.issue, v),
    ),
    row("/abstracts-retrieval-response/coredata/prism:pageRange", "pages", |c, v| {
        fill(&mut c.pages, v)
    }),
    row(
        "/abstracts-retrieval-response/coredata/prism:coverDate",
        "publication_date",
        |c, v| fill(&mut c.publication_date, v),
    ),
    row("/abstracts-retrieval-response/coredata/prism:coverDate", "year", |c, v| {
        fill_with(&mut c.year, || year_of(v))
    }),
    row("/abstracts-retrieval-response/coredata/prism:url", "url", |c, v| {
        fill(&mut c.url, v)
    }),
    row("/abstracts-retrieval-response/coredata/prism:copyright", "license", |c, v| {
        fill(&mut c.license, v)
    }),
    row("/abstracts-retrieval-response/coredata/openaccess", "open_access", |c, v| {
        fill_with(&mut c.open_access, || flag_of(v))
    }),
    row("/abstracts-retrieval-response/language/@xml:lang", "language", |c, v| {
        fill(&mut c.language, v)
    }),
    row(
        "/abstracts-retrieval-response/authkeywords/author-keyword",
        "keywords",
        |c, v| fill_list(&mut c.keywords, v),
    ),
    row(
        "/abstracts-retrieval-response/subject-areas/subject-area",
        "subject_classifications",
        |c, v| fill_list(&mut c.subject_classifications, v),
    ),
];

/// Scalar text of a Scopus value; `{"$": "..."}` wrappers are unwrapped.
fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("$").and_then(text_of),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Scopus returns a bare object instead of a one-element list.
fn texts_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        other => text_of(other).into_iter().collect(),
    }
}

fn flag_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => match text_of(other)?.to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
    }
}

fn year_of(value: &Value) -> Option<i64> {
    text_of(value)?.get(..4)?.parse().ok()
}

fn fill_with<T>(slot: &mut Option<T>, parse: impl FnOnce() -> Option<T>) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = parse();
    slot.is_some()
}

fn fill(slot: &mut Option<String>, value: &Value) -> bool {
    fill_with(slot, || text_of(value))
}

fn fill_list(slot: &mut Vec<String>, value: &Value) -> bool {
    if !slot.is_empty() {
        return false;
    }
    *slot = texts_of(value);
    !slot.is_empty()
}

/// Fill empty citation fields from a Scopus response; returns what was filled.
pub fn enrich_citation(citation: &mut CitationMetadata, scopus: &Value) -> Vec<&'static str> {
    enrich_with(citation, scopus, SCOPUS_FIELD_MAP)
}

/// Apply an arbitrary field map to `source`.
pub fn enrich_with(
    citation: &mut CitationMetadata,
    source: &Value,
    map: &[FieldMapping],
) -> Vec<&'static str> {
    let mut filled = Vec::new();

    for mapping in map {
        let Some(value) = source.pointer(mapping.pointer) else {
            continue;
        };
        if (mapping.apply)(citation, value) {
            filled.push(mapping.field);
        }
    }

    debug!(filled = ?filled, "Citation enriched");
    filled
}
