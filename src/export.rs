//! Output formats for validated records.
//!
//! - JSON-LD using the Schema.org vocabulary: the article is a
//!   `ScholarlyArticle` that `mentions` one `Dataset` per LTE dataset
//! - CSV summary with one row per processed document

use crate::error::Result;
use crate::models::{
    Author, CitationMetadata, ExtractionResponse, GeoCoverage, LteDatasetMetadata, LteOverviewEntry,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::info;

const SCHEMA_ORG: &str = "https://schema.org";

/// Insert `key` only when a value is present.
fn put<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.into());
    }
}

fn put_list(map: &mut Map<String, Value>, key: &str, values: Vec<Value>) {
    if !values.is_empty() {
        map.insert(key.to_string(), Value::Array(values));
    }
}

fn typed(kind: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("@type".to_string(), Value::String(kind.to_string()));
    map
}

fn organization(name: &str) -> Value {
    json!({"@type": "Organization", "name": name})
}

fn property_value(id: &str, value: &str) -> Value {
    json!({"@type": "PropertyValue", "propertyID": id, "value": value})
}

fn person(author: &Author) -> Value {
    let mut map = typed("Person");
    map.insert("name".to_string(), Value::String(author.name.clone()));
    put(&mut map, "affiliation", author.affiliation.as_deref().map(organization));
    Value::Object(map)
}

/// Point coverage becomes `GeoCoordinates`, a bounding box a `GeoShape`.
fn place(geo: &GeoCoverage) -> Value {
    let shape = match (geo.lat2, geo.lon2) {
        (Some(lat2), Some(lon2)) => json!({
            "@type": "GeoShape",
            "box": format!("{} {} {} {}", geo.lat1, geo.lon1, lat2, lon2)
        }),
        _ => json!({"@type": "GeoCoordinates", "latitude": geo.lat1, "longitude": geo.lon1}),
    };
    json!({"@type": "Place", "geo": shape})
}

fn article(citation: &CitationMetadata) -> Map<String, Value> {
    let mut map = typed("ScholarlyArticle");
    map.insert("@context".to_string(), Value::String(SCHEMA_ORG.to_string()));
    map.insert("name".to_string(), Value::String(citation.title.clone()));
    put_list(&mut map, "author", citation.authors.iter().map(person).collect());

    let mut periodical = typed("Periodical");
    periodical.insert("name".to_string(), Value::String(citation.journal.name.clone()));
    put(&mut periodical, "issn", citation.journal.issn.clone());
    put(&mut periodical, "publisher", citation.journal.publisher.as_deref().map(organization));
    map.insert("isPartOf".to_string(), Value::Object(periodical));

    put(&mut map, "volumeNumber", citation.volume.clone());
    put(&mut map, "issueNumber", citation.issue.clone());
    put(&mut map, "pagination", citation.pages.clone());

    let mut identifiers = Vec::new();
    if let Some(doi) = &citation.doi {
        identifiers.push(property_value("DOI", doi));
    }
    if let Some(pmid) = &citation.pubmed_id {
        identifiers.push(property_value("PMID", pmid));
    }
    put_list(&mut map, "identifier", identifiers);

    put(&mut map, "url", citation.url.clone());
    put(
        &mut map,
        "datePublished",
        citation
            .publication_date
            .clone()
            .or_else(|| citation.year.map(|y| y.to_string())),
    );
    put(&mut map, "abstract", citation.abstract_text.clone());
    put_list(
        &mut map,
        "keywords",
        citation.keywords.iter().cloned().map(Value::String).collect(),
    );
    put_list(
        &mut map,
        "about",
        citation.subject_classifications.iter().cloned().map(Value::String).collect(),
    );
    put(&mut map, "inLanguage", citation.language.clone());
    put(&mut map, "license", citation.license.clone());
    put(&mut map, "isAccessibleForFree", citation.open_access);
    put(&mut map, "funding", citation.funding.clone());
    put(&mut map, "description", citation.formatted_citation.clone());
    map
}

fn dataset(ds: &LteDatasetMetadata) -> Value {
    let mut map = typed("Dataset");
    map.insert("name".to_string(), Value::String(ds.name.clone()));
    put(&mut map, "description", ds.description.clone());
    put(&mut map, "spatialCoverage", ds.geographic_coverage.as_ref().map(place));
    put(&mut map, "temporalCoverage", ds.temporal_coverage.clone());

    let variables = ds
        .variables
        .iter()
        .map(|v| {
            let mut var = typed("PropertyValue");
            var.insert("name".to_string(), Value::String(v.name.clone()));
            var.insert("description".to_string(), Value::String(v.description.clone()));
            put(&mut var, "unitText", v.unit.clone());
            put(&mut var, "propertyID", v.vocabulary.clone());
            Value::Object(var)
        })
        .collect();
    put_list(&mut map, "variableMeasured", variables);

    put(&mut map, "identifier", ds.dataset_doi.as_deref().map(|doi| property_value("DOI", doi)));
    put(&mut map, "encodingFormat", ds.format.clone());
    put(&mut map, "contentSize", ds.size.clone());
    put(&mut map, "conditionsOfAccess", ds.access_conditions.clone());
    put(&mut map, "creativeWorkStatus", ds.trial_status.clone());
    put(&mut map, "measurementTechnique", ds.experimental_setup.clone());
    put(&mut map, "abstract", ds.research_objectives.clone());
    put(&mut map, "license", ds.license.clone());
    put(
        &mut map,
        "distribution",
        ds.distribution.as_ref().map(|d| {
            let mut download = typed("DataDownload");
            download.insert("contentUrl".to_string(), Value::String(d.content_url.clone()));
            put(&mut download, "encodingFormat", d.encoding_format.clone());
            Value::Object(download)
        }),
    );
    put(&mut map, "associatedMedia", ds.supplementary_materials.clone());
    Value::Object(map)
}

fn overview_dataset(entry: &LteOverviewEntry) -> Value {
    let mut map = typed("Dataset");
    put(&mut map, "name", entry.name.clone().or_else(|| entry.site.clone()));
    put(&mut map, "description", entry.description.clone());

    if let (Some(latitude), Some(longitude)) = (entry.latitude, entry.longitude) {
        let mut place = typed("Place");
        put(&mut place, "name", entry.site.clone());
        put(&mut place, "addressCountry", entry.country.clone());
        place.insert(
            "geo".to_string(),
            json!({"@type": "GeoCoordinates", "latitude": latitude, "longitude": longitude}),
        );
        map.insert("spatialCoverage".to_string(), Value::Object(place));
    }

    let temporal = match (entry.start_year, entry.end_year) {
        (Some(start), Some(end)) => Some(format!("{}/{}", start, end)),
        (Some(start), None) => Some(format!("{}/..", start)),
        _ => None,
    };
    put(&mut map, "temporalCoverage", temporal);
    put(&mut map, "creator", entry.trial_institution.as_deref().map(organization));
    put(&mut map, "creativeWorkStatus", entry.trial_status.clone());

    let concepts = entry
        .crop_species
        .iter()
        .chain(&entry.agrovoc_keywords)
        .map(|c| {
            let mut term = typed("DefinedTerm");
            term.insert("name".to_string(), Value::String(c.label.clone()));
            put(&mut term, "url", c.uri.clone());
            Value::Object(term)
        })
        .collect();
    put_list(&mut map, "keywords", concepts);
    put_list(
        &mut map,
        "isBasedOn",
        entry.sources.iter().cloned().map(Value::String).collect(),
    );
    Value::Object(map)
}

/// Render a record as a Schema.org JSON-LD document.
pub fn to_json_ld(record: &ExtractionResponse) -> Value {
    let mut doc = article(&record.citation);
    let mut datasets: Vec<Value> = record.datasets.iter().map(dataset).collect();
    if let Some(entry) = &record.lte_overview {
        datasets.push(overview_dataset(entry));
    }
    put_list(&mut doc, "mentions", datasets);
    Value::Object(doc)
}

/// One CSV row per processed document
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub file: String,
    pub status: String,
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub doi: String,
    pub dataset_count: usize,
    pub datasets: String,
    pub error: String,
}

impl ExtractionSummary {
    pub fn success(file: &str, record: &ExtractionResponse) -> Self {
        let citation = &record.citation;
        let mut names: Vec<&str> = record.datasets.iter().map(|d| d.name.as_str()).collect();
        if let Some(name) = record
            .lte_overview
            .as_ref()
            .and_then(|o| o.name.as_deref().or(o.site.as_deref()))
        {
            names.push(name);
        }

        Self {
            file: file.to_string(),
            status: "success".to_string(),
            title: citation.title.clone(),
            authors: citation
                .authors
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            journal: citation.journal.name.clone(),
            year: citation.year.map(|y| y.to_string()).unwrap_or_default(),
            doi: citation.doi.clone().unwrap_or_default(),
            dataset_count: names.len(),
            datasets: names.join("; "),
            error: String::new(),
        }
    }

    pub fn failure(file: &str, error: &str) -> Self {
        Self {
            file: file.to_string(),
            status: "error".to_string(),
            error: error.to_string(),
            ..Default::default()
        }
    }
}

/// Save data to CSV file
pub fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        info!(path = %path.display(), "No rows to save");
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for item in data {
        wtr.serialize(item)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = data.len(), "Saved CSV");
    Ok(())
}
