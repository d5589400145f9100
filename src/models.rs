//! Typed extraction records.
//!
//! These structs mirror the field tables in [`crate::schema`] one to one.
//! They are only ever built from validator output, so every required field
//! is known to be present and every string is already trimmed.

use serde::{Deserialize, Serialize};

/// Full result of one extraction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionResponse {
    pub citation: CitationMetadata,
    #[serde(default)]
    pub datasets: Vec<LteDatasetMetadata>,
    /// Extended single-experiment record, used instead of `datasets`
    #[serde(
        rename = "LTE_metadata_OverviewMap",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub lte_overview: Option<LteOverviewEntry>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Journal {
    pub name: String,
    #[serde(default)]
    pub issn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// Bibliographic metadata of the article itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitationMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub journal: Journal,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub pubmed_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subject_classifications: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub open_access: Option<bool>,
    #[serde(default)]
    pub funding: Option<String>,
    #[serde(default)]
    pub formatted_citation: Option<String>,
}

/// A point (`lat1`/`lon1`) or bounding box (all four) in WGS84 decimal degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoCoverage {
    pub lat1: f64,
    pub lon1: f64,
    #[serde(default)]
    pub lat2: Option<f64>,
    #[serde(default)]
    pub lon2: Option<f64>,
}

impl GeoCoverage {
    pub fn is_bounding_box(&self) -> bool {
        self.lat2.is_some() && self.lon2.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variable {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub vocabulary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataDistribution {
    pub content_url: String,
    #[serde(default)]
    pub encoding_format: Option<String>,
}

/// One LTE dataset described or used by the article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LteDatasetMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub geographic_coverage: Option<GeoCoverage>,
    /// ISO 8601 interval, e.g. `1902/2019`
    #[serde(default)]
    pub temporal_coverage: Option<String>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub dataset_doi: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub access_conditions: Option<String>,
    #[serde(default)]
    pub trial_status: Option<String>,
    #[serde(default)]
    pub experimental_setup: Option<String>,
    #[serde(default)]
    pub research_objectives: Option<String>,
    #[serde(default)]
    pub distribution: Option<DataDistribution>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub supplementary_materials: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialTypes {
    #[serde(default)]
    pub fertilization_trial: Option<bool>,
    #[serde(default)]
    pub crop_rotation_trial: Option<bool>,
    #[serde(default)]
    pub tillage_trial: Option<bool>,
    #[serde(default)]
    pub irrigation_trial: Option<bool>,
    #[serde(default)]
    pub cover_crop_trial: Option<bool>,
    #[serde(default)]
    pub grazing_trial: Option<bool>,
    #[serde(default)]
    pub pest_weed_trial: Option<bool>,
    #[serde(default)]
    pub other_trial: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialDesign {
    #[serde(default)]
    pub randomization: Option<bool>,
    #[serde(default)]
    pub replication: Option<i64>,
    #[serde(default)]
    pub plot_count: Option<i64>,
    #[serde(default)]
    pub plot_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorialDesign {
    #[serde(default)]
    pub one_factorial: Option<bool>,
    #[serde(default)]
    pub two_factorial: Option<bool>,
    #[serde(default)]
    pub multifactorial: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoilInfo {
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub soil_texture: Option<String>,
    #[serde(default)]
    pub soil_classification: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Reference to an AGROVOC concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConceptRef {
    pub label: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Extended overview record of a single long-term experiment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LteOverviewEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub trial_institution: Option<String>,
    #[serde(default)]
    pub holder_category: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub position_exactness: Option<String>,
    #[serde(default)]
    pub start_year: Option<i64>,
    #[serde(default)]
    pub end_year: Option<i64>,
    #[serde(default)]
    pub trial_status: Option<String>,
    #[serde(default)]
    pub trial_types: Option<TrialTypes>,
    #[serde(default)]
    pub trial_design: Option<TrialDesign>,
    #[serde(default)]
    pub factorial_design: Option<FactorialDesign>,
    #[serde(default)]
    pub soil_info: Option<SoilInfo>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub crop_species: Vec<ConceptRef>,
    #[serde(default)]
    pub agrovoc_keywords: Vec<ConceptRef>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub miscellaneous: Option<String>,
}
