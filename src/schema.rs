//! Declarative extraction schema and validator.
//!
//! Every record shape is a table of [`Field`]s. The validator walks a decoded
//! completion against these tables, collecting every violation with its field
//! path, and produces a normalized JSON tree (trimmed strings, coerced scalars,
//! defaults filled in) that is then decoded into [`ExtractionResponse`].
//! Adding a field means adding a row here and a member in [`crate::models`].

use crate::error::ValidationErrors;
use crate::models::ExtractionResponse;
use serde_json::{Map, Number, Value};

/// Value kind accepted for a field
#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Str,
    Int,
    Bool,
    /// Absolute URL
    Url,
    /// Decimal degrees in [-90, 90]
    Latitude,
    /// Decimal degrees in [-180, 180]
    Longitude,
    List(&'static Kind),
    Object(&'static [Field]),
}

/// One row of a schema table
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    /// Value filled in when an optional string field is absent or null
    pub default: Option<&'static str>,
}

const fn required(name: &'static str, kind: Kind) -> Field {
    Field {
        name,
        kind,
        required: true,
        default: None,
    }
}

const fn optional(name: &'static str, kind: Kind) -> Field {
    Field {
        name,
        kind,
        required: false,
        default: None,
    }
}

const fn defaulted(name: &'static str, kind: Kind, default: &'static str) -> Field {
    Field {
        name,
        kind,
        required: false,
        default: Some(default),
    }
}

const STR: Kind = Kind::Str;
const AUTHOR: Kind = Kind::Object(AUTHOR_FIELDS);
const VARIABLE: Kind = Kind::Object(VARIABLE_FIELDS);
const DATASET: Kind = Kind::Object(DATASET_FIELDS);
const CONCEPT: Kind = Kind::Object(CONCEPT_FIELDS);

pub const AUTHOR_FIELDS: &[Field] = &[required("name", Kind::Str), optional("affiliation", Kind::Str)];

pub const JOURNAL_FIELDS: &[Field] = &[
    required("name", Kind::Str),
    optional("issn", Kind::Str),
    optional("publisher", Kind::Str),
];

pub const CITATION_FIELDS: &[Field] = &[
    required("title", Kind::Str),
    optional("authors", Kind::List(&AUTHOR)),
    required("journal", Kind::Object(JOURNAL_FIELDS)),
    optional("volume", Kind::Str),
    optional("issue", Kind::Str),
    optional("pages", Kind::Str),
    optional("doi", Kind::Str),
    optional("pubmed_id", Kind::Str),
    optional("url", Kind::Str),
    optional("publication_date", Kind::Str),
    optional("year", Kind::Int),
    optional("abstract", Kind::Str),
    optional("keywords", Kind::List(&STR)),
    optional("subject_classifications", Kind::List(&STR)),
    optional("language", Kind::Str),
    optional("license", Kind::Str),
    optional("open_access", Kind::Bool),
    optional("funding", Kind::Str),
    optional("formatted_citation", Kind::Str),
];

pub const GEO_FIELDS: &[Field] = &[
    required("lat1", Kind::Latitude),
    required("lon1", Kind::Longitude),
    optional("lat2", Kind::Latitude),
    optional("lon2", Kind::Longitude),
];

pub const VARIABLE_FIELDS: &[Field] = &[
    required("name", Kind::Str),
    required("description", Kind::Str),
    optional("unit", Kind::Str),
    defaulted("vocabulary", Kind::Str, "AGROVOC"),
];

pub const DISTRIBUTION_FIELDS: &[Field] = &[
    required("content_url", Kind::Url),
    defaulted("encoding_format", Kind::Str, "text/csv"),
];

pub const DATASET_FIELDS: &[Field] = &[
    required("name", Kind::Str),
    optional("description", Kind::Str),
    optional("geographic_coverage", Kind::Object(GEO_FIELDS)),
    optional("temporal_coverage", Kind::Str),
    optional("variables", Kind::List(&VARIABLE)),
    optional("dataset_doi", Kind::Str),
    optional("format", Kind::Str),
    optional("size", Kind::Str),
    optional("access_conditions", Kind::Str),
    optional("trial_status", Kind::Str),
    optional("experimental_setup", Kind::Str),
    optional("research_objectives", Kind::Str),
    optional("distribution", Kind::Object(DISTRIBUTION_FIELDS)),
    optional("license", Kind::Str),
    optional("supplementary_materials", Kind::Str),
];

pub const TRIAL_TYPE_FIELDS: &[Field] = &[
    optional("fertilization_trial", Kind::Bool),
    optional("crop_rotation_trial", Kind::Bool),
    optional("tillage_trial", Kind::Bool),
    optional("irrigation_trial", Kind::Bool),
    optional("cover_crop_trial", Kind::Bool),
    optional("grazing_trial", Kind::Bool),
    optional("pest_weed_trial", Kind::Bool),
    optional("other_trial", Kind::Bool),
];

pub const TRIAL_DESIGN_FIELDS: &[Field] = &[
    optional("randomization", Kind::Bool),
    optional("replication", Kind::Int),
    optional("plot_count", Kind::Int),
    optional("plot_size", Kind::Str),
];

pub const FACTORIAL_FIELDS: &[Field] = &[
    optional("one_factorial", Kind::Bool),
    optional("two_factorial", Kind::Bool),
    optional("multifactorial", Kind::Bool),
];

pub const SOIL_FIELDS: &[Field] = &[
    optional("soil_type", Kind::Str),
    optional("soil_texture", Kind::Str),
    optional("soil_classification", Kind::Str),
];

pub const CONTACT_FIELDS: &[Field] = &[
    optional("name", Kind::Str),
    optional("email", Kind::Str),
    optional("website", Kind::Str),
];

/// AGROVOC concept reference
pub const CONCEPT_FIELDS: &[Field] = &[required("label", Kind::Str), optional("uri", Kind::Str)];

pub const OVERVIEW_FIELDS: &[Field] = &[
    optional("name", Kind::Str),
    optional("description", Kind::Str),
    optional("site", Kind::Str),
    optional("country", Kind::Str),
    optional("trial_institution", Kind::Str),
    optional("holder_category", Kind::Str),
    optional("latitude", Kind::Latitude),
    optional("longitude", Kind::Longitude),
    optional("position_exactness", Kind::Str),
    optional("start_year", Kind::Int),
    optional("end_year", Kind::Int),
    optional("trial_status", Kind::Str),
    optional("trial_types", Kind::Object(TRIAL_TYPE_FIELDS)),
    optional("trial_design", Kind::Object(TRIAL_DESIGN_FIELDS)),
    optional("factorial_design", Kind::Object(FACTORIAL_FIELDS)),
    optional("soil_info", Kind::Object(SOIL_FIELDS)),
    optional("contact", Kind::Object(CONTACT_FIELDS)),
    optional("crop_species", Kind::List(&CONCEPT)),
    optional("agrovoc_keywords", Kind::List(&CONCEPT)),
    optional("networks", Kind::List(&STR)),
    optional("sources", Kind::List(&STR)),
    optional("miscellaneous", Kind::Str),
];

/// Key of the extended single-experiment record
pub const OVERVIEW_KEY: &str = "LTE_metadata_OverviewMap";

pub const RESPONSE_FIELDS: &[Field] = &[
    required("citation", Kind::Object(CITATION_FIELDS)),
    optional("datasets", Kind::List(&DATASET)),
    optional(OVERVIEW_KEY, Kind::Object(OVERVIEW_FIELDS)),
    optional("reasoning", Kind::Str),
];

/// Validate a decoded completion and build the typed record.
///
/// Either every field conforms and a record is returned, or the full list of
/// violations is returned; there is no partial result.
pub fn validate(value: &Value) -> Result<ExtractionResponse, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let normalized = check_object(value, RESPONSE_FIELDS, "", &mut errors);

    // An empty dataset list is what an encoded overview record carries.
    if let Value::Object(map) = value {
        let has_datasets = match map.get("datasets") {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        let has_overview = map.get(OVERVIEW_KEY).is_some_and(|v| !v.is_null());
        if has_datasets && has_overview {
            errors.push(OVERVIEW_KEY, "cannot be combined with datasets");
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(normalized).map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.push("$", e.to_string());
        errors
    })
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn check_object(value: &Value, fields: &[Field], path: &str, errors: &mut ValidationErrors) -> Value {
    let Value::Object(map) = value else {
        errors.push(if path.is_empty() { "$" } else { path }, "expected object");
        return Value::Null;
    };

    for key in map.keys() {
        if !fields.iter().any(|f| f.name == key) {
            errors.push(join(path, key), "unknown field");
        }
    }

    let mut out = Map::new();
    for field in fields {
        let field_path = join(path, field.name);
        let checked = match map.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    let reason = if map.contains_key(field.name) {
                        "must not be null"
                    } else {
                        "field required"
                    };
                    errors.push(field_path, reason);
                    Value::Null
                } else {
                    absent_value(field)
                }
            }
            Some(v) => check_value(v, &field.kind, &field_path, errors),
        };
        out.insert(field.name.to_string(), checked);
    }
    Value::Object(out)
}

fn absent_value(field: &Field) -> Value {
    match (field.kind, field.default) {
        (Kind::List(_), _) => Value::Array(Vec::new()),
        (_, Some(default)) => Value::String(default.to_string()),
        _ => Value::Null,
    }
}

fn check_value(value: &Value, kind: &Kind, path: &str, errors: &mut ValidationErrors) -> Value {
    let coerced = match kind {
        Kind::Str => coerce_str(value),
        Kind::Int => coerce_int(value),
        Kind::Bool => coerce_bool(value),
        Kind::Url => coerce_url(value),
        Kind::Latitude => coerce_degrees(value, 90.0),
        Kind::Longitude => coerce_degrees(value, 180.0),
        Kind::Object(fields) => return check_object(value, fields, path, errors),
        Kind::List(item) => {
            let Value::Array(items) = value else {
                errors.push(path, "expected list");
                return Value::Null;
            };
            let checked = items
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let item_path = format!("{}[{}]", path, i);
                    if v.is_null() {
                        errors.push(item_path, "must not be null");
                        Value::Null
                    } else {
                        check_value(v, item, &item_path, errors)
                    }
                })
                .collect();
            return Value::Array(checked);
        }
    };

    coerced.unwrap_or_else(|reason| {
        errors.push(path, reason);
        Value::Null
    })
}

type Coerced = std::result::Result<Value, String>;

fn coerce_str(value: &Value) -> Coerced {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        other => Err(format!("expected string, got {}", type_name(other))),
    }
}

fn coerce_int(value: &Value) -> Coerced {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n
            .as_i64()
            .map(Value::from)
            .ok_or_else(|| "integer out of range".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected integer, got \"{}\"", s)),
        other => Err(format!("expected integer, got {}", type_name(other))),
    }
}

fn coerce_float(value: &Value) -> Coerced {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => return Err(format!("expected number, got {}", type_name(other))),
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("expected number, got {}", value))
}

fn coerce_degrees(value: &Value, limit: f64) -> Coerced {
    let number = coerce_float(value)?;
    match number.as_f64() {
        Some(deg) if (-limit..=limit).contains(&deg) => Ok(number),
        _ => Err(format!("must be within -{limit} and {limit} degrees")),
    }
}

fn coerce_bool(value: &Value) -> Coerced {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| format!("expected boolean, got {}", value))
}

fn coerce_url(value: &Value) -> Coerced {
    let Value::String(s) = value else {
        return Err(format!("expected URL string, got {}", type_name(value)));
    };
    let trimmed = s.trim();
    url::Url::parse(trimmed)
        .map(|_| Value::String(trimmed.to_string()))
        .map_err(|e| format!("invalid URL \"{}\": {}", trimmed, e))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
