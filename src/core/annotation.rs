//! Annotation records as consumed from deserialized JSON.
//!
//! Construction is where malformed input dies: missing required fields,
//! wrong JSON types, unparseable timestamps, and unknown check codes are all
//! rejected while deserializing, so the resolver only ever sees well-formed
//! records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::types::{AttachedElement, IdValue, TargetKind};

/// A declarative post-hoc check evaluated against a resolved target.
///
/// Serialized as a JSON array whose first element is the check code:
/// `["REQUIRE_MONOPHYLETIC", id, ...]` or `["TARGET_EXCLUDES", id, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<IdValue>", into = "Vec<IdValue>")]
pub enum Condition {
    /// The union bitmask of these ids must be an exact split of the tree
    Monophyly(Vec<IdValue>),
    /// The target edge's bitmask must share no bit with these ids
    Exclusion(Vec<IdValue>),
}

impl Condition {
    pub const MONOPHYLY_CODE: &'static str = "REQUIRE_MONOPHYLETIC";
    pub const EXCLUSION_CODE: &'static str = "TARGET_EXCLUDES";

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Monophyly(_) => Self::MONOPHYLY_CODE,
            Self::Exclusion(_) => Self::EXCLUSION_CODE,
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[IdValue] {
        match self {
            Self::Monophyly(ids) | Self::Exclusion(ids) => ids,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.ids().iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.code(), ids.join(", "))
    }
}

impl TryFrom<Vec<IdValue>> for Condition {
    type Error = String;

    fn try_from(values: Vec<IdValue>) -> Result<Self, Self::Error> {
        let mut values = values.into_iter();
        let code = match values.next() {
            Some(IdValue::Str(code)) => code,
            Some(other) => {
                return Err(format!("check type code must be a string, got {other}"));
            }
            None => return Err("cannot parse an empty array as a check".to_string()),
        };
        let ids: Vec<IdValue> = values.collect();
        match code.as_str() {
            Self::MONOPHYLY_CODE => Ok(Self::Monophyly(ids)),
            Self::EXCLUSION_CODE => Ok(Self::Exclusion(ids)),
            other => Err(format!("unknown check type code {other:?}")),
        }
    }
}

impl From<Condition> for Vec<IdValue> {
    fn from(condition: Condition) -> Self {
        let code = IdValue::Str(condition.code().to_string());
        let mut out = vec![code];
        match condition {
            Condition::Monophyly(ids) | Condition::Exclusion(ids) => out.extend(ids),
        }
        out
    }
}

/// The abstract tree position an annotation designates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,

    /// Taxon ids the target clade must contain
    pub included_ids: Vec<IdValue>,

    /// Taxon ids the target must exclude; meaningful for branch targets only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_ids: Vec<IdValue>,

    /// Hard conditions: first failure aborts the application
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_checks: Vec<Condition>,

    /// Soft conditions: failures accumulate without aborting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning_checks: Vec<Condition>,
}

impl ReferenceTarget {
    #[must_use]
    pub fn node(included_ids: Vec<IdValue>) -> Self {
        Self {
            kind: TargetKind::Node,
            included_ids,
            excluded_ids: Vec::new(),
            error_checks: Vec::new(),
            warning_checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn branch(included_ids: Vec<IdValue>, excluded_ids: Vec<IdValue>) -> Self {
        Self {
            kind: TargetKind::Branch,
            included_ids,
            excluded_ids,
            error_checks: Vec::new(),
            warning_checks: Vec::new(),
        }
    }
}

/// Version strings and numbers both occur in the wild; keep whichever the
/// record used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Default for VersionValue {
    fn default() -> Self {
        Self::Str(String::new())
    }
}

fn default_entity_type() -> String {
    "prov:Entity".to_string()
}

/// Provenance of an annotation: the agent or tool that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvEntity {
    #[serde(rename = "type", default = "default_entity_type")]
    pub kind: String,

    pub name: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: VersionValue,

    /// Free-form invocation metadata; must be a JSON object
    #[serde(default)]
    pub invocation: serde_json::Map<String, serde_json::Value>,
}

impl ProvEntity {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: default_entity_type(),
            name: name.into(),
            url: String::new(),
            description: String::new(),
            version: VersionValue::default(),
            invocation: serde_json::Map::new(),
        }
    }
}

/// A (tree, element) pair an annotation has been successfully bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTo {
    /// Tree name or a positional placeholder when the tree is unnamed
    pub tree: String,
    pub element: AttachedElement,
}

/// A phyloreference annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "_id")]
    pub id: IdValue,

    #[serde(rename = "oa:hasTarget")]
    pub target: ReferenceTarget,

    /// ISO-8601 creation timestamp; kept as the validated original string so
    /// serialization round-trips byte-identically
    #[serde(rename = "oa:annotatedAt", deserialize_with = "deserialize_timestamp")]
    pub annotated_at: String,

    #[serde(rename = "oa:annotatedBy")]
    pub annotated_by: ProvEntity,

    /// Free-form JSON-serializable body
    #[serde(rename = "oa:hasBody")]
    pub body: serde_json::Value,

    /// (tree, element) pairs this annotation has been bound to during the
    /// current run; never serialized
    #[serde(skip)]
    pub applied_to: Vec<AppliedTo>,
}

impl Annotation {
    /// One-line JSON rendering, used in logs.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error if the body cannot be serialized.
    pub fn summary(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Accepts RFC 3339, naive datetime, or naive date forms.
pub(crate) fn validate_timestamp(value: &str) -> Result<(), String> {
    if DateTime::parse_from_rfc3339(value).is_ok()
        || value.parse::<NaiveDateTime>().is_ok()
        || value.parse::<NaiveDate>().is_ok()
    {
        return Ok(());
    }
    Err(format!(
        "could not parse the datetime string {value:?}; oa:annotatedAt must hold an ISO-8601 timestamp"
    ))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    validate_timestamp(&value).map_err(serde::de::Error::custom)?;
    Ok(value)
}
