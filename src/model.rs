// 🧱 Core data model - Entity, raw statements, normalized records
//
// Identity lives in the knowledge-base ids (Q.../P...).
// Labels are display values and never take part in equality.

use serde::{Deserialize, Serialize};

// ============================================================================
// ENTITY
// ============================================================================

/// A knowledge-base item as fetched at the start of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Entity {
            id: id.into(),
            label: label.into(),
            description: description.into(),
        }
    }

    /// "Douglas Adams (Q42)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.label, self.id)
    }
}

// ============================================================================
// DATATYPE TAG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatatypeTag {
    /// Value is a reference to another item - the only kind compared
    WikibaseItem,
    WikibaseProperty,
    String,
    ExternalId,
    Quantity,
    Time,
    GlobeCoordinate,
    MonolingualText,
    CommonsMedia,
    Url,
    Other(String),
}

impl DatatypeTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "wikibase-item" => DatatypeTag::WikibaseItem,
            "wikibase-property" => DatatypeTag::WikibaseProperty,
            "string" => DatatypeTag::String,
            "external-id" => DatatypeTag::ExternalId,
            "quantity" => DatatypeTag::Quantity,
            "time" => DatatypeTag::Time,
            "globe-coordinate" => DatatypeTag::GlobeCoordinate,
            "monolingualtext" => DatatypeTag::MonolingualText,
            "commonsMedia" => DatatypeTag::CommonsMedia,
            "url" => DatatypeTag::Url,
            other => DatatypeTag::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DatatypeTag::WikibaseItem => "wikibase-item",
            DatatypeTag::WikibaseProperty => "wikibase-property",
            DatatypeTag::String => "string",
            DatatypeTag::ExternalId => "external-id",
            DatatypeTag::Quantity => "quantity",
            DatatypeTag::Time => "time",
            DatatypeTag::GlobeCoordinate => "globe-coordinate",
            DatatypeTag::MonolingualText => "monolingualtext",
            DatatypeTag::CommonsMedia => "commonsMedia",
            DatatypeTag::Url => "url",
            DatatypeTag::Other(tag) => tag,
        }
    }

    pub fn is_entity_valued(&self) -> bool {
        matches!(self, DatatypeTag::WikibaseItem)
    }
}

// ============================================================================
// RAW STATEMENT (API boundary)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnakType {
    Value,
    SomeValue,
    NoValue,
}

impl SnakType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "value" => Some(SnakType::Value),
            "somevalue" => Some(SnakType::SomeValue),
            "novalue" => Some(SnakType::NoValue),
            _ => None,
        }
    }
}

/// One main-snak exactly as the API returned it (after schema validation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatement {
    pub property_id: String,
    pub datatype: DatatypeTag,
    pub snak_type: SnakType,

    /// Referenced item id; only set for entity-valued snaks carrying a value
    pub value_id: Option<String>,
}

impl RawStatement {
    /// Entity-valued statement pointing at `value_id`
    pub fn item(property_id: impl Into<String>, value_id: impl Into<String>) -> Self {
        RawStatement {
            property_id: property_id.into(),
            datatype: DatatypeTag::WikibaseItem,
            snak_type: SnakType::Value,
            value_id: Some(value_id.into()),
        }
    }

    /// The (property, value) key if this statement can be compared
    pub fn entity_pair(&self) -> Option<PairKey> {
        if !self.datatype.is_entity_valued() || self.snak_type != SnakType::Value {
            return None;
        }
        self.value_id
            .as_ref()
            .map(|value_id| PairKey::new(self.property_id.clone(), value_id.clone()))
    }
}

// ============================================================================
// NORMALIZED ROWS
// ============================================================================

/// Comparison identity: (property id, value id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub property_id: String,
    pub value_id: String,
}

impl PairKey {
    pub fn new(property_id: impl Into<String>, value_id: impl Into<String>) -> Self {
        PairKey {
            property_id: property_id.into(),
            value_id: value_id.into(),
        }
    }
}

/// A normalized (property, value) row with resolved labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub property_id: String,
    pub property_label: String,
    pub value_id: String,
    pub value_label: String,
}

impl Statement {
    pub fn new(
        property_id: impl Into<String>,
        property_label: impl Into<String>,
        value_id: impl Into<String>,
        value_label: impl Into<String>,
    ) -> Self {
        Statement {
            property_id: property_id.into(),
            property_label: property_label.into(),
            value_id: value_id.into(),
            value_label: value_label.into(),
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.property_id.clone(), self.value_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub entity: Entity,
    pub rows: Vec<Statement>,
}

impl NormalizedRecord {
    pub fn new(entity: Entity, rows: Vec<Statement>) -> Self {
        NormalizedRecord { entity, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = PairKey> + '_ {
        self.rows.iter().map(Statement::key)
    }

    /// Distinct property ids in first-seen order
    pub fn property_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.property_id.as_str()))
            .map(|row| row.property_id.as_str())
            .collect()
    }
}

/// Search hit returned by the selection collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl Suggestion {
    /// "(Q42) Douglas Adams - English writer"
    pub fn display(&self) -> String {
        if self.description.is_empty() {
            format!("({}) {}", self.id, self.label)
        } else {
            format!("({}) {} - {}", self.id, self.label, self.description)
        }
    }
}
