// ⚖️ Comparison Engine - partition two records into common / only-A / only-B
//
// Equality is over (property_id, value_id). Two items can share a label,
// so labels never decide membership. Common rows carry the A-side labels.

use crate::model::{Entity, NormalizedRecord, PairKey, Statement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ============================================================================
// BUCKETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Pair present in both records
    Common,

    /// Pair present only in record A
    OnlyA,

    /// Pair present only in record B
    OnlyB,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Common, Bucket::OnlyA, Bucket::OnlyB];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Common => "common",
            Bucket::OnlyA => "only_a",
            Bucket::OnlyB => "only_b",
        }
    }

    /// Display name using the compared entities' labels
    pub fn title(&self, a: &Entity, b: &Entity) -> String {
        match self {
            Bucket::Common => "Common".to_string(),
            Bucket::OnlyA => format!("Only {}", a.label),
            Bucket::OnlyB => format!("Only {}", b.label),
        }
    }
}

// ============================================================================
// COMPARISON RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub entity_a: Entity,
    pub entity_b: Entity,

    /// In A's row order
    pub common: Vec<Statement>,

    /// In A's row order
    pub only_a: Vec<Statement>,

    /// In B's row order
    pub only_b: Vec<Statement>,
}

/// A property both records use, with the values they do not share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergentProperty {
    pub property_id: String,
    pub property_label: String,
    pub values_a: Vec<Statement>,
    pub values_b: Vec<Statement>,
}

impl ComparisonResult {
    pub fn bucket(&self, bucket: Bucket) -> &[Statement] {
        match bucket {
            Bucket::Common => &self.common,
            Bucket::OnlyA => &self.only_a,
            Bucket::OnlyB => &self.only_b,
        }
    }

    /// Bucket contents as an order-free key set
    pub fn keys(&self, bucket: Bucket) -> BTreeSet<PairKey> {
        self.bucket(bucket).iter().map(Statement::key).collect()
    }

    /// Every row tagged with its bucket: common, then only_a, then only_b
    pub fn tagged_rows(&self) -> impl Iterator<Item = (Bucket, &Statement)> {
        Bucket::ALL
            .into_iter()
            .flat_map(move |bucket| self.bucket(bucket).iter().map(move |row| (bucket, row)))
    }

    /// Distinct pairs observed in record A
    pub fn total_a(&self) -> usize {
        self.common.len() + self.only_a.len()
    }

    /// Distinct pairs observed in record B
    pub fn total_b(&self) -> usize {
        self.common.len() + self.only_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.only_a.is_empty() && self.only_b.is_empty()
    }

    /// Same pairs on both sides, and at least one of them
    pub fn is_identical(&self) -> bool {
        !self.common.is_empty() && self.only_a.is_empty() && self.only_b.is_empty()
    }

    /// Property ids with at least one common value, first-seen order
    pub fn shared_properties(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.common
            .iter()
            .map(|row| row.property_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Properties used by both records whose value sets differ
    pub fn divergent_properties(&self) -> Vec<DivergentProperty> {
        let props_a: HashSet<&str> = self
            .common
            .iter()
            .chain(&self.only_a)
            .map(|row| row.property_id.as_str())
            .collect();
        let props_b: HashSet<&str> = self
            .common
            .iter()
            .chain(&self.only_b)
            .map(|row| row.property_id.as_str())
            .collect();

        // Divergence needs a non-shared value, so walk the only_* rows
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for row in self.only_a.iter().chain(&self.only_b) {
            let id = row.property_id.as_str();
            if props_a.contains(id) && props_b.contains(id) && seen.insert(id) {
                order.push(row);
            }
        }

        order
            .into_iter()
            .map(|first| {
                let of_property = |rows: &[Statement]| -> Vec<Statement> {
                    rows.iter()
                        .filter(|row| row.property_id == first.property_id)
                        .cloned()
                        .collect()
                };
                DivergentProperty {
                    property_id: first.property_id.clone(),
                    property_label: self.property_label(&first.property_id).to_string(),
                    values_a: of_property(&self.only_a),
                    values_b: of_property(&self.only_b),
                }
            })
            .collect()
    }

    /// Property label, preferring the A side
    pub(crate) fn property_label<'a>(&'a self, property_id: &'a str) -> &'a str {
        self.common
            .iter()
            .chain(&self.only_a)
            .chain(&self.only_b)
            .find(|row| row.property_id == property_id)
            .map(|row| row.property_label.as_str())
            .unwrap_or(property_id)
    }
}

// ============================================================================
// COMPARISON ENGINE
// ============================================================================

pub struct ComparisonEngine;

impl ComparisonEngine {
    pub fn new() -> Self {
        ComparisonEngine
    }

    /// Partition the distinct pairs of two records
    ///
    /// Pure and deterministic: the same inputs always give the same output,
    /// including row order. Empty records are valid input.
    ///
    /// Example:
    /// ```
    /// use entity_compare::{ComparisonEngine, Entity, NormalizedRecord, Statement};
    ///
    /// let a = NormalizedRecord::new(
    ///     Entity::new("Q1", "A", ""),
    ///     vec![Statement::new("P1", "p1", "V1", "v1"), Statement::new("P2", "p2", "V2", "v2")],
    /// );
    /// let b = NormalizedRecord::new(
    ///     Entity::new("Q2", "B", ""),
    ///     vec![Statement::new("P1", "p1", "V1", "v1"), Statement::new("P2", "p2", "V3", "v3")],
    /// );
    ///
    /// let result = ComparisonEngine::new().compare(&a, &b);
    /// assert_eq!(result.common.len(), 1);
    /// assert_eq!(result.only_a[0].value_id, "V2");
    /// assert_eq!(result.only_b[0].value_id, "V3");
    /// ```
    pub fn compare(&self, record_a: &NormalizedRecord, record_b: &NormalizedRecord) -> ComparisonResult {
        let keys_a: HashSet<PairKey> = record_a.keys().collect();
        let keys_b: HashSet<PairKey> = record_b.keys().collect();

        let mut common = Vec::new();
        let mut only_a = Vec::new();
        let mut seen = HashSet::new();
        for row in &record_a.rows {
            let key = row.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            if keys_b.contains(&key) {
                common.push(row.clone());
            } else {
                only_a.push(row.clone());
            }
        }

        let mut only_b = Vec::new();
        let mut seen = HashSet::new();
        for row in &record_b.rows {
            let key = row.key();
            if seen.insert(key.clone()) && !keys_a.contains(&key) {
                only_b.push(row.clone());
            }
        }

        ComparisonResult {
            entity_a: record_a.entity.clone(),
            entity_b: record_b.entity.clone(),
            common,
            only_a,
            only_b,
        }
    }
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
