// 🧹 Record Normalizer - raw statements → comparable rows
//
// Keeps entity-valued statements, collapses duplicate (property, value) pairs,
// resolves labels in batches. Unresolved ids keep their raw id as label.

use crate::config::FetchConfig;
use crate::error::CompareResult;
use crate::model::{Entity, NormalizedRecord, PairKey, RawStatement, Statement};
use crate::wikidata::KnowledgeBase;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub struct RecordNormalizer {
    config: FetchConfig,
}

impl RecordNormalizer {
    pub fn new(config: FetchConfig) -> Self {
        RecordNormalizer { config }
    }

    /// Filter, dedupe and label a raw statement list
    pub async fn normalize<K: KnowledgeBase + ?Sized>(
        &self,
        kb: &K,
        entity: Entity,
        raw_statements: &[RawStatement],
    ) -> CompareResult<NormalizedRecord> {
        let pairs = entity_pairs(raw_statements);
        let ids = ids_to_resolve(&pairs);

        info!(
            entity = %entity.id,
            raw = raw_statements.len(),
            kept = pairs.len(),
            lookups = ids.len(),
            "normalizing record"
        );

        let labels = self.resolve_labels(kb, &ids).await?;
        Ok(build_record(entity, &pairs, &labels))
    }

    /// Batched label lookup with bounded concurrency
    pub async fn resolve_labels<K: KnowledgeBase + ?Sized>(
        &self,
        kb: &K,
        ids: &[String],
    ) -> CompareResult<HashMap<String, String>> {
        let batches: Vec<Vec<String>> = ids
            .chunks(self.config.label_batch_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        debug!(ids = ids.len(), batches = batches.len(), "resolving labels");

        let resolved: Vec<HashMap<String, String>> = stream::iter(batches)
            .map(|batch| async move { kb.fetch_labels(&batch).await })
            .buffered(self.config.label_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(resolved.into_iter().flatten().collect())
    }

    /// Pure core of `normalize` for callers that already hold the labels
    pub fn normalize_with_labels(
        &self,
        entity: Entity,
        raw_statements: &[RawStatement],
        labels: &HashMap<String, String>,
    ) -> NormalizedRecord {
        build_record(entity, &entity_pairs(raw_statements), labels)
    }
}

/// Distinct entity-valued pairs in input order (first occurrence wins)
pub fn entity_pairs(raw_statements: &[RawStatement]) -> Vec<PairKey> {
    let mut seen = HashSet::new();
    raw_statements
        .iter()
        .filter_map(RawStatement::entity_pair)
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}

/// Property and value ids needing a label, deduped, in first-seen order
fn ids_to_resolve(pairs: &[PairKey]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for pair in pairs {
        for id in [&pair.property_id, &pair.value_id] {
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

fn build_record(
    entity: Entity,
    pairs: &[PairKey],
    labels: &HashMap<String, String>,
) -> NormalizedRecord {
    let label_for = |id: &str| labels.get(id).cloned().unwrap_or_else(|| id.to_string());

    let rows = pairs
        .iter()
        .map(|pair| Statement {
            property_id: pair.property_id.clone(),
            property_label: label_for(&pair.property_id),
            value_id: pair.value_id.clone(),
            value_label: label_for(&pair.value_id),
        })
        .collect();

    NormalizedRecord::new(entity, rows)
}

// ============================================================================
// TESTS
// ============================================================================
