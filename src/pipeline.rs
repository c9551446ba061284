// 🔗 Comparison Pipeline - fetch → normalize → compare → summarize → visualize
//
// The two entity sequences run concurrently and join before comparison.
// Any fetch/normalize failure aborts the run; no partial comparison exists.

use crate::comparison::{ComparisonEngine, ComparisonResult};
use crate::config::FetchConfig;
use crate::error::{CompareError, CompareResult};
use crate::model::NormalizedRecord;
use crate::normalizer::RecordNormalizer;
use crate::statistics::{summarize, Stats};
use crate::visualization::VisualizationDataset;
use crate::wikidata::KnowledgeBase;
use serde::Serialize;
use tracing::{info, warn};

/// Everything one run produces, immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRun {
    pub record_a: NormalizedRecord,
    pub record_b: NormalizedRecord,
    pub result: ComparisonResult,
    pub stats: Stats,
    pub visualization: VisualizationDataset,

    /// Non-fatal conditions (empty records)
    #[serde(skip)]
    pub warnings: Vec<CompareError>,
}

impl ComparisonRun {
    /// Compare two already-normalized records
    pub fn from_records(record_a: NormalizedRecord, record_b: NormalizedRecord) -> Self {
        let warnings = [&record_a, &record_b]
            .into_iter()
            .filter(|record| record.is_empty())
            .map(|record| CompareError::EmptyResult {
                id: record.entity.id.clone(),
            })
            .collect();

        let result = ComparisonEngine::new().compare(&record_a, &record_b);
        let stats = summarize(&result);
        let visualization = VisualizationDataset::build(&result, &record_a, &record_b);

        ComparisonRun {
            record_a,
            record_b,
            result,
            stats,
            visualization,
            warnings,
        }
    }
}

pub struct ComparisonPipeline<K: KnowledgeBase> {
    kb: K,
    normalizer: RecordNormalizer,
}

impl<K: KnowledgeBase> ComparisonPipeline<K> {
    pub fn new(kb: K, config: FetchConfig) -> Self {
        ComparisonPipeline {
            kb,
            normalizer: RecordNormalizer::new(config),
        }
    }

    pub fn knowledge_base(&self) -> &K {
        &self.kb
    }

    /// Fetch and normalize one entity
    pub async fn fetch_record(&self, id: &str) -> CompareResult<NormalizedRecord> {
        let (entity, raw_statements) = self.kb.fetch_entity(id).await?;
        info!(id, label = %entity.label, statements = raw_statements.len(), "fetched entity");

        self.normalizer
            .normalize(&self.kb, entity, &raw_statements)
            .await
    }

    pub async fn run(&self, id_a: &str, id_b: &str) -> CompareResult<ComparisonRun> {
        info!(id_a, id_b, "starting comparison run");

        let (record_a, record_b) =
            tokio::try_join!(self.fetch_record(id_a), self.fetch_record(id_b))?;

        let run = ComparisonRun::from_records(record_a, record_b);
        for warning in &run.warnings {
            warn!("{}", warning);
        }
        info!(summary = %run.stats.summary(), "comparison complete");

        Ok(run)
    }
}

// ============================================================================
// TESTS
// ============================================================================
