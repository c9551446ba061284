// Entity Compare - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod model;
pub mod wikidata;       // Knowledge-base client + payload parsing
pub mod normalizer;     // Raw statements → labelled rows
pub mod comparison;     // Set comparison + buckets
pub mod statistics;     // Counts + similarity ratio
pub mod visualization;  // Flow, graph and sunburst datasets
pub mod selection;      // Id / search-term resolution
pub mod pipeline;       // fetch → normalize → compare orchestration
pub mod export;         // JSON/CSV snapshots

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{CompareError, CompareResult};
pub use config::FetchConfig;
pub use model::{
    DatatypeTag, Entity, NormalizedRecord, PairKey, RawStatement, SnakType,
    Statement, Suggestion,
};
pub use wikidata::{KnowledgeBase, WikidataClient};
pub use normalizer::RecordNormalizer;
pub use comparison::{Bucket, ComparisonEngine, ComparisonResult, DivergentProperty};
pub use statistics::{summarize, Stats};
pub use visualization::{
    build_flow_view, build_graph_view, build_sunburst,
    FlowView, GraphView, IndexedFlows, SunburstNode, VisualizationDataset,
};
pub use selection::{parse_entity_id, resolve_selection, Selection};
pub use pipeline::{ComparisonPipeline, ComparisonRun};
pub use export::{SnapshotManifest, SnapshotWriter, DEFAULT_OUT_DIR};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
