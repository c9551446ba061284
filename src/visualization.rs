// 🎨 Visualization data - flow list, relationship graph, sunburst tree
//
// Three independent projections of one ComparisonResult. They are rebuilt
// wholesale when the comparison changes and never mutated afterwards.

use crate::comparison::{Bucket, ComparisonResult};
use crate::model::{Entity, NormalizedRecord, PairKey, Statement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const SUNBURST_ROOT_ID: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Entity,
    Property,
    Value,
    Bucket,
}

/// Which side of the comparison a flow or branch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

// ============================================================================
// FLOW VIEW (Sankey)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowNode {
    pub kind: NodeKind,
    pub id: String,
    pub label: String,
}

/// Colour key for a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum FlowKind {
    /// entity → property
    From(Side),
    /// property → bucket
    Into(Bucket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub source: FlowNode,
    pub target: FlowNode,
    pub weight: usize,
    pub kind: FlowKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowView {
    pub flows: Vec<Flow>,
}

/// Node list plus index triples, the shape Sankey renderers take
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexedFlows {
    pub labels: Vec<String>,
    pub node_kinds: Vec<NodeKind>,
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
    pub values: Vec<usize>,
    pub link_kinds: Vec<FlowKind>,
}

impl FlowView {
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn to_indexed(&self) -> IndexedFlows {
        let mut indexed = IndexedFlows::default();
        let mut positions: HashMap<(NodeKind, &str), usize> = HashMap::new();

        for flow in &self.flows {
            let source = node_position(&mut positions, &flow.source, &mut indexed);
            let target = node_position(&mut positions, &flow.target, &mut indexed);

            indexed.sources.push(source);
            indexed.targets.push(target);
            indexed.values.push(flow.weight);
            indexed.link_kinds.push(flow.kind);
        }

        indexed
    }
}

fn node_position<'a>(
    positions: &mut HashMap<(NodeKind, &'a str), usize>,
    node: &'a FlowNode,
    indexed: &mut IndexedFlows,
) -> usize {
    *positions.entry((node.kind, node.id.as_str())).or_insert_with(|| {
        indexed.labels.push(node.label.clone());
        indexed.node_kinds.push(node.kind);
        indexed.labels.len() - 1
    })
}

fn entity_node(entity: &Entity) -> FlowNode {
    FlowNode {
        kind: NodeKind::Entity,
        id: entity.id.clone(),
        label: entity.label.clone(),
    }
}

pub fn build_flow_view(
    result: &ComparisonResult,
    record_a: &NormalizedRecord,
    record_b: &NormalizedRecord,
) -> FlowView {
    let mut counts: HashMap<(&str, Bucket), usize> = HashMap::new();
    for (bucket, row) in result.tagged_rows() {
        *counts.entry((row.property_id.as_str(), bucket)).or_insert(0) += 1;
    }
    let count = |property: &str, bucket: Bucket| counts.get(&(property, bucket)).copied().unwrap_or(0);

    let node_a = entity_node(&result.entity_a);
    let node_b = entity_node(&result.entity_b);

    let mut flows = Vec::new();
    for property_id in property_order(result, record_a, record_b) {
        let property = FlowNode {
            kind: NodeKind::Property,
            id: property_id.to_string(),
            label: result.property_label(property_id).to_string(),
        };

        let common = count(property_id, Bucket::Common);
        let from_a = common + count(property_id, Bucket::OnlyA);
        let from_b = common + count(property_id, Bucket::OnlyB);

        for (side, node, weight) in [(Side::A, &node_a, from_a), (Side::B, &node_b, from_b)] {
            if weight > 0 {
                flows.push(Flow {
                    source: node.clone(),
                    target: property.clone(),
                    weight,
                    kind: FlowKind::From(side),
                });
            }
        }

        for bucket in Bucket::ALL {
            let weight = count(property_id, bucket);
            if weight > 0 {
                flows.push(Flow {
                    source: property.clone(),
                    target: FlowNode {
                        kind: NodeKind::Bucket,
                        id: bucket.as_str().to_string(),
                        label: bucket.title(&result.entity_a, &result.entity_b),
                    },
                    weight,
                    kind: FlowKind::Into(bucket),
                });
            }
        }
    }

    FlowView { flows }
}

/// Properties present in the result, in record A order then record B order
fn property_order<'a>(
    result: &'a ComparisonResult,
    record_a: &'a NormalizedRecord,
    record_b: &'a NormalizedRecord,
) -> Vec<&'a str> {
    let present: HashSet<&str> = result
        .tagged_rows()
        .map(|(_, row)| row.property_id.as_str())
        .collect();

    let mut seen = HashSet::new();
    let mut order: Vec<&str> = record_a
        .rows
        .iter()
        .chain(&record_b.rows)
        .map(|row| row.property_id.as_str())
        .filter(|id| present.contains(id) && seen.insert(*id))
        .collect();

    // Rows the records did not list (mismatched inputs) still get a slot
    for (_, row) in result.tagged_rows() {
        let id = row.property_id.as_str();
        if seen.insert(id) {
            order.push(id);
        }
    }

    order
}

// ============================================================================
// GRAPH VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Normalized statement count (entity nodes only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_count: Option<usize>,

    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub property_id: String,
    pub property_label: String,
    pub bucket: Bucket,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Nodes with no incident edge
    pub fn isolated_nodes(&self) -> Vec<&GraphNode> {
        self.nodes.iter().filter(|node| node.degree == 0).collect()
    }

    pub fn edges_in(&self, bucket: Bucket) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.bucket == bucket)
    }
}

/// One edge per observing entity and (property, value) pair.
/// A value whose id is one of the compared entities reuses that entity's node.
pub fn build_graph_view(
    result: &ComparisonResult,
    record_a: &NormalizedRecord,
    record_b: &NormalizedRecord,
) -> GraphView {
    let mut nodes = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (entity, record) in [(&result.entity_a, record_a), (&result.entity_b, record_b)] {
        if index.contains_key(&entity.id) {
            continue;
        }
        index.insert(entity.id.clone(), nodes.len());
        nodes.push(GraphNode {
            id: entity.id.clone(),
            label: entity.label.clone(),
            kind: NodeKind::Entity,
            description: Some(entity.description.clone()),
            statement_count: Some(record.len()),
            degree: 0,
        });
    }

    let mut edges = Vec::new();
    let same_entity = result.entity_a.id == result.entity_b.id;

    for (bucket, row) in result.tagged_rows() {
        if !index.contains_key(&row.value_id) {
            index.insert(row.value_id.clone(), nodes.len());
            nodes.push(GraphNode {
                id: row.value_id.clone(),
                label: row.value_label.clone(),
                kind: NodeKind::Value,
                description: None,
                statement_count: None,
                degree: 0,
            });
        }

        let observers: Vec<&Entity> = match bucket {
            Bucket::Common if same_entity => vec![&result.entity_a],
            Bucket::Common => vec![&result.entity_a, &result.entity_b],
            Bucket::OnlyA => vec![&result.entity_a],
            Bucket::OnlyB => vec![&result.entity_b],
        };

        for entity in observers {
            edges.push(edge(entity, row, bucket));
        }
    }

    for e in &edges {
        for endpoint in [&e.source, &e.target] {
            if let Some(&position) = index.get(endpoint) {
                nodes[position].degree += 1;
            }
        }
    }

    GraphView { nodes, edges }
}

fn edge(entity: &Entity, row: &Statement, bucket: Bucket) -> GraphEdge {
    GraphEdge {
        source: entity.id.clone(),
        target: row.value_id.clone(),
        property_id: row.property_id.clone(),
        property_label: row.property_label.clone(),
        bucket,
    }
}

// ============================================================================
// SUNBURST VIEW
// ============================================================================

/// Tree node; ids are slash-joined paths so they stay unique across branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunburstNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,

    /// Leaf whose (property, value) pair is in the common bucket
    pub common: bool,

    pub children: Vec<SunburstNode>,
}

/// Flat row for renderers taking (ids, labels, parents, values) columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunburstRow {
    pub id: String,
    pub label: String,
    pub parent: String,
    pub value: usize,
    pub common: bool,
}

impl SunburstNode {
    fn new(id: String, label: String, kind: NodeKind) -> Self {
        SunburstNode {
            id,
            label,
            kind,
            common: false,
            children: Vec::new(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            usize::from(self.kind == NodeKind::Value)
        } else {
            self.children.iter().map(SunburstNode::leaf_count).sum()
        }
    }

    /// Depth-first rows; the root's parent is the empty string
    pub fn flatten(&self) -> Vec<SunburstRow> {
        let mut rows = Vec::new();
        self.flatten_into("", &mut rows);
        rows
    }

    fn flatten_into(&self, parent: &str, rows: &mut Vec<SunburstRow>) {
        rows.push(SunburstRow {
            id: self.id.clone(),
            label: self.label.clone(),
            parent: parent.to_string(),
            value: self.leaf_count(),
            common: self.common,
        });
        for child in &self.children {
            child.flatten_into(&self.id, rows);
        }
    }
}

/// Synthetic root → entity A / entity B → properties → value leaves
pub fn build_sunburst(
    result: &ComparisonResult,
    record_a: &NormalizedRecord,
    record_b: &NormalizedRecord,
) -> SunburstNode {
    let common_keys: BTreeSet<PairKey> = result.keys(Bucket::Common);

    let mut root = SunburstNode::new(
        SUNBURST_ROOT_ID.to_string(),
        format!("{} vs {}", result.entity_a.label, result.entity_b.label),
        NodeKind::Root,
    );

    for (side, entity, record) in [
        ("a", &result.entity_a, record_a),
        ("b", &result.entity_b, record_b),
    ] {
        let branch_id = format!("{}/{}", SUNBURST_ROOT_ID, side);
        let mut branch = SunburstNode::new(branch_id.clone(), entity.label.clone(), NodeKind::Entity);
        let mut property_slots: HashMap<&str, usize> = HashMap::new();
        let mut seen = HashSet::new();

        for row in &record.rows {
            if !seen.insert(row.key()) {
                continue;
            }

            let slot = *property_slots
                .entry(row.property_id.as_str())
                .or_insert_with(|| {
                    branch.children.push(SunburstNode::new(
                        format!("{}/{}", branch_id, row.property_id),
                        row.property_label.clone(),
                        NodeKind::Property,
                    ));
                    branch.children.len() - 1
                });

            let property = &mut branch.children[slot];
            let mut leaf = SunburstNode::new(
                format!("{}/{}", property.id, row.value_id),
                row.value_label.clone(),
                NodeKind::Value,
            );
            leaf.common = common_keys.contains(&row.key());
            property.children.push(leaf);
        }

        root.children.push(branch);
    }

    root
}

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationDataset {
    pub flow: FlowView,
    pub graph: GraphView,
    pub sunburst: SunburstNode,
}

impl VisualizationDataset {
    pub fn build(
        result: &ComparisonResult,
        record_a: &NormalizedRecord,
        record_b: &NormalizedRecord,
    ) -> Self {
        VisualizationDataset {
            flow: build_flow_view(result, record_a, record_b),
            graph: build_graph_view(result, record_a, record_b),
            sunburst: build_sunburst(result, record_a, record_b),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ComparisonEngine;

    fn record(id: &str, label: &str, pairs: &[(&str, &str)]) -> NormalizedRecord {
        NormalizedRecord::new(
            Entity::new(id, label, format!("{} description", label)),
            pairs
                .iter()
                .map(|(p, v)| Statement::new(*p, format!("label {}", p), *v, format!("label {}", v)))
                .collect(),
        )
    }

    fn dataset(a: &NormalizedRecord, b: &NormalizedRecord) -> VisualizationDataset {
        let result = ComparisonEngine::new().compare(a, b);
        VisualizationDataset::build(&result, a, b)
    }

    fn example() -> (NormalizedRecord, NormalizedRecord) {
        (
            record("QA", "Alpha", &[("P1", "V1"), ("P2", "V2")]),
            record("QB", "Beta", &[("P1", "V1"), ("P2", "V3")]),
        )
    }

    #[test]
    fn test_flow_view_weights() {
        let (a, b) = example();
        let flow = dataset(&a, &b).flow;

        let summary: Vec<(String, String, usize)> = flow
            .flows
            .iter()
            .map(|f| (f.source.id.clone(), f.target.id.clone(), f.weight))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("QA".to_string(), "P1".to_string(), 1),
                ("QB".to_string(), "P1".to_string(), 1),
                ("P1".to_string(), "common".to_string(), 1),
                ("QA".to_string(), "P2".to_string(), 1),
                ("QB".to_string(), "P2".to_string(), 1),
                ("P2".to_string(), "only_a".to_string(), 1),
                ("P2".to_string(), "only_b".to_string(), 1),
            ]
        );
        assert_eq!(flow.flows[2].kind, FlowKind::Into(Bucket::Common));
        assert_eq!(flow.flows[0].kind, FlowKind::From(Side::A));
        assert_eq!(flow.flows[5].target.label, "Only Alpha");
    }

    #[test]
    fn test_flow_weight_counts_values_per_bucket() {
        let a = record("QA", "Alpha", &[("P106", "V1"), ("P106", "V2"), ("P106", "V3")]);
        let b = record("QB", "Beta", &[("P106", "V1"), ("P106", "V2")]);
        let flow = dataset(&a, &b).flow;

        let weight = |source: &str, target: &str| {
            flow.flows
                .iter()
                .find(|f| f.source.id == source && f.target.id == target)
                .map(|f| f.weight)
        };
        assert_eq!(weight("QA", "P106"), Some(3));
        assert_eq!(weight("QB", "P106"), Some(2));
        assert_eq!(weight("P106", "common"), Some(2));
        assert_eq!(weight("P106", "only_a"), Some(1));
        assert_eq!(weight("P106", "only_b"), None);
    }

    #[test]
    fn test_flow_to_indexed() {
        let (a, b) = example();
        let indexed = dataset(&a, &b).flow.to_indexed();

        assert_eq!(
            indexed.labels,
            vec!["Alpha", "label P1", "Beta", "Common", "label P2", "Only Alpha", "Only Beta"]
        );
        assert_eq!(indexed.sources.len(), 7);
        assert_eq!(indexed.sources[0], 0);
        assert_eq!(indexed.targets[0], 1);
        assert_eq!(indexed.values, vec![1; 7]);
        assert_eq!(indexed.node_kinds[3], NodeKind::Bucket);
    }

    #[test]
    fn test_graph_view_edges_and_nodes() {
        let (a, b) = example();
        let graph = dataset(&a, &b).graph;

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["QA", "QB", "V1", "V2", "V3"]);

        // Common pair observed by both entities
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.edges_in(Bucket::Common).count(), 2);
        assert_eq!(graph.node("V1").unwrap().degree, 2);
        assert_eq!(graph.node("QA").unwrap().statement_count, Some(2));
        assert_eq!(
            graph.node("QA").unwrap().description.as_deref(),
            Some("Alpha description")
        );
        assert!(graph.isolated_nodes().is_empty());
    }

    #[test]
    fn test_graph_view_empty_records() {
        let a = record("QA", "Alpha", &[]);
        let b = record("QB", "Beta", &[]);
        let graph = dataset(&a, &b).graph;

        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.isolated_nodes().len(), 2);
    }

    #[test]
    fn test_graph_value_matching_entity_reuses_node() {
        // Alpha's record points at Beta
        let a = record("QA", "Alpha", &[("P3373", "QB")]);
        let b = record("QB", "Beta", &[]);
        let graph = dataset(&a, &b).graph;

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.node("QB").unwrap().kind, NodeKind::Entity);
        assert_eq!(graph.node("QB").unwrap().degree, 1);
    }

    #[test]
    fn test_sunburst_structure() {
        let (a, b) = example();
        let sunburst = dataset(&a, &b).sunburst;

        assert_eq!(sunburst.id, SUNBURST_ROOT_ID);
        assert_eq!(sunburst.children.len(), 2);

        let branch_a = &sunburst.children[0];
        assert_eq!(branch_a.id, "root/a");
        assert_eq!(branch_a.label, "Alpha");
        assert_eq!(branch_a.children.len(), 2);

        let p1 = &branch_a.children[0];
        assert_eq!(p1.id, "root/a/P1");
        assert_eq!(p1.children[0].id, "root/a/P1/V1");
        assert!(p1.children[0].common);

        let p2_b = &sunburst.children[1].children[1];
        assert_eq!(p2_b.children[0].id, "root/b/P2/V3");
        assert!(!p2_b.children[0].common);

        assert_eq!(sunburst.leaf_count(), 4);
    }

    #[test]
    fn test_sunburst_empty_records() {
        let a = record("QA", "Alpha", &[]);
        let b = record("QB", "Beta", &[]);
        let data = dataset(&a, &b);

        assert!(data.flow.is_empty());
        assert_eq!(data.sunburst.children.len(), 2);
        assert!(data.sunburst.children.iter().all(|c| c.children.is_empty()));
        assert_eq!(data.sunburst.leaf_count(), 0);
    }

    #[test]
    fn test_sunburst_same_entity_ids_stay_unique() {
        let a = record("QA", "Alpha", &[("P1", "V1")]);
        let rows = dataset(&a, &a).sunburst.flatten();

        let ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), rows.len());
    }

    #[test]
    fn test_sunburst_flatten() {
        let (a, b) = example();
        let rows = dataset(&a, &b).sunburst.flatten();

        assert_eq!(rows[0].id, "root");
        assert_eq!(rows[0].parent, "");
        assert_eq!(rows[0].value, 4);
        assert_eq!(rows[1].parent, "root");
        assert_eq!(rows[2].parent, "root/a");
        assert_eq!(rows.len(), 1 + 2 + 4 + 4);
    }
}
