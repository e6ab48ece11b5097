//! Weighted co-occurrence graph of semantic elements.
//!
//! Nodes are keyed by a stable `kind:text` id and edges by the ordered pair of their
//! endpoint ids, so the structure is two flat maps plus a derived adjacency index.
//! Weights are co-occurrence counts and only ever grow within a session.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::element::{ElementKind, SemanticElement};

/// Stable node id: `kind:normalized text`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(kind: ElementKind, text: &str) -> Self {
        Self(format!("{}:{text}", kind.as_str()))
    }

    #[must_use]
    pub fn of(element: &SemanticElement) -> Self {
        Self::new(element.kind, &element.text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptNode {
    pub id: NodeId,
    pub text: String,
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Number of distinct queries the element appeared in.
    pub weight: u64,
    pub first_seen_query_id: String,
    pub last_seen_query_id: String,
    #[serde(skip)]
    query_ids: BTreeSet<String>,
}

impl ConceptNode {
    /// The element this node stands for, attributed to the query that introduced it.
    #[must_use]
    pub fn element(&self) -> SemanticElement {
        SemanticElement {
            text: self.text.clone(),
            kind: self.kind,
            label: self.label.clone(),
            source_query_id: self.first_seen_query_id.clone(),
        }
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.text.cmp(&other.text))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptEdge {
    pub source: NodeId,
    pub target: NodeId,
    /// Co-occurrence count; always equals `query_ids.len()`.
    pub weight: u64,
    pub query_ids: BTreeSet<String>,
    /// Kind-aware strength used for visualization only.
    pub affinity: f64,
}

/// Node and edge lists for visualization tooling.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

type EdgeKey = (NodeId, NodeId);

fn edge_key(a: &NodeId, b: &NodeId) -> EdgeKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Kind-pair multiplier, same-kind boost and a saturating frequency factor.
fn affinity(a: ElementKind, b: ElementKind, weight: u64) -> f64 {
    use ElementKind::{Concept, Entity, NounPhrase, Verb};

    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let multiplier = match (lo, hi) {
        (Entity, Entity) => 2.0,
        (Entity, Concept) => 1.5,
        (NounPhrase, Verb) => 1.2,
        (Concept, Concept) => 1.3,
        (Verb, Verb) => 0.8,
        _ => 1.0,
    };
    let same_kind = if a == b { 1.1 } else { 1.0 };
    let frequency = (weight.saturating_sub(1) as f64).mul_add(0.2, 1.0).min(2.0);
    multiplier * same_kind * frequency
}

#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    nodes: HashMap<NodeId, ConceptNode>,
    edges: HashMap<EdgeKey, ConceptEdge>,
    adjacency: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl ConceptGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query's elements: bump each distinct node once and every distinct pair once.
    ///
    /// Replaying a query id that a node or edge already counted leaves its weight unchanged.
    pub fn add_query_elements<'a, I>(&mut self, query_id: &str, elements: I)
    where
        I: IntoIterator<Item = &'a SemanticElement>,
    {
        let mut distinct: BTreeMap<NodeId, &SemanticElement> = BTreeMap::new();
        for element in elements {
            distinct.entry(NodeId::of(element)).or_insert(element);
        }

        for (id, element) in &distinct {
            self.upsert_node(id, element, query_id);
        }

        let ids: Vec<&NodeId> = distinct.keys().collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                self.upsert_edge(a, b, query_id);
            }
        }
    }

    fn upsert_node(&mut self, id: &NodeId, element: &SemanticElement, query_id: &str) {
        match self.nodes.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let node = entry.get_mut();
                if node.query_ids.insert(query_id.to_string()) {
                    node.weight += 1;
                    node.last_seen_query_id = query_id.to_string();
                }
                if node.label.is_none() {
                    node.label.clone_from(&element.label);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(ConceptNode {
                    id: id.clone(),
                    text: element.text.clone(),
                    kind: element.kind,
                    label: element.label.clone(),
                    weight: 1,
                    first_seen_query_id: query_id.to_string(),
                    last_seen_query_id: query_id.to_string(),
                    query_ids: BTreeSet::from([query_id.to_string()]),
                });
            }
        }
    }

    fn upsert_edge(&mut self, a: &NodeId, b: &NodeId, query_id: &str) {
        let (Some(kind_a), Some(kind_b)) = (
            self.nodes.get(a).map(|n| n.kind),
            self.nodes.get(b).map(|n| n.kind),
        ) else {
            return;
        };

        let key = edge_key(a, b);
        match self.edges.entry(key) {
            Entry::Occupied(mut entry) => {
                let edge = entry.get_mut();
                if edge.query_ids.insert(query_id.to_string()) {
                    edge.weight += 1;
                    edge.affinity = affinity(kind_a, kind_b, edge.weight);
                }
            }
            Entry::Vacant(entry) => {
                let (source, target) = entry.key().clone();
                entry.insert(ConceptEdge {
                    source,
                    target,
                    weight: 1,
                    query_ids: BTreeSet::from([query_id.to_string()]),
                    affinity: affinity(kind_a, kind_b, 1),
                });
                self.adjacency
                    .entry(a.clone())
                    .or_default()
                    .insert(b.clone());
                self.adjacency
                    .entry(b.clone())
                    .or_default()
                    .insert(a.clone());
            }
        }
    }

    /// Neighbors of `element` by edge weight, then node weight, then text and kind.
    ///
    /// Unknown elements have no neighbors.
    #[must_use]
    pub fn related_elements(
        &self,
        element: &SemanticElement,
        top_k: usize,
        min_weight: u64,
    ) -> Vec<SemanticElement> {
        let id = NodeId::of(element);
        let Some(neighbors) = self.adjacency.get(&id) else {
            return Vec::new();
        };

        let mut ranked: Vec<(&ConceptEdge, &ConceptNode)> = neighbors
            .iter()
            .filter_map(|neighbor| {
                let edge = self.edges.get(&edge_key(&id, neighbor))?;
                if edge.weight < min_weight {
                    return None;
                }
                Some((edge, self.nodes.get(neighbor)?))
            })
            .collect();

        ranked.sort_by(|(edge_a, node_a), (edge_b, node_b)| {
            edge_b
                .weight
                .cmp(&edge_a.weight)
                .then_with(|| node_a.rank(node_b))
        });

        ranked
            .into_iter()
            .take(top_k)
            .map(|(_, node)| node.element())
            .collect()
    }

    /// Global node ranking: weight desc, then text and kind.
    #[must_use]
    pub fn highest_weight_nodes(&self, top_k: usize) -> Vec<&ConceptNode> {
        let mut ranked: Vec<&ConceptNode> = self.nodes.values().collect();
        ranked.sort_by(|a, b| a.rank(b));
        ranked.truncate(top_k);
        ranked
    }

    /// Text pairs of same-kind elements joined by an edge of at least `min_weight`.
    #[must_use]
    pub fn related_pairs(&self, kind: ElementKind, min_weight: u64) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .edges
            .values()
            .filter(|edge| edge.weight >= min_weight)
            .filter_map(|edge| {
                let source = self.nodes.get(&edge.source)?;
                let target = self.nodes.get(&edge.target)?;
                (source.kind == kind && target.kind == kind)
                    .then(|| (source.text.clone(), target.text.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&ConceptNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn node_for(&self, element: &SemanticElement) -> Option<&ConceptNode> {
        self.nodes.get(&NodeId::of(element))
    }

    #[must_use]
    pub fn edge(&self, a: &SemanticElement, b: &SemanticElement) -> Option<&ConceptEdge> {
        self.edges.get(&edge_key(&NodeId::of(a), &NodeId::of(b)))
    }

    #[must_use]
    pub fn degree(&self, id: &NodeId) -> usize {
        self.adjacency.get(id).map_or(0, BTreeSet::len)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ConceptEdge> {
        self.edges.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic snapshot: nodes by rank, edges by weight then endpoint ids.
    #[must_use]
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .highest_weight_nodes(self.nodes.len())
            .into_iter()
            .cloned()
            .collect();

        let mut edges: Vec<ConceptEdge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.target.cmp(&b.target))
        });

        GraphExport { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(text: &str, kind: ElementKind) -> SemanticElement {
        SemanticElement {
            text: text.to_string(),
            kind,
            label: None,
            source_query_id: "test".to_string(),
        }
    }

    fn weights(graph: &ConceptGraph) -> (Vec<(NodeId, u64)>, Vec<(EdgeKey, u64)>) {
        let mut nodes: Vec<_> = graph.nodes().map(|n| (n.id.clone(), n.weight)).collect();
        let mut edges: Vec<_> = graph
            .edges()
            .map(|e| ((e.source.clone(), e.target.clone()), e.weight))
            .collect();
        nodes.sort();
        edges.sort();
        (nodes, edges)
    }

    #[test]
    fn test_single_query_creates_nodes_and_edge() {
        let mut graph = ConceptGraph::new();
        let model = el("transformer model", ElementKind::NounPhrase);
        let work = el("work", ElementKind::Verb);
        graph.add_query_elements("q1", [&model, &work]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_for(&model).map(|n| n.weight), Some(1));
        assert_eq!(graph.node_for(&work).map(|n| n.weight), Some(1));

        let edge = graph.edge(&model, &work);
        assert_eq!(edge.map(|e| e.weight), Some(1));
        assert!(edge.is_some_and(|e| e.query_ids.contains("q1")));
    }

    #[test]
    fn test_duplicates_within_one_query_count_once() {
        let mut graph = ConceptGraph::new();
        let seattle = el("seattle", ElementKind::Entity);
        let again = el("seattle", ElementKind::Entity);
        let visit = el("visit", ElementKind::Verb);
        graph.add_query_elements("q1", [&seattle, &again, &visit, &visit]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_for(&seattle).map(|n| n.weight), Some(1));
        assert_eq!(graph.edge(&seattle, &visit).map(|e| e.weight), Some(1));
        assert_eq!(graph.degree(&NodeId::of(&seattle)), 1);
    }

    #[test]
    fn test_same_text_different_kind_are_distinct_nodes() {
        let mut graph = ConceptGraph::new();
        let entity = el("python", ElementKind::Entity);
        let concept = el("python", ElementKind::Concept);
        graph.add_query_elements("q1", [&entity, &concept]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_single_element_query_adds_no_edge() {
        let mut graph = ConceptGraph::new();
        let alone = el("thermodynamics", ElementKind::Concept);
        graph.add_query_elements("q1", [&alone]);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.related_elements(&alone, 5, 1).is_empty());
    }

    #[test]
    fn test_edge_weight_matches_provenance() {
        let mut graph = ConceptGraph::new();
        let a = el("cloud computing", ElementKind::NounPhrase);
        let b = el("architecture", ElementKind::Concept);
        let c = el("scale", ElementKind::Verb);

        graph.add_query_elements("q1", [&a, &b]);
        graph.add_query_elements("q2", [&a, &b, &c]);
        graph.add_query_elements("q3", [&b, &c, &b]);
        graph.add_query_elements("q3", [&b, &c]);

        for edge in graph.edges() {
            assert_eq!(edge.weight, edge.query_ids.len() as u64);
        }
        assert_eq!(graph.edge(&a, &b).map(|e| e.weight), Some(2));
        assert_eq!(graph.edge(&b, &c).map(|e| e.weight), Some(2));
        assert_eq!(graph.edge(&a, &c).map(|e| e.weight), Some(1));
        assert_eq!(graph.node_for(&b).map(|n| n.weight), Some(3));
    }

    #[test]
    fn test_first_and_last_seen_tracking() {
        let mut graph = ConceptGraph::new();
        let dna = el("dna", ElementKind::Entity);
        graph.add_query_elements("sci1", [&dna]);
        graph.add_query_elements("sci3", [&dna]);

        let node = graph.node_for(&dna);
        assert_eq!(node.map(|n| n.first_seen_query_id.as_str()), Some("sci1"));
        assert_eq!(node.map(|n| n.last_seen_query_id.as_str()), Some("sci3"));
        assert_eq!(
            node.map(|n| n.element().source_query_id),
            Some("sci1".to_string())
        );
    }

    #[test]
    fn test_label_kept_from_first_labelled_occurrence() {
        let mut graph = ConceptGraph::new();
        let plain = el("google", ElementKind::Entity);
        let labelled = el("google", ElementKind::Entity).with_label(Some("ORG".to_string()));
        graph.add_query_elements("q1", [&plain]);
        graph.add_query_elements("q2", [&labelled]);

        assert_eq!(
            graph.node_for(&plain).and_then(|n| n.label.clone()),
            Some("ORG".to_string())
        );
    }

    #[test]
    fn test_related_elements_ordering_and_ties() {
        let mut graph = ConceptGraph::new();
        let hub = el("coffee", ElementKind::Concept);
        let shop = el("shop", ElementKind::Concept);
        let hotel = el("hotel", ElementKind::Concept);
        let brew = el("brew", ElementKind::Verb);
        let bean = el("bean", ElementKind::Concept);

        graph.add_query_elements("q1", [&hub, &shop, &hotel]);
        graph.add_query_elements("q2", [&hub, &shop]);
        graph.add_query_elements("q3", [&hub, &brew, &bean]);
        // hotel and bean now tie on edge weight 1; give hotel extra node weight
        graph.add_query_elements("q4", [&hotel]);

        let related = graph.related_elements(&hub, 10, 1);
        let texts: Vec<&str> = related.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["shop", "hotel", "bean", "brew"]);
    }

    #[test]
    fn test_related_elements_respects_top_k_and_min_weight() {
        let mut graph = ConceptGraph::new();
        let hub = el("agile", ElementKind::Concept);
        let sprint = el("sprint", ElementKind::Concept);
        let team = el("team", ElementKind::Concept);
        graph.add_query_elements("q1", [&hub, &sprint, &team]);
        graph.add_query_elements("q2", [&hub, &sprint]);

        assert_eq!(graph.related_elements(&hub, 1, 1).len(), 1);
        assert_eq!(graph.related_elements(&hub, 0, 1).len(), 0);

        let strong = graph.related_elements(&hub, 10, 2);
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].text, "sprint");
    }

    #[test]
    fn test_related_elements_unknown_and_idempotent() {
        let mut graph = ConceptGraph::new();
        let a = el("swot analysis", ElementKind::NounPhrase);
        let b = el("component", ElementKind::Concept);
        graph.add_query_elements("bus1", [&a, &b]);

        assert!(
            graph
                .related_elements(&el("unknown", ElementKind::Entity), 3, 1)
                .is_empty()
        );

        let first = graph.related_elements(&a, 3, 1);
        let second = graph.related_elements(&a, 3, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_highest_weight_nodes_ranking() {
        let mut graph = ConceptGraph::new();
        let popular = el("seattle", ElementKind::Entity);
        let zeta = el("zeta", ElementKind::Concept);
        let alpha = el("alpha", ElementKind::Concept);
        graph.add_query_elements("q1", [&popular, &zeta]);
        graph.add_query_elements("q2", [&popular, &alpha]);

        let ranked: Vec<&str> = graph
            .highest_weight_nodes(3)
            .iter()
            .map(|n| n.text.as_str())
            .collect();
        assert_eq!(ranked, vec!["seattle", "alpha", "zeta"]);
        assert_eq!(graph.highest_weight_nodes(1).len(), 1);
        assert!(graph.highest_weight_nodes(0).is_empty());
    }

    #[test]
    fn test_related_pairs_filters_by_kind() {
        let mut graph = ConceptGraph::new();
        let http = el("http", ElementKind::Entity);
        let https = el("https", ElementKind::Entity);
        let difference = el("difference", ElementKind::Concept);
        graph.add_query_elements("tech4", [&http, &https, &difference]);

        assert_eq!(
            graph.related_pairs(ElementKind::Entity, 1),
            vec![("http".to_string(), "https".to_string())]
        );
        assert!(graph.related_pairs(ElementKind::Verb, 1).is_empty());
        assert!(graph.related_pairs(ElementKind::Entity, 2).is_empty());
    }

    #[test]
    fn test_affinity_multipliers() {
        let eps = 1e-9;
        assert!((affinity(ElementKind::Verb, ElementKind::Verb, 1) - 0.88).abs() < eps);
        assert!((affinity(ElementKind::Entity, ElementKind::Entity, 1) - 2.2).abs() < eps);
        assert!((affinity(ElementKind::Concept, ElementKind::Entity, 1) - 1.5).abs() < eps);
        assert!((affinity(ElementKind::Verb, ElementKind::NounPhrase, 2) - 1.44).abs() < eps);
        // frequency factor saturates at 2.0
        assert!((affinity(ElementKind::Entity, ElementKind::Verb, 50) - 2.0).abs() < eps);
    }

    #[test]
    fn test_weights_never_decrease() {
        let mut graph = ConceptGraph::new();
        let pool = [
            el("market", ElementKind::Concept),
            el("segmentation", ElementKind::Concept),
            el("explain", ElementKind::Verb),
            el("supply chain", ElementKind::NounPhrase),
        ];
        let queries: [&[usize]; 5] = [&[0, 1], &[1, 2, 3], &[0, 3], &[0, 1, 2, 3], &[2]];

        let mut previous = weights(&graph);
        for (n, members) in queries.iter().enumerate() {
            let elements: Vec<&SemanticElement> = members.iter().map(|&i| &pool[i]).collect();
            graph.add_query_elements(&format!("q{n}"), elements);
            let current = weights(&graph);

            for (id, weight) in &previous.0 {
                let now = current.0.iter().find(|(other, _)| other == id).map(|(_, w)| *w);
                assert!(now.is_some_and(|w| w >= *weight));
            }
            for (key, weight) in &previous.1 {
                let now = current.1.iter().find(|(other, _)| other == key).map(|(_, w)| *w);
                assert!(now.is_some_and(|w| w >= *weight));
            }
            previous = current;
        }
    }

    #[test]
    fn test_export_is_sorted() {
        let mut graph = ConceptGraph::new();
        let a = el("a", ElementKind::Concept);
        let b = el("b", ElementKind::Concept);
        let c = el("c", ElementKind::Concept);
        graph.add_query_elements("q1", [&a, &b, &c]);
        graph.add_query_elements("q2", [&b, &c]);

        let export = graph.export();
        assert_eq!(export.nodes.len(), 3);
        assert_eq!(export.edges.len(), 3);
        assert_eq!(export.nodes[0].weight, 2);
        assert_eq!(export.edges[0].weight, 2);
        assert_eq!(export.edges[0].source.as_str(), "concept:b");
        assert_eq!(export.edges[0].target.as_str(), "concept:c");
    }
}
