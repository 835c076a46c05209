//! Forest construction from name-keyed superior references.
//!
//! Members only know their superior by display name. Every member is indexed
//! by name and attached to the first member registered under its superior's
//! name. Two unrelated members sharing a name cannot be told apart, so the
//! earlier one always wins.

use std::collections::HashMap;
use std::ops::Index;

use serde::Serialize;

use crate::roster::{MemberRecord, Roster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Discovery order, never duplicated.
    pub children: Vec<NodeId>,
    pub record: MemberRecord,
    /// Lowercased `name identifier department`.
    pub search_text: String,
}

impl Node {
    fn new(id: NodeId, record: MemberRecord) -> Self {
        let search_text = format!(
            "{} {} {}",
            record.name, record.identifier, record.department
        )
        .to_lowercase();
        Self {
            id,
            parent: None,
            children: Vec::new(),
            record,
            search_text,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn is_virtual(&self) -> bool {
        self.record.is_virtual
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// What the builder had to decide on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Members whose superior name matched more than one node.
    pub ambiguous_superiors: usize,
    /// Members whose superior name matched nothing and became roots.
    pub unresolved_superiors: usize,
    /// Members left as roots because attaching them would close a cycle.
    pub cycles_broken: usize,
}

#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    report: BuildReport,
}

impl Forest {
    /// Build the forest. Node ids follow input order.
    pub fn build(records: Vec<MemberRecord>) -> Self {
        let mut nodes: Vec<Node> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Node::new(NodeId(index), record))
            .collect();

        let mut by_name: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in &nodes {
            by_name
                .entry(node.record.name.clone())
                .or_default()
                .push(node.id);
        }

        let mut report = BuildReport::default();
        let mut roots = Vec::new();

        for index in 0..nodes.len() {
            let id = NodeId(index);
            let parent = resolve_parent(&nodes, &by_name, id, &mut report);

            match parent {
                Some(parent) => {
                    nodes[index].parent = Some(parent);
                    nodes[parent.0].children.push(id);
                }
                None => roots.push(id),
            }
        }

        if report.ambiguous_superiors > 0 {
            tracing::debug!(
                count = report.ambiguous_superiors,
                "superior names matched several members; attached to the first registered"
            );
        }
        if report.cycles_broken > 0 {
            tracing::warn!(
                count = report.cycles_broken,
                "superior references formed cycles; affected members kept as roots"
            );
        }

        Self {
            nodes,
            roots,
            report,
        }
    }

    pub fn from_roster(roster: Roster) -> Self {
        Self::build(roster.members)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn report(&self) -> BuildReport {
        self.report
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            forest: self,
            next: self.get(id).and_then(|n| n.parent),
        }
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| self.depth(n.id)).max().unwrap_or(0)
    }

    pub fn real_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_virtual()).count()
    }

    pub fn virtual_count(&self) -> usize {
        self.nodes.len() - self.real_count()
    }

    /// Nodes that have at least one child.
    pub fn branch_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|n| !n.children.is_empty())
            .map(|n| n.id)
    }
}

impl Index<NodeId> for Forest {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

pub struct Ancestors<'a> {
    forest: &'a Forest,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.forest.get(current).and_then(|n| n.parent);
        Some(current)
    }
}

fn resolve_parent(
    nodes: &[Node],
    by_name: &HashMap<String, Vec<NodeId>>,
    id: NodeId,
    report: &mut BuildReport,
) -> Option<NodeId> {
    let record = &nodes[id.0].record;
    if !record.has_superior() {
        return None;
    }

    let Some(candidates) = by_name.get(&record.superior_name) else {
        report.unresolved_superiors += 1;
        return None;
    };
    if candidates.len() > 1 {
        report.ambiguous_superiors += 1;
    }

    let parent = candidates[0];
    if parent == id {
        return None;
    }
    if closes_cycle(nodes, parent, id) {
        report.cycles_broken += 1;
        return None;
    }
    Some(parent)
}

/// Whether `id` already sits on the attached chain above `parent`.
fn closes_cycle(nodes: &[Node], parent: NodeId, id: NodeId) -> bool {
    if nodes[id.0].children.is_empty() {
        return false;
    }
    let mut current = Some(parent);
    while let Some(node) = current {
        if node == id {
            return true;
        }
        current = nodes[node.0].parent;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::synthesize_virtual_ancestors;
    use proptest::prelude::*;

    fn member(name: &str, superior: &str) -> MemberRecord {
        MemberRecord {
            name: name.to_string(),
            superior_name: superior.to_string(),
            ..Default::default()
        }
    }

    fn names(forest: &Forest, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| forest[*id].name().to_string()).collect()
    }

    #[test]
    fn placeholder_superior_becomes_a_root() {
        let mut records = vec![
            member("Alice", ""),
            member("Bob", "Alice"),
            member("Carol", "Dave"),
        ];
        synthesize_virtual_ancestors(&mut records);
        let forest = Forest::build(records);

        assert_eq!(names(&forest, forest.roots()), ["Alice", "Dave"]);
        assert_eq!(names(&forest, &forest[NodeId(0)].children), ["Bob"]);
        assert_eq!(names(&forest, &forest[NodeId(3)].children), ["Carol"]);
        assert!(forest[NodeId(3)].is_virtual());
        assert_eq!(forest.report().unresolved_superiors, 0);
    }

    #[test]
    fn superior_listed_after_subordinate_still_resolves() {
        let forest = Forest::build(vec![member("Bob", "Alice"), member("Alice", "")]);
        assert_eq!(forest[NodeId(0)].parent, Some(NodeId(1)));
        assert_eq!(forest.roots(), [NodeId(1)]);
    }

    #[test]
    fn ambiguous_name_attaches_to_first_registered() {
        let forest = Forest::build(vec![
            member("Sam", ""),
            member("Sam", ""),
            member("Kim", "Sam"),
        ]);
        assert_eq!(forest[NodeId(2)].parent, Some(NodeId(0)));
        assert!(forest[NodeId(1)].children.is_empty());
        assert_eq!(forest.report().ambiguous_superiors, 1);
    }

    #[test]
    fn self_reference_becomes_root() {
        let forest = Forest::build(vec![member("Ouro", "Ouro")]);
        assert_eq!(forest.roots(), [NodeId(0)]);
        assert!(forest[NodeId(0)].children.is_empty());
    }

    #[test]
    fn mutual_superiors_do_not_form_a_cycle() {
        let forest = Forest::build(vec![member("A", "B"), member("B", "A")]);
        assert_eq!(forest[NodeId(0)].parent, Some(NodeId(1)));
        assert_eq!(forest[NodeId(1)].parent, None);
        assert_eq!(forest.report().cycles_broken, 1);
    }

    #[test]
    fn unresolved_superior_without_synthesis_is_a_root() {
        let forest = Forest::build(vec![member("Carol", "Nobody")]);
        assert_eq!(forest.roots(), [NodeId(0)]);
        assert_eq!(forest.report().unresolved_superiors, 1);
    }

    #[test]
    fn depth_and_ancestors_follow_parent_links() {
        let forest = Forest::build(vec![
            member("A", ""),
            member("B", "A"),
            member("C", "B"),
        ]);
        assert_eq!(forest.ancestors(NodeId(2)).collect::<Vec<_>>(), [NodeId(1), NodeId(0)]);
        assert_eq!(forest.depth(NodeId(2)), 2);
        assert_eq!(forest.max_depth(), 2);
    }

    #[test]
    fn search_text_is_lowercased_concatenation() {
        let forest = Forest::build(vec![MemberRecord {
            name: "Erin".to_string(),
            identifier: "E205".to_string(),
            department: "Ops".to_string(),
            ..Default::default()
        }]);
        assert_eq!(forest[NodeId(0)].search_text, "erin e205 ops");
    }

    fn arb_members() -> impl Strategy<Value = Vec<MemberRecord>> {
        prop::collection::vec(("[a-f]", prop_oneof![Just(String::new()), "[a-h]"]), 1..30)
            .prop_map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(name, superior)| member(&name, &superior))
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn forest_is_acyclic_and_complete(mut records in arb_members()) {
            synthesize_virtual_ancestors(&mut records);
            let total = records.len();
            let forest = Forest::build(records);

            prop_assert_eq!(forest.len(), total);
            let mut reached = 0;
            for node in forest.nodes() {
                let chain: Vec<_> = forest.ancestors(node.id).collect();
                prop_assert!(chain.len() < total);
                prop_assert!(!chain.contains(&node.id));
                let top = chain.last().copied().unwrap_or(node.id);
                prop_assert!(forest[top].is_root());
                reached += 1;
            }
            prop_assert_eq!(reached, total);
            prop_assert_eq!(forest.report().unresolved_superiors, 0);

            for node in forest.nodes() {
                let mut seen = std::collections::HashSet::new();
                for child in &node.children {
                    prop_assert!(seen.insert(*child));
                    prop_assert_eq!(forest[*child].parent, Some(node.id));
                }
            }
        }

        #[test]
        fn construction_is_deterministic(mut records in arb_members()) {
            synthesize_virtual_ancestors(&mut records);
            let first = Forest::build(records.clone());
            let second = Forest::build(records);
            prop_assert_eq!(first.roots(), second.roots());
            for (a, b) in first.nodes().zip(second.nodes()) {
                prop_assert_eq!(a, b);
            }
        }
    }
}
