//! Query matching over node search text, and match-list navigation.

use std::collections::{BTreeSet, HashSet};

use crate::layout::LayoutState;
use crate::tree::{Forest, NodeId};

/// Trimmed, lowercased query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Every node whose search text contains `needle` (already normalized).
pub fn highlight_set(forest: &Forest, needle: &str) -> HashSet<NodeId> {
    if needle.is_empty() {
        return HashSet::new();
    }
    forest
        .nodes()
        .filter(|node| node.search_text.contains(needle))
        .map(|node| node.id)
        .collect()
}

/// Navigation order: exact name matches if there are any, otherwise
/// partial name matches. Both in forest order.
pub fn match_list(forest: &Forest, needle: &str) -> Vec<NodeId> {
    if needle.is_empty() {
        return Vec::new();
    }

    let names: Vec<(NodeId, String)> = forest
        .nodes()
        .map(|node| (node.id, node.name().to_lowercase()))
        .collect();

    let exact: Vec<NodeId> = names
        .iter()
        .filter(|(_, name)| name == needle)
        .map(|(id, _)| *id)
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    names
        .iter()
        .filter(|(_, name)| name.contains(needle))
        .map(|(id, _)| *id)
        .collect()
}

/// Ancestors that must be expanded for every highlighted node to be visible.
pub fn ancestors_to_reveal(forest: &Forest, highlight: &HashSet<NodeId>) -> BTreeSet<NodeId> {
    let mut reveal = BTreeSet::new();
    for id in highlight {
        for ancestor in forest.ancestors(*id) {
            // Everything above an already-collected ancestor is collected too.
            if !reveal.insert(ancestor) {
                break;
            }
        }
    }
    reveal
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub highlighted: usize,
    pub matches: usize,
    /// Whether revealing matches changed the expanded set.
    pub expanded_changed: bool,
}

/// Run a query against the forest and record the result in `state`.
///
/// An empty query clears highlight and match state. Otherwise every
/// highlighted node's ancestors are expanded and the first match is made
/// active.
pub fn apply_search(forest: &Forest, state: &mut LayoutState, query: &str) -> SearchOutcome {
    let needle = normalize_query(query);
    if needle.is_empty() {
        state.clear_search();
        return SearchOutcome {
            highlighted: 0,
            matches: 0,
            expanded_changed: false,
        };
    }

    let highlight = highlight_set(forest, &needle);
    let matches = match_list(forest, &needle);
    let expanded_changed = state.expand_many(ancestors_to_reveal(forest, &highlight));

    tracing::debug!(
        query = %needle,
        highlighted = highlight.len(),
        matches = matches.len(),
        "search applied"
    );

    let outcome = SearchOutcome {
        highlighted: highlight.len(),
        matches: matches.len(),
        expanded_changed,
    };
    state.set_search(highlight, matches);
    outcome
}

/// Move the active match by `step`, wrapping around the match list.
pub fn step_match(state: &mut LayoutState, step: isize) -> Option<NodeId> {
    let len = state.matches().len();
    if len == 0 {
        return None;
    }
    let current = state.active_match().unwrap_or(0) as isize;
    let next = (current + step).rem_euclid(len as isize) as usize;
    state.set_active_match(Some(next));
    state.active_node()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::MemberRecord;
    use proptest::prelude::*;

    fn member(name: &str, identifier: &str, department: &str, superior: &str) -> MemberRecord {
        MemberRecord {
            name: name.to_string(),
            identifier: identifier.to_string(),
            department: department.to_string(),
            superior_name: superior.to_string(),
            ..Default::default()
        }
    }

    fn org() -> Forest {
        Forest::build(vec![
            member("Alice", "E100", "Board", ""),
            member("Bob", "E101", "Engineering", "Alice"),
            member("Carol", "E205", "Engineering", "Bob"),
            member("Ann", "E300", "Sales", "Alice"),
            member("Anna", "E301", "Sales", "Ann"),
        ])
    }

    #[test]
    fn identifier_query_reveals_every_ancestor() {
        let forest = org();
        let mut state = LayoutState::new();
        let outcome = apply_search(&forest, &mut state, "205");

        assert_eq!(outcome.highlighted, 1);
        assert!(outcome.expanded_changed);
        assert_eq!(state.highlight(), &HashSet::from([NodeId(2)]));
        assert!(state.is_expanded(NodeId(0)));
        assert!(state.is_expanded(NodeId(1)));
        assert!(!state.is_expanded(NodeId(2)));
        // "205" is not part of any name.
        assert!(state.matches().is_empty());
        assert_eq!(state.active_match(), None);
    }

    #[test]
    fn exact_name_matches_take_precedence() {
        let forest = org();
        let mut state = LayoutState::new();
        apply_search(&forest, &mut state, "  ANN ");

        assert_eq!(state.matches(), [NodeId(3)]);
        assert_eq!(state.active_node(), Some(NodeId(3)));
        // Highlight stays a substring match over all searchable text.
        assert!(state.highlight().contains(&NodeId(4)));
    }

    #[test]
    fn partial_name_matches_are_the_fallback() {
        let forest = org();
        let mut state = LayoutState::new();
        apply_search(&forest, &mut state, "an");
        assert_eq!(state.matches(), [NodeId(3), NodeId(4)]);
    }

    #[test]
    fn empty_query_clears_state() {
        let forest = org();
        let mut state = LayoutState::new();
        apply_search(&forest, &mut state, "bob");
        apply_search(&forest, &mut state, "   ");
        assert!(state.highlight().is_empty());
        assert!(state.matches().is_empty());
        assert_eq!(state.active_match(), None);
        // Expansion performed by earlier searches is kept.
        assert!(state.is_expanded(NodeId(0)));
    }

    #[test]
    fn navigation_wraps_in_both_directions() {
        let forest = org();
        let mut state = LayoutState::new();
        apply_search(&forest, &mut state, "an");

        assert_eq!(step_match(&mut state, 1), Some(NodeId(4)));
        assert_eq!(step_match(&mut state, 1), Some(NodeId(3)));
        assert_eq!(step_match(&mut state, -1), Some(NodeId(4)));

        let mut empty = LayoutState::new();
        assert_eq!(step_match(&mut empty, 1), None);
    }

    proptest! {
        #[test]
        fn highlight_is_exactly_the_substring_matches(query in "[a-z0-9 ]{0,4}") {
            let forest = org();
            let mut state = LayoutState::new();
            apply_search(&forest, &mut state, &query);
            let needle = normalize_query(&query);

            for node in forest.nodes() {
                let hit = state.highlight().contains(&node.id);
                if needle.is_empty() {
                    prop_assert!(!hit);
                } else {
                    prop_assert_eq!(hit, node.search_text.contains(&needle));
                }
                if hit {
                    for ancestor in forest.ancestors(node.id) {
                        prop_assert!(state.is_expanded(ancestor));
                    }
                }
            }
        }
    }
}
