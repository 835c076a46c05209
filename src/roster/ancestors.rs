use std::collections::{BTreeSet, HashSet};

use super::types::MemberRecord;

const VIRTUAL_ID_PREFIX: &str = "virtual-";

/// Append one placeholder root for every superior name that matches no
/// member. Returns the number of placeholders added.
///
/// Missing names are processed in sorted order so identifiers are stable
/// between runs. Placeholders are roots: this makes a single pass and never
/// links them further.
pub fn synthesize_virtual_ancestors(records: &mut Vec<MemberRecord>) -> usize {
    let known: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let missing: BTreeSet<String> = records
        .iter()
        .filter(|r| r.has_superior() && !known.contains(r.superior_name.as_str()))
        .map(|r| r.superior_name.clone())
        .collect();

    if missing.is_empty() {
        return 0;
    }

    let mut used_keys: HashSet<String> = records
        .iter()
        .filter_map(|r| r.identity_key().map(str::to_string))
        .collect();
    let mut counter = 0usize;
    let added = missing.len();

    for name in missing {
        let identifier = loop {
            counter += 1;
            let candidate = format!("{VIRTUAL_ID_PREFIX}{counter}");
            if used_keys.insert(candidate.clone()) {
                break candidate;
            }
        };
        tracing::debug!(%name, %identifier, "synthesized placeholder superior");
        records.push(MemberRecord::placeholder(&name, identifier));
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, superior: &str) -> MemberRecord {
        MemberRecord {
            name: name.to_string(),
            superior_name: superior.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_superior_gets_one_placeholder_appended() {
        let mut records = vec![
            member("Alice", ""),
            member("Bob", "Alice"),
            member("Carol", "Dave"),
            member("Eve", "Dave"),
        ];

        let added = synthesize_virtual_ancestors(&mut records);
        assert_eq!(added, 1);
        assert_eq!(records.len(), 5);

        let dave = &records[4];
        assert_eq!(dave.name, "Dave");
        assert!(dave.is_virtual);
        assert!(dave.superior_name.is_empty());
        assert_eq!(dave.identifier, "virtual-1");
    }

    #[test]
    fn placeholders_follow_sorted_name_order() {
        let mut records = vec![member("A", "Zed"), member("B", "Mia")];
        synthesize_virtual_ancestors(&mut records);
        let names: Vec<_> = records[2..].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Mia", "Zed"]);
    }

    #[test]
    fn synthetic_identifiers_skip_existing_keys() {
        let mut records = vec![MemberRecord {
            identifier: "virtual-1".to_string(),
            ..member("A", "Ghost")
        }];
        synthesize_virtual_ancestors(&mut records);
        assert_eq!(records[1].identifier, "virtual-2");
    }

    #[test]
    fn complete_roster_is_left_untouched() {
        let mut records = vec![member("A", ""), member("B", "A")];
        assert_eq!(synthesize_virtual_ancestors(&mut records), 0);
        assert_eq!(records.len(), 2);
    }
}
