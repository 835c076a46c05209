mod ancestors;
mod dedup;
mod normalize;
mod store;
mod types;

pub use ancestors::synthesize_virtual_ancestors;
pub use dedup::{dedup_records, merge_batches};
pub use normalize::{normalize_batch, normalize_record, NormalizeReport};
pub use store::{load_roster, parse_roster, roster_to_json};
pub use types::{MemberRecord, RawRecord};

use crate::error::{Error, Result};

/// A merged, deduplicated roster with every superior name resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub members: Vec<MemberRecord>,
    pub malformed: usize,
    pub virtual_count: usize,
}

impl Roster {
    pub fn real_count(&self) -> usize {
        self.members.len() - self.virtual_count
    }
}

/// Normalize, merge and complete the batches delivered by a provider.
pub fn prepare_roster(batches: &[Vec<RawRecord>]) -> Result<Roster> {
    let (members, report) = merge_batches(batches);
    complete(members, report.malformed)
}

/// Complete an already-normalized member list, e.g. one loaded from a
/// persisted roster document.
pub fn complete_roster(members: Vec<MemberRecord>) -> Result<Roster> {
    complete(members, 0)
}

fn complete(mut members: Vec<MemberRecord>, malformed: usize) -> Result<Roster> {
    if members.is_empty() {
        return Err(Error::EmptyInput);
    }

    let added = synthesize_virtual_ancestors(&mut members);
    let virtual_count = members.iter().filter(|m| m.is_virtual).count();
    tracing::debug!(
        members = members.len(),
        placeholders = added,
        "roster complete"
    );

    Ok(Roster {
        members,
        malformed,
        virtual_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_merge_is_a_hard_failure() {
        let err = prepare_roster(&[vec![], vec![]]).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn persisted_placeholders_are_not_duplicated() {
        let members = vec![
            MemberRecord {
                name: "Carol".to_string(),
                superior_name: "Dave".to_string(),
                ..Default::default()
            },
            MemberRecord::placeholder("Dave", "virtual-1".to_string()),
        ];
        let roster = complete_roster(members).unwrap();
        assert_eq!(roster.members.len(), 2);
        assert_eq!(roster.virtual_count, 1);
        assert_eq!(roster.real_count(), 1);
    }

    #[test]
    fn prepare_counts_malformed_records() {
        let batch = vec![RawRecord::from(json!({"name": "A", "extInfo": "{"}))];
        let roster = prepare_roster(&[batch]).unwrap();
        assert_eq!(roster.malformed, 1);
        assert_eq!(roster.members.len(), 1);
    }
}
