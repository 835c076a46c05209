use std::path::Path;

use serde_json::Value;

use super::types::MemberRecord;
use crate::error::{Error, Result};

/// Parse a persisted roster: a JSON list of flat member records.
///
/// Fails before any tree construction if the document has any other shape.
pub fn parse_roster(content: &str) -> Result<Vec<MemberRecord>> {
    let document: Value = serde_json::from_str(content)
        .map_err(|e| Error::InvalidArtifactInput(format!("not valid JSON: {e}")))?;

    let Value::Array(items) = document else {
        return Err(Error::InvalidArtifactInput(
            "expected a list of member records".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(Error::InvalidArtifactInput(format!(
                    "entry {index} is not a flat record"
                )));
            }
            serde_json::from_value::<MemberRecord>(item)
                .map_err(|e| Error::InvalidArtifactInput(format!("entry {index}: {e}")))
        })
        .collect()
}

pub fn load_roster(path: &Path) -> Result<Vec<MemberRecord>> {
    let content = if path.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };
    parse_roster(&content)
}

pub fn roster_to_json(records: &[MemberRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_documents_that_are_not_lists() {
        let err = parse_roster(r#"{"name": "Alice"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactInput(_)));
    }

    #[test]
    fn rejects_nested_entries() {
        let err = parse_roster(r#"[{"name": "Alice"}, ["Bob"]]"#).unwrap_err();
        match err {
            Error::InvalidArtifactInput(message) => assert!(message.contains("entry 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_member_lists_saved_by_the_membership_service() {
        let records = parse_roster(
            r#"[{"name":"Li","id":"E1","userName":"li","deptName":"Ops","superior":"","is_virtual":false,
                "role_desc":"owner","portrait_url":"https://img.invalid/li.png"}]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "E1");
        assert_eq!(records[0].login_name, "li");
        assert_eq!(records[0].department, "Ops");
        assert!(!records[0].has_superior());
    }

    #[test]
    fn rejects_records_without_a_name() {
        let err = parse_roster(r#"[{"id": "E1"}]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidArtifactInput(_)));
    }

    #[test]
    fn keeps_virtual_flag_through_serialization() {
        let records = vec![
            MemberRecord {
                name: "Carol".to_string(),
                superior_name: "Dave".to_string(),
                ..Default::default()
            },
            MemberRecord::placeholder("Dave", "virtual-1".to_string()),
        ];
        let json = roster_to_json(&records).unwrap();
        assert!(json.contains("\"isVirtual\": true"));
        assert_eq!(parse_roster(&json).unwrap(), records);
    }
}
