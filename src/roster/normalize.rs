use serde_json::{Map, Value};

use super::types::{MemberRecord, RawRecord};

const NAME_KEYS: &[&str] = &["name", "displayName"];
const IDENTIFIER_KEYS: &[&str] = &["id", "personId", "employeeId", "identifier", "jobNumber"];
const LOGIN_KEYS: &[&str] = &["userName", "loginName", "account", "login"];
const TITLE_KEYS: &[&str] = &["title", "position"];
const DEPARTMENT_KEYS: &[&str] = &["deptName", "department", "departmentName"];
const SUPERIOR_KEYS: &[&str] = &["superior", "superiorName", "leaderName", "managerName"];
const NESTED_KEYS: &[&str] = &["extra", "extInfo", "ext", "attributes"];

const DEPT_CODE_KEYS: &[&str] = &["deptCode", "departmentCode"];
const LOCATION_KEYS: &[&str] = &["workPlaceName", "workLocation", "location"];
const SEX_KEYS: &[&str] = &["sex", "gender"];
const JOIN_KEYS: &[&str] = &["create_dt", "joinTime", "joinTimestamp", "hiredAt"];
const ORDER_KEYS: &[&str] = &["gorder", "order", "displayOrder", "sort"];

/// Group role code carried by membership records; 1 marks the group owner.
const ROLE_KEY: &str = "role";
const GROUP_OWNER_ROLE: i64 = 1;

/// Counters gathered while normalizing a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub records: usize,
    /// Records whose nested attribute object failed to parse.
    pub malformed: usize,
}

/// Flatten one raw record. The flag reports whether the nested attribute
/// object had to be replaced by an empty one.
pub fn normalize_record(raw: &RawRecord) -> (MemberRecord, bool) {
    let (nested, malformed) = nested_attributes(raw);
    let lookup = |keys: &[&str]| {
        raw.first_of(keys)
            .or_else(|| first_in(&nested, keys))
            .map(text_of)
            .unwrap_or_default()
    };
    let lookup_number = |keys: &[&str]| {
        first_in(&nested, keys)
            .or_else(|| raw.first_of(keys))
            .map(number_of)
            .unwrap_or(0)
    };

    let mut title = lookup(TITLE_KEYS);
    if title.is_empty() {
        title = role_title(raw.get(ROLE_KEY));
    }

    let record = MemberRecord {
        name: lookup(NAME_KEYS),
        identifier: lookup(IDENTIFIER_KEYS),
        login_name: lookup(LOGIN_KEYS),
        title,
        department: lookup(DEPARTMENT_KEYS),
        department_code: first_in(&nested, DEPT_CODE_KEYS)
            .or_else(|| raw.first_of(DEPT_CODE_KEYS))
            .map(text_of)
            .unwrap_or_default(),
        superior_name: lookup(SUPERIOR_KEYS),
        location: first_in(&nested, LOCATION_KEYS)
            .or_else(|| raw.first_of(LOCATION_KEYS))
            .map(text_of)
            .unwrap_or_default(),
        sex: first_in(&nested, SEX_KEYS)
            .or_else(|| raw.first_of(SEX_KEYS))
            .map(text_of)
            .unwrap_or_default(),
        join_timestamp: lookup_number(JOIN_KEYS),
        order: lookup_number(ORDER_KEYS),
        is_virtual: false,
    };

    (record, malformed)
}

/// Normalize a whole batch, preserving order.
pub fn normalize_batch(raw: &[RawRecord]) -> (Vec<MemberRecord>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let mut records = Vec::with_capacity(raw.len());

    for (index, item) in raw.iter().enumerate() {
        let (record, malformed) = normalize_record(item);
        if malformed {
            report.malformed += 1;
            tracing::warn!(
                index,
                name = %record.name,
                "nested attributes failed to parse; using empty attributes"
            );
        }
        records.push(record);
    }

    report.records = records.len();
    (records, report)
}

/// Nested attributes arrive either as an object or as a string holding a
/// serialized object. Anything unparseable degrades to an empty map.
fn nested_attributes(raw: &RawRecord) -> (Map<String, Value>, bool) {
    match raw.first_of(NESTED_KEYS) {
        None => (Map::new(), false),
        Some(Value::Object(map)) => (map.clone(), false),
        Some(Value::String(text)) if text.trim().is_empty() => (Map::new(), false),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => (map, false),
            _ => (Map::new(), true),
        },
        Some(_) => (Map::new(), true),
    }
}

/// Role codes are numeric membership flags, not job titles. Only the group
/// owner code and free-text roles produce a title.
fn role_title(role: Option<&Value>) -> String {
    match role {
        Some(Value::Number(n)) if n.as_i64() == Some(GROUP_OWNER_ROLE) => {
            "Group owner".to_string()
        }
        Some(Value::String(s)) if s.trim().parse::<i64>().is_err() => s.trim().to_string(),
        _ => String::new(),
    }
}

fn first_in<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn number_of(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        RawRecord::from(value)
    }

    #[test]
    fn extracts_known_fields_and_nested_string_object() {
        let (record, malformed) = normalize_record(&raw(json!({
            "name": " Alice ",
            "personId": "E100",
            "loginName": "alice",
            "title": "manager",
            "deptName": "Platform",
            "superiorName": "Dave",
            "extInfo": "{\"deptCode\":\"D7\",\"workLocation\":\"Berlin\",\"sex\":1,\"joinTime\":1700000000000,\"order\":\"3\"}"
        })));

        assert!(!malformed);
        assert_eq!(record.name, "Alice");
        assert_eq!(record.identifier, "E100");
        assert_eq!(record.login_name, "alice");
        assert_eq!(record.title, "manager");
        assert_eq!(record.department, "Platform");
        assert_eq!(record.superior_name, "Dave");
        assert_eq!(record.department_code, "D7");
        assert_eq!(record.location, "Berlin");
        assert_eq!(record.sex, "1");
        assert_eq!(record.join_timestamp, 1_700_000_000_000);
        assert_eq!(record.order, 3);
        assert!(!record.is_virtual);
    }

    #[test]
    fn absent_fields_default_to_empty() {
        let (record, malformed) = normalize_record(&raw(json!({"name": "Bob"})));
        assert!(!malformed);
        assert_eq!(record.identifier, "");
        assert_eq!(record.superior_name, "");
        assert_eq!(record.join_timestamp, 0);
    }

    #[test]
    fn malformed_nested_object_degrades_to_empty() {
        let (record, malformed) = normalize_record(&raw(json!({
            "name": "Carol",
            "employeeId": 205,
            "extInfo": "{not json"
        })));
        assert!(malformed);
        assert_eq!(record.name, "Carol");
        assert_eq!(record.identifier, "205");
        assert_eq!(record.location, "");
    }

    #[test]
    fn nested_object_value_is_accepted_directly() {
        let (record, malformed) =
            normalize_record(&raw(json!({"name": "Dan", "ext": {"workLocation": "Oslo"}})));
        assert!(!malformed);
        assert_eq!(record.location, "Oslo");
    }

    #[test]
    fn upstream_membership_shape_is_recognised() {
        let (record, malformed) = normalize_record(&raw(json!({
            "name": "Wang",
            "id": "E2",
            "role": 4,
            "create_dt": 1_690_000_000_000_i64,
            "gorder": 7,
            "portrait_url": "https://img.invalid/wang.png",
            "extra": "{\"userName\":\"wang\",\"deptName\":\"Ops\",\"deptCode\":\"D9\",\"superior\":\"Li\",\"workPlaceName\":\"Shanghai\",\"sex\":1}"
        })));

        assert!(!malformed);
        assert_eq!(record.name, "Wang");
        assert_eq!(record.identifier, "E2");
        assert_eq!(record.login_name, "wang");
        assert_eq!(record.department, "Ops");
        assert_eq!(record.department_code, "D9");
        assert_eq!(record.superior_name, "Li");
        assert_eq!(record.location, "Shanghai");
        assert_eq!(record.sex, "1");
        assert_eq!(record.join_timestamp, 1_690_000_000_000);
        assert_eq!(record.order, 7);
        assert_eq!(record.identity_key(), Some("E2"));
    }

    #[test]
    fn numeric_role_codes_do_not_become_titles() {
        let (member, _) = normalize_record(&raw(json!({"name": "Wang", "role": 4})));
        assert_eq!(member.title, "");

        let (owner, _) = normalize_record(&raw(json!({"name": "Li", "role": 1})));
        assert_eq!(owner.title, "Group owner");

        let (free_text, _) = normalize_record(&raw(json!({"name": "Zhao", "role": "Tech lead"})));
        assert_eq!(free_text.title, "Tech lead");

        let (titled, _) =
            normalize_record(&raw(json!({"name": "Qian", "title": "CTO", "role": 1})));
        assert_eq!(titled.title, "CTO");
    }

    #[test]
    fn user_name_is_a_login_not_a_display_name() {
        let (record, _) = normalize_record(&raw(json!({"userName": "zhou"})));
        assert_eq!(record.name, "");
        assert_eq!(record.login_name, "zhou");
    }

    #[test]
    fn batch_report_counts_malformed_records() {
        let batch = vec![
            raw(json!({"name": "A", "extInfo": "[1,2]"})),
            raw(json!({"name": "B", "extInfo": ""})),
            raw(json!({"name": "C", "extInfo": 42})),
        ];
        let (records, report) = normalize_batch(&batch);
        assert_eq!(records.len(), 3);
        assert_eq!(report, NormalizeReport { records: 3, malformed: 2 });
    }
}
