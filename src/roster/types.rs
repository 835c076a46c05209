use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A membership record as delivered by a roster provider.
///
/// Providers hand over whatever key/value structure the upstream system
/// returns; the normalizer picks the fields it knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// First present, non-null value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_null())
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RawRecord(map),
            _ => RawRecord::default(),
        }
    }
}

/// Canonical flat member record.
///
/// Created once per fetch and never mutated afterwards. Placeholder
/// superiors synthesized during roster completion carry `is_virtual`.
///
/// Saved rosters may also use the membership service's own key names;
/// fields this record does not model are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub name: String,
    #[serde(default, alias = "id", deserialize_with = "text_or_number")]
    pub identifier: String,
    #[serde(default, alias = "userName")]
    pub login_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "deptName")]
    pub department: String,
    #[serde(default, alias = "deptCode", deserialize_with = "text_or_number")]
    pub department_code: String,
    #[serde(default, alias = "superior")]
    pub superior_name: String,
    #[serde(default, alias = "workPlaceName")]
    pub location: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub sex: String,
    #[serde(default, alias = "create_dt")]
    pub join_timestamp: i64,
    #[serde(default, alias = "gorder")]
    pub order: i64,
    #[serde(default, alias = "is_virtual")]
    pub is_virtual: bool,
}

/// Identifiers and codes show up as either strings or bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

impl MemberRecord {
    /// Deduplication key: identifier, else login name, else none.
    ///
    /// Records without a key cannot collide with anything and are always kept.
    pub fn identity_key(&self) -> Option<&str> {
        if !self.identifier.is_empty() {
            Some(&self.identifier)
        } else if !self.login_name.is_empty() {
            Some(&self.login_name)
        } else {
            None
        }
    }

    pub fn has_superior(&self) -> bool {
        !self.superior_name.is_empty()
    }

    /// Placeholder standing in for a superior with no member record.
    pub fn placeholder(name: &str, identifier: String) -> Self {
        Self {
            name: name.to_string(),
            identifier,
            is_virtual: true,
            ..Default::default()
        }
    }
}
