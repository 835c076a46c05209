//! Roster retrieval: anything that can hand back the raw member records of
//! one group.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::config::{Credentials, ProviderConfig};
use crate::error::{Error, Result};
use crate::roster::RawRecord;

const ENVELOPE_KEYS: &[&str] = &["data", "members", "items"];
const RETRY_STEP: Duration = Duration::from_millis(500);

pub trait RosterProvider {
    fn fetch_group(&self, group: &str) -> Result<Vec<RawRecord>>;
}

impl<F> RosterProvider for F
where
    F: Fn(&str) -> Result<Vec<RawRecord>>,
{
    fn fetch_group(&self, group: &str) -> Result<Vec<RawRecord>> {
        self(group)
    }
}

/// Fetch every group in order; one batch per group.
pub fn fetch_union<P: RosterProvider + ?Sized>(
    provider: &P,
    groups: &[String],
) -> Result<Vec<Vec<RawRecord>>> {
    let mut batches = Vec::with_capacity(groups.len());
    for group in groups {
        let batch = provider.fetch_group(group)?;
        tracing::debug!(group = %group, records = batch.len(), "fetched group");
        batches.push(batch);
    }
    Ok(batches)
}

/// Pull the record list out of a response body.
///
/// Accepts a bare array or an object wrapping one under `data`, `members`
/// or `items`. A wrapping object with a non-zero numeric `code` is a failed
/// request and reports its `msg`. Entries that are not objects become empty
/// records.
pub fn parse_envelope(source_id: &str, body: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::Provider {
        source_id: source_id.to_string(),
        message: format!("invalid JSON: {}", e),
    })?;

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(code) = status_code(&map).filter(|code| *code != 0) {
                return Err(Error::Provider {
                    source_id: source_id.to_string(),
                    message: failure_message(code, &map),
                });
            }
            ENVELOPE_KEYS
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| Error::Provider {
                    source_id: source_id.to_string(),
                    message: "object has no data, members or items list".to_string(),
                })?
        }
        _ => {
            return Err(Error::Provider {
                source_id: source_id.to_string(),
                message: "expected a list of records".to_string(),
            });
        }
    };

    Ok(list.into_iter().map(RawRecord::from).collect())
}

fn status_code(map: &serde_json::Map<String, Value>) -> Option<i64> {
    map.get("code").and_then(Value::as_i64)
}

fn failure_message(code: i64, map: &serde_json::Map<String, Value>) -> String {
    match map.get("msg").or_else(|| map.get("message")) {
        Some(Value::String(msg)) if !msg.trim().is_empty() => {
            format!("service returned code {code}: {}", msg.trim())
        }
        _ => format!("service returned code {code}"),
    }
}

/// Each group id is a path to a JSON document; `-` reads stdin.
#[derive(Debug, Clone, Default)]
pub struct FileProvider {
    base_dir: Option<PathBuf>,
}

impl FileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative group paths against `dir`.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, group: &str) -> PathBuf {
        let path = Path::new(group);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl RosterProvider for FileProvider {
    fn fetch_group(&self, group: &str) -> Result<Vec<RawRecord>> {
        let body = if group == "-" {
            let mut buffer = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
            buffer
        } else {
            let path = self.resolve(group);
            std::fs::read_to_string(&path).map_err(|e| Error::Provider {
                source_id: group.to_string(),
                message: format!("cannot read {}: {}", path.display(), e),
            })?
        };
        parse_envelope(group, &body)
    }
}

/// `GET {base_url}/groups/{id}/members` with a bearer token.
pub struct HttpProvider {
    agent: ureq::Agent,
    base_url: String,
    credentials: Credentials,
    retries: u32,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig, credentials: Credentials) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config(
                "provider.base_url is required for http".to_string(),
            ));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url,
            credentials,
            retries: config.retries,
        })
    }

    pub fn group_url(&self, group: &str) -> String {
        format!("{}/groups/{}/members", self.base_url, group.trim())
    }

    fn get(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", self.credentials.token))
            .header("Accept", "application/json")
            .call()
            .map_err(FetchFailure::from)?;
        response
            .body_mut()
            .read_to_string()
            .map_err(FetchFailure::from)
    }
}

impl RosterProvider for HttpProvider {
    fn fetch_group(&self, group: &str) -> Result<Vec<RawRecord>> {
        let url = self.group_url(group);
        let body = with_retries(group, self.retries, RETRY_STEP, || self.get(&url))?;
        parse_envelope(group, &body)
    }
}

#[derive(Debug)]
struct FetchFailure {
    message: String,
    transient: bool,
}

impl From<ureq::Error> for FetchFailure {
    fn from(err: ureq::Error) -> Self {
        let transient = match &err {
            ureq::Error::StatusCode(code) => *code == 429 || *code >= 500,
            ureq::Error::Timeout(_) | ureq::Error::Io(_) | ureq::Error::ConnectionFailed => true,
            _ => false,
        };
        Self {
            message: err.to_string(),
            transient,
        }
    }
}

/// Run `attempt` until it succeeds, fails permanently, or `retries` extra
/// attempts are used up. Waits `step * n` before the n-th retry.
fn with_retries<T, F>(source_id: &str, retries: u32, step: Duration, mut attempt: F) -> Result<T>
where
    F: FnMut() -> std::result::Result<T, FetchFailure>,
{
    let mut tries = 0;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(failure) if failure.transient && tries < retries => {
                tries += 1;
                tracing::warn!(
                    source = source_id,
                    attempt = tries,
                    "fetch failed, retrying: {}",
                    failure.message
                );
                std::thread::sleep(step * tries);
            }
            Err(failure) => {
                return Err(Error::Provider {
                    source_id: source_id.to_string(),
                    message: failure.message,
                });
            }
        }
    }
}
